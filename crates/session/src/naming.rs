//! Session file naming

use std::path::{Path, PathBuf};

use contracts::Storage;
use tracing::warn;

const PREFIX: &str = "session_";
const SUFFIX: &str = ".opl";

/// Number in `session_<n>.opl`, if the name has that shape
pub fn parse_session_number(name: &str) -> Option<u64> {
    let digits = name.strip_prefix(PREFIX)?.strip_suffix(SUFFIX)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Next free session path: one past the highest existing number.
///
/// Falls back to a timestamp-derived name when the directory cannot be
/// listed.
pub fn next_session_path<S: Storage>(storage: &S, directory: &Path, now_us: u64) -> PathBuf {
    match storage.list_directory(directory) {
        Ok(entries) => {
            let next = entries
                .iter()
                .filter_map(|e| parse_session_number(&e.name))
                .max()
                .map_or(1, |n| n.saturating_add(1));
            directory.join(format!("{}{:05}{}", PREFIX, next, SUFFIX))
        }
        Err(e) => {
            warn!(dir = %directory.display(), error = %e, "Cannot list sessions, using timestamp name");
            directory.join(format!("{}{}{}", PREFIX, now_us, SUFFIX))
        }
    }
}
