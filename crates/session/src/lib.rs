//! # Session
//!
//! Session lifecycle, block accumulation and flush policy.
//!
//! Responsibilities:
//! - Create `session_NNNNN.opl` files and write header / hardware / end records
//! - Accumulate samples into blocks and commit them on event, size, time,
//!   capacity overflow, explicit request and shutdown
//! - Surface storage errors without stopping the session
//!
//! ## Usage Example
//!
//! ```ignore
//! use session::SessionManager;
//!
//! let mut manager = SessionManager::new(storage, MonotonicClock::new(), "/sd");
//! manager.start(metadata)?;
//! while let Some(sample) = queue.pop() {
//!     manager.write_sample(sample)?;
//! }
//! manager.check_flush()?;
//! manager.stop()?;
//! ```

mod error;
mod manager;
mod naming;
mod policy;
mod stats;

pub use error::{Result, SessionError};
pub use manager::{CommitInfo, SessionManager};
pub use naming::{next_session_path, parse_session_number};
pub use policy::FlushPolicy;
pub use stats::SessionStats;
