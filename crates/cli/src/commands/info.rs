//! `info` command implementation.
//!
//! Parses a session file with the resyncing reader, so truncated or
//! partially corrupted files still report everything that survived.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use codec::{BlockSummary, RecordBody, SessionHeader, SessionLog, TimedSample, MAGIC};
use contracts::{HardwareItem, Reading};
use serde::Serialize;
use tracing::{debug, info};

use crate::cli::InfoArgs;

/// Session file info for JSON output
#[derive(Serialize)]
struct SessionInfo {
    file: String,
    file_bytes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    modified: Option<String>,
    compressed: bool,
    complete: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    header: Option<SessionHeader>,
    hardware: Vec<HardwareItem>,
    block_count: usize,
    sample_count: usize,
    duration_ms: u64,
    flush_reasons: BTreeMap<&'static str, usize>,
    /// Inclusive ranges of missing block sequences
    #[serde(skip_serializing_if = "Vec::is_empty")]
    sequence_gaps: Vec<(u32, u32)>,
    missing_blocks: u64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    corruptions: Vec<CorruptionInfo>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    blocks: Vec<BlockSummary>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    samples: Vec<TimedSample>,
}

#[derive(Serialize)]
struct CorruptionInfo {
    offset: usize,
    skipped: usize,
    error: String,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(file = %args.file.display(), "Reading session file");

    if !args.file.exists() {
        anyhow::bail!("Session file not found: {}", args.file.display());
    }

    let raw = std::fs::read(&args.file)
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    let (data, compressed) = decode_container(raw);
    let log = SessionLog::parse(&data);

    let info = build_session_info(&args.file, &log, compressed, args);

    if args.json {
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize session info")?;
        println!("{}", json);
    } else {
        print_session_info(&info);
    }

    Ok(())
}

/// Plain files start with the record magic; anything else is tried as
/// deflate frames and kept raw if that does not yield a session.
pub(crate) fn decode_container(raw: Vec<u8>) -> (Vec<u8>, bool) {
    if raw.starts_with(&MAGIC) {
        return (raw, false);
    }
    let inflated = storage::inflate_frames(&raw);
    if inflated.starts_with(&MAGIC) {
        debug!(
            compressed = raw.len(),
            inflated = inflated.len(),
            "Inflated deflate-framed session"
        );
        (inflated, true)
    } else {
        (raw, false)
    }
}

fn build_session_info(
    path: &Path,
    log: &SessionLog,
    compressed: bool,
    args: &InfoArgs,
) -> SessionInfo {
    let metadata = std::fs::metadata(path).ok();
    let modified = metadata
        .as_ref()
        .and_then(|m| m.modified().ok())
        .map(|t| DateTime::<Local>::from(t).format("%Y-%m-%d %H:%M:%S").to_string());

    let mut flush_reasons = BTreeMap::new();
    for block in &log.blocks {
        let names = block.flags.names();
        if names.is_empty() {
            *flush_reasons.entry("OVERFLOW").or_insert(0) += 1;
        }
        for name in names {
            *flush_reasons.entry(name).or_insert(0) += 1;
        }
    }

    let first_start = log.blocks.iter().map(|b| b.start_us).min().unwrap_or(0);
    let last_end = log.blocks.iter().map(|b| b.end_us).max().unwrap_or(0);

    let samples = if args.samples {
        log.samples().into_iter().take(args.limit).collect()
    } else {
        Vec::new()
    };

    SessionInfo {
        file: path.display().to_string(),
        file_bytes: metadata.map(|m| m.len()).unwrap_or(0),
        modified,
        compressed,
        complete: log.is_complete(),
        header: log.header.clone(),
        hardware: log.hardware.clone(),
        block_count: log.blocks.len(),
        sample_count: log.sample_count(),
        duration_ms: last_end.saturating_sub(first_start) / 1000,
        flush_reasons,
        sequence_gaps: log.sequence_gaps(),
        missing_blocks: log.missing_blocks(),
        corruptions: log
            .corruptions
            .iter()
            .map(|c| CorruptionInfo {
                offset: c.offset,
                skipped: c.skipped,
                error: c.error.to_string(),
            })
            .collect(),
        blocks: if args.blocks {
            log.blocks.iter().map(BlockSummary::from).collect()
        } else {
            Vec::new()
        },
        samples,
    }
}

fn print_session_info(info: &SessionInfo) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                   OpenPony Session File                      ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("📁 File");
    println!("   ├─ Path: {}", info.file);
    println!("   ├─ Size: {} bytes", info.file_bytes);
    if let Some(ref modified) = info.modified {
        println!("   ├─ Modified: {}", modified);
    }
    println!("   ├─ Compressed: {}", if info.compressed { "deflate" } else { "no" });
    println!(
        "   └─ Status: {}",
        if info.complete { "complete" } else { "incomplete (no matching end marker)" }
    );

    match info.header {
        Some(ref header) => {
            let meta = &header.metadata;
            println!("\n📋 Session");
            println!("   ├─ ID: {}", header.session_id);
            println!(
                "   ├─ Format: v{}.{} (hardware v{}.{})",
                header.format_version.0,
                header.format_version.1,
                header.hardware_version.0,
                header.hardware_version.1
            );
            println!("   ├─ Name: {}", meta.name);
            println!("   ├─ Driver: {}", meta.driver);
            println!("   ├─ Vehicle: {}", meta.vehicle);
            println!("   ├─ Weather: {}", meta.weather);
            println!("   ├─ Ambient: {:.1} °C", meta.ambient_temp_c);
            println!("   └─ Config CRC: {:#010x}", meta.config_crc);
        }
        None => println!("\n⚠ No session header found"),
    }

    if !info.hardware.is_empty() {
        println!("\n🔌 Hardware ({})", info.hardware.len());
        for item in &info.hardware {
            println!(
                "   ├─ {} ({:?} via {:?})",
                item.identifier, item.class, item.connection
            );
        }
    }

    println!("\n📦 Data");
    println!("   ├─ Blocks: {}", info.block_count);
    println!("   ├─ Samples: {}", info.sample_count);
    println!("   ├─ Duration: {:.3} s", info.duration_ms as f64 / 1000.0);
    let reasons: Vec<String> = info
        .flush_reasons
        .iter()
        .map(|(reason, count)| format!("{reason}={count}"))
        .collect();
    println!("   └─ Flush reasons: {}", reasons.join(", "));

    if !info.sequence_gaps.is_empty() {
        let ranges: Vec<String> = info
            .sequence_gaps
            .iter()
            .map(|&(first, last)| {
                if first == last {
                    first.to_string()
                } else {
                    format!("{first}-{last}")
                }
            })
            .collect();
        println!(
            "\n⚠ Missing block sequences ({} blocks): {}",
            info.missing_blocks,
            ranges.join(", ")
        );
    }

    if !info.corruptions.is_empty() {
        println!("\n⚠ Corrupted regions ({})", info.corruptions.len());
        for c in &info.corruptions {
            println!(
                "   ├─ offset {} ({} bytes skipped): {}",
                c.offset, c.skipped, c.error
            );
        }
    }

    if !info.blocks.is_empty() {
        println!("\n🧱 Blocks");
        for b in &info.blocks {
            println!(
                "   ├─ #{:<6} {:>4} samples {:>7} ms  {}",
                b.sequence,
                b.samples,
                b.span_ms,
                b.flags.join("|")
            );
        }
    }

    if !info.samples.is_empty() {
        println!("\n📈 Samples (first {})", info.samples.len());
        for s in &info.samples {
            println!(
                "   ├─ t={:>12} us  seq={:<5} {}",
                s.timestamp_us,
                s.sequence,
                describe(&s.body)
            );
        }
    }

    println!();
}

fn describe(body: &RecordBody) -> String {
    match body {
        RecordBody::Reading(Reading::Marker { message }) => format!("marker \"{}\"", message),
        RecordBody::Reading(Reading::GpsSatellites { satellites }) => {
            format!("satellites ({} in view)", satellites.len())
        }
        RecordBody::Reading(reading) => format!("{:?}", reading),
        RecordBody::Unknown { tag, data } => format!("unknown tag {:#04x} ({} bytes)", tag, data.len()),
    }
}
