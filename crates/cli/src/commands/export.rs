//! `export` command implementation.
//!
//! Flattens a session into one CSV row per sample, ordered by timestamp.
//! Session metadata goes into `#` comment lines ahead of the column header.

use std::fs::File;
use std::io::{BufWriter, Write};

use anyhow::{Context, Result};
use codec::{RecordBody, SessionLog, TimedSample};
use contracts::Reading;
use tracing::{debug, info};

use super::info::decode_container;
use crate::cli::ExportArgs;

const COLUMNS: [&str; 13] = [
    "timestamp_us",
    "type",
    "x",
    "y",
    "z",
    "lat",
    "lon",
    "alt",
    "speed",
    "heading",
    "hdop",
    "satellites",
    "message",
];

/// Rows written and records left out
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct ExportSummary {
    pub rows: usize,
    pub skipped: usize,
}

/// Execute the `export` command
pub fn run_export(args: &ExportArgs) -> Result<()> {
    if !args.file.exists() {
        anyhow::bail!("Session file not found: {}", args.file.display());
    }

    let raw = std::fs::read(&args.file)
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    let (data, _) = decode_container(raw);
    let log = SessionLog::parse(&data);

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| args.file.with_extension("csv"));
    let file = File::create(&output)
        .with_context(|| format!("Failed to create {}", output.display()))?;
    let summary = write_csv(BufWriter::new(file), &log)?;

    info!(
        output = %output.display(),
        rows = summary.rows,
        skipped = summary.skipped,
        "Session exported"
    );
    println!("✓ Exported {} samples to {}", summary.rows, output.display());
    Ok(())
}

fn weather_name(code: u8) -> &'static str {
    match code {
        1 => "Clear",
        2 => "Cloudy",
        3 => "Rain",
        4 => "Snow",
        5 => "Fog",
        _ => "Unknown",
    }
}

fn write_comments<W: Write>(out: &mut W, log: &SessionLog) -> std::io::Result<()> {
    writeln!(out, "# OpenPony Session Export")?;
    match log.header {
        Some(ref h) => {
            let meta = &h.metadata;
            writeln!(out, "# Session: {}", meta.name)?;
            writeln!(out, "# Session ID: {}", h.session_id)?;
            writeln!(out, "# Driver: {}", meta.driver)?;
            writeln!(out, "# Vehicle: {}", meta.vehicle)?;
            writeln!(
                out,
                "# Weather: {}, {:.1}°C",
                weather_name(meta.weather),
                meta.ambient_temp_c
            )?;
            writeln!(out, "# Format: {}.{}", h.format_version.0, h.format_version.1)?;
            writeln!(out, "# Hardware: {}.{}", h.hardware_version.0, h.hardware_version.1)?;
        }
        None => writeln!(out, "# Session: <no header>")?,
    }
    if !log.hardware.is_empty() {
        writeln!(out, "#")?;
        writeln!(out, "# Hardware Configuration ({} items):", log.hardware.len())?;
        for item in &log.hardware {
            writeln!(
                out,
                "#   {:<15} {:<12} {}",
                format!("{:?}", item.class),
                format!("{:?}", item.connection),
                item.identifier
            )?;
        }
    }
    if !log.is_complete() {
        writeln!(out, "# Warning: session has no matching end marker")?;
    }
    writeln!(out, "#")
}

/// CSV fields for one sample, `None` for records the reader did not understand
fn row(sample: &TimedSample) -> Option<[String; 13]> {
    let RecordBody::Reading(reading) = &sample.body else {
        return None;
    };
    let mut fields: [String; 13] = Default::default();
    fields[0] = sample.timestamp_us.to_string();
    fields[1] = reading.kind().to_string();
    match reading {
        Reading::Accel(v) | Reading::Gyro(v) | Reading::Magnetometer(v) => {
            fields[2] = format!("{:.6}", v.x);
            fields[3] = format!("{:.6}", v.y);
            fields[4] = format!("{:.6}", v.z);
        }
        Reading::Gps(fix) => {
            fields[5] = format!("{:.8}", fix.latitude);
            fields[6] = format!("{:.8}", fix.longitude);
            fields[7] = format!("{:.2}", fix.altitude);
            fields[8] = format!("{:.2}", fix.speed);
            fields[9] = format!("{:.2}", fix.heading);
            fields[10] = format!("{:.2}", fix.hdop);
        }
        Reading::GpsSatellites { satellites } => {
            fields[11] = satellites
                .iter()
                .map(|s| format!("{}:{}", s.id, s.snr))
                .collect::<Vec<_>>()
                .join(";");
        }
        Reading::Marker { message } => fields[12] = message.clone(),
    }
    Some(fields)
}

/// Write the comment header and one row per decoded sample
pub(crate) fn write_csv<W: Write>(mut out: W, log: &SessionLog) -> Result<ExportSummary> {
    write_comments(&mut out, log).context("Failed to write CSV header")?;

    let mut samples = log.samples();
    samples.sort_by_key(|s| s.timestamp_us);

    let mut writer = csv::Writer::from_writer(out);
    writer
        .write_record(COLUMNS)
        .context("Failed to write CSV columns")?;

    let mut summary = ExportSummary::default();
    for sample in &samples {
        match row(sample) {
            Some(fields) => {
                writer
                    .write_record(&fields)
                    .context("Failed to write CSV row")?;
                summary.rows += 1;
            }
            None => {
                debug!(sequence = sample.sequence, "Skipping undecoded record");
                summary.skipped += 1;
            }
        }
    }
    writer.flush().context("Failed to flush CSV output")?;
    Ok(summary)
}
