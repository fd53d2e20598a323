//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// OpenPony Logger - telemetry logger for accelerometer and GPS data
#[derive(Parser, Debug)]
#[command(
    name = "opl-logger",
    author,
    version,
    about = "Block-structured telemetry logger",
    long_about = "Records accelerometer and GPS samples into block-structured .opl session files.\n\n\
                  Samples flow through a bounded queue into a session manager that commits \n\
                  blocks on high-g events, fill level and elapsed time, while a retention \n\
                  task evicts old sessions as storage fills up."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "OPL_LOGGER_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "OPL_LOGGER_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Record a session from the mock producer
    Record(RecordArgs),

    /// Validate a configuration file without recording
    Validate(ValidateArgs),

    /// Inspect a recorded session file
    Info(InfoArgs),

    /// Convert a recorded session file to another format
    Export(ExportArgs),
}

/// Arguments for the `record` command
#[derive(Parser, Debug, Clone)]
pub struct RecordArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(
        short,
        long,
        default_value = "logger.toml",
        env = "OPL_LOGGER_CONFIG"
    )]
    pub config: PathBuf,

    /// Recording duration in seconds (0 = until Ctrl+C)
    #[arg(short, long, default_value = "0", env = "OPL_LOGGER_DURATION")]
    pub duration: u64,

    /// Override the storage directory from configuration
    #[arg(short, long, env = "OPL_LOGGER_OUTPUT")]
    pub output: Option<PathBuf>,

    /// Override the session name from configuration
    #[arg(long)]
    pub name: Option<String>,

    /// Validate configuration and exit without recording
    #[arg(long)]
    pub dry_run: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "OPL_LOGGER_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "logger.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Session file (.opl), plain or deflate-framed
    pub file: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// List every block
    #[arg(long)]
    pub blocks: bool,

    /// Dump decoded samples (up to --limit)
    #[arg(long)]
    pub samples: bool,

    /// Maximum samples to dump
    #[arg(long, default_value = "50")]
    pub limit: usize,
}

/// Arguments for the `export` command
#[derive(Parser, Debug)]
pub struct ExportArgs {
    /// Session file (.opl), plain or deflate-framed
    pub file: PathBuf,

    /// Write comma-separated values
    #[arg(long, required = true)]
    pub csv: bool,

    /// Output path (default: input with a .csv extension)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}
