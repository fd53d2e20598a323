//! # Observability
//!
//! Tracing and Prometheus metrics for the logger.
//!
//! - Tracing subscriber (JSON / Pretty / Compact), `RUST_LOG` aware
//! - Prometheus exporter with buckets sized for data blocks
//! - Block commit recorders and an in-memory run summary
//!
//! ```ignore
//! observability::init_with_config(ObservabilityConfig {
//!     log_format: LogFormat::Compact,
//!     metrics_port: Some(9000),
//!     ..Default::default()
//! })?;
//!
//! manager.set_commit_observer(|info| observability::record_block_committed(info));
//! ```

pub mod metrics;

use anyhow::{Context, Result};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry};

pub use crate::metrics::{
    describe_metrics, record_block_committed, record_block_failed, record_queue_depth,
    record_samples_dropped, record_sessions_evicted, record_storage_usage,
    LoggerMetricsAggregator, MetricsSummary, RunningStats, StatsSummary,
};

/// Payload fill fraction buckets
const FILL_BUCKETS: &[f64] = &[0.05, 0.1, 0.25, 0.5, 0.75, 0.9, 0.95, 1.0];

/// Encoded block size buckets (bytes); a full block is just over 4 KiB
const BLOCK_BYTES_BUCKETS: &[f64] = &[64.0, 256.0, 512.0, 1024.0, 2048.0, 3072.0, 3700.0, 4096.0, 4200.0];

/// Initialize with defaults: JSON logs at `info`, exporter on port 9000
pub fn init() -> Result<()> {
    init_with_config(ObservabilityConfig::default())
}

/// Observability settings
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    pub log_format: LogFormat,
    /// Prometheus port (None = disabled)
    pub metrics_port: Option<u16>,
    /// Filter used when `RUST_LOG` is unset
    pub default_log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Json,
            metrics_port: Some(9000),
            default_log_level: "info".to_string(),
        }
    }
}

/// Log format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Structured JSON, one object per line
    #[default]
    Json,
    /// Multi-line human readable
    Pretty,
    /// Single line
    Compact,
}

fn fmt_layer(format: LogFormat) -> Box<dyn Layer<Registry> + Send + Sync> {
    match format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(true)
            .with_thread_names(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        LogFormat::Pretty => fmt::layer().pretty().boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(false).boxed(),
    }
}

/// Initialize tracing and, when a port is set, the Prometheus exporter
pub fn init_with_config(config: ObservabilityConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_log_level));

    tracing_subscriber::registry()
        .with(fmt_layer(config.log_format))
        .with(filter)
        .try_init()
        .context("Failed to initialize tracing subscriber")?;

    if let Some(port) = config.metrics_port {
        init_metrics_only(port)?;
    }

    tracing::info!(
        log_format = ?config.log_format,
        metrics_port = ?config.metrics_port,
        "Observability initialized"
    );
    Ok(())
}

/// Install only the Prometheus exporter, for callers that already set up
/// tracing
pub fn init_metrics_only(port: u16) -> Result<()> {
    PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], port))
        .set_buckets_for_metric(
            Matcher::Full("opl_logger_block_fill_ratio".to_string()),
            FILL_BUCKETS,
        )
        .context("Invalid fill ratio buckets")?
        .set_buckets_for_metric(
            Matcher::Full("opl_logger_block_bytes".to_string()),
            BLOCK_BYTES_BUCKETS,
        )
        .context("Invalid block size buckets")?
        .install()
        .context("Failed to install Prometheus recorder")?;

    describe_metrics();
    tracing::info!(port, "Prometheus metrics endpoint initialized");
    Ok(())
}
