//! Pipeline orchestrator - wires producer, queue, session manager and retention.
//!
//! - Producer: tokio task pushing mock samples into the queue
//! - Consumer: `spawn_blocking` loop draining the queue into the session manager
//! - Retention: tokio interval task reading the active file through the handle
//!
//! Shutdown order: stop producer, drain queue, stop session.

use std::future::Future;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use contracts::{
    ActiveSessionHandle, Clock, CompressionKind, LoggerBlueprint, MonotonicClock, Storage,
};
use ingestion::{MockSampleSource, MockSourceConfig, SampleQueue};
use observability::{
    record_block_committed, record_queue_depth, record_samples_dropped, record_sessions_evicted,
    record_storage_usage, LoggerMetricsAggregator,
};
use session::{SessionManager, SessionStats};
use storage::{DeflateStorage, FsStorage, RetentionConfig, RetentionManager};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::PipelineStats;

/// Samples moved from the queue per consumer iteration
const CONSUMER_BATCH: usize = 256;

/// Consumer back-off when the queue is empty
const CONSUMER_IDLE: Duration = Duration::from_millis(5);

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub blueprint: LoggerBlueprint,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// Recording pipeline
pub struct Pipeline {
    config: PipelineConfig,
}

/// What the consumer hands back on exit
#[derive(Debug, Default)]
struct ConsumerReport {
    session: SessionStats,
    write_errors: u64,
    peak_queue_depth: usize,
    stop_error: Option<String>,
}

#[derive(Debug, Default, Clone, Copy)]
struct RetentionTotals {
    passes: u64,
    evicted: u64,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Record until `shutdown` resolves, then stop in order
    pub async fn run<F>(self, shutdown: F) -> Result<PipelineStats>
    where
        F: Future<Output = ()>,
    {
        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        let storage_config = &self.config.blueprint.storage;
        let fs = FsStorage::new(storage_config.base_path.clone(), storage_config.capacity_bytes)
            .with_context(|| {
                format!(
                    "Failed to open storage at {}",
                    storage_config.base_path.display()
                )
            })?;

        let compression = storage_config.compression;
        match compression {
            CompressionKind::None => self.run_with(Arc::new(fs), shutdown).await,
            CompressionKind::Deflate => {
                info!("Deflate compression enabled");
                self.run_with(Arc::new(DeflateStorage::new(fs)), shutdown)
                    .await
            }
        }
    }

    async fn run_with<S, F>(self, storage: Arc<S>, shutdown: F) -> Result<PipelineStats>
    where
        S: Storage + 'static,
        F: Future<Output = ()>,
    {
        let start_time = Instant::now();
        let blueprint = self.config.blueprint;
        let base_path = blueprint.storage.base_path.clone();
        let clock = Arc::new(MonotonicClock::new());

        let queue = Arc::new(
            SampleQueue::with_capacity(blueprint.queue.capacity)
                .context("Invalid queue capacity")?,
        );

        // Session manager
        let aggregator = Arc::new(Mutex::new(LoggerMetricsAggregator::new()));
        let mut manager = SessionManager::new(storage.clone(), clock.clone(), base_path.clone())
            .with_flush_config(&blueprint.flush);
        {
            let aggregator = aggregator.clone();
            manager.set_commit_observer(move |commit| {
                record_block_committed(commit);
                if let Ok(mut agg) = aggregator.lock() {
                    agg.update(commit);
                }
            });
        }
        for item in &blueprint.hardware {
            if !manager.add_hardware_item(item.class, item.connection, &item.identifier) {
                warn!(identifier = %item.identifier, "Hardware item not registered");
            }
        }

        let session_id = manager
            .start(blueprint.session.to_metadata())
            .context("Failed to start session")?;
        let session_path = manager.current_path().map(Path::to_path_buf);
        info!(
            session = %session_id,
            path = ?session_path,
            "Session started"
        );

        // Retention
        let (stop_tx, stop_rx) = watch::channel(false);
        let retention_handle = if blueprint.retention.enabled {
            let retention = RetentionManager::new(
                storage.clone(),
                base_path.clone(),
                RetentionConfig {
                    high_water: blueprint.retention.high_water,
                    low_water: blueprint.retention.low_water,
                },
            );
            Some(spawn_retention(
                retention,
                storage.clone(),
                manager.active_handle(),
                Duration::from_secs(blueprint.retention.interval_s),
                stop_rx,
            ))
        } else {
            info!("Retention disabled");
            None
        };

        // Producer
        let source = MockSampleSource::new(MockSourceConfig::from(&blueprint.producer))
            .context("Invalid producer configuration")?;
        let producer_metrics = source.metrics();
        let producer_handle = source.start(queue.clone(), clock.clone());

        // Consumer
        let running = Arc::new(AtomicBool::new(true));
        let consumer_handle = {
            let queue = queue.clone();
            let running = running.clone();
            tokio::task::spawn_blocking(move || consume(manager, queue, running))
        };

        info!(
            queue_capacity = queue.capacity(),
            hardware = blueprint.hardware.len(),
            "Pipeline running"
        );

        shutdown.await;

        // Shutdown
        info!("Shutting down pipeline...");
        source.stop();
        if let Err(e) = producer_handle.await {
            warn!(error = %e, "Producer task failed");
        }

        running.store(false, Ordering::SeqCst);
        let report = consumer_handle.await.context("Consumer task failed")?;
        if let Some(ref e) = report.stop_error {
            warn!(error = %e, "Session did not stop cleanly");
        }

        let _ = stop_tx.send(true);
        let retention = match retention_handle {
            Some(handle) => handle.await.unwrap_or_else(|e| {
                warn!(error = %e, "Retention task failed");
                RetentionTotals::default()
            }),
            None => RetentionTotals::default(),
        };

        let storage_usage = storage.usage().ok();
        if let Some(ref usage) = storage_usage {
            record_storage_usage(usage);
        }

        let metrics = aggregator
            .lock()
            .map(|agg| agg.clone())
            .unwrap_or_default();

        let stats = PipelineStats {
            duration: start_time.elapsed(),
            session_id: Some(session_id),
            session_path,
            producer: producer_metrics.snapshot(),
            queue: queue.snapshot(),
            peak_queue_depth: report.peak_queue_depth,
            session: report.session,
            write_errors: report.write_errors,
            retention_passes: retention.passes,
            sessions_evicted: retention.evicted,
            storage_usage,
            metrics,
        };

        info!(
            duration_secs = stats.duration.as_secs_f64(),
            blocks = stats.session.blocks_written,
            "Pipeline shutdown complete"
        );

        Ok(stats)
    }
}

/// Drain the queue into the session manager until told to stop and empty
fn consume<S, C>(
    mut manager: SessionManager<S, C>,
    queue: Arc<SampleQueue>,
    running: Arc<AtomicBool>,
) -> ConsumerReport
where
    S: Storage,
    C: Clock,
{
    let mut report = ConsumerReport::default();
    let mut batch = Vec::with_capacity(CONSUMER_BATCH);
    let mut seen_dropped = 0u64;

    loop {
        let moved = queue.drain_into(&mut batch, CONSUMER_BATCH);
        for sample in batch.drain(..) {
            if let Err(e) = manager.write_sample(sample) {
                report.write_errors += 1;
                warn!(error = %e, "Block write failed");
            }
        }
        if let Err(e) = manager.check_flush() {
            report.write_errors += 1;
            warn!(error = %e, "Time flush failed");
        }

        let snapshot = queue.snapshot();
        record_queue_depth(snapshot.len, snapshot.capacity);
        report.peak_queue_depth = report.peak_queue_depth.max(snapshot.len + moved);
        if snapshot.dropped > seen_dropped {
            record_samples_dropped("queue", snapshot.dropped - seen_dropped);
            seen_dropped = snapshot.dropped;
        }

        if moved == 0 {
            if !running.load(Ordering::SeqCst) {
                break;
            }
            thread::sleep(CONSUMER_IDLE);
        }
    }

    debug!(pending = manager.pending_samples(), "Queue drained, stopping session");
    if let Err(e) = manager.stop() {
        report.stop_error = Some(e.to_string());
    }

    report.session = manager.stats();
    record_samples_dropped("block", report.session.samples_dropped);
    report
}

fn spawn_retention<S>(
    retention: RetentionManager<Arc<S>>,
    storage: Arc<S>,
    active: ActiveSessionHandle,
    period: Duration,
    mut stop: watch::Receiver<bool>,
) -> JoinHandle<RetentionTotals>
where
    S: Storage + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        let mut totals = RetentionTotals::default();

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = stop.changed() => break,
            }

            let retention = retention.clone();
            let storage = storage.clone();
            let active_path = active.get();
            let pass = tokio::task::spawn_blocking(move || {
                let report = retention.enforce(active_path.as_deref());
                (report, storage.usage())
            })
            .await;

            match pass {
                Ok((Ok(report), usage)) => {
                    totals.passes += 1;
                    totals.evicted += report.evicted() as u64;
                    record_sessions_evicted(report.evicted());
                    if let Ok(usage) = usage {
                        record_storage_usage(&usage);
                    }
                }
                Ok((Err(e), _)) => warn!(error = %e, "Retention pass failed"),
                Err(e) => warn!(error = %e, "Retention task panicked"),
            }
        }

        debug!(passes = totals.passes, evicted = totals.evicted, "Retention stopped");
        totals
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use codec::SessionLog;

    fn blueprint(dir: &Path, compression: &str) -> LoggerBlueprint {
        let toml = format!(
            r#"
[session]
name = "Pipeline Test"

[[hardware]]
class = "accelerometer"
connection = "i2c"
identifier = "LIS3DH@0x18"

[storage]
base_path = "{}"
compression = "{}"

[producer]
fifo_poll_interval_ms = 5
watermark = 8
gps_rate_hz = 20.0
"#,
            dir.display(),
            compression
        );
        config_loader::ConfigLoader::load_from_str(&toml, config_loader::ConfigFormat::Toml)
            .unwrap()
    }

    fn read_session(path: &Path) -> SessionLog {
        let raw = std::fs::read(path).unwrap();
        let data = if raw.starts_with(&codec::MAGIC) {
            raw
        } else {
            storage::inflate_frames(&raw)
        };
        SessionLog::parse(&data)
    }

    #[tokio::test]
    async fn test_records_complete_session() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = Pipeline::new(PipelineConfig {
            blueprint: blueprint(dir.path(), "none"),
            metrics_port: None,
        });

        let stats = pipeline
            .run(tokio::time::sleep(Duration::from_millis(200)))
            .await
            .unwrap();

        let path = stats.session_path.clone().unwrap();
        assert!(path.ends_with("session_00001.opl"));
        assert!(stats.session.samples_written > 0);
        assert_eq!(stats.write_errors, 0);
        assert_eq!(stats.queue.len, 0);

        let log = read_session(&path);
        assert!(log.is_complete());
        assert_eq!(log.hardware.len(), 1);
        assert_eq!(log.sample_count() as u64, stats.session.samples_written);
        assert_eq!(
            stats.producer.generated,
            stats.queue.pushed + stats.queue.dropped
        );
        assert_eq!(stats.metrics.samples_written, stats.session.samples_written);
    }

    #[tokio::test]
    async fn test_deflate_session_readable() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = Pipeline::new(PipelineConfig {
            blueprint: blueprint(dir.path(), "deflate"),
            metrics_port: None,
        });

        let stats = pipeline
            .run(tokio::time::sleep(Duration::from_millis(100)))
            .await
            .unwrap();

        let path = stats.session_path.unwrap();
        let raw = std::fs::read(&path).unwrap();
        assert!(!raw.starts_with(&codec::MAGIC));
        let log = read_session(&path);
        assert!(log.is_complete());
        assert_eq!(log.sample_count() as u64, stats.session.samples_written);
    }
}
