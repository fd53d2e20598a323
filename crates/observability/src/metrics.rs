//! Logger metrics
//!
//! Prometheus-facing recorders for the session, queue and retention paths,
//! plus an in-memory aggregator for end-of-run summaries.

use std::collections::BTreeMap;

use contracts::{FlushFlags, StorageUsage};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit};
use session::CommitInfo;

/// Register help text and units with the installed recorder
pub fn describe_metrics() {
    describe_counter!("opl_logger_blocks_written_total", "Data blocks written to the session file");
    describe_counter!("opl_logger_blocks_failed_total", "Data blocks discarded after a failed write");
    describe_counter!("opl_logger_samples_written_total", "Samples committed inside written blocks");
    describe_counter!("opl_logger_samples_lost_total", "Samples inside failed blocks");
    describe_counter!("opl_logger_samples_dropped_total", "Samples dropped before reaching a block");
    describe_counter!(
        "opl_logger_bytes_written_total",
        Unit::Bytes,
        "Encoded data block bytes written"
    );
    describe_counter!("opl_logger_flushes_total", "Block commits by flush reason");
    describe_counter!("opl_logger_retention_passes_total", "Retention enforcement passes");
    describe_counter!("opl_logger_sessions_evicted_total", "Session files deleted by retention");
    describe_gauge!("opl_logger_queue_depth", "Samples waiting in the queue");
    describe_gauge!("opl_logger_storage_used_ratio", "Used fraction of storage capacity");
    describe_histogram!("opl_logger_block_fill_ratio", "Payload fill fraction at commit");
    describe_histogram!("opl_logger_block_bytes", Unit::Bytes, "Encoded size per written block");
}

/// Record one block commit attempt
///
/// Call from the session manager's commit observer.
///
/// # Example
///
/// ```ignore
/// manager.set_commit_observer(|info| {
///     observability::metrics::record_block_committed(info);
/// });
/// ```
pub fn record_block_committed(info: &CommitInfo) {
    if !info.written {
        record_block_failed(info.flags, info.sample_count);
        return;
    }

    counter!("opl_logger_blocks_written_total").increment(1);
    counter!("opl_logger_samples_written_total").increment(info.sample_count as u64);
    counter!("opl_logger_bytes_written_total").increment(info.encoded_bytes as u64);
    gauge!("opl_logger_last_block_sequence").set(info.sequence as f64);

    histogram!("opl_logger_block_fill_ratio").record(info.occupancy);
    histogram!("opl_logger_block_bytes").record(info.encoded_bytes as f64);

    for name in flag_labels(info.flags) {
        counter!("opl_logger_flushes_total", "reason" => name).increment(1);
    }
}

/// Record a block whose write failed; its samples are lost
pub fn record_block_failed(flags: FlushFlags, sample_count: u16) {
    counter!("opl_logger_blocks_failed_total").increment(1);
    counter!("opl_logger_samples_lost_total").increment(sample_count as u64);
    for name in flag_labels(flags) {
        counter!("opl_logger_failed_flushes_total", "reason" => name).increment(1);
    }
}

/// Record samples dropped before reaching a block
pub fn record_samples_dropped(source: &str, count: u64) {
    if count == 0 {
        return;
    }
    counter!(
        "opl_logger_samples_dropped_total",
        "source" => source.to_string()
    )
    .increment(count);
}

/// Record sample queue depth
pub fn record_queue_depth(len: usize, capacity: usize) {
    gauge!("opl_logger_queue_depth").set(len as f64);
    if capacity > 0 {
        gauge!("opl_logger_queue_fill_ratio").set(len as f64 / capacity as f64);
    }
}

/// Record storage usage
pub fn record_storage_usage(usage: &StorageUsage) {
    gauge!("opl_logger_storage_used_bytes").set(usage.used_bytes as f64);
    gauge!("opl_logger_storage_total_bytes").set(usage.total_bytes as f64);
    gauge!("opl_logger_storage_used_ratio").set(usage.used_fraction());
}

/// Record sessions removed by a retention pass
pub fn record_sessions_evicted(count: usize) {
    counter!("opl_logger_retention_passes_total").increment(1);
    if count > 0 {
        counter!("opl_logger_sessions_evicted_total").increment(count as u64);
    }
}

/// Commits with no flags are capacity overflows
fn flag_labels(flags: FlushFlags) -> Vec<&'static str> {
    if flags.is_empty() {
        vec!["OVERFLOW"]
    } else {
        flags.names()
    }
}

/// Commit aggregator
///
/// Aggregates commits in memory for the end-of-run summary.
#[derive(Debug, Clone, Default)]
pub struct LoggerMetricsAggregator {
    pub blocks_written: u64,

    pub blocks_failed: u64,

    pub samples_written: u64,

    /// Samples in failed blocks
    pub samples_lost: u64,

    pub bytes_written: u64,

    /// Commits per flush reason
    pub flush_reasons: BTreeMap<&'static str, u64>,

    /// Payload fill (%) per written block
    pub fill_stats: RunningStats,

    /// Encoded size (bytes) per written block
    pub size_stats: RunningStats,

    /// Samples per written block
    pub samples_per_block: RunningStats,
}

impl LoggerMetricsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one commit into the totals
    pub fn update(&mut self, info: &CommitInfo) {
        for name in flag_labels(info.flags) {
            *self.flush_reasons.entry(name).or_insert(0) += 1;
        }

        if !info.written {
            self.blocks_failed += 1;
            self.samples_lost += info.sample_count as u64;
            return;
        }

        self.blocks_written += 1;
        self.samples_written += info.sample_count as u64;
        self.bytes_written += info.encoded_bytes as u64;
        self.fill_stats.push(info.occupancy * 100.0);
        self.size_stats.push(info.encoded_bytes as f64);
        self.samples_per_block.push(info.sample_count as f64);
    }

    pub fn summary(&self) -> MetricsSummary {
        let attempts = self.blocks_written + self.blocks_failed;
        MetricsSummary {
            blocks_written: self.blocks_written,
            blocks_failed: self.blocks_failed,
            samples_written: self.samples_written,
            samples_lost: self.samples_lost,
            bytes_written: self.bytes_written,
            failure_rate: if attempts > 0 {
                self.blocks_failed as f64 / attempts as f64 * 100.0
            } else {
                0.0
            },
            flush_reasons: self.flush_reasons.clone(),
            block_fill_pct: StatsSummary::from(&self.fill_stats),
            block_bytes: StatsSummary::from(&self.size_stats),
            samples_per_block: StatsSummary::from(&self.samples_per_block),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Aggregated commit summary
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub blocks_written: u64,
    pub blocks_failed: u64,
    pub samples_written: u64,
    pub samples_lost: u64,
    pub bytes_written: u64,
    pub failure_rate: f64,
    pub flush_reasons: BTreeMap<&'static str, u64>,
    pub block_fill_pct: StatsSummary,
    pub block_bytes: StatsSummary,
    pub samples_per_block: StatsSummary,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Block Metrics Summary ===")?;
        writeln!(f, "Blocks written: {}", self.blocks_written)?;
        writeln!(
            f,
            "Blocks failed: {} ({:.2}%)",
            self.blocks_failed, self.failure_rate
        )?;
        writeln!(f, "Samples written: {}", self.samples_written)?;
        writeln!(f, "Samples lost: {}", self.samples_lost)?;
        writeln!(f, "Bytes written: {}", self.bytes_written)?;
        writeln!(f, "Block fill (%): {}", self.block_fill_pct)?;
        writeln!(f, "Block size (bytes): {}", self.block_bytes)?;
        writeln!(f, "Samples per block: {}", self.samples_per_block)?;

        if !self.flush_reasons.is_empty() {
            writeln!(f, "Flush reasons:")?;
            for (reason, count) in &self.flush_reasons {
                writeln!(f, "  {}: {}", reason, count)?;
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.1}, max={:.1}, mean={:.1}, std={:.1} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online mean/variance (Welford)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::SessionId;

    fn commit(flags: FlushFlags, samples: u16, written: bool) -> CommitInfo {
        CommitInfo {
            session_id: SessionId { part1: 1, part2: 2 },
            sequence: 0,
            flags,
            sample_count: samples,
            encoded_bytes: 50 + samples as usize * 16,
            occupancy: samples as f64 * 16.0 / 4016.0,
            written,
        }
    }

    #[test]
    fn test_running_stats() {
        let mut stats = RunningStats::default();
        for v in [1.0, 2.0, 3.0, 4.0, 5.0] {
            stats.push(v);
        }

        assert_eq!(stats.count(), 5);
        assert!((stats.mean() - 3.0).abs() < 1e-10);
        assert!((stats.min() - 1.0).abs() < 1e-10);
        assert!((stats.max() - 5.0).abs() < 1e-10);
        assert!((stats.variance() - 2.5).abs() < 1e-10);
    }

    #[test]
    fn test_aggregator_update() {
        let mut aggregator = LoggerMetricsAggregator::new();
        aggregator.update(&commit(FlushFlags::SIZE, 226, true));
        aggregator.update(&commit(FlushFlags::EVENT | FlushFlags::SIZE, 226, true));
        aggregator.update(&commit(FlushFlags::TIME, 10, false));

        assert_eq!(aggregator.blocks_written, 2);
        assert_eq!(aggregator.blocks_failed, 1);
        assert_eq!(aggregator.samples_written, 452);
        assert_eq!(aggregator.samples_lost, 10);
        assert_eq!(aggregator.flush_reasons.get("SIZE"), Some(&2));
        assert_eq!(aggregator.flush_reasons.get("EVENT"), Some(&1));
        assert_eq!(aggregator.flush_reasons.get("TIME"), Some(&1));
        assert_eq!(aggregator.samples_per_block.count(), 2);
    }

    #[test]
    fn test_overflow_label() {
        let mut aggregator = LoggerMetricsAggregator::new();
        aggregator.update(&commit(FlushFlags::empty(), 251, true));
        assert_eq!(aggregator.flush_reasons.get("OVERFLOW"), Some(&1));
    }

    #[test]
    fn test_summary_display() {
        let mut aggregator = LoggerMetricsAggregator::new();
        aggregator.update(&commit(FlushFlags::SIZE, 100, true));
        aggregator.update(&commit(FlushFlags::SIZE, 100, false));

        let output = format!("{}", aggregator.summary());
        assert!(output.contains("Blocks written: 1"));
        assert!(output.contains("50.00%"));
        assert!(output.contains("SIZE: 2"));
    }

    #[test]
    fn test_recorders_without_exporter() {
        // No recorder installed: calls are no-ops
        describe_metrics();
        record_block_committed(&commit(FlushFlags::MANUAL, 3, true));
        record_samples_dropped("queue", 4);
        record_queue_depth(10, 100);
        record_storage_usage(&StorageUsage {
            total_bytes: 100,
            used_bytes: 50,
        });
        record_sessions_evicted(2);
    }
}
