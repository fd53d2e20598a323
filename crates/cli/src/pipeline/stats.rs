//! Recording statistics.

use std::path::PathBuf;
use std::time::Duration;

use contracts::{SessionId, StorageUsage};
use ingestion::{ProducerSnapshot, QueueSnapshot};
use observability::LoggerMetricsAggregator;
use session::SessionStats;

/// Statistics from one recording run
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Wall time from pipeline start to shutdown complete
    pub duration: Duration,

    pub session_id: Option<SessionId>,

    pub session_path: Option<PathBuf>,

    /// Mock producer counters
    pub producer: ProducerSnapshot,

    /// Queue counters after the final drain
    pub queue: QueueSnapshot,

    pub peak_queue_depth: usize,

    /// Session manager counters
    pub session: SessionStats,

    /// Failed sample writes and time flushes seen by the consumer
    pub write_errors: u64,

    pub retention_passes: u64,

    pub sessions_evicted: u64,

    pub storage_usage: Option<StorageUsage>,

    /// Per-commit aggregates
    pub metrics: LoggerMetricsAggregator,
}

impl PipelineStats {
    /// Samples committed to storage per second
    pub fn samples_per_sec(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.session.samples_written as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Share of produced samples rejected by a full queue (%)
    pub fn queue_drop_rate(&self) -> f64 {
        let total = self.queue.pushed + self.queue.dropped;
        if total > 0 {
            (self.queue.dropped as f64 / total as f64) * 100.0
        } else {
            0.0
        }
    }

    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                    Recording Statistics                      ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Overview");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        if let Some(id) = self.session_id {
            println!("   ├─ Session: {}", id);
        }
        if let Some(ref path) = self.session_path {
            println!("   ├─ File: {}", path.display());
        }
        println!("   ├─ Samples written: {}", self.session.samples_written);
        println!("   ├─ Bytes written: {}", self.session.bytes_written);
        println!("   └─ Rate: {:.1} samples/s", self.samples_per_sec());

        println!("\n📥 Ingestion");
        println!("   ├─ Generated: {}", self.producer.generated);
        println!("   ├─ High-g events injected: {}", self.producer.events);
        println!(
            "   ├─ Queue drops: {} ({:.2}%)",
            self.queue.dropped,
            self.queue_drop_rate()
        );
        println!(
            "   └─ Peak queue depth: {} / {}",
            self.peak_queue_depth, self.queue.capacity
        );

        println!("\n🧱 Blocks");
        println!("   ├─ Written: {}", self.session.blocks_written);
        println!(
            "   ├─ Failed: {} ({:.2}%)",
            self.session.blocks_failed,
            self.session.failure_rate() * 100.0
        );
        println!("   ├─ Samples lost in failed blocks: {}", self.session.samples_lost);
        println!("   ├─ Samples dropped (oversize): {}", self.session.samples_dropped);
        println!(
            "   └─ Flushes: event={} size={} time={} overflow={}",
            self.session.event_flushes,
            self.session.size_flushes,
            self.session.time_flushes,
            self.session.overflow_flushes
        );

        let summary = self.metrics.summary();
        println!("\n📈 Block Metrics");
        println!("   ├─ Fill (%): {}", summary.block_fill_pct);
        println!("   ├─ Size (bytes): {}", summary.block_bytes);
        println!("   └─ Samples per block: {}", summary.samples_per_block);

        println!("\n💾 Storage");
        match self.storage_usage {
            Some(usage) if usage.total_bytes > 0 => println!(
                "   ├─ Usage: {} / {} bytes ({:.1}%)",
                usage.used_bytes,
                usage.total_bytes,
                usage.used_percent()
            ),
            Some(usage) => println!("   ├─ Usage: {} bytes (no quota)", usage.used_bytes),
            None => println!("   ├─ Usage: unavailable"),
        }
        println!("   ├─ Retention passes: {}", self.retention_passes);
        println!("   └─ Sessions evicted: {}", self.sessions_evicted);

        if self.write_errors > 0 {
            println!("\n⚠️  {} write errors during recording", self.write_errors);
        }

        println!();
    }
}
