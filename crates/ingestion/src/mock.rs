//! Mock sample source
//!
//! Stands in for the accelerometer FIFO and GPS receiver: every poll
//! interval it drains `watermark` accelerometer samples into the queue, and
//! emits a GPS fix at `gps_rate_hz`. Occasional hard-braking spikes exercise
//! the event flush path.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use contracts::{Clock, GpsFix, ProducerConfig, Sample};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::error::{IngestionError, Result};
use crate::queue::SampleQueue;

/// Mock producer pacing
#[derive(Debug, Clone)]
pub struct MockSourceConfig {
    /// FIFO poll interval
    pub poll_interval: Duration,
    /// Accelerometer samples drained per poll
    pub watermark: u8,
    /// GPS fix rate (Hz)
    pub gps_rate_hz: f64,
    /// Chance per poll of a high-g spike
    pub event_probability: f64,
    /// Spike magnitude (g)
    pub event_magnitude: f32,
    /// RNG seed
    pub seed: u64,
}

impl Default for MockSourceConfig {
    fn default() -> Self {
        Self::from(&ProducerConfig::default())
    }
}

impl From<&ProducerConfig> for MockSourceConfig {
    fn from(config: &ProducerConfig) -> Self {
        Self {
            poll_interval: Duration::from_millis(config.fifo_poll_interval_ms),
            watermark: config.watermark,
            gps_rate_hz: config.gps_rate_hz,
            event_probability: 0.01,
            event_magnitude: 3.5,
            seed: 0x5EED,
        }
    }
}

impl MockSourceConfig {
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval.is_zero() {
            return Err(IngestionError::invalid_config("poll interval must be non-zero"));
        }
        if self.watermark == 0 {
            return Err(IngestionError::invalid_config("watermark must be at least 1"));
        }
        if !(self.gps_rate_hz.is_finite() && self.gps_rate_hz > 0.0) {
            return Err(IngestionError::invalid_config("gps rate must be positive"));
        }
        if !(0.0..=1.0).contains(&self.event_probability) {
            return Err(IngestionError::invalid_config("event probability must be in [0, 1]"));
        }
        Ok(())
    }
}

/// Producer-side counters
#[derive(Debug, Default)]
pub struct ProducerMetrics {
    generated: AtomicU64,
    rejected: AtomicU64,
    events: AtomicU64,
}

impl ProducerMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, accepted: bool) {
        self.generated.fetch_add(1, Ordering::Relaxed);
        if !accepted {
            self.rejected.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> ProducerSnapshot {
        ProducerSnapshot {
            generated: self.generated.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            events: self.events.load(Ordering::Relaxed),
        }
    }
}

/// Producer counters at a point in time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProducerSnapshot {
    pub generated: u64,
    /// Pushes refused by a full queue
    pub rejected: u64,
    /// High-g spikes injected
    pub events: u64,
}

/// Simulated accelerometer + GPS producer
pub struct MockSampleSource {
    config: MockSourceConfig,
    running: Arc<AtomicBool>,
    metrics: Arc<ProducerMetrics>,
}

impl MockSampleSource {
    pub fn new(config: MockSourceConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            running: Arc::new(AtomicBool::new(false)),
            metrics: Arc::new(ProducerMetrics::new()),
        })
    }

    pub fn metrics(&self) -> Arc<ProducerMetrics> {
        self.metrics.clone()
    }

    /// Spawn the producer task pushing into `queue`
    pub fn start<C>(&self, queue: Arc<SampleQueue>, clock: C) -> JoinHandle<()>
    where
        C: Clock + 'static,
    {
        let config = self.config.clone();
        let running = self.running.clone();
        let metrics = self.metrics.clone();
        running.store(true, Ordering::SeqCst);

        tokio::spawn(async move {
            let mut rng = StdRng::seed_from_u64(config.seed);
            let mut ticker = tokio::time::interval(config.poll_interval);
            let gps_period_us = (1_000_000.0 / config.gps_rate_hz) as u64;
            let mut next_gps_us = 0u64;
            let mut fix = GpsFix {
                latitude: 37.7749,
                longitude: -122.4194,
                altitude: 12.0,
                speed: 0.0,
                heading: 90.0,
                hdop: 0.9,
            };

            debug!(
                poll_ms = config.poll_interval.as_millis() as u64,
                watermark = config.watermark,
                gps_rate_hz = config.gps_rate_hz,
                "Mock sample source started"
            );

            while running.load(Ordering::Relaxed) {
                ticker.tick().await;
                let now = clock.now_micros();
                let poll_us = config.poll_interval.as_micros() as u64;
                let spacing = poll_us / config.watermark as u64;
                let spike_at = if rng.random_bool(config.event_probability) {
                    metrics.events.fetch_add(1, Ordering::Relaxed);
                    Some(rng.random_range(0..config.watermark))
                } else {
                    None
                };

                // FIFO burst: oldest sample first, spaced across the poll window
                for i in 0..config.watermark {
                    let age = (config.watermark - 1 - i) as u64 * spacing;
                    let ts = now.saturating_sub(age).max(1);
                    let (x, y) = if spike_at == Some(i) {
                        (-config.event_magnitude, 0.4)
                    } else {
                        (rng.random_range(-0.3..0.3), rng.random_range(-0.3..0.3))
                    };
                    let z = 1.0 + rng.random_range(-0.05..0.05);
                    metrics.record(queue.push(Sample::accel(x, y, z, ts)));
                }

                if now >= next_gps_us {
                    fix.speed = (fix.speed + rng.random_range(-0.5..0.8)).clamp(0.0, 60.0);
                    fix.latitude += fix.speed as f64 * 1e-6;
                    fix.longitude += rng.random_range(-1e-6..1e-6);
                    metrics.record(queue.push(Sample::gps(fix, now.max(1))));
                    next_gps_us = now + gps_period_us;
                }

                trace!(queued = queue.len(), "Mock poll");
            }

            debug!(
                generated = metrics.snapshot().generated,
                "Mock sample source stopped"
            );
        })
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{MonotonicClock, Reading};

    fn fast_config() -> MockSourceConfig {
        MockSourceConfig {
            poll_interval: Duration::from_millis(5),
            watermark: 4,
            gps_rate_hz: 50.0,
            event_probability: 0.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_from_producer_config() {
        let config = MockSourceConfig::from(&ProducerConfig::default());
        assert_eq!(config.poll_interval, Duration::from_millis(50));
        assert_eq!(config.watermark, 16);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = MockSourceConfig {
            watermark: 0,
            ..fast_config()
        };
        assert!(MockSampleSource::new(config).is_err());
    }

    #[tokio::test]
    async fn test_pushes_accel_and_gps() {
        let queue = Arc::new(SampleQueue::with_capacity(4096).unwrap());
        let source = MockSampleSource::new(fast_config()).unwrap();
        let handle = source.start(queue.clone(), MonotonicClock::new());

        tokio::time::sleep(Duration::from_millis(60)).await;
        source.stop();
        handle.await.unwrap();

        let mut accel = 0;
        let mut gps = 0;
        while let Some(sample) = queue.pop() {
            assert!(sample.timestamp_us > 0);
            match sample.reading {
                Reading::Accel(_) => accel += 1,
                Reading::Gps(_) => gps += 1,
                _ => panic!("unexpected reading"),
            }
        }
        assert!(accel >= 4);
        assert_eq!(accel % 4, 0);
        assert!(gps >= 1);
        assert_eq!(source.metrics().snapshot().rejected, 0);
    }

    #[tokio::test]
    async fn test_full_queue_counts_rejections() {
        let queue = Arc::new(SampleQueue::with_capacity(3).unwrap());
        let source = MockSampleSource::new(fast_config()).unwrap();
        let handle = source.start(queue.clone(), MonotonicClock::new());

        tokio::time::sleep(Duration::from_millis(20)).await;
        source.stop();
        handle.await.unwrap();

        let snap = source.metrics().snapshot();
        assert!(snap.rejected > 0);
        assert_eq!(queue.drop_count(), snap.rejected);
    }
}
