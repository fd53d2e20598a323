//! Flush policy
//!
//! Pure decision logic: given a sample, block fill and the clock, decide
//! which flush reasons apply. Committing is the manager's job.

use contracts::{FlushConfig, FlushFlags, Sample};
use tracing::warn;

const MICROS_PER_SEC: f64 = 1_000_000.0;

/// Event / size / time flush decisions
#[derive(Debug, Clone)]
pub struct FlushPolicy {
    gforce_threshold: f32,
    event_rate_limit_us: u64,
    time_threshold_us: u64,
    size_flush: bool,
    last_event_flush_us: Option<u64>,
    last_flush_us: u64,
}

impl Default for FlushPolicy {
    fn default() -> Self {
        Self::new(&FlushConfig::default())
    }
}

fn secs_to_us(secs: f64) -> u64 {
    (secs * MICROS_PER_SEC) as u64
}

impl FlushPolicy {
    /// Policy from config; invalid values keep the defaults
    pub fn new(config: &FlushConfig) -> Self {
        let defaults = FlushConfig::default();
        let mut policy = Self {
            gforce_threshold: defaults.gforce_threshold,
            event_rate_limit_us: secs_to_us(defaults.event_rate_limit_s),
            time_threshold_us: secs_to_us(defaults.time_threshold_s),
            size_flush: true,
            last_event_flush_us: None,
            last_flush_us: 0,
        };
        policy.set_gforce_threshold(config.gforce_threshold);
        policy.set_event_rate_limit(config.event_rate_limit_s);
        policy.set_time_threshold(config.time_threshold_s);
        policy
    }

    pub fn gforce_threshold(&self) -> f32 {
        self.gforce_threshold
    }

    pub fn event_rate_limit_us(&self) -> u64 {
        self.event_rate_limit_us
    }

    pub fn time_threshold_us(&self) -> u64 {
        self.time_threshold_us
    }

    pub fn size_flush(&self) -> bool {
        self.size_flush
    }

    /// With SIZE disabled a block fills to capacity and is committed on overflow
    pub fn set_size_flush(&mut self, enabled: bool) {
        self.size_flush = enabled;
    }

    /// Accepts `g > 0`; anything else is ignored
    pub fn set_gforce_threshold(&mut self, g: f32) -> bool {
        if g.is_finite() && g > 0.0 {
            self.gforce_threshold = g;
            true
        } else {
            warn!(value = g, "Ignoring invalid g-force threshold");
            false
        }
    }

    /// Accepts finite `seconds >= 0`; anything else is ignored
    pub fn set_event_rate_limit(&mut self, seconds: f64) -> bool {
        if seconds.is_finite() && seconds >= 0.0 {
            self.event_rate_limit_us = secs_to_us(seconds);
            true
        } else {
            warn!(value = seconds, "Ignoring invalid event rate limit");
            false
        }
    }

    /// Accepts finite `seconds > 0`; anything else is ignored
    pub fn set_time_threshold(&mut self, seconds: f64) -> bool {
        if seconds.is_finite() && seconds > 0.0 {
            self.time_threshold_us = secs_to_us(seconds);
            true
        } else {
            warn!(value = seconds, "Ignoring invalid time threshold");
            false
        }
    }

    /// New session: time reference is `now`, no prior event flush
    pub fn reset(&mut self, now_us: u64) {
        self.last_flush_us = now_us;
        self.last_event_flush_us = None;
    }

    /// Flush reasons for a just-appended sample.
    ///
    /// Empty when the block should keep filling. An event that fires is
    /// recorded against the rate limit.
    pub fn on_sample(&mut self, sample: &Sample, size_reached: bool, now_us: u64) -> FlushFlags {
        let mut flags = FlushFlags::empty();

        if let Some(g) = sample.g_force() {
            if g >= self.gforce_threshold && self.event_allowed(now_us) {
                self.last_event_flush_us = Some(now_us);
                flags |= FlushFlags::EVENT;
            }
        }
        if size_reached && self.size_flush {
            flags |= FlushFlags::SIZE;
        }
        flags
    }

    fn event_allowed(&self, now_us: u64) -> bool {
        match self.last_event_flush_us {
            None => true,
            Some(last) => now_us.saturating_sub(last) >= self.event_rate_limit_us,
        }
    }

    /// Time threshold elapsed since the last flush
    pub fn time_due(&self, now_us: u64) -> bool {
        now_us.saturating_sub(self.last_flush_us) >= self.time_threshold_us
    }

    /// Refresh the time reference after any commit attempt
    pub fn mark_flushed(&mut self, now_us: u64) {
        self.last_flush_us = now_us;
    }
}
