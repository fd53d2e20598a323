//! SessionManager - session lifecycle and block commits

use std::path::{Path, PathBuf};

use codec::{encode_hardware_block, encode_session_end, encode_session_header, Block};
use contracts::{
    truncate_utf8, ActiveSessionHandle, Clock, ConnectionClass, FlushConfig, FlushFlags, GpsFix,
    HardwareClass, HardwareItem, Sample, Satellite, SessionId, SessionMetadata, Storage,
    StorageFile, MAX_DATA_PAYLOAD, MAX_HARDWARE_ID, MAX_HARDWARE_ITEMS,
};
use tracing::{debug, error, info, instrument, warn};

use crate::error::Result;
use crate::naming::next_session_path;
use crate::policy::FlushPolicy;
use crate::stats::SessionStats;

/// Outcome of one block commit, passed to the commit observer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CommitInfo {
    pub session_id: SessionId,
    pub sequence: u32,
    pub flags: FlushFlags,
    pub sample_count: u16,
    pub encoded_bytes: usize,
    /// Payload fill fraction at commit
    pub occupancy: f64,
    pub written: bool,
}

type CommitObserver = Box<dyn FnMut(&CommitInfo) + Send>;

struct ActiveSession<F> {
    id: SessionId,
    path: PathBuf,
    file: F,
    block: Block,
}

/// Owns the active session file, the in-progress block and the flush policy
pub struct SessionManager<S: Storage, C: Clock> {
    storage: S,
    clock: C,
    directory: PathBuf,
    policy: FlushPolicy,
    block_capacity: usize,
    hardware: Vec<HardwareItem>,
    active: Option<ActiveSession<S::File>>,
    stats: SessionStats,
    handle: ActiveSessionHandle,
    observer: Option<CommitObserver>,
}

impl<S: Storage, C: Clock> SessionManager<S, C> {
    /// Manager writing sessions into `directory`, default flush policy
    pub fn new(storage: S, clock: C, directory: impl Into<PathBuf>) -> Self {
        Self {
            storage,
            clock,
            directory: directory.into(),
            policy: FlushPolicy::default(),
            block_capacity: MAX_DATA_PAYLOAD,
            hardware: Vec::new(),
            active: None,
            stats: SessionStats::default(),
            handle: ActiveSessionHandle::new(),
            observer: None,
        }
    }

    /// Apply flush thresholds from config (invalid values ignored)
    pub fn with_flush_config(mut self, config: &FlushConfig) -> Self {
        self.policy = FlushPolicy::new(config);
        self
    }

    /// Called after every non-empty commit, written or not
    pub fn set_commit_observer(&mut self, observer: impl FnMut(&CommitInfo) + Send + 'static) {
        self.observer = Some(Box::new(observer));
    }

    // ===== Lifecycle =====

    /// Start a new session, stopping any active one first.
    ///
    /// On header write failure the partial file is closed and deleted and
    /// the manager stays inactive.
    #[instrument(name = "session_start", skip(self, metadata), fields(name = %metadata.name))]
    pub fn start(&mut self, metadata: SessionMetadata) -> Result<SessionId> {
        if self.active.is_some() {
            if let Err(e) = self.stop() {
                warn!(error = %e, "Previous session did not stop cleanly");
            }
        }

        let now = self.clock.now_micros();
        let id = SessionId::from_clock(now);
        let path = next_session_path(&self.storage, &self.directory, now);
        let header = encode_session_header(id, &metadata, now)?;

        let mut file = self.storage.create(&path)?;
        if let Err(e) = file.write(&header) {
            error!(path = %path.display(), error = %e, "Header write failed, discarding file");
            if let Err(close_err) = file.close() {
                debug!(error = %close_err, "Close after failed header");
            }
            if let Err(del_err) = self.storage.delete(&path) {
                warn!(path = %path.display(), error = %del_err, "Could not delete partial session file");
            }
            return Err(e.into());
        }

        match encode_hardware_block(&self.hardware) {
            Ok(bytes) if !bytes.is_empty() => {
                if let Err(e) = file.write(&bytes) {
                    warn!(error = %e, "Hardware block write failed");
                }
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "Hardware block encode failed"),
        }
        if let Err(e) = file.sync() {
            warn!(error = %e, "Sync after header failed");
        }

        self.policy.reset(now);
        self.handle.set(Some(path.clone()));
        self.stats.sessions_started += 1;
        info!(
            session = %id,
            path = %path.display(),
            hardware = self.hardware.len(),
            "Session started"
        );
        self.active = Some(ActiveSession {
            id,
            path,
            file,
            block: Block::with_capacity(id, 0, self.block_capacity),
        });
        Ok(id)
    }

    /// Stop the active session: final SHUTDOWN block, end marker, close.
    ///
    /// No-op when inactive. The session is inactive afterwards even if a
    /// step failed; the first error is returned.
    #[instrument(name = "session_stop", skip(self))]
    pub fn stop(&mut self) -> Result<()> {
        if self.active.is_none() {
            return Ok(());
        }

        let mut first_err = self.commit(FlushFlags::SHUTDOWN).err();

        let Some(mut session) = self.active.take() else {
            return Ok(());
        };
        let end = encode_session_end(session.id);
        let mut note = |res: std::result::Result<(), contracts::ContractError>, step: &str| {
            if let Err(e) = res {
                warn!(session = %session.id, step, error = %e, "Session stop step failed");
                if first_err.is_none() {
                    first_err = Some(e.into());
                }
            }
        };
        note(session.file.write(&end), "end_marker");
        note(session.file.sync(), "sync");
        note(session.file.close(), "close");

        self.hardware.clear();
        self.handle.set(None);
        info!(
            session = %session.id,
            path = %session.path.display(),
            blocks = session.block.sequence(),
            "Session stopped"
        );

        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    // ===== Sample ingestion =====

    pub fn write_accel(&mut self, x: f32, y: f32, z: f32, timestamp_us: u64) -> Result<bool> {
        self.write_sample(Sample::accel(x, y, z, timestamp_us))
    }

    pub fn write_gps(&mut self, fix: GpsFix, timestamp_us: u64) -> Result<bool> {
        self.write_sample(Sample::gps(fix, timestamp_us))
    }

    pub fn write_gyro(&mut self, x: f32, y: f32, z: f32, timestamp_us: u64) -> Result<bool> {
        self.write_sample(Sample::gyro(x, y, z, timestamp_us))
    }

    pub fn write_magnetometer(&mut self, x: f32, y: f32, z: f32, timestamp_us: u64) -> Result<bool> {
        self.write_sample(Sample::magnetometer(x, y, z, timestamp_us))
    }

    pub fn write_gps_satellites(
        &mut self,
        satellites: Vec<Satellite>,
        timestamp_us: u64,
    ) -> Result<bool> {
        self.write_sample(Sample::gps_satellites(satellites, timestamp_us))
    }

    /// Event marker stamped with the clock (lap, pit, operator note)
    pub fn write_metadata(&mut self, message: &str) -> Result<bool> {
        self.write_sample(Sample::marker(message, 0))
    }

    /// Append a sample to the current block, committing per the flush policy.
    ///
    /// `Ok(false)` when no session is active or the sample does not fit even
    /// an empty block. A zero timestamp is replaced with the clock.
    pub fn write_sample(&mut self, mut sample: Sample) -> Result<bool> {
        let now = self.clock.now_micros();
        let Some(session) = self.active.as_mut() else {
            return Ok(false);
        };
        if sample.timestamp_us == 0 {
            sample.timestamp_us = now;
        }

        let mut overflow_err = None;
        if !session.block.try_append(&sample) {
            self.stats.overflow_flushes += 1;
            overflow_err = self.commit(FlushFlags::empty()).err();

            let appended = self
                .active
                .as_mut()
                .is_some_and(|s| s.block.try_append(&sample));
            if !appended {
                self.stats.samples_dropped += 1;
                warn!(kind = sample.reading.kind(), "Sample does not fit an empty block, dropped");
                return overflow_err.map_or(Ok(false), Err);
            }
        }

        let size_reached = self
            .active
            .as_ref()
            .is_some_and(|s| s.block.size_threshold_reached());
        let flags = self.policy.on_sample(&sample, size_reached, now);
        if !flags.is_empty() {
            if flags.contains(FlushFlags::EVENT) {
                self.stats.event_flushes += 1;
                info!(g = sample.g_force().unwrap_or_default(), "High-g event flush");
            }
            if flags.contains(FlushFlags::SIZE) {
                self.stats.size_flushes += 1;
            }
            self.commit(flags)?;
        }

        overflow_err.map_or(Ok(true), Err)
    }

    /// Periodic time trigger
    pub fn check_flush(&mut self) -> Result<bool> {
        if self.active.is_none() {
            return Ok(false);
        }
        if !self.policy.time_due(self.clock.now_micros()) {
            return Ok(false);
        }
        let committed = self.commit(FlushFlags::TIME)?;
        if committed {
            self.stats.time_flushes += 1;
        }
        Ok(committed)
    }

    /// Commit the current block now
    pub fn flush_now(&mut self) -> Result<bool> {
        if self.active.is_none() {
            return Ok(false);
        }
        self.commit(FlushFlags::MANUAL)
    }

    /// Encode and write the current block, then start the next one.
    ///
    /// Empty blocks are not written and keep their sequence number; the
    /// time reference is refreshed either way. A failed write discards the
    /// block and still advances the sequence.
    #[instrument(name = "block_commit", skip(self))]
    fn commit(&mut self, flags: FlushFlags) -> Result<bool> {
        let now = self.clock.now_micros();
        self.policy.mark_flushed(now);

        let Some(session) = self.active.as_mut() else {
            return Ok(false);
        };
        if session.block.is_empty() {
            return Ok(false);
        }

        session.block.mark(flags);
        let bytes = session.block.encode();
        let next = session.block.next();
        let block = std::mem::replace(&mut session.block, next);

        let result = session.file.write(&bytes);
        let info = CommitInfo {
            session_id: session.id,
            sequence: block.sequence(),
            flags: block.flags(),
            sample_count: block.sample_count(),
            encoded_bytes: bytes.len(),
            occupancy: block.occupancy(),
            written: result.is_ok(),
        };
        if let Some(observer) = self.observer.as_mut() {
            observer(&info);
        }

        match result {
            Ok(()) => {
                self.stats.blocks_written += 1;
                self.stats.bytes_written += bytes.len() as u64;
                self.stats.samples_written += block.sample_count() as u64;
                debug!(
                    session = %info.session_id,
                    seq = info.sequence,
                    samples = info.sample_count,
                    bytes = info.encoded_bytes,
                    flags = ?info.flags.names(),
                    "Block committed"
                );
                Ok(true)
            }
            Err(e) => {
                self.stats.blocks_failed += 1;
                self.stats.samples_lost += block.sample_count() as u64;
                error!(
                    session = %info.session_id,
                    seq = info.sequence,
                    samples = info.sample_count,
                    error = %e,
                    "Block write failed, block discarded"
                );
                Err(e.into())
            }
        }
    }

    // ===== Configuration =====

    /// Register hardware provenance for the next session header.
    ///
    /// `false` once `MAX_HARDWARE_ITEMS` are registered.
    pub fn add_hardware_item(
        &mut self,
        class: HardwareClass,
        connection: ConnectionClass,
        identifier: &str,
    ) -> bool {
        if self.hardware.len() >= MAX_HARDWARE_ITEMS {
            warn!(identifier, "Hardware table full");
            return false;
        }
        self.hardware.push(HardwareItem {
            class,
            connection,
            identifier: truncate_utf8(identifier, MAX_HARDWARE_ID).to_string(),
        });
        true
    }

    pub fn hardware_items(&self) -> &[HardwareItem] {
        &self.hardware
    }

    pub fn set_gforce_threshold(&mut self, g: f32) -> bool {
        self.policy.set_gforce_threshold(g)
    }

    pub fn set_event_rate_limit(&mut self, seconds: f64) -> bool {
        self.policy.set_event_rate_limit(seconds)
    }

    pub fn set_time_threshold(&mut self, seconds: f64) -> bool {
        self.policy.set_time_threshold(seconds)
    }

    pub fn set_size_flush(&mut self, enabled: bool) {
        self.policy.set_size_flush(enabled);
    }

    /// Payload capacity for blocks of the next session.
    ///
    /// Accepts `1..=MAX_DATA_PAYLOAD`; anything else is ignored.
    pub fn set_block_capacity(&mut self, bytes: usize) -> bool {
        if bytes == 0 || bytes > MAX_DATA_PAYLOAD {
            warn!(value = bytes, "Ignoring invalid block capacity");
            return false;
        }
        self.block_capacity = bytes;
        true
    }

    pub fn policy(&self) -> &FlushPolicy {
        &self.policy
    }

    // ===== Observers =====

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn session_id(&self) -> Option<SessionId> {
        self.active.as_ref().map(|s| s.id)
    }

    pub fn current_path(&self) -> Option<&Path> {
        self.active.as_ref().map(|s| s.path.as_path())
    }

    /// Sequence number the next committed block will carry
    pub fn next_sequence(&self) -> Option<u32> {
        self.active.as_ref().map(|s| s.block.sequence())
    }

    /// Samples buffered in the uncommitted block
    pub fn pending_samples(&self) -> u16 {
        self.active.as_ref().map_or(0, |s| s.block.sample_count())
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    /// Shared view of the active file path, for retention
    pub fn active_handle(&self) -> ActiveSessionHandle {
        self.handle.clone()
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }
}
