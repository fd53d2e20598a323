//! # Integration Tests
//!
//! Cross-crate scenarios for the logger core:
//! - contract snapshots
//! - session file layout end to end (manager -> storage -> reader)
//! - flush policy, retention and compression working together
//! - producer/consumer hand-off through the sample queue

#[cfg(test)]
mod contract_tests {
    use contracts::{
        ConfigVersion, FlushFlags, HardwareClass, SessionId, StorageUsage, DEFAULT_QUEUE_CAPACITY,
        MAX_HARDWARE_ID, MAX_HARDWARE_ITEMS, MAX_MARKER_LEN, MAX_SATELLITES,
    };

    #[test]
    fn test_contracts_compile() {
        let _ = ConfigVersion::V1;
    }

    #[test]
    fn test_limits() {
        assert_eq!(MAX_HARDWARE_ITEMS, 32);
        assert_eq!(MAX_HARDWARE_ID, 31);
        assert_eq!(DEFAULT_QUEUE_CAPACITY, 2048);
        assert_eq!(codec::MAGIC, *b"OPNY");
        // both variable records stay within the u8 length byte
        assert!(1 + MAX_SATELLITES * codec::SATELLITE_LEN <= u8::MAX as usize);
        assert_eq!(MAX_MARKER_LEN, 255);
    }

    #[test]
    fn test_sample_type_tags() {
        assert_eq!(codec::SAMPLE_TYPE_ACCELEROMETER, 0x01);
        assert_eq!(codec::SAMPLE_TYPE_GPS_FIX, 0x02);
        assert_eq!(codec::SAMPLE_TYPE_GPS_SATELLITES, 0x03);
        assert_eq!(codec::SAMPLE_TYPE_GYROSCOPE, 0x04);
        assert_eq!(codec::SAMPLE_TYPE_MAGNETOMETER, 0x05);
        assert_eq!(codec::SAMPLE_TYPE_EVENT_MARKER, 0x20);
    }

    #[test]
    fn test_flush_flag_bits() {
        assert_eq!(FlushFlags::TIME.bits(), 0x01);
        assert_eq!(FlushFlags::SIZE.bits(), 0x02);
        assert_eq!(FlushFlags::EVENT.bits(), 0x04);
        assert_eq!(FlushFlags::MANUAL.bits(), 0x08);
        assert_eq!(FlushFlags::SHUTDOWN.bits(), 0x10);
    }

    #[test]
    fn test_session_id_bytes() {
        let id = SessionId {
            part1: 0x0102_0304_0506_0708,
            part2: 0x1112_1314_1516_1718,
        };
        assert_eq!(SessionId::from_bytes(id.to_bytes()), id);
    }

    #[test]
    fn test_hardware_class_wire_values() {
        assert_eq!(u8::from(HardwareClass::Accelerometer), 0x01);
        assert_eq!(HardwareClass::from(0x0A), HardwareClass::Can);
        assert_eq!(HardwareClass::from(0x7F), HardwareClass::Other(0x7F));
    }

    #[test]
    fn test_usage_fraction_without_total() {
        let usage = StorageUsage {
            total_bytes: 0,
            used_bytes: 500,
        };
        assert_eq!(usage.used_fraction(), 0.0);
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use codec::{FrameReader, ReadItem, Record, RecordBody, SessionLog, MAGIC};
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{
        Clock, ConnectionClass, FlushFlags, GpsFix, HardwareClass, ManualClock, MonotonicClock,
        Reading, Sample, Satellite, SessionMetadata, Storage, Vector3,
    };
    use ingestion::{MockSampleSource, MockSourceConfig, SampleQueue};
    use observability::LoggerMetricsAggregator;
    use session::{CommitInfo, SessionManager};
    use storage::{
        inflate_frames, DeflateStorage, FsStorage, MemoryStorage, RetentionConfig,
        RetentionManager,
    };

    const SEC: u64 = 1_000_000;
    const DIR: &str = "/sd";

    fn memory_manager() -> (
        SessionManager<MemoryStorage, Arc<ManualClock>>,
        MemoryStorage,
        Arc<ManualClock>,
    ) {
        let storage = MemoryStorage::new(0);
        let clock = Arc::new(ManualClock::new(SEC));
        let manager = SessionManager::new(storage.clone(), clock.clone(), DIR);
        (manager, storage, clock)
    }

    fn track_day() -> SessionMetadata {
        SessionMetadata {
            name: "Track Day".into(),
            driver: "John".into(),
            vehicle: "Ciara".into(),
            weather: 1,
            ambient_temp_c: 18.5,
            config_crc: 0,
        }
    }

    fn collect_commits<S: Storage, C: Clock>(
        manager: &mut SessionManager<S, C>,
    ) -> Arc<Mutex<Vec<CommitInfo>>> {
        let commits = Arc::new(Mutex::new(Vec::new()));
        let sink = commits.clone();
        manager.set_commit_observer(move |info| sink.lock().unwrap().push(*info));
        commits
    }

    /// Header, one data block and the end marker, in that order
    #[test]
    fn test_track_day_session_layout() {
        let (mut manager, storage, _clock) = memory_manager();

        let id = manager.start(track_day()).unwrap();
        let path = manager.current_path().unwrap().to_path_buf();
        assert_eq!(path, PathBuf::from("/sd/session_00001.opl"));

        assert!(manager.write_accel(1.0, 0.0, 0.0, 1_000).unwrap());
        assert!(manager
            .write_gps(GpsFix::position(40.0, -74.0), 2_000)
            .unwrap());
        manager.stop().unwrap();

        let bytes = storage.contents(&path).unwrap();
        let records: Vec<Record> = FrameReader::new(&bytes)
            .map(|item| match item {
                ReadItem::Record { record, .. } => record,
                ReadItem::Corrupt(c) => panic!("unexpected corruption: {:?}", c),
            })
            .collect();
        assert_eq!(records.len(), 3);

        let Record::SessionHeader(header) = &records[0] else {
            panic!("first record is not a header: {:?}", records[0]);
        };
        assert_eq!(header.session_id, id);
        assert_eq!(header.written_at_us, SEC);
        assert_eq!(header.metadata.name, "Track Day");
        assert_eq!(header.metadata.driver, "John");
        assert_eq!(header.metadata.vehicle, "Ciara");
        assert_eq!(header.metadata.weather, 1);
        assert!((header.metadata.ambient_temp_c - 18.5).abs() < 1e-6);

        let Record::Data(block) = &records[1] else {
            panic!("second record is not a data block: {:?}", records[1]);
        };
        assert_eq!(block.session_id, id);
        assert_eq!(block.sequence, 0);
        assert_eq!(block.sample_count, 2);
        assert_eq!(block.flags, FlushFlags::SHUTDOWN);
        assert_eq!(block.start_us, 1_000);
        assert_eq!(block.end_us, 2_000);

        let samples = codec::decode_samples(block).unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].timestamp_us, 1_000);
        assert_eq!(
            samples[0].body,
            RecordBody::Reading(Reading::Accel(Vector3 {
                x: 1.0,
                y: 0.0,
                z: 0.0
            }))
        );
        assert_eq!(samples[1].timestamp_us, 2_000);
        assert_eq!(
            samples[1].body,
            RecordBody::Reading(Reading::Gps(GpsFix::position(40.0, -74.0)))
        );

        assert_eq!(records[2], Record::SessionEnd(id));
    }

    /// Two high-g samples inside the rate limit commit once
    #[test]
    fn test_event_rate_limit() {
        let (mut manager, _storage, clock) = memory_manager();
        assert!(manager.set_gforce_threshold(1.0));
        assert!(manager.set_event_rate_limit(0.5));
        let commits = collect_commits(&mut manager);
        manager.start(track_day()).unwrap();

        manager.write_accel(2.0, 0.0, 0.0, clock.now_micros()).unwrap();
        clock.advance_secs(0.1);
        manager.write_accel(2.0, 0.0, 0.0, clock.now_micros()).unwrap();

        {
            let commits = commits.lock().unwrap();
            assert_eq!(commits.len(), 1);
            assert_eq!(commits[0].flags, FlushFlags::EVENT);
            assert_eq!(commits[0].sample_count, 1);
        }
        assert_eq!(manager.pending_samples(), 1);

        // past the limit the next spike flushes both
        clock.advance_secs(0.5);
        manager.write_accel(0.0, 2.0, 0.0, clock.now_micros()).unwrap();
        let commits = commits.lock().unwrap();
        assert_eq!(commits.len(), 2);
        assert_eq!(commits[1].sample_count, 2);
        assert_eq!(manager.stats().event_flushes, 2);
    }

    /// Full-length markers with SIZE disabled fill the block and overflow into the next
    #[test]
    fn test_marker_overflow_without_size_flush() {
        let (mut manager, storage, clock) = memory_manager();
        manager.set_size_flush(false);
        let commits = collect_commits(&mut manager);
        manager.start(track_day()).unwrap();
        let path = manager.current_path().unwrap().to_path_buf();

        let sats: Vec<Satellite> = (1..=12u8)
            .map(|id| Satellite::new(id, 30 * id as u16, 45, 40))
            .collect();
        assert!(manager.write_gps_satellites(sats.clone(), clock.now_micros()).unwrap());

        // (4 + 1 + 12 * 5) + 15 * (4 + 255) = 3950; another full marker does not fit
        let note = "x".repeat(300);
        for _ in 0..15 {
            clock.advance(1_000);
            assert!(manager.write_metadata(&note).unwrap());
        }
        assert!(commits.lock().unwrap().is_empty());
        clock.advance(1_000);
        assert!(manager.write_metadata(&note).unwrap());
        {
            let commits = commits.lock().unwrap();
            assert_eq!(commits.len(), 1);
            assert!(commits[0].flags.is_empty());
            assert_eq!(commits[0].sample_count, 16);
        }
        assert_eq!(manager.stats().overflow_flushes, 1);
        assert_eq!(manager.pending_samples(), 1);
        clock.advance(1_000);
        assert!(manager.write_metadata("last lap").unwrap());
        manager.stop().unwrap();

        let log = SessionLog::parse(&storage.contents(&path).unwrap());
        assert!(log.is_complete());
        assert_eq!(log.blocks.len(), 2);
        assert_eq!(log.blocks[1].flags, FlushFlags::SHUTDOWN);

        let samples = log.samples();
        assert_eq!(samples.len(), 18);
        assert_eq!(
            samples[0].body,
            RecordBody::Reading(Reading::GpsSatellites { satellites: sats })
        );
        let RecordBody::Reading(Reading::Marker { message }) = &samples[16].body else {
            panic!("expected marker");
        };
        assert_eq!(message.len(), 255);
        assert_eq!(samples[16].sequence, 1);
        assert_eq!(
            samples[17].body,
            RecordBody::Reading(Reading::Marker {
                message: "last lap".into()
            })
        );
    }

    /// 95% used, high water 90%, low water 60%: the two oldest go
    #[test]
    fn test_retention_evicts_oldest_sessions() {
        let (mut manager, storage, clock) = memory_manager();

        let mut finished = Vec::new();
        for _ in 0..3 {
            manager.start(track_day()).unwrap();
            finished.push(manager.current_path().unwrap().to_path_buf());
            for i in 0..50u64 {
                manager.write_accel(0.0, 0.0, 1.0, SEC + i * 1_000).unwrap();
            }
            manager.stop().unwrap();
            clock.advance_secs(1.0);
        }
        manager.start(track_day()).unwrap();
        let active = manager.current_path().unwrap().to_path_buf();
        assert_eq!(active, PathBuf::from("/sd/session_00004.opl"));

        let used = storage.usage().unwrap().used_bytes;
        storage.set_total_bytes(used * 100 / 95);

        let retention = RetentionManager::new(
            storage.clone(),
            DIR,
            RetentionConfig {
                high_water: 0.90,
                low_water: 0.60,
            },
        );
        let report = retention.enforce(Some(&active)).unwrap();

        assert_eq!(report.deleted, vec![finished[0].clone(), finished[1].clone()]);
        assert!(report.usage_before > 0.94);
        assert!(report.usage_after <= 0.60);
        assert!(storage.exists(&finished[2]));
        assert!(storage.exists(&active));
        assert!(storage.usage().unwrap().used_fraction() <= 0.60);

        // the active session keeps writing after eviction
        manager.write_accel(0.0, 0.0, 1.0, 10 * SEC).unwrap();
        manager.stop().unwrap();
        let log = SessionLog::parse(&storage.contents(&active).unwrap());
        assert!(log.is_complete());
        assert_eq!(log.sample_count(), 1);
    }

    #[test]
    fn test_stop_is_idempotent() {
        let (mut manager, storage, _clock) = memory_manager();
        manager.start(track_day()).unwrap();
        let path = manager.current_path().unwrap().to_path_buf();
        manager.write_accel(0.0, 0.0, 1.0, 5_000).unwrap();

        manager.stop().unwrap();
        let first = storage.contents(&path).unwrap();
        manager.stop().unwrap();
        assert_eq!(storage.contents(&path).unwrap(), first);

        assert!(!manager.write_accel(0.0, 0.0, 1.0, 6_000).unwrap());
        assert!(!manager.flush_now().unwrap());
        assert_eq!(storage.contents(&path).unwrap(), first);
    }

    /// A corrupted middle block is skipped and shows up as a sequence gap
    #[test]
    fn test_flipped_bit_in_middle_block() {
        let (mut manager, storage, _clock) = memory_manager();
        manager.start(track_day()).unwrap();
        let path = manager.current_path().unwrap().to_path_buf();
        for block in 0..3u64 {
            for i in 0..10u64 {
                manager
                    .write_accel(0.1, 0.2, 1.0, SEC + block * SEC + i * 10_000)
                    .unwrap();
            }
            assert!(manager.flush_now().unwrap());
        }
        manager.stop().unwrap();

        let mut bytes = storage.contents(&path).unwrap();
        let data_offsets: Vec<usize> = FrameReader::new(&bytes)
            .filter_map(|item| match item {
                ReadItem::Record {
                    offset,
                    record: Record::Data(_),
                } => Some(offset),
                _ => None,
            })
            .collect();
        assert_eq!(data_offsets.len(), 3);

        let target = (data_offsets[1] + data_offsets[2]) / 2;
        bytes[target] ^= 0x01;

        let log = SessionLog::parse(&bytes);
        assert_eq!(log.corruptions.len(), 1);
        assert_eq!(log.blocks.len(), 2);
        assert_eq!(log.sequence_gaps(), vec![(1, 1)]);
        assert_eq!(log.sample_count(), 20);
        assert!(log.is_complete());
    }

    #[test]
    fn test_deflate_session_round_trip() {
        let storage = MemoryStorage::new(0);
        let clock = Arc::new(ManualClock::new(SEC));
        let mut manager =
            SessionManager::new(DeflateStorage::new(storage.clone()), clock.clone(), DIR);
        let aggregator = Arc::new(Mutex::new(LoggerMetricsAggregator::new()));
        let agg = aggregator.clone();
        manager.set_commit_observer(move |info| agg.lock().unwrap().update(info));

        manager.start(track_day()).unwrap();
        let path = manager.current_path().unwrap().to_path_buf();
        let mut written = Vec::new();
        for i in 0..1000u64 {
            let sample = Sample::accel(i as f32 * 0.001, -0.5, 1.0, SEC + i * 1_000);
            assert!(manager.write_sample(sample.clone()).unwrap());
            written.push(sample);
        }
        manager.stop().unwrap();

        let raw = storage.contents(&path).unwrap();
        assert!(!raw.starts_with(&MAGIC));
        let plain = inflate_frames(&raw);
        assert!(plain.starts_with(&MAGIC));

        let log = SessionLog::parse(&plain);
        assert!(log.is_complete());
        assert!(log.corruptions.is_empty());
        assert!(log.blocks.len() >= 4);
        assert!(log.sequence_gaps().is_empty());
        assert!(log
            .blocks
            .iter()
            .any(|b| b.flags.contains(FlushFlags::SIZE)));

        let decoded = log.samples();
        assert_eq!(decoded.len(), written.len());
        for (got, want) in decoded.iter().zip(&written) {
            assert_eq!(got.timestamp_us, want.timestamp_us);
            assert_eq!(got.body, RecordBody::Reading(want.reading.clone()));
        }

        let stats = manager.stats();
        let aggregator = aggregator.lock().unwrap();
        assert_eq!(aggregator.blocks_written, stats.blocks_written);
        assert_eq!(aggregator.samples_written, 1000);
        assert_eq!(aggregator.blocks_failed, 0);
    }

    /// Everything the queue accepted reaches the file
    #[test]
    fn test_queue_to_manager_threads() {
        const PRODUCED: u64 = 5_000;

        let queue = Arc::new(SampleQueue::with_capacity(64).unwrap());
        let (mut manager, storage, _clock) = memory_manager();
        manager.start(track_day()).unwrap();
        let path = manager.current_path().unwrap().to_path_buf();

        let done = Arc::new(AtomicBool::new(false));
        let producer = {
            let queue = queue.clone();
            let done = done.clone();
            std::thread::spawn(move || {
                for i in 0..PRODUCED {
                    queue.push(Sample::accel(0.0, 0.0, 1.0, SEC + i * 1_000));
                    if i % 64 == 0 {
                        std::thread::yield_now();
                    }
                }
                done.store(true, Ordering::SeqCst);
            })
        };

        let mut batch = Vec::with_capacity(32);
        loop {
            let finished = done.load(Ordering::SeqCst);
            let moved = queue.drain_into(&mut batch, 32);
            for sample in batch.drain(..) {
                assert!(manager.write_sample(sample).unwrap());
            }
            if moved == 0 {
                if finished {
                    break;
                }
                std::thread::yield_now();
            }
        }
        producer.join().unwrap();
        manager.stop().unwrap();

        let snapshot = queue.snapshot();
        assert_eq!(snapshot.pushed + snapshot.dropped, PRODUCED);
        assert_eq!(manager.stats().samples_written, snapshot.pushed);

        let log = SessionLog::parse(&storage.contents(&path).unwrap());
        assert!(log.is_complete());
        assert_eq!(log.sample_count() as u64, snapshot.pushed);

        // accepted samples keep their FIFO order
        let stamps: Vec<u64> = log.samples().iter().map(|s| s.timestamp_us).collect();
        assert!(stamps.windows(2).all(|w| w[0] < w[1]));
    }

    const CONFIG_TOML: &str = r#"
[session]
name = "Track Day"
driver = "John"
vehicle = "Ciara"
weather = 1
ambient_temp_c = 18.5

[[hardware]]
class = "accelerometer"
connection = "i2c"
identifier = "LIS3DH@0x18"

[[hardware]]
class = "gps"
connection = "uart"
identifier = "PA1010D"

[flush]
gforce_threshold = 2.5
event_rate_limit_s = 0.25
time_threshold_s = 60.0

[storage]
base_path = "/sd"
"#;

    /// Config hardware and thresholds land in the manager and the header
    #[test]
    fn test_config_drives_session() {
        let bp = ConfigLoader::load_from_str(CONFIG_TOML, ConfigFormat::Toml).unwrap();
        let storage = MemoryStorage::new(0);
        let clock = Arc::new(ManualClock::new(SEC));
        let mut manager = SessionManager::new(storage.clone(), clock.clone(), &bp.storage.base_path)
            .with_flush_config(&bp.flush);

        assert!((manager.policy().gforce_threshold() - 2.5).abs() < 1e-6);
        assert_eq!(manager.policy().event_rate_limit_us(), 250_000);
        assert_eq!(manager.policy().time_threshold_us(), 60 * SEC);

        for item in &bp.hardware {
            assert!(manager.add_hardware_item(item.class, item.connection, &item.identifier));
        }
        manager.start(bp.session.to_metadata()).unwrap();
        let path = manager.current_path().unwrap().to_path_buf();

        manager.write_accel(0.0, 0.0, 1.0, SEC).unwrap();
        clock.advance_secs(61.0);
        assert!(manager.check_flush().unwrap());
        manager.stop().unwrap();

        let log = SessionLog::parse(&storage.contents(&path).unwrap());
        assert!(log.is_complete());
        assert_eq!(log.hardware, bp.hardware);
        assert_eq!(log.hardware[0].class, HardwareClass::Accelerometer);
        assert_eq!(log.hardware[1].connection, ConnectionClass::Uart);
        let header = log.header.unwrap();
        assert_eq!(header.metadata, bp.session.to_metadata());
        assert_eq!(log.blocks.len(), 1);
        assert_eq!(log.blocks[0].flags, FlushFlags::TIME);

        // hardware is cleared on stop and must be registered again
        assert!(manager.hardware_items().is_empty());
    }

    /// A full quota fails the block; eviction makes room for the next one
    #[test]
    fn test_fs_quota_with_retention() {
        let dir = tempfile::tempdir().unwrap();
        for n in 1..=3 {
            std::fs::write(
                dir.path().join(format!("session_{:05}.opl", n)),
                vec![0u8; 3_000],
            )
            .unwrap();
        }
        std::fs::write(dir.path().join("notes.txt"), b"keep").unwrap();

        let fs = FsStorage::new(dir.path(), Some(10_000)).unwrap();
        let clock = Arc::new(MonotonicClock::new());
        let mut manager = SessionManager::new(fs.clone(), clock, dir.path());
        let retention = RetentionManager::new(fs.clone(), dir.path(), RetentionConfig::default());

        manager.start(track_day()).unwrap();
        let active = manager.current_path().unwrap().to_path_buf();
        assert_eq!(active, dir.path().join("session_00004.opl"));

        for i in 0..200u64 {
            manager.write_accel(0.0, 0.0, 1.0, SEC + i * 1_000).unwrap();
        }
        assert!(manager.flush_now().is_err());
        assert_eq!(manager.stats().blocks_failed, 1);
        assert_eq!(manager.stats().samples_lost, 200);

        let report = retention.enforce(Some(&active)).unwrap();
        assert_eq!(
            report.deleted,
            vec![
                dir.path().join("session_00001.opl"),
                dir.path().join("session_00002.opl"),
            ]
        );
        assert!(report.usage_after <= 0.60);
        assert!(dir.path().join("notes.txt").exists());

        for i in 0..200u64 {
            manager.write_accel(0.0, 0.0, 1.0, 2 * SEC + i * 1_000).unwrap();
        }
        assert!(manager.flush_now().unwrap());
        manager.stop().unwrap();

        let log = SessionLog::parse(&fs.read(&active).unwrap());
        assert!(log.is_complete());
        assert_eq!(log.blocks.len(), 1);
        // the failed block still consumed its sequence number
        assert_eq!(log.blocks[0].sequence, 1);
        assert_eq!(log.sample_count(), 200);
        assert!(fs.usage().unwrap().used_bytes <= 10_000);
    }

    /// Mock producer -> queue -> manager under the tokio runtime
    #[tokio::test]
    async fn test_e2e_mock_pipeline() {
        let queue = Arc::new(SampleQueue::with_capacity(1024).unwrap());
        let clock = Arc::new(MonotonicClock::new());
        let storage = MemoryStorage::new(0);
        let mut manager = SessionManager::new(storage.clone(), clock.clone(), DIR);
        let commits = collect_commits(&mut manager);
        manager.start(track_day()).unwrap();
        let path = manager.current_path().unwrap().to_path_buf();

        let source = MockSampleSource::new(MockSourceConfig {
            poll_interval: Duration::from_millis(5),
            watermark: 4,
            gps_rate_hz: 50.0,
            event_probability: 0.5,
            ..Default::default()
        })
        .unwrap();
        let producer = source.start(queue.clone(), clock.clone());

        let running = Arc::new(AtomicBool::new(true));
        let consumer = {
            let queue = queue.clone();
            let running = running.clone();
            tokio::task::spawn_blocking(move || {
                let mut batch = Vec::new();
                loop {
                    let active = running.load(Ordering::SeqCst);
                    let moved = queue.drain_into(&mut batch, 64);
                    for sample in batch.drain(..) {
                        manager.write_sample(sample).unwrap();
                    }
                    if moved == 0 {
                        if !active {
                            break;
                        }
                        std::thread::sleep(Duration::from_millis(1));
                    }
                }
                manager.stop().unwrap();
                manager.stats()
            })
        };

        tokio::time::sleep(Duration::from_millis(100)).await;
        source.stop();
        producer.await.unwrap();
        running.store(false, Ordering::SeqCst);
        let stats = tokio::time::timeout(Duration::from_secs(5), consumer)
            .await
            .expect("consumer timed out")
            .unwrap();

        let produced = source.metrics().snapshot();
        assert!(produced.generated > 0);
        assert_eq!(stats.samples_written, queue.pushed_count());
        assert_eq!(produced.generated, queue.pushed_count() + queue.drop_count());

        let log = SessionLog::parse(&storage.contents(&path).unwrap());
        assert!(log.is_complete());
        assert_eq!(log.sample_count() as u64, stats.samples_written);

        let commits = commits.lock().unwrap();
        assert_eq!(commits.len() as u64, stats.blocks_written);
        if produced.events > 0 {
            assert!(commits.iter().any(|c| c.flags.contains(FlushFlags::EVENT)));
        }
    }
}
