//! SampleQueue - bounded FIFO between producer and consumer
//!
//! Circular buffer over a fixed slice. One slot is always left empty so
//! `head == tail` means empty and `next(head) == tail` means full; usable
//! capacity is `slots - 1`. A full queue rejects the new sample and counts
//! the drop.

use std::sync::{Mutex, MutexGuard};

use contracts::{Sample, DEFAULT_QUEUE_CAPACITY};

use crate::error::{IngestionError, Result};

#[derive(Debug)]
struct Ring {
    slots: Box<[Option<Sample>]>,
    head: usize,
    tail: usize,
    dropped: u64,
    pushed: u64,
}

impl Ring {
    fn next(&self, index: usize) -> usize {
        (index + 1) % self.slots.len()
    }

    fn len(&self) -> usize {
        (self.head + self.slots.len() - self.tail) % self.slots.len()
    }
}

/// Queue counters at a point in time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueSnapshot {
    pub len: usize,
    pub capacity: usize,
    pub pushed: u64,
    pub dropped: u64,
}

impl QueueSnapshot {
    /// Fill fraction of usable capacity
    pub fn fill(&self) -> f64 {
        if self.capacity == 0 {
            0.0
        } else {
            self.len as f64 / self.capacity as f64
        }
    }
}

/// Bounded multi-producer multi-consumer sample queue
#[derive(Debug)]
pub struct SampleQueue {
    ring: Mutex<Ring>,
}

impl SampleQueue {
    /// Queue with `slots` slots (`slots - 1` usable)
    pub fn with_capacity(slots: usize) -> Result<Self> {
        if slots < 2 {
            return Err(IngestionError::InvalidCapacity { capacity: slots });
        }
        Ok(Self::build(slots))
    }

    fn build(slots: usize) -> Self {
        Self {
            ring: Mutex::new(Ring {
                slots: vec![None; slots].into_boxed_slice(),
                head: 0,
                tail: 0,
                dropped: 0,
                pushed: 0,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Ring> {
        match self.ring.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Enqueue; `false` (and a counted drop) when full
    pub fn push(&self, sample: Sample) -> bool {
        let mut ring = self.lock();
        let next = ring.next(ring.head);
        if next == ring.tail {
            ring.dropped += 1;
            return false;
        }
        let head = ring.head;
        ring.slots[head] = Some(sample);
        ring.head = next;
        ring.pushed += 1;
        true
    }

    /// Dequeue the oldest sample
    pub fn pop(&self) -> Option<Sample> {
        let mut ring = self.lock();
        if ring.head == ring.tail {
            return None;
        }
        let tail = ring.tail;
        let sample = ring.slots[tail].take();
        ring.tail = ring.next(tail);
        sample
    }

    /// Pop up to `max` samples into `out`; returns how many were moved
    pub fn drain_into(&self, out: &mut Vec<Sample>, max: usize) -> usize {
        let mut moved = 0;
        while moved < max {
            match self.pop() {
                Some(sample) => {
                    out.push(sample);
                    moved += 1;
                }
                None => break,
            }
        }
        moved
    }

    pub fn is_empty(&self) -> bool {
        let ring = self.lock();
        ring.head == ring.tail
    }

    pub fn is_full(&self) -> bool {
        let ring = self.lock();
        ring.next(ring.head) == ring.tail
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Usable capacity (`slots - 1`)
    pub fn capacity(&self) -> usize {
        self.lock().slots.len() - 1
    }

    /// Samples rejected because the queue was full
    pub fn drop_count(&self) -> u64 {
        self.lock().dropped
    }

    /// Samples accepted
    pub fn pushed_count(&self) -> u64 {
        self.lock().pushed
    }

    /// Zero the drop and push counters
    pub fn reset_counters(&self) {
        let mut ring = self.lock();
        ring.dropped = 0;
        ring.pushed = 0;
    }

    pub fn snapshot(&self) -> QueueSnapshot {
        let ring = self.lock();
        QueueSnapshot {
            len: ring.len(),
            capacity: ring.slots.len() - 1,
            pushed: ring.pushed,
            dropped: ring.dropped,
        }
    }
}

impl Default for SampleQueue {
    fn default() -> Self {
        Self::build(DEFAULT_QUEUE_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn accel(ts: u64) -> Sample {
        Sample::accel(0.0, 0.0, 1.0, ts)
    }

    #[test]
    fn test_rejects_tiny_capacity() {
        assert!(matches!(
            SampleQueue::with_capacity(1),
            Err(IngestionError::InvalidCapacity { capacity: 1 })
        ));
    }

    #[test]
    fn test_fifo_order() {
        let q = SampleQueue::with_capacity(8).unwrap();
        for ts in 1..=5 {
            assert!(q.push(accel(ts)));
        }
        assert_eq!(q.len(), 5);
        for ts in 1..=5 {
            assert_eq!(q.pop().unwrap().timestamp_us, ts);
        }
        assert!(q.pop().is_none());
        assert!(q.is_empty());
    }

    #[test]
    fn test_full_drops_newest() {
        let q = SampleQueue::with_capacity(4).unwrap();
        assert_eq!(q.capacity(), 3);
        for ts in 1..=3 {
            assert!(q.push(accel(ts)));
        }
        assert!(q.is_full());
        assert!(!q.push(accel(99)));
        assert_eq!(q.drop_count(), 1);

        // queued contents unchanged
        let got: Vec<u64> = std::iter::from_fn(|| q.pop()).map(|s| s.timestamp_us).collect();
        assert_eq!(got, vec![1, 2, 3]);
    }

    #[test]
    fn test_owned_readings_pass_through() {
        let q = SampleQueue::with_capacity(4).unwrap();
        assert!(q.push(Sample::marker("pit out", 7)));
        assert!(q.push(accel(8)));
        let marker = q.pop().unwrap();
        assert_eq!(marker, Sample::marker("pit out", 7));
        assert_eq!(marker.reading.kind(), "marker");
        assert_eq!(q.pop().unwrap().timestamp_us, 8);
    }

    #[test]
    fn test_wraparound() {
        let q = SampleQueue::with_capacity(3).unwrap();
        for round in 0..10u64 {
            assert!(q.push(accel(round * 2)));
            assert!(q.push(accel(round * 2 + 1)));
            assert_eq!(q.pop().unwrap().timestamp_us, round * 2);
            assert_eq!(q.pop().unwrap().timestamp_us, round * 2 + 1);
        }
        assert_eq!(q.pushed_count(), 20);
        assert_eq!(q.drop_count(), 0);
    }

    #[test]
    fn test_reset_counters() {
        let q = SampleQueue::with_capacity(2).unwrap();
        q.push(accel(1));
        q.push(accel(2));
        assert_eq!(q.snapshot().dropped, 1);
        q.reset_counters();
        let snap = q.snapshot();
        assert_eq!(snap.dropped, 0);
        assert_eq!(snap.pushed, 0);
        assert_eq!(snap.len, 1);
    }

    #[test]
    fn test_drain_into() {
        let q = SampleQueue::with_capacity(16).unwrap();
        for ts in 0..10 {
            q.push(accel(ts));
        }
        let mut out = Vec::new();
        assert_eq!(q.drain_into(&mut out, 4), 4);
        assert_eq!(q.drain_into(&mut out, 100), 6);
        assert_eq!(out.len(), 10);
    }

    #[test]
    fn test_concurrent_producers() {
        let q = Arc::new(SampleQueue::with_capacity(1024).unwrap());
        let handles: Vec<_> = (0..4)
            .map(|p| {
                let q = q.clone();
                std::thread::spawn(move || {
                    for i in 0..500u64 {
                        q.push(accel(p * 1000 + i));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        let snap = q.snapshot();
        assert_eq!(snap.pushed + snap.dropped, 2000);
        assert_eq!(snap.len as u64, snap.pushed);
        assert_eq!(snap.len, 1023);
    }

    #[test]
    fn test_default_capacity() {
        assert_eq!(SampleQueue::default().capacity(), DEFAULT_QUEUE_CAPACITY - 1);
    }
}
