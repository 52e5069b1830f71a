use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::data::{Batch, Sample};

/// Hand-off FIFO between the acquisition thread and the dispatcher.
///
/// Insertion order is delivery order. `push` and `drain_all` may race
/// freely; the lock makes each drain atomic, so every sample lands in
/// exactly one batch.
///
/// Unbounded by default, on the assumption that the dispatcher drains at
/// least as fast as intervals arrive. With a capacity set, overflow
/// drops the oldest queued sample (bounded staleness over a blocked
/// producer) and counts the drop; the producer is never blocked either
/// way.
pub struct AcquisitionQueue {
    inner: Mutex<VecDeque<Sample>>,
    cap: Option<usize>,
    dropped: AtomicU64,
}

impl AcquisitionQueue {
    pub fn new(cap: Option<usize>) -> Self {
        AcquisitionQueue {
            inner: Mutex::new(VecDeque::new()),
            // A zero cap would make push unrepresentable; one is the
            // smallest queue that still hands samples over.
            cap: cap.map(|c| c.max(1)),
            dropped: AtomicU64::new(0),
        }
    }

    pub fn push(&self, sample: Sample) {
        let mut queue = self.inner.lock();
        if let Some(cap) = self.cap {
            if queue.len() == cap {
                queue.pop_front();
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
        queue.push_back(sample);
    }

    /// Take every queued sample at once, in arrival order.
    pub fn drain_all(&self) -> Batch {
        let mut queue = self.inner.lock();
        queue.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Samples discarded by the overflow policy since construction.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}
