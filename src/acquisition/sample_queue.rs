// src/acquisition/sample_queue.rs
//! Unbounded FIFO of raw samples shared by the listener and the reader
//!
//! A single mutex guards the deque and its counters, so enqueue, dequeue and
//! reset are serialized against each other. Readers park on a condition
//! variable instead of polling.

use crate::hal::RawSample;
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Counters describing everything that passed through a queue
///
/// `enqueued == dequeued + discarded + queued` holds for every snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct QueueStats {
    /// Samples pushed since creation
    pub enqueued: u64,
    /// Samples handed to a reader
    pub dequeued: u64,
    /// Samples dropped by reset
    pub discarded: u64,
    /// Samples currently waiting
    pub queued: usize,
}

#[derive(Debug, Default)]
struct QueueState {
    samples: VecDeque<RawSample>,
    enqueued: u64,
    dequeued: u64,
    discarded: u64,
}

impl QueueState {
    fn drain(&mut self, count: usize) -> Vec<RawSample> {
        self.dequeued += count as u64;
        self.samples.drain(..count).collect()
    }
}

/// Thread-safe unbounded sample FIFO
#[derive(Debug, Default)]
pub struct SampleQueue {
    state: Mutex<QueueState>,
    available: Condvar,
}

impl SampleQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a sample and wake a waiting reader. Returns its sequence number.
    pub fn push(&self, values: Vec<f32>) -> u64 {
        let mut state = self.state.lock();
        let sequence = state.enqueued;
        state.samples.push_back(RawSample::new(sequence, values));
        state.enqueued += 1;
        drop(state);

        self.available.notify_one();
        sequence
    }

    /// Remove the oldest sample without blocking
    pub fn try_pop(&self) -> Option<RawSample> {
        let mut state = self.state.lock();
        let sample = state.samples.pop_front()?;
        state.dequeued += 1;
        Some(sample)
    }

    /// Remove the oldest sample, parking until one arrives
    pub fn pop(&self) -> RawSample {
        let mut state = self.state.lock();
        loop {
            if let Some(sample) = state.samples.pop_front() {
                state.dequeued += 1;
                return sample;
            }
            self.available.wait(&mut state);
        }
    }

    /// Remove exactly `count` consecutive samples, parking until that many
    /// are queued.
    ///
    /// The samples leave the queue in one critical section, so a concurrent
    /// [`SampleQueue::reset`] either discards all of them or none.
    pub fn take(&self, count: usize) -> Vec<RawSample> {
        let mut state = self.state.lock();
        while state.samples.len() < count {
            self.available.wait(&mut state);
        }
        state.drain(count)
    }

    /// Like [`SampleQueue::take`] but gives up after `timeout`.
    ///
    /// On timeout nothing is removed; the partial batch stays queued for the
    /// next call. A `timeout` too large to express as a deadline waits like
    /// [`SampleQueue::take`].
    pub fn take_timeout(&self, count: usize, timeout: Duration) -> Option<Vec<RawSample>> {
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            return Some(self.take(count));
        };
        let mut state = self.state.lock();
        while state.samples.len() < count {
            if self.available.wait_until(&mut state, deadline).timed_out() {
                if state.samples.len() >= count {
                    break;
                }
                return None;
            }
        }
        Some(state.drain(count))
    }

    /// Discard every queued sample. Returns how many were dropped.
    pub fn reset(&self) -> usize {
        let mut state = self.state.lock();
        let dropped = state.samples.len();
        state.samples.clear();
        state.discarded += dropped as u64;
        dropped
    }

    /// Number of samples waiting to be read
    pub fn len(&self) -> usize {
        self.state.lock().samples.len()
    }

    /// Whether no samples are waiting
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the queue counters
    pub fn stats(&self) -> QueueStats {
        let state = self.state.lock();
        QueueStats {
            enqueued: state.enqueued,
            dequeued: state.dequeued,
            discarded: state.discarded,
            queued: state.samples.len(),
        }
    }
}
