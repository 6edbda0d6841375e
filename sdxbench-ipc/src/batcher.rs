//! Sample Batching
//!
//! Collects samples on the worker side and hands out [`SampleBatch`]es of at
//! most [`MAX_BATCH_SIZE`](crate::MAX_BATCH_SIZE) entries, numbered in order.

use crate::messages::{Sample, SampleBatch};

/// Accumulates samples until a batch is full
#[derive(Debug)]
pub struct SampleBatcher {
    capacity: usize,
    next_sequence: u32,
    pending: Vec<Sample>,
}

impl SampleBatcher {
    /// Batcher with the protocol's default capacity
    pub fn new() -> Self {
        Self::with_capacity(crate::MAX_BATCH_SIZE)
    }

    /// Batcher that flushes every `capacity` samples
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            next_sequence: 0,
            pending: Vec::with_capacity(capacity),
        }
    }

    /// Add a sample, returning a full batch when one is ready
    #[inline]
    pub fn push(&mut self, sample: Sample) -> Option<SampleBatch> {
        self.pending.push(sample);
        if self.pending.len() >= self.capacity {
            self.take()
        } else {
            None
        }
    }

    /// Drain whatever is pending, `None` if nothing is
    pub fn flush(&mut self) -> Option<SampleBatch> {
        if self.pending.is_empty() {
            None
        } else {
            self.take()
        }
    }

    /// Samples not yet handed out
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    fn take(&mut self) -> Option<SampleBatch> {
        let samples = std::mem::replace(&mut self.pending, Vec::with_capacity(self.capacity));
        let batch = SampleBatch {
            batch_sequence: self.next_sequence,
            samples,
        };
        self.next_sequence = self.next_sequence.wrapping_add(1);
        Some(batch)
    }
}

impl Default for SampleBatcher {
    fn default() -> Self {
        Self::new()
    }
}
