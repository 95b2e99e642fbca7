use crate::metrics::MetricsSample;
use std::collections::VecDeque;
use std::sync::RwLock;

pub const DEFAULT_CAPACITY: usize = 120;

/// Bounded, chronologically ordered sample history. Appends and trimming
/// happen under one write lock, so readers never see more than `capacity`
/// entries.
pub struct HistoryBuffer {
    capacity: usize,
    inner: RwLock<VecDeque<MetricsSample>>,
}

impl HistoryBuffer {
    /// A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            inner: RwLock::new(VecDeque::with_capacity(capacity)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn append(&self, sample: MetricsSample) {
        let mut guard = match self.inner.write() {
            Ok(g) => g,
            Err(poisoned) => {
                // Continue with the inner value even if poisoned.
                poisoned.into_inner()
            }
        };
        while guard.len() >= self.capacity {
            guard.pop_front();
        }
        guard.push_back(sample);
    }

    pub fn latest(&self) -> Option<MetricsSample> {
        let guard = match self.inner.read() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.back().cloned()
    }

    /// Whole history, oldest first.
    pub fn all(&self) -> Vec<MetricsSample> {
        self.history(None)
    }

    /// The most recent `limit` samples (all when `None`), oldest first.
    pub fn history(&self, limit: Option<usize>) -> Vec<MetricsSample> {
        let guard = match self.inner.read() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        let len = guard.len();
        let take = limit.unwrap_or(len).min(len);
        guard.iter().skip(len - take).cloned().collect()
    }

    pub fn len(&self) -> usize {
        match self.inner.read() {
            Ok(g) => g.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for HistoryBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
