use crate::scan::ScanReport;
use std::collections::VecDeque;

/// Bounded FIFO of scan reports.
///
/// The eviction check runs before each append, so the store can hold
/// `threshold + 1` entries right after an append. Callers that size
/// downstream work against the store should use [`SignalStore::max_len`].
#[derive(Debug, Clone)]
pub struct SignalStore {
    entries: VecDeque<ScanReport>,
    threshold: usize,
}

impl SignalStore {
    pub fn with_threshold(threshold: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(threshold.saturating_add(1)),
            threshold,
        }
    }

    /// Appends a report, evicting the oldest one first when the store has
    /// grown past its threshold.
    pub fn append(&mut self, report: ScanReport) {
        if self.entries.len() > self.threshold {
            self.entries.pop_front();
        }
        self.entries.push_back(report);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Copy of every stored report, oldest first.
    pub fn snapshot(&self) -> Vec<ScanReport> {
        self.entries.iter().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ScanReport> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_len(&self) -> usize {
        self.threshold.saturating_add(1)
    }
}
