use serde::Serialize;
use std::sync::Mutex;

pub struct MetricsRecorder {
    inner: Mutex<Metrics>,
}

/// Counters accumulated since start-up.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct Metrics {
    pub cycles: usize,
    pub wifi_reports: usize,
    pub ble_reports: usize,
    pub rejected_batches: usize,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Metrics::default()),
        }
    }

    pub fn record_cycle(&self, wifi_reports: usize, ble_reports: usize) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.cycles += 1;
            metrics.wifi_reports += wifi_reports;
            metrics.ble_reports += ble_reports;
        }
    }

    pub fn record_rejection(&self) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.rejected_batches += 1;
        }
    }

    pub fn snapshot(&self) -> Metrics {
        if let Ok(metrics) = self.inner.lock() {
            *metrics
        } else {
            Metrics::default()
        }
    }
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}
