use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Radio technology a scan report was captured with.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SignalKind {
    Wifi,
    Bluetooth,
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalKind::Wifi => write!(f, "wifi"),
            SignalKind::Bluetooth => write!(f, "bluetooth"),
        }
    }
}

/// How the long-lived fingerprint table is refreshed on each ingestion cycle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum FingerprintPolicy {
    /// Overwrite only the (emitter, sensor) cells reproduced this cycle; older
    /// cells keep their last known value.
    #[default]
    Retain,
    /// Clear the table and assemble it from the current window only.
    Rebuild,
}

/// Key under which baseline mismatches are counted.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExclusionStrategy {
    /// One counter per watched emitter; reports emitter ids.
    PerEmitter,
    /// One counter per sensor axis, summed over all watched emitters; reports
    /// sensor ids.
    PerSensorAxis,
}

/// Runtime configuration for the monitor and every pipeline stage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MonitorConfig {
    pub wifi_sensors: Vec<String>,
    pub bt_sensors: Vec<String>,
    /// Eviction threshold for the Wi-Fi and Bluetooth stores.
    pub store_capacity: usize,
    pub hotspot_capacity: usize,
    pub max_signal_age_secs: i64,
    pub hotspot_max_age_secs: i64,
    /// Tolerated deviation from the baseline, in dB.
    pub max_rssi_diff: f64,
    pub exclude_threshold: usize,
    pub fingerprint_policy: FingerprintPolicy,
    pub wifi_exclusion: ExclusionStrategy,
    pub bt_exclusion: ExclusionStrategy,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        let roster: Vec<String> = (1..=4).map(|idx| format!("ESP_{idx}")).collect();
        Self {
            wifi_sensors: roster.clone(),
            bt_sensors: roster,
            store_capacity: 1000,
            hotspot_capacity: 5000,
            max_signal_age_secs: 40,
            hotspot_max_age_secs: 20,
            max_rssi_diff: 5.0,
            exclude_threshold: 2,
            fingerprint_policy: FingerprintPolicy::Retain,
            wifi_exclusion: ExclusionStrategy::PerEmitter,
            bt_exclusion: ExclusionStrategy::PerSensorAxis,
        }
    }
}

impl MonitorConfig {
    pub fn sensors(&self, kind: SignalKind) -> &[String] {
        match kind {
            SignalKind::Wifi => &self.wifi_sensors,
            SignalKind::Bluetooth => &self.bt_sensors,
        }
    }

    pub fn exclusion(&self, kind: SignalKind) -> ExclusionStrategy {
        match kind {
            SignalKind::Wifi => self.wifi_exclusion,
            SignalKind::Bluetooth => self.bt_exclusion,
        }
    }

    pub fn validate(&self) -> MonitorResult<()> {
        for kind in [SignalKind::Wifi, SignalKind::Bluetooth] {
            let roster = self.sensors(kind);
            if roster.is_empty() {
                return Err(MonitorError::InvalidConfig(format!(
                    "{kind} sensor roster is empty"
                )));
            }
            let mut seen = HashSet::new();
            for sensor in roster {
                if sensor.trim().is_empty() {
                    return Err(MonitorError::InvalidConfig(format!(
                        "{kind} sensor roster contains a blank id"
                    )));
                }
                if !seen.insert(sensor.as_str()) {
                    return Err(MonitorError::InvalidConfig(format!(
                        "{kind} sensor roster lists {sensor} twice"
                    )));
                }
            }
        }
        if self.store_capacity == 0 || self.hotspot_capacity == 0 {
            return Err(MonitorError::InvalidConfig(
                "store capacities must be positive".into(),
            ));
        }
        if self.max_signal_age_secs <= 0 || self.hotspot_max_age_secs <= 0 {
            return Err(MonitorError::InvalidConfig(
                "window ages must be positive".into(),
            ));
        }
        if !self.max_rssi_diff.is_finite() || self.max_rssi_diff < 0.0 {
            return Err(MonitorError::InvalidConfig(format!(
                "max_rssi_diff {} is not a usable tolerance",
                self.max_rssi_diff
            )));
        }
        if self.exclude_threshold == 0 {
            return Err(MonitorError::InvalidConfig(
                "exclude_threshold must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Common error type for monitor operations.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum MonitorError {
    #[error("invalid {kind} record #{index}: {reason}")]
    InvalidRecord {
        kind: SignalKind,
        index: usize,
        reason: String,
    },
    #[error("{kind} record #{index} comes from unknown sensor {sensor:?}")]
    UnknownSensor {
        kind: SignalKind,
        index: usize,
        sensor: String,
    },
    #[error("malformed scan payload: {0}")]
    InvalidPayload(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type MonitorResult<T> = Result<T, MonitorError>;
