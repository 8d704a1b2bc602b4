use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

/// A single sighting of an emitter by one sensor, stamped at ingestion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScanReport {
    pub sensor_id: String,
    pub emitter_id: String,
    pub rssi: i32,
    pub received_at: DateTime<Utc>,
}

impl ScanReport {
    /// Builds a report, truncating `received_at` to whole seconds.
    pub fn new(
        sensor_id: impl Into<String>,
        emitter_id: impl Into<String>,
        rssi: i32,
        received_at: DateTime<Utc>,
    ) -> Self {
        Self {
            sensor_id: sensor_id.into(),
            emitter_id: emitter_id.into(),
            rssi,
            received_at: received_at.trunc_subsecs(0),
        }
    }
}

/// Wi-Fi sighting as posted by a sensor node.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WifiSighting {
    #[serde(alias = "sensorId")]
    pub esp: String,
    #[serde(alias = "emitterId")]
    pub ssid: String,
    pub rssi: i32,
}

/// Bluetooth sighting as posted by a sensor node. Either `name` or `addr`
/// must be non-empty.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BleSighting {
    #[serde(alias = "sensorId")]
    pub esp: String,
    #[serde(default, alias = "emitterId")]
    pub name: Option<String>,
    #[serde(default)]
    pub addr: Option<String>,
    pub rssi: i32,
}

impl BleSighting {
    /// Device name when advertised, hardware address otherwise.
    pub fn emitter_id(&self) -> Option<&str> {
        let name = self.name.as_deref().filter(|name| !name.is_empty());
        name.or_else(|| self.addr.as_deref().filter(|addr| !addr.is_empty()))
    }
}
