use chrono::{DateTime, Utc};
use rssicore::scan::ScanReport;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct HotspotNameRequest {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HotspotAgeRequest {
    pub age: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WatchListRequest {
    pub wifi: Vec<String>,
    pub bt: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusReply {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl StatusReply {
    pub fn ok() -> Self {
        Self {
            status: "OK".into(),
            message: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error".into(),
            message: Some(message.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataReply {
    pub data: Vec<ScanReport>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimestampReply {
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawStoresReply {
    pub wifi: Vec<ScanReport>,
    pub ble: Vec<ScanReport>,
    pub time: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HotspotStoreReply {
    pub hotspot: Vec<ScanReport>,
}
