use crate::prelude::{MonitorConfig, MonitorError, MonitorResult, SignalKind};
use crate::scan::report::{BleSighting, ScanReport, WifiSighting};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One upload from the sensor network: every Wi-Fi and Bluetooth sighting
/// collected since the previous upload.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ScanBatch {
    pub wifi: Vec<WifiSighting>,
    pub ble: Vec<BleSighting>,
}

/// Reports of a validated batch, stamped with the ingestion time.
#[derive(Debug, Clone, Default)]
pub struct StampedBatch {
    pub wifi: Vec<ScanReport>,
    pub ble: Vec<ScanReport>,
}

impl ScanBatch {
    /// Parses a raw upload record by record so that a malformed entry is
    /// reported with its position instead of as an opaque document error.
    pub fn from_json(payload: &Value) -> MonitorResult<Self> {
        let object = payload
            .as_object()
            .ok_or_else(|| MonitorError::InvalidPayload("expected a JSON object".into()))?;

        let wifi = parse_records(object.get("wifi"), SignalKind::Wifi, "wifi")?;
        let ble = parse_records(object.get("ble"), SignalKind::Bluetooth, "ble")?;
        Ok(Self { wifi, ble })
    }

    pub fn len(&self) -> usize {
        self.wifi.len() + self.ble.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wifi.is_empty() && self.ble.is_empty()
    }

    /// Validates every sighting against the configured rosters and converts
    /// the batch into timestamped reports. Fails on the first bad record.
    pub fn stamp(&self, config: &MonitorConfig, now: DateTime<Utc>) -> MonitorResult<StampedBatch> {
        let mut wifi = Vec::with_capacity(self.wifi.len());
        for (index, sighting) in self.wifi.iter().enumerate() {
            check_sensor(config, SignalKind::Wifi, index, &sighting.esp)?;
            wifi.push(ScanReport::new(
                sighting.esp.as_str(),
                sighting.ssid.as_str(),
                sighting.rssi,
                now,
            ));
        }

        let mut ble = Vec::with_capacity(self.ble.len());
        for (index, sighting) in self.ble.iter().enumerate() {
            check_sensor(config, SignalKind::Bluetooth, index, &sighting.esp)?;
            let emitter = sighting
                .emitter_id()
                .ok_or_else(|| MonitorError::InvalidRecord {
                    kind: SignalKind::Bluetooth,
                    index,
                    reason: "neither name nor addr is set".into(),
                })?;
            ble.push(ScanReport::new(
                sighting.esp.as_str(),
                emitter,
                sighting.rssi,
                now,
            ));
        }

        Ok(StampedBatch { wifi, ble })
    }
}

fn parse_records<T: DeserializeOwned>(
    field: Option<&Value>,
    kind: SignalKind,
    key: &str,
) -> MonitorResult<Vec<T>> {
    let items = field
        .ok_or_else(|| MonitorError::InvalidPayload(format!("missing \"{key}\" list")))?
        .as_array()
        .ok_or_else(|| MonitorError::InvalidPayload(format!("\"{key}\" must be a list")))?;

    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            T::deserialize(item).map_err(|err| MonitorError::InvalidRecord {
                kind,
                index,
                reason: err.to_string(),
            })
        })
        .collect()
}

fn check_sensor(
    config: &MonitorConfig,
    kind: SignalKind,
    index: usize,
    sensor: &str,
) -> MonitorResult<()> {
    if sensor.is_empty() {
        return Err(MonitorError::InvalidRecord {
            kind,
            index,
            reason: "sensor id is empty".into(),
        });
    }
    if !config.sensors(kind).iter().any(|known| known == sensor) {
        return Err(MonitorError::UnknownSensor {
            kind,
            index,
            sensor: sensor.to_string(),
        });
    }
    Ok(())
}
