//! RSSI aggregation, fingerprinting and baseline matching for a fixed network
//! of scanning sensor nodes.
//!
//! Sensors upload Wi-Fi and Bluetooth sightings; the pipeline keeps bounded
//! per-kind stores, averages recent readings per sensor, assembles per-emitter
//! fingerprints and flags watched emitters that drifted from their baseline.

pub mod math;
pub mod monitor;
pub mod prelude;
pub mod processing;
pub mod scan;
pub mod telemetry;

pub use monitor::{Monitor, PerKind};
pub use prelude::{MonitorConfig, MonitorError, MonitorResult, SignalKind};
