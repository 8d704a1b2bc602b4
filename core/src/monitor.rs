//! Shared monitor context.
//!
//! Every piece of mutable state (stores, fingerprints, watch lists, baselines
//! and hotspot settings) sits behind one mutex. Ingestion cycles, queries and
//! diagnostic reads all hold it for their full duration, so callers always
//! observe a state between two complete operations.

use crate::prelude::{FingerprintPolicy, MonitorConfig, MonitorError, MonitorResult, SignalKind};
use crate::processing::{
    average, group_by_sensor, recent, BaselineMatcher, Fingerprint, SensorAverages, SensorGroups,
    SignalStore,
};
use crate::scan::{ScanBatch, ScanReport, StampedBatch};
use crate::telemetry::{LogManager, Metrics, MetricsRecorder};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// A pair of values, one per signal kind.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PerKind<T> {
    pub wifi: T,
    pub bt: T,
}

impl<T> PerKind<T> {
    pub fn get(&self, kind: SignalKind) -> &T {
        match kind {
            SignalKind::Wifi => &self.wifi,
            SignalKind::Bluetooth => &self.bt,
        }
    }

    pub fn get_mut(&mut self, kind: SignalKind) -> &mut T {
        match kind {
            SignalKind::Wifi => &mut self.wifi,
            SignalKind::Bluetooth => &mut self.bt,
        }
    }

    pub fn map<U>(&self, mut f: impl FnMut(SignalKind, &T) -> U) -> PerKind<U> {
        PerKind {
            wifi: f(SignalKind::Wifi, &self.wifi),
            bt: f(SignalKind::Bluetooth, &self.bt),
        }
    }
}

/// Designated emitter whose Wi-Fi sightings are buffered separately.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HotspotSettings {
    /// Compared literally against SSIDs; the empty name matches hidden networks.
    pub name: String,
    pub max_age_secs: i64,
}

/// Outcome of one ingestion cycle.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct IngestSummary {
    pub wifi_reports: usize,
    pub ble_reports: usize,
    pub hotspot_reports: usize,
    pub recent_wifi: usize,
    pub recent_ble: usize,
}

/// Point-in-time overview used by the status endpoint.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MonitorStatus {
    pub metrics: Metrics,
    pub stored: PerKind<usize>,
    pub recent: PerKind<usize>,
    pub fingerprinted: PerKind<usize>,
    pub watched: PerKind<usize>,
    pub hotspot_stored: usize,
    pub hotspot: HotspotSettings,
}

struct MonitorState {
    stores: PerKind<SignalStore>,
    hotspot_store: SignalStore,
    hotspot: HotspotSettings,
    recent: PerKind<Vec<ScanReport>>,
    groups: PerKind<SensorGroups>,
    averages: PerKind<SensorAverages>,
    fingerprints: PerKind<Fingerprint>,
    watched: PerKind<BTreeSet<String>>,
    baselines: PerKind<Fingerprint>,
}

impl MonitorState {
    fn new(config: &MonitorConfig) -> Self {
        Self {
            stores: PerKind {
                wifi: SignalStore::with_threshold(config.store_capacity),
                bt: SignalStore::with_threshold(config.store_capacity),
            },
            hotspot_store: SignalStore::with_threshold(config.hotspot_capacity),
            hotspot: HotspotSettings {
                name: String::new(),
                max_age_secs: config.hotspot_max_age_secs,
            },
            recent: PerKind::default(),
            groups: PerKind::default(),
            averages: PerKind::default(),
            fingerprints: PerKind::default(),
            watched: PerKind::default(),
            baselines: PerKind::default(),
        }
    }
}

/// Owned context driving the ingestion pipeline and the baseline matcher.
pub struct Monitor {
    config: MonitorConfig,
    matcher: BaselineMatcher,
    state: Mutex<MonitorState>,
    metrics: MetricsRecorder,
    logger: LogManager,
}

impl Monitor {
    pub fn new(config: MonitorConfig) -> MonitorResult<Self> {
        config.validate()?;
        let state = MonitorState::new(&config);
        Ok(Self {
            matcher: BaselineMatcher::new(config.max_rssi_diff, config.exclude_threshold),
            config,
            state: Mutex::new(state),
            metrics: MetricsRecorder::new(),
            logger: LogManager::new("monitor"),
        })
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    // Every mutation completes before its guard drops, so a poisoned lock
    // still guards consistent state.
    fn state(&self) -> MutexGuard<'_, MonitorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Parses a raw sensor upload and runs one ingestion cycle with it.
    pub fn ingest_json(&self, payload: &Value, now: DateTime<Utc>) -> MonitorResult<IngestSummary> {
        let batch = ScanBatch::from_json(payload).map_err(|err| self.reject(err))?;
        self.ingest(&batch, now)
    }

    /// Runs one full cycle: store append, window, group, average, assemble.
    /// The whole batch is validated first; a bad record leaves state untouched.
    pub fn ingest(&self, batch: &ScanBatch, now: DateTime<Utc>) -> MonitorResult<IngestSummary> {
        let stamped = batch
            .stamp(&self.config, now)
            .map_err(|err| self.reject(err))?;

        let mut state = self.state();
        let hotspot_reports = Self::append(&mut state, stamped);

        for kind in [SignalKind::Wifi, SignalKind::Bluetooth] {
            let window = recent(state.stores.get(kind), now, self.config.max_signal_age_secs);
            let groups = group_by_sensor(&window, self.config.sensors(kind));
            let averages = average(&groups);

            let fingerprint = state.fingerprints.get_mut(kind);
            if self.config.fingerprint_policy == FingerprintPolicy::Rebuild {
                fingerprint.clear();
            }
            fingerprint.assemble(&averages);

            *state.recent.get_mut(kind) = window;
            *state.groups.get_mut(kind) = groups;
            *state.averages.get_mut(kind) = averages;
        }

        let summary = IngestSummary {
            wifi_reports: batch.wifi.len(),
            ble_reports: batch.ble.len(),
            hotspot_reports,
            recent_wifi: state.recent.wifi.len(),
            recent_ble: state.recent.bt.len(),
        };
        drop(state);

        self.metrics
            .record_cycle(summary.wifi_reports, summary.ble_reports);
        self.logger.detail(&format!(
            "cycle wifi {} ble {} hotspot {} recent {}/{}",
            summary.wifi_reports,
            summary.ble_reports,
            summary.hotspot_reports,
            summary.recent_wifi,
            summary.recent_ble
        ));
        Ok(summary)
    }

    fn append(state: &mut MonitorState, stamped: StampedBatch) -> usize {
        let mut hotspot_reports = 0;
        for report in stamped.wifi {
            if report.emitter_id == state.hotspot.name {
                state.hotspot_store.append(report.clone());
                hotspot_reports += 1;
            }
            state.stores.wifi.append(report);
        }
        for report in stamped.ble {
            state.stores.bt.append(report);
        }
        hotspot_reports
    }

    fn reject(&self, err: MonitorError) -> MonitorError {
        self.metrics.record_rejection();
        self.logger.warn(&format!("rejected scan batch: {err}"));
        err
    }

    /// Replaces the hotspot name and drops every sighting captured so far.
    pub fn set_hotspot_name(&self, name: &str) {
        let mut state = self.state();
        state.hotspot.name = name.to_string();
        state.hotspot_store.clear();
        drop(state);
        self.logger.record(&format!("updated hotspot name: {name:?}"));
    }

    pub fn set_hotspot_max_age(&self, secs: u32) {
        self.state().hotspot.max_age_secs = i64::from(secs);
        self.logger.record(&format!("updated hotspot max age: {secs}s"));
    }

    /// Hotspot sightings younger than the hotspot max age.
    pub fn hotspot(&self, now: DateTime<Utc>) -> Vec<ScanReport> {
        let state = self.state();
        let reports = recent(&state.hotspot_store, now, state.hotspot.max_age_secs);
        self.logger
            .detail(&format!("hotspot data size: {}", reports.len()));
        reports
    }

    pub fn clear_hotspot(&self) {
        self.state().hotspot_store.clear();
    }

    /// Every buffered hotspot sighting, regardless of age.
    pub fn hotspot_area(&self) -> Vec<ScanReport> {
        self.state().hotspot_store.snapshot()
    }

    pub fn hotspot_settings(&self) -> HotspotSettings {
        self.state().hotspot.clone()
    }

    /// Replaces both watch lists and freezes the current fingerprints as the
    /// new baseline.
    pub fn set_watch_list<W, B>(&self, wifi: W, bt: B)
    where
        W: IntoIterator<Item = String>,
        B: IntoIterator<Item = String>,
    {
        let mut state = self.state();
        state.watched = PerKind {
            wifi: wifi.into_iter().collect(),
            bt: bt.into_iter().collect(),
        };
        state.baselines = state.fingerprints.clone();
        let message = format!(
            "updated watched devices wifi: {:?}, bt: {:?}",
            state.watched.wifi, state.watched.bt
        );
        drop(state);
        self.logger.record(&message);
    }

    /// Watched emitters (Wi-Fi) and sensor axes (Bluetooth, by default) whose
    /// live fingerprint drifted from the baseline.
    pub fn excluded_devices(&self) -> PerKind<Vec<String>> {
        let state = self.state();
        state.watched.map(|kind, watched| {
            self.matcher.excluded(
                watched,
                state.fingerprints.get(kind),
                state.baselines.get(kind),
                self.config.exclusion(kind),
            )
        })
    }

    pub fn raw_stores(&self) -> PerKind<Vec<ScanReport>> {
        self.state().stores.map(|_, store| store.snapshot())
    }

    /// Windowed reports used by the most recent ingestion cycle.
    pub fn recent_reports(&self) -> PerKind<Vec<ScanReport>> {
        self.state().recent.clone()
    }

    pub fn sensor_groups(&self) -> PerKind<SensorGroups> {
        self.state().groups.clone()
    }

    pub fn sensor_averages(&self) -> PerKind<SensorAverages> {
        self.state().averages.clone()
    }

    pub fn fingerprints(&self) -> PerKind<Fingerprint> {
        self.state().fingerprints.clone()
    }

    pub fn baseline(&self) -> PerKind<Fingerprint> {
        self.state().baselines.clone()
    }

    pub fn watch_lists(&self) -> PerKind<Vec<String>> {
        self.state()
            .watched
            .map(|_, watched| watched.iter().cloned().collect())
    }

    pub fn status(&self) -> MonitorStatus {
        let state = self.state();
        MonitorStatus {
            metrics: self.metrics.snapshot(),
            stored: state.stores.map(|_, store| store.len()),
            recent: state.recent.map(|_, reports| reports.len()),
            fingerprinted: state.fingerprints.map(|_, fingerprint| fingerprint.len()),
            watched: state.watched.map(|_, watched| watched.len()),
            hotspot_stored: state.hotspot_store.len(),
            hotspot: state.hotspot.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::{BleSighting, WifiSighting};
    use chrono::{Duration, TimeZone};
    use std::sync::Arc;
    use std::thread;

    fn t0() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    fn wifi(sensor: &str, ssid: &str, rssi: i32) -> WifiSighting {
        WifiSighting {
            esp: sensor.into(),
            ssid: ssid.into(),
            rssi,
        }
    }

    fn ble(sensor: &str, name: &str, rssi: i32) -> BleSighting {
        BleSighting {
            esp: sensor.into(),
            name: Some(name.into()),
            addr: Some("00:11:22:33:44:55".into()),
            rssi,
        }
    }

    fn wifi_batch(sightings: Vec<WifiSighting>) -> ScanBatch {
        ScanBatch {
            wifi: sightings,
            ble: vec![],
        }
    }

    fn monitor() -> Monitor {
        Monitor::new(MonitorConfig::default()).unwrap()
    }

    #[test]
    fn invalid_config_is_refused() {
        let config = MonitorConfig {
            wifi_sensors: vec![],
            ..Default::default()
        };
        assert!(matches!(
            Monitor::new(config),
            Err(MonitorError::InvalidConfig(_))
        ));
    }

    #[test]
    fn ingestion_builds_fingerprints() {
        let monitor = monitor();
        let batch = ScanBatch {
            wifi: vec![
                wifi("ESP_1", "office", -40),
                wifi("ESP_1", "office", -60),
                wifi("ESP_2", "office", -70),
            ],
            ble: vec![ble("ESP_3", "watch", -80)],
        };
        let summary = monitor.ingest(&batch, t0()).unwrap();
        assert_eq!(summary.recent_wifi, 3);

        let fingerprints = monitor.fingerprints();
        assert_eq!(fingerprints.wifi.reading("office", "ESP_1"), Some(-50.0));
        assert_eq!(fingerprints.wifi.reading("office", "ESP_2"), Some(-70.0));
        assert_eq!(fingerprints.bt.reading("watch", "ESP_3"), Some(-80.0));
        assert_eq!(monitor.sensor_averages().wifi.len(), 4);
        assert_eq!(monitor.status().metrics.cycles, 1);
    }

    #[test]
    fn rejected_batch_leaves_state_untouched() {
        let monitor = monitor();
        monitor
            .ingest(&wifi_batch(vec![wifi("ESP_1", "office", -40)]), t0())
            .unwrap();

        let bad = wifi_batch(vec![wifi("ESP_1", "office", -90), wifi("ESP_7", "office", -90)]);
        let err = monitor.ingest(&bad, t0()).unwrap_err();
        assert!(matches!(err, MonitorError::UnknownSensor { index: 1, .. }));

        assert_eq!(monitor.raw_stores().wifi.len(), 1);
        assert_eq!(monitor.fingerprints().wifi.reading("office", "ESP_1"), Some(-40.0));
        assert_eq!(monitor.status().metrics.rejected_batches, 1);
    }

    #[test]
    fn malformed_json_is_rejected_before_ingestion() {
        let monitor = monitor();
        let payload = serde_json::json!({"wifi": [{"esp": "ESP_1", "rssi": "loud"}], "ble": []});
        assert!(monitor.ingest_json(&payload, t0()).is_err());
        assert!(monitor.raw_stores().wifi.is_empty());
    }

    #[test]
    fn old_reports_leave_window_but_fingerprint_is_retained() {
        let monitor = monitor();
        monitor
            .ingest(
                &wifi_batch(vec![wifi("ESP_1", "office", -40), wifi("ESP_2", "lab", -60)]),
                t0(),
            )
            .unwrap();
        monitor
            .ingest(
                &wifi_batch(vec![wifi("ESP_1", "office", -50)]),
                t0() + Duration::seconds(45),
            )
            .unwrap();

        assert_eq!(monitor.recent_reports().wifi.len(), 1);
        let fingerprints = monitor.fingerprints();
        assert_eq!(fingerprints.wifi.reading("office", "ESP_1"), Some(-50.0));
        assert_eq!(fingerprints.wifi.reading("lab", "ESP_2"), Some(-60.0));
    }

    #[test]
    fn rebuild_policy_drops_stale_emitters() {
        let monitor = Monitor::new(MonitorConfig {
            fingerprint_policy: FingerprintPolicy::Rebuild,
            ..Default::default()
        })
        .unwrap();
        monitor
            .ingest(&wifi_batch(vec![wifi("ESP_2", "lab", -60)]), t0())
            .unwrap();
        monitor
            .ingest(
                &wifi_batch(vec![wifi("ESP_1", "office", -50)]),
                t0() + Duration::seconds(45),
            )
            .unwrap();

        let fingerprints = monitor.fingerprints();
        assert!(fingerprints.wifi.get("lab").is_none());
        assert_eq!(fingerprints.wifi.len(), 1);
    }

    #[test]
    fn hotspot_captures_only_named_ssid() {
        let monitor = monitor();
        monitor.set_hotspot_name("phone-ap");
        monitor
            .ingest(
                &wifi_batch(vec![wifi("ESP_1", "phone-ap", -45), wifi("ESP_2", "office", -50)]),
                t0(),
            )
            .unwrap();

        let area = monitor.hotspot_area();
        assert_eq!(area.len(), 1);
        assert_eq!(area[0].sensor_id, "ESP_1");
        assert_eq!(monitor.hotspot(t0() + Duration::seconds(19)).len(), 1);
        assert!(monitor.hotspot(t0() + Duration::seconds(20)).is_empty());

        monitor.set_hotspot_max_age(60);
        assert_eq!(monitor.hotspot(t0() + Duration::seconds(30)).len(), 1);
    }

    #[test]
    fn empty_hotspot_name_captures_hidden_networks() {
        let monitor = monitor();
        assert_eq!(monitor.hotspot_settings().name, "");
        monitor
            .ingest(
                &wifi_batch(vec![wifi("ESP_1", "", -40), wifi("ESP_2", "office", -50)]),
                t0(),
            )
            .unwrap();
        assert_eq!(monitor.hotspot_area().len(), 1);

        monitor.set_hotspot_name("");
        assert!(monitor.hotspot_area().is_empty());
        monitor
            .ingest(&wifi_batch(vec![wifi("ESP_1", "", -40)]), t0())
            .unwrap();
        let area = monitor.hotspot_area();
        assert_eq!(area.len(), 1);
        assert_eq!(area[0].emitter_id, "");
    }

    #[test]
    fn hotspot_store_has_its_own_bound() {
        let monitor = Monitor::new(MonitorConfig {
            store_capacity: 50,
            hotspot_capacity: 3,
            ..Default::default()
        })
        .unwrap();
        monitor.set_hotspot_name("phone-ap");
        for rssi in 0..10 {
            monitor
                .ingest(&wifi_batch(vec![wifi("ESP_1", "phone-ap", -rssi)]), t0())
                .unwrap();
        }

        let survivors: Vec<i32> = monitor.hotspot_area().iter().map(|r| r.rssi).collect();
        assert_eq!(survivors, vec![-6, -7, -8, -9]);
        assert_eq!(monitor.raw_stores().wifi.len(), 10);
        assert_eq!(monitor.status().hotspot_stored, 4);
    }

    #[test]
    fn changing_hotspot_name_clears_store() {
        let monitor = monitor();
        monitor.set_hotspot_name("phone-ap");
        monitor
            .ingest(&wifi_batch(vec![wifi("ESP_1", "phone-ap", -45)]), t0())
            .unwrap();
        assert_eq!(monitor.hotspot_area().len(), 1);

        monitor.set_hotspot_name("tablet-ap");
        assert!(monitor.hotspot_area().is_empty());
        assert_eq!(monitor.hotspot_settings().name, "tablet-ap");
    }

    #[test]
    fn clear_hotspot_keeps_name() {
        let monitor = monitor();
        monitor.set_hotspot_name("phone-ap");
        monitor
            .ingest(&wifi_batch(vec![wifi("ESP_1", "phone-ap", -45)]), t0())
            .unwrap();
        monitor.clear_hotspot();
        assert!(monitor.hotspot_area().is_empty());
        assert_eq!(monitor.status().hotspot.name, "phone-ap");
    }

    #[test]
    fn drifted_watched_emitter_is_excluded() {
        let monitor = monitor();
        let calm = wifi_batch(vec![
            wifi("ESP_1", "office", -50),
            wifi("ESP_2", "office", -50),
            wifi("ESP_3", "office", -50),
        ]);
        monitor.ingest(&calm, t0()).unwrap();
        monitor.set_watch_list(vec!["office".to_string()], Vec::new());
        assert!(monitor.excluded_devices().wifi.is_empty());

        let moved = wifi_batch(vec![
            wifi("ESP_1", "office", -70),
            wifi("ESP_2", "office", -30),
            wifi("ESP_3", "office", -52),
        ]);
        monitor.ingest(&moved, t0() + Duration::seconds(60)).unwrap();

        let excluded = monitor.excluded_devices();
        assert_eq!(excluded.wifi, vec!["office".to_string()]);
        assert!(excluded.bt.is_empty());
    }

    #[test]
    fn bluetooth_exclusion_reports_sensor_axes() {
        let monitor = monitor();
        let before = ScanBatch {
            wifi: vec![],
            ble: vec![ble("ESP_1", "watch", -60), ble("ESP_1", "tag", -60)],
        };
        monitor.ingest(&before, t0()).unwrap();
        monitor.set_watch_list(Vec::new(), vec!["watch".to_string(), "tag".to_string()]);

        let after = ScanBatch {
            wifi: vec![],
            ble: vec![ble("ESP_1", "watch", -80), ble("ESP_1", "tag", -80)],
        };
        monitor.ingest(&after, t0() + Duration::seconds(60)).unwrap();
        assert_eq!(monitor.excluded_devices().bt, vec!["ESP_1".to_string()]);
    }

    #[test]
    fn watch_list_update_resnapshots_baseline() {
        let monitor = monitor();
        monitor
            .ingest(&wifi_batch(vec![wifi("ESP_1", "office", -50)]), t0())
            .unwrap();
        monitor.set_watch_list(vec!["office".to_string()], Vec::new());

        monitor
            .ingest(
                &wifi_batch(vec![wifi("ESP_1", "office", -80)]),
                t0() + Duration::seconds(60),
            )
            .unwrap();
        assert_eq!(monitor.baseline().wifi.reading("office", "ESP_1"), Some(-50.0));

        monitor.set_watch_list(vec!["office".to_string()], Vec::new());
        assert_eq!(monitor.baseline().wifi.reading("office", "ESP_1"), Some(-80.0));
        assert_eq!(monitor.watch_lists().wifi, vec!["office".to_string()]);
    }

    #[test]
    fn baseline_is_not_aliased_to_live_fingerprint() {
        let monitor = monitor();
        monitor
            .ingest(&wifi_batch(vec![wifi("ESP_1", "office", -50)]), t0())
            .unwrap();
        monitor.set_watch_list(vec!["office".to_string()], Vec::new());
        monitor
            .ingest(
                &wifi_batch(vec![wifi("ESP_1", "office", -60)]),
                t0() + Duration::seconds(60),
            )
            .unwrap();
        assert_ne!(monitor.baseline().wifi, monitor.fingerprints().wifi);
    }

    #[test]
    fn concurrent_ingestion_keeps_stores_bounded() {
        let monitor = Arc::new(
            Monitor::new(MonitorConfig {
                store_capacity: 50,
                ..Default::default()
            })
            .unwrap(),
        );

        let workers: Vec<_> = (0..4)
            .map(|worker| {
                let monitor = Arc::clone(&monitor);
                thread::spawn(move || {
                    for round in 0..25 {
                        let sensor = format!("ESP_{}", worker + 1);
                        let batch = ScanBatch {
                            wifi: vec![wifi(&sensor, "office", -40 - round)],
                            ble: vec![ble(&sensor, "watch", -60)],
                        };
                        monitor.ingest(&batch, t0()).unwrap();
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        let status = monitor.status();
        assert_eq!(status.metrics.cycles, 100);
        assert_eq!(status.stored.wifi, 51);
        assert_eq!(status.stored.bt, 51);
        assert_eq!(status.fingerprinted.wifi, 1);
    }
}
