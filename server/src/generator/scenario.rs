use rand::{rngs::StdRng, Rng, SeedableRng};
use rssicore::scan::{BleSighting, ScanBatch, WifiSighting};
use rssicore::MonitorConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Signal shift applied to one emitter from a given cycle onwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Drift {
    pub emitter: String,
    pub from_cycle: usize,
    /// Applied with alternating sign across the sensor roster so that the
    /// emitter's shape changes, not just its overall level.
    pub offset_db: i32,
}

/// Configuration for generating synthetic sensor uploads.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    pub wifi_emitters: Vec<String>,
    pub ble_emitters: Vec<String>,
    pub noise_db: i32,
    pub seed: u64,
    pub interval_secs: i64,
    /// Cycle after which the watch list is installed during an offline run.
    pub watch_after: usize,
    pub drifts: Vec<Drift>,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            wifi_emitters: vec!["office".into(), "lab".into(), "hallway".into()],
            ble_emitters: vec!["watch".into(), "tag".into(), "phone".into()],
            noise_db: 2,
            seed: 0,
            interval_secs: 5,
            watch_after: 4,
            drifts: vec![
                Drift {
                    emitter: "office".into(),
                    from_cycle: 8,
                    offset_db: 20,
                },
                Drift {
                    emitter: "watch".into(),
                    from_cycle: 8,
                    offset_db: 20,
                },
                Drift {
                    emitter: "tag".into(),
                    from_cycle: 8,
                    offset_db: 20,
                },
            ],
        }
    }
}

/// Deterministic source of scan batches for every roster sensor.
pub struct ScenarioGenerator {
    config: ScenarioConfig,
    wifi_sensors: Vec<String>,
    bt_sensors: Vec<String>,
    base_rssi: HashMap<(String, String), i32>,
    rng: StdRng,
}

impl ScenarioGenerator {
    pub fn new(config: ScenarioConfig, monitor: &MonitorConfig) -> Self {
        let mut rng = StdRng::seed_from_u64(config.seed);
        let mut base_rssi = HashMap::new();

        for (emitters, sensors) in [
            (&config.wifi_emitters, &monitor.wifi_sensors),
            (&config.ble_emitters, &monitor.bt_sensors),
        ] {
            for emitter in emitters {
                for sensor in sensors {
                    base_rssi.insert(
                        (sensor.clone(), emitter.clone()),
                        rng.gen_range(-85..=-35),
                    );
                }
            }
        }

        Self {
            wifi_sensors: monitor.wifi_sensors.clone(),
            bt_sensors: monitor.bt_sensors.clone(),
            config,
            base_rssi,
            rng,
        }
    }

    pub fn config(&self) -> &ScenarioConfig {
        &self.config
    }

    fn drift_offset(&self, emitter: &str, sensor_index: usize, cycle: usize) -> i32 {
        self.config
            .drifts
            .iter()
            .filter(|drift| drift.emitter == emitter && cycle >= drift.from_cycle)
            .map(|drift| {
                if sensor_index % 2 == 0 {
                    drift.offset_db
                } else {
                    -drift.offset_db
                }
            })
            .sum()
    }

    fn reading(&mut self, sensor: &str, sensor_index: usize, emitter: &str, cycle: usize) -> i32 {
        let base = self
            .base_rssi
            .get(&(sensor.to_string(), emitter.to_string()))
            .copied()
            .unwrap_or(-70);
        let noise = self.config.noise_db.abs();
        let jitter = self.rng.gen_range(-noise..=noise);
        base + self.drift_offset(emitter, sensor_index, cycle) + jitter
    }

    /// One upload holding a sighting of every emitter by every sensor.
    pub fn next_batch(&mut self, cycle: usize) -> ScanBatch {
        let mut batch = ScanBatch::default();

        let wifi_sensors = self.wifi_sensors.clone();
        let wifi_emitters = self.config.wifi_emitters.clone();
        for (sensor_index, sensor) in wifi_sensors.iter().enumerate() {
            for emitter in &wifi_emitters {
                let rssi = self.reading(sensor, sensor_index, emitter, cycle);
                batch.wifi.push(WifiSighting {
                    esp: sensor.clone(),
                    ssid: emitter.clone(),
                    rssi,
                });
            }
        }

        let bt_sensors = self.bt_sensors.clone();
        let ble_emitters = self.config.ble_emitters.clone();
        for (sensor_index, sensor) in bt_sensors.iter().enumerate() {
            for (emitter_index, emitter) in ble_emitters.iter().enumerate() {
                let rssi = self.reading(sensor, sensor_index, emitter, cycle);
                batch.ble.push(BleSighting {
                    esp: sensor.clone(),
                    name: Some(emitter.clone()),
                    addr: Some(format!("02:00:00:00:00:{:02X}", emitter_index & 0xff)),
                    rssi,
                });
            }
        }

        batch
    }
}
