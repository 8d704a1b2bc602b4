use crate::generator::scenario::ScenarioConfig;
use anyhow::Context;
use rssicore::MonitorConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::Path;

fn default_bind() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 5000))
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default = "default_bind")]
    pub bind: SocketAddr,
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub scenario: ScenarioConfig,
}

impl ServiceConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading service config {}", path_ref.display()))?;
        let config: ServiceConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing service config {}", path_ref.display()))?;
        config
            .monitor
            .validate()
            .with_context(|| format!("validating service config {}", path_ref.display()))?;
        Ok(config)
    }

    pub fn from_args(bind: SocketAddr, seed: u64) -> Self {
        Self {
            bind,
            monitor: MonitorConfig::default(),
            scenario: ScenarioConfig {
                seed,
                ..Default::default()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rssicore::prelude::{ExclusionStrategy, FingerprintPolicy};
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn config_from_args_uses_default_monitor() {
        let cfg = ServiceConfig::from_args(default_bind(), 7);
        assert_eq!(cfg.monitor.store_capacity, 1000);
        assert_eq!(cfg.scenario.seed, 7);
        assert_eq!(cfg.bind.port(), 5000);
    }

    #[test]
    fn config_load_reads_yaml() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(
            b"bind: 127.0.0.1:8080\nmonitor:\n  wifi_sensors: [north, south]\n  max_rssi_diff: 7.5\n  fingerprint_policy: rebuild\n  bt_exclusion: per_emitter\n",
        )
        .unwrap();
        let path = temp.into_temp_path();
        let cfg = ServiceConfig::load(&path).unwrap();
        assert_eq!(cfg.bind.port(), 8080);
        assert_eq!(cfg.monitor.wifi_sensors, vec!["north", "south"]);
        assert_eq!(cfg.monitor.bt_sensors.len(), 4);
        assert_eq!(cfg.monitor.max_rssi_diff, 7.5);
        assert_eq!(cfg.monitor.fingerprint_policy, FingerprintPolicy::Rebuild);
        assert_eq!(cfg.monitor.bt_exclusion, ExclusionStrategy::PerEmitter);
    }

    #[test]
    fn config_load_rejects_invalid_roster() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(b"monitor:\n  bt_sensors: []\n").unwrap();
        let path = temp.into_temp_path();
        let err = ServiceConfig::load(&path).unwrap_err();
        assert!(format!("{err:#}").contains("roster is empty"));
    }
}
