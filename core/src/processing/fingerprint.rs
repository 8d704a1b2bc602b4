use crate::processing::grouping::SensorAverages;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-emitter signal fingerprint: emitter id → sensor id → mean RSSI.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct Fingerprint {
    emitters: BTreeMap<String, BTreeMap<String, f64>>,
}

impl Fingerprint {
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes every (sensor, emitter, mean) triple of `averages` into the
    /// table. Cells not touched by `averages` keep their previous value.
    pub fn assemble(&mut self, averages: &SensorAverages) {
        for (sensor, per_emitter) in averages {
            for (emitter, &mean) in per_emitter {
                self.emitters
                    .entry(emitter.clone())
                    .or_default()
                    .insert(sensor.clone(), mean);
            }
        }
    }

    pub fn clear(&mut self) {
        self.emitters.clear();
    }

    pub fn get(&self, emitter: &str) -> Option<&BTreeMap<String, f64>> {
        self.emitters.get(emitter)
    }

    pub fn reading(&self, emitter: &str, sensor: &str) -> Option<f64> {
        self.emitters.get(emitter)?.get(sensor).copied()
    }

    pub fn len(&self) -> usize {
        self.emitters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.emitters.is_empty()
    }
}
