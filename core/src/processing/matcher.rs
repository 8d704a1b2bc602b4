use crate::prelude::ExclusionStrategy;
use crate::processing::fingerprint::Fingerprint;
use std::collections::{BTreeMap, BTreeSet};

/// Compares live fingerprints of watched emitters against a frozen baseline.
///
/// Each (emitter, sensor) cell present in both fingerprints contributes one
/// mismatch when it moved by more than `max_rssi_diff`, however large the
/// move. Cells missing on either side contribute nothing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BaselineMatcher {
    pub max_rssi_diff: f64,
    pub exclude_threshold: usize,
}

impl BaselineMatcher {
    pub fn new(max_rssi_diff: f64, exclude_threshold: usize) -> Self {
        Self {
            max_rssi_diff,
            exclude_threshold,
        }
    }

    /// Mismatch counts keyed by emitter or by sensor, depending on `strategy`.
    pub fn mismatches(
        &self,
        watched: &BTreeSet<String>,
        live: &Fingerprint,
        baseline: &Fingerprint,
        strategy: ExclusionStrategy,
    ) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();

        for emitter in watched {
            let (Some(live_axes), Some(reference_axes)) = (live.get(emitter), baseline.get(emitter))
            else {
                continue;
            };
            for (sensor, &current) in live_axes {
                let Some(&reference) = reference_axes.get(sensor) else {
                    continue;
                };
                if (reference - current).abs() > self.max_rssi_diff {
                    let key = match strategy {
                        ExclusionStrategy::PerEmitter => emitter,
                        ExclusionStrategy::PerSensorAxis => sensor,
                    };
                    *counts.entry(key.clone()).or_insert(0) += 1;
                }
            }
        }

        counts
    }

    /// Keys whose mismatch count reached the exclusion threshold.
    pub fn excluded(
        &self,
        watched: &BTreeSet<String>,
        live: &Fingerprint,
        baseline: &Fingerprint,
        strategy: ExclusionStrategy,
    ) -> Vec<String> {
        self.mismatches(watched, live, baseline, strategy)
            .into_iter()
            .filter(|&(_, count)| count >= self.exclude_threshold)
            .map(|(key, _)| key)
            .collect()
    }
}

impl Default for BaselineMatcher {
    fn default() -> Self {
        Self::new(5.0, 2)
    }
}
