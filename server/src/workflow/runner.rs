use crate::generator::scenario::ScenarioGenerator;
use anyhow::{anyhow, Context};
use chrono::{DateTime, Duration, Utc};
use rssicore::monitor::MonitorStatus;
use rssicore::{Monitor, PerKind};
use std::sync::Arc;

#[derive(Debug)]
pub struct ReplayResult {
    pub cycles: usize,
    pub excluded: PerKind<Vec<String>>,
    pub status: MonitorStatus,
}

/// Replays generated sensor uploads through a monitor, installing the watch
/// list part-way so that later drift shows up as exclusions.
#[derive(Clone)]
pub struct Runner {
    monitor: Arc<Monitor>,
}

impl Runner {
    pub fn new(monitor: Arc<Monitor>) -> Self {
        Self { monitor }
    }

    pub fn execute(
        &self,
        generator: &mut ScenarioGenerator,
        cycles: usize,
        start: DateTime<Utc>,
    ) -> anyhow::Result<ReplayResult> {
        let interval = generator.config().interval_secs.max(1);
        let watch_after = generator.config().watch_after;

        for cycle in 0..cycles {
            let now = Self::cycle_time(start, interval, cycle)?;
            let batch = generator.next_batch(cycle);
            self.monitor
                .ingest(&batch, now)
                .with_context(|| format!("ingesting replay cycle {cycle}"))?;

            if cycle + 1 == watch_after {
                let config = generator.config();
                self.monitor
                    .set_watch_list(config.wifi_emitters.clone(), config.ble_emitters.clone());
            }
        }

        Ok(ReplayResult {
            cycles,
            excluded: self.monitor.excluded_devices(),
            status: self.monitor.status(),
        })
    }

    fn cycle_time(
        start: DateTime<Utc>,
        interval: i64,
        cycle: usize,
    ) -> anyhow::Result<DateTime<Utc>> {
        i64::try_from(cycle)
            .ok()
            .and_then(|cycle| interval.checked_mul(cycle))
            .and_then(Duration::try_seconds)
            .and_then(|offset| start.checked_add_signed(offset))
            .ok_or_else(|| {
                anyhow!("replay cycle {cycle} at {interval}s intervals overflows the clock")
            })
    }
}
