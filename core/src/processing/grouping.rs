use crate::math::stats::StatsHelper;
use crate::scan::ScanReport;
use std::collections::BTreeMap;

/// Sensor id → emitter id → RSSI readings inside the current window.
pub type SensorGroups = BTreeMap<String, BTreeMap<String, Vec<i32>>>;

/// Sensor id → emitter id → mean RSSI inside the current window.
pub type SensorAverages = BTreeMap<String, BTreeMap<String, f64>>;

/// Partitions windowed reports by (sensor, emitter).
///
/// Every roster sensor gets an entry, even when it reported nothing. Reports
/// from sensors outside the roster are dropped.
pub fn group_by_sensor<'a, I>(reports: I, roster: &[String]) -> SensorGroups
where
    I: IntoIterator<Item = &'a ScanReport>,
{
    let mut groups: SensorGroups = roster
        .iter()
        .map(|sensor| (sensor.clone(), BTreeMap::new()))
        .collect();

    for report in reports {
        if let Some(per_emitter) = groups.get_mut(&report.sensor_id) {
            per_emitter
                .entry(report.emitter_id.clone())
                .or_default()
                .push(report.rssi);
        }
    }

    groups
}

/// Reduces each group to its arithmetic mean. Emitters without readings are
/// left out rather than reported as zero.
pub fn average(groups: &SensorGroups) -> SensorAverages {
    groups
        .iter()
        .map(|(sensor, per_emitter)| {
            let means = per_emitter
                .iter()
                .filter_map(|(emitter, readings)| {
                    StatsHelper::mean(readings).map(|mean| (emitter.clone(), mean))
                })
                .collect();
            (sensor.clone(), means)
        })
        .collect()
}
