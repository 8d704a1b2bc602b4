use crate::processing::ring_buffer::SignalStore;
use crate::scan::ScanReport;
use chrono::{DateTime, Utc};

/// Age of a report in whole seconds. Both instants are floored to the second
/// before subtracting, so a report can look up to one second younger than it
/// really is.
pub fn age_secs(now: DateTime<Utc>, received_at: DateTime<Utc>) -> i64 {
    now.timestamp() - received_at.timestamp()
}

/// Reports from `store` whose age is strictly below `max_age_secs`, oldest
/// first. The store itself is left untouched.
pub fn recent(store: &SignalStore, now: DateTime<Utc>, max_age_secs: i64) -> Vec<ScanReport> {
    store
        .iter()
        .filter(|report| age_secs(now, report.received_at) < max_age_secs)
        .cloned()
        .collect()
}
