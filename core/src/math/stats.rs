pub struct StatsHelper;

impl StatsHelper {
    /// Arithmetic mean of RSSI readings, `None` for an empty slice.
    pub fn mean(samples: &[i32]) -> Option<f64> {
        if samples.is_empty() {
            return None;
        }
        let sum: i64 = samples.iter().map(|&v| i64::from(v)).sum();
        Some(sum as f64 / samples.len() as f64)
    }
}
