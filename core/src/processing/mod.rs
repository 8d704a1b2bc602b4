pub mod fingerprint;
pub mod grouping;
pub mod matcher;
pub mod ring_buffer;
pub mod window;

pub use fingerprint::Fingerprint;
pub use grouping::{average, group_by_sensor, SensorAverages, SensorGroups};
pub use matcher::BaselineMatcher;
pub use ring_buffer::SignalStore;
pub use window::recent;
