pub mod batch;
pub mod report;

pub use batch::{ScanBatch, StampedBatch};
pub use report::{BleSighting, ScanReport, WifiSighting};
