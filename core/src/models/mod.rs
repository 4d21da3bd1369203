//! Shared data model for monitors and the coordinator.

mod correlation;
mod reading;
mod signal;

pub use correlation::{Confidence, CorrelatedSpike, Direction};
pub use reading::{MetricReading, VolumeSplit};
pub use signal::{Severity, SignalDetail, SignalMetadata, SignalType, SpikeSignal};
