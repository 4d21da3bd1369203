pub mod models;
pub mod sink;

pub use models::{
    Confidence, CorrelatedSpike, Direction, MetricReading, Severity, SignalDetail,
    SignalMetadata, SignalType, SpikeSignal, VolumeSplit,
};
pub use sink::SignalSink;
