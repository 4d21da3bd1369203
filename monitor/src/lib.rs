//! Generic spike monitor: polls a metric source per entity, keeps a bounded
//! history, and forwards threshold crossings to a [`corelib::SignalSink`].

pub mod config;
pub mod control;
pub mod engine;
pub mod error;
pub mod history;
pub mod rules;
pub mod source;
pub mod status;

pub use config::{CombineMode, MonitorConfig};
pub use control::MonitorHandle;
pub use engine::{SpikeMonitor, TickReport};
pub use error::{FetchError, MonitorError};
pub use history::EntityHistory;
pub use rules::{
    Measurement, SpikeRule, ThresholdMode, liquidation::LiquidationRule, price::PriceRule,
    social::SocialRule,
};
pub use source::{MetricSource, Sample};
pub use status::MonitorStatus;

pub type PriceMonitor<S> = SpikeMonitor<S, PriceRule>;
pub type LiquidationMonitor<S> = SpikeMonitor<S, LiquidationRule>;
pub type SocialMonitor<S> = SpikeMonitor<S, SocialRule>;
