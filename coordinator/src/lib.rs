//! Cross-monitor correlation: buffers spike signals per entity, scores them,
//! dedupes alert-worthy correlations and hands them to a notifier task.

pub mod buffer;
pub mod config;
pub mod coordinator;
pub mod correlation;
pub mod counters;
pub mod dedup;
pub mod dispatch;
pub mod error;
pub mod status;

pub use config::CoordinatorConfig;
pub use coordinator::{SpikeCoordinator, SweepReport};
pub use correlation::{complementary_bonus, correlate, direction_of};
pub use counters::Counters;
pub use dispatch::{AlertDispatcher, AlertEvent, Notifier, alert_channel, render_alert};
pub use error::{CoordinatorError, DispatchError};
pub use status::CoordinatorStatus;
