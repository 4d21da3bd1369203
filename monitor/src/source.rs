use async_trait::async_trait;
use corelib::VolumeSplit;

use crate::error::FetchError;

/// Raw value returned by a [`MetricSource`] for one entity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub value: f64,
    pub split: Option<VolumeSplit>,
}

impl Sample {
    pub fn value(value: f64) -> Self {
        Self { value, split: None }
    }

    /// Two-sided sample; the value is the summed volume.
    pub fn split(long: f64, short: f64) -> Self {
        let split = VolumeSplit::new(long, short);
        Self {
            value: split.total(),
            split: Some(split),
        }
    }
}

/// Per-entity numeric reading provider.
///
/// `Ok(None)` means the provider has no data for the entity right now; the
/// entity is skipped for this tick without being treated as a failure.
#[async_trait]
pub trait MetricSource: Send + Sync + 'static {
    async fn fetch(&self, entity_id: &str) -> Result<Option<Sample>, FetchError>;
}
