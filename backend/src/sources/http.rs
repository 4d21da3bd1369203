use std::time::Duration;

use async_trait::async_trait;
use monitor::{FetchError, MetricSource, Sample};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, instrument};

/// Body of `GET {base}/{entity}`.
#[derive(Debug, Deserialize)]
pub struct MetricPayload {
    pub value: Option<f64>,
    #[serde(default)]
    pub long_usd: Option<f64>,
    #[serde(default)]
    pub short_usd: Option<f64>,
}

impl MetricPayload {
    /// A long/short pair wins over `value`; neither present means no data.
    pub fn into_sample(self) -> Option<Sample> {
        match (self.long_usd, self.short_usd) {
            (Some(long), Some(short)) => Some(Sample::split(long, short)),
            _ => self.value.map(Sample::value),
        }
    }
}

/// Generic JSON metric source. One instance per monitor.
#[derive(Clone)]
pub struct HttpMetricSource {
    http: Client,
    base_url: String,
}

impl HttpMetricSource {
    /// `timeout` bounds the whole request.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = Client::builder()
            .timeout(timeout)
            .pool_idle_timeout(Duration::from_secs(30))
            .tcp_keepalive(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn url_for(&self, entity_id: &str) -> String {
        format!("{}/{}", self.base_url, entity_id)
    }
}

fn map_reqwest(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Transport(format!("request timed out: {e}"))
    } else if e.is_decode() {
        FetchError::InvalidResponse(e.to_string())
    } else {
        FetchError::Transport(e.to_string())
    }
}

#[async_trait]
impl MetricSource for HttpMetricSource {
    #[instrument(skip(self), fields(entity = %entity_id), level = "debug")]
    async fn fetch(&self, entity_id: &str) -> Result<Option<Sample>, FetchError> {
        let url = self.url_for(entity_id);

        let resp = self.http.get(&url).send().await.map_err(map_reqwest)?;

        if resp.status() == StatusCode::NOT_FOUND {
            debug!("source has no data for entity");
            return Ok(None);
        }

        let resp = resp.error_for_status().map_err(map_reqwest)?;
        let payload: MetricPayload = resp.json().await.map_err(map_reqwest)?;

        let sample = payload.into_sample();
        if let Some(s) = &sample {
            if !s.value.is_finite() {
                return Err(FetchError::InvalidResponse(format!(
                    "non-finite value {}",
                    s.value
                )));
            }
        }

        debug!(?sample, "metric fetched");
        Ok(sample)
    }
}
