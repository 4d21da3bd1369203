use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use coordinator::Notifier;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, instrument};

#[derive(Debug, Serialize)]
struct WebhookBody<'a> {
    text: &'a str,
}

/// Posts `{"text": message}` to a chat-style incoming webhook.
#[derive(Clone)]
pub struct WebhookNotifier {
    http: Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>) -> Result<Self, reqwest::Error> {
        let http = Client::builder().timeout(Duration::from_secs(10)).build()?;
        Ok(Self {
            http,
            url: url.into(),
        })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    #[instrument(skip_all, level = "debug")]
    async fn send(&self, message: &str) -> anyhow::Result<()> {
        self.http
            .post(&self.url)
            .json(&WebhookBody { text: message })
            .send()
            .await
            .context("webhook request failed")?
            .error_for_status()
            .context("webhook rejected alert")?;

        debug!("webhook accepted alert");
        Ok(())
    }
}
