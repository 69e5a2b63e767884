//! Discord webhook notifications

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use crate::error::{OutreachError, OutreachResult};
use crate::traits::Notifier;

/// Posts plain messages to a Discord webhook
pub struct DiscordNotifier {
    webhook_url: String,
    client: reqwest::Client,
}

impl DiscordNotifier {
    pub fn new(webhook_url: impl Into<String>) -> OutreachResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| OutreachError::config("DISCORD_WEBHOOK_URL", e.to_string()))?;

        Ok(Self {
            webhook_url: webhook_url.into(),
            client,
        })
    }

    /// Build a notifier only when a webhook URL is configured
    pub fn from_url(webhook_url: Option<String>) -> OutreachResult<Option<Self>> {
        match webhook_url.filter(|url| !url.trim().is_empty()) {
            Some(url) => Ok(Some(Self::new(url)?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    async fn notify(&self, message: &str) -> OutreachResult<()> {
        let response = self
            .client
            .post(&self.webhook_url)
            .json(&json!({ "content": message }))
            .send()
            .await
            .map_err(|e| OutreachError::Notification { message: e.to_string() })?;

        if !response.status().is_success() {
            return Err(OutreachError::Notification {
                message: format!("webhook responded with status {}", response.status()),
            });
        }

        Ok(())
    }
}
