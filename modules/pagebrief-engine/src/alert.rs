//! Outbound failure alerting. Fire-and-forget by contract: a failed alert
//! delivery is logged and dropped, never propagated.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

const SLACK_API_URL: &str = "https://slack.com/api/chat.postMessage";

#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn notify(&self, text: &str);
}

// --- Slack ---

pub struct SlackAlerter {
    client: reqwest::Client,
    token: String,
    channel: String,
}

#[derive(Debug, Deserialize)]
struct SlackResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

impl SlackAlerter {
    pub fn new(token: &str, channel: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            token: token.to_string(),
            channel: channel.to_string(),
        }
    }
}

#[async_trait]
impl AlertSink for SlackAlerter {
    async fn notify(&self, text: &str) {
        let body = serde_json::json!({
            "channel": self.channel,
            "text": text,
        });

        let result = self
            .client
            .post(SLACK_API_URL)
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await;

        match result {
            Ok(resp) => match resp.json::<SlackResponse>().await {
                Ok(slack) if slack.ok => {}
                Ok(slack) => {
                    warn!(error = ?slack.error, "Slack alert rejected");
                }
                Err(e) => {
                    warn!(error = %e, "Unreadable Slack response");
                }
            },
            Err(e) => {
                warn!(error = %e, "Failed to deliver Slack alert");
            }
        }
    }
}

// --- No-op sink for tests and alert-disabled deployments ---

pub struct NoopAlerter;

#[async_trait]
impl AlertSink for NoopAlerter {
    async fn notify(&self, text: &str) {
        debug!(text, "Alert (noop)");
    }
}
