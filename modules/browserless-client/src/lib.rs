pub mod error;

pub use error::{BrowserlessError, Result};

use std::time::Duration;

use tracing::debug;

/// How long the remote browser session may spend reaching network idle.
const RENDER_TIMEOUT_MS: u64 = 80_000;

/// Client-side cap on the whole request; must outlast the render budget.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(90);

pub struct BrowserlessClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl BrowserlessClient {
    pub fn new(base_url: &str, token: Option<&str>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.map(String::from),
        }
    }

    /// Fetch fully-rendered HTML for a URL via the Browserless /content
    /// endpoint. The session navigates, waits for network idle, and
    /// returns the rendered markup.
    pub async fn content(&self, url: &str) -> Result<String> {
        let endpoint = format!("{}/content", self.base_url);

        let body = serde_json::json!({
            "url": url,
            "gotoOptions": {
                "waitUntil": "networkidle2",
                "timeout": RENDER_TIMEOUT_MS,
            },
        });

        debug!(url, "Browserless content request");

        let mut request = self.client.post(&endpoint).json(&body);
        if let Some(ref token) = self.token {
            request = request.query(&[("token", token)]);
        }

        let resp = request.send().await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(BrowserlessError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(resp.text().await?)
    }
}
