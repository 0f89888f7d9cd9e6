pub mod error;

pub use error::{Result, SearxngError};

use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

/// One hit from the SearXNG result list, in engine ranking order.
#[derive(Debug, Clone, Deserialize)]
pub struct SearxngResult {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub img_src: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearxngResponse {
    #[serde(default)]
    results: Vec<SearxngResult>,
}

pub struct SearxngClient {
    client: reqwest::Client,
    base_url: String,
}

impl SearxngClient {
    pub fn new(base_url: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Run a search restricted to a language. Results come back in the
    /// backend's own ranking order; no pagination.
    pub async fn search(&self, query: &str, language: &str) -> Result<Vec<SearxngResult>> {
        let endpoint = format!("{}/search", self.base_url);

        debug!(query, language, "SearXNG search request");

        let resp = self
            .client
            .get(&endpoint)
            .query(&[("q", query), ("format", "json"), ("language", language)])
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(SearxngError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: SearxngResponse = resp
            .json()
            .await
            .map_err(|e| SearxngError::Decode(e.to_string()))?;

        Ok(body.results)
    }
}
