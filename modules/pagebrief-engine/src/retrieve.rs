//! Candidate retrieval. Wraps the metasearch backend behind a small trait so
//! the pipeline (and its tests) never talk HTTP directly.

use async_trait::async_trait;
use tracing::info;

use pagebrief_common::{CandidateUrl, RetrievalError, RetrievalResult};
use searxng_client::{SearxngClient, SearxngError};

#[async_trait]
pub trait WebSearcher: Send + Sync {
    /// Run one search and return candidates in the backend's ranking order.
    /// Zero candidates is a valid outcome, not an error.
    async fn search(&self, query: &str) -> RetrievalResult<Vec<CandidateUrl>>;
}

pub struct SearxngSearcher {
    client: SearxngClient,
    language: String,
}

impl SearxngSearcher {
    pub fn new(base_url: &str, language: &str) -> Self {
        Self {
            client: SearxngClient::new(base_url),
            language: language.to_string(),
        }
    }
}

#[async_trait]
impl WebSearcher for SearxngSearcher {
    async fn search(&self, query: &str) -> RetrievalResult<Vec<CandidateUrl>> {
        let hits = self
            .client
            .search(query, &self.language)
            .await
            .map_err(|e| match e {
                SearxngError::Decode(message) => RetrievalError::Malformed(message),
                other => RetrievalError::Backend(other.to_string()),
            })?;

        let candidates: Vec<CandidateUrl> = hits
            .into_iter()
            .filter(|hit| !hit.url.is_empty())
            .map(|hit| {
                let candidate = CandidateUrl::new(hit.url, hit.title);
                match hit.img_src {
                    Some(img) if !img.is_empty() => candidate.with_image(img),
                    _ => candidate,
                }
            })
            .collect();

        info!(query, count = candidates.len(), "Search complete");
        Ok(candidates)
    }
}
