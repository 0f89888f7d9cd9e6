//! Pipeline orchestration: discovery and summarization flows.
//!
//! Every component failure is absorbed here, at the narrowest scope that can
//! contain it. A bad URL drops out of the batch; a bad search degrades to an
//! empty candidate list; a cache outage costs a redundant summarization. The
//! caller always gets a response. Absorbed failures funnel through one
//! on-error hook that logs and alerts uniformly.

use std::collections::HashSet;

use futures::{stream, StreamExt};
use serde::Serialize;
use tracing::{info, warn};

use pagebrief_common::{
    classify, CandidateUrl, ChatTurn, ContentKind, PageContent, PipelineError, QualityReject,
    SummaryRecord,
};

use crate::alert::AlertSink;
use crate::cache::SummaryCache;
use crate::fetch::PageFetcher;
use crate::rephrase::{QueryRephraser, RephraseOutcome};
use crate::retrieve::WebSearcher;
use crate::summarize::Summarizer;
use crate::{clean, discussion};

/// Business cap on discovery results. Bounds downstream fetch/LLM cost per
/// request; unrelated to the fan-out concurrency limit.
pub const MAX_CANDIDATES: usize = 5;

/// One incoming request, already validated by the HTTP layer.
#[derive(Debug, Clone)]
pub enum PipelineRequest {
    /// Turn a query (plus chat history) into a filtered URL list.
    Discover {
        query: String,
        history: Vec<ChatTurn>,
    },
    /// Summarize an explicit URL list.
    Summarize { urls: Vec<String> },
}

/// What a request produces. Serialized as-is into the response body.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum PipelineOutput {
    Urls { urls: Vec<String> },
    Summaries(Vec<SummaryRecord>),
}

pub struct Pipeline {
    rephraser: Box<dyn QueryRephraser>,
    searcher: Box<dyn WebSearcher>,
    fetcher: Box<dyn PageFetcher>,
    summarizer: Box<dyn Summarizer>,
    cache: Box<dyn SummaryCache>,
    alerts: Box<dyn AlertSink>,
    concurrency: usize,
}

impl Pipeline {
    pub fn new(
        rephraser: Box<dyn QueryRephraser>,
        searcher: Box<dyn WebSearcher>,
        fetcher: Box<dyn PageFetcher>,
        summarizer: Box<dyn Summarizer>,
        cache: Box<dyn SummaryCache>,
        alerts: Box<dyn AlertSink>,
        concurrency: usize,
    ) -> Self {
        Self {
            rephraser,
            searcher,
            fetcher,
            summarizer,
            cache,
            alerts,
            concurrency: concurrency.max(1),
        }
    }

    /// Run one request to completion. Infallible by design: failures are
    /// absorbed into partial (possibly empty) results.
    pub async fn run(&self, request: PipelineRequest) -> PipelineOutput {
        match request {
            PipelineRequest::Discover { query, history } => self.discover(&query, &history).await,
            PipelineRequest::Summarize { urls } => self.summarize_batch(&urls).await,
        }
    }

    async fn discover(&self, query: &str, history: &[ChatTurn]) -> PipelineOutput {
        info!(query, "Discovery request");

        let question = match self.rephraser.rephrase(query, history).await {
            Ok(RephraseOutcome::Question(q)) => q,
            Ok(RephraseOutcome::NotNeeded) => {
                info!(query, "No search warranted for this turn");
                return PipelineOutput::Urls { urls: Vec::new() };
            }
            Ok(RephraseOutcome::Links { links, .. }) => {
                info!(query, count = links.len(), "Query carried explicit links");
                return PipelineOutput::Urls {
                    urls: filter_urls(links.iter().map(String::as_str)),
                };
            }
            Err(e) => {
                warn!(query, error = %e, "Rephrase failed, searching with the raw query");
                query.to_string()
            }
        };

        let candidates = match self.searcher.search(&question).await {
            Ok(candidates) => candidates,
            Err(e) => {
                self.report(query, &PipelineError::Retrieval(e)).await;
                Vec::new()
            }
        };

        let urls = filter_candidates(&candidates);
        info!(
            candidates = candidates.len(),
            selected = urls.len(),
            "Discovery complete"
        );
        PipelineOutput::Urls { urls }
    }

    async fn summarize_batch(&self, urls: &[String]) -> PipelineOutput {
        info!(count = urls.len(), "Summarization request");

        // Futures are built eagerly into a Vec so the mapping closure does
        // not become part of the batch future's type; the closure tripped
        // rustc's higher-ranked lifetime check when the handler future was
        // proven Send. buffer_unordered still bounds actual concurrency.
        let jobs: Vec<_> = urls.iter().map(|url| self.summarize_url(url)).collect();
        let results: Vec<Option<SummaryRecord>> = stream::iter(jobs)
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        let records: Vec<SummaryRecord> = results.into_iter().flatten().collect();
        info!(
            requested = urls.len(),
            produced = records.len(),
            "Summarization complete"
        );
        PipelineOutput::Summaries(records)
    }

    /// Drive one URL through classify → cache → fetch → extract → summarize
    /// → store. Returns `None` when the URL drops out; the reason has
    /// already been logged and, where warranted, alerted.
    async fn summarize_url(&self, url: &str) -> Option<SummaryRecord> {
        let kind = classify(url);
        if kind == ContentKind::SocialMedia {
            info!(url, "Skipping social media URL");
            return None;
        }

        // A lookup failure degrades to a miss.
        match self.cache.lookup(url).await {
            Ok(Some(record)) => {
                info!(url, "Cache hit");
                return Some(record);
            }
            Ok(None) => {}
            Err(e) => {
                self.report(url, &PipelineError::Cache(e)).await;
            }
        }

        let html = match self.fetcher.render(url).await {
            Ok(html) => html,
            Err(e) => {
                self.report(url, &PipelineError::Fetch(e)).await;
                return None;
            }
        };

        let content = match extract_content(kind, &html) {
            Ok(content) => content,
            Err(reject) => {
                info!(url, reason = %reject, "Content rejected by quality gate");
                return None;
            }
        };

        let outcome = match self.summarizer.summarize(url, kind, &content).await {
            Ok(outcome) => outcome,
            Err(e) => {
                self.report(url, &PipelineError::Summarize(e)).await;
                return None;
            }
        };

        // The summary is still served if only durability was lost.
        if let Err(e) = self
            .cache
            .store(url, &outcome.envelope, content.word_count)
            .await
        {
            self.report(url, &PipelineError::Cache(e)).await;
        }

        Some(outcome.record)
    }

    /// The single on-error hook: log, then alert, for every absorbed
    /// failure. `context` is the URL, or the query for batch-level search
    /// failures.
    async fn report(&self, context: &str, error: &PipelineError) {
        warn!(context, error = %error, "Pipeline step failed");
        let text = match error {
            PipelineError::Retrieval(_) => format!("*Error - websearch * \n Title : {context}"),
            PipelineError::Fetch(_) => format!("*Error - Fetch page content * \n URL : {context}"),
            PipelineError::Summarize(_) => format!("*Error - AI Summary* \n URL : {context}"),
            PipelineError::Cache(_) => format!("*Error - DB* \n URL : {context}"),
        };
        self.alerts.notify(&text).await;
    }
}

/// Kind-appropriate extraction of summarizable text from rendered markup.
fn extract_content(kind: ContentKind, html: &str) -> Result<PageContent, QualityReject> {
    match kind {
        ContentKind::DiscussionPost => discussion::extract(html),
        ContentKind::Generic | ContentKind::SocialMedia => {
            let content = clean::condense(html);
            if content.is_empty() {
                Err(QualityReject::NoText)
            } else {
                Ok(content)
            }
        }
    }
}

/// Drop social-media domains, deduplicate by exact URL string, and cap at
/// [`MAX_CANDIDATES`]. Input order is preserved; no re-ranking.
pub fn filter_urls<'a, I>(urls: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for url in urls {
        if classify(url) == ContentKind::SocialMedia {
            continue;
        }
        if !seen.insert(url.to_string()) {
            continue;
        }
        out.push(url.to_string());
        if out.len() == MAX_CANDIDATES {
            break;
        }
    }
    out
}

/// [`filter_urls`] over retriever candidates.
pub fn filter_candidates(candidates: &[CandidateUrl]) -> Vec<String> {
    filter_urls(candidates.iter().map(|c| c.url.as_str()))
}
