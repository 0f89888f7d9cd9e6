//! Acquisition → extraction → cache → summarize pipeline.
//!
//! Given a query or a URL list, the engine finds candidate pages, renders
//! them, strips boilerplate, and produces durable URL-keyed summaries. Each
//! stage sits behind a trait (search, render, summarize, cache, alert) so
//! deployments can swap backends and tests can swap fakes without touching
//! the orchestration.

pub mod alert;
pub mod cache;
pub mod clean;
pub mod discussion;
pub mod fetch;
pub mod pipeline;
pub mod rephrase;
pub mod retrieve;
pub mod summarize;

pub use alert::{AlertSink, NoopAlerter, SlackAlerter};
pub use cache::{PgSummaryCache, SummaryCache};
pub use fetch::{BrowserlessFetcher, ChromeFetcher, PageFetcher};
pub use pipeline::{
    filter_candidates, filter_urls, Pipeline, PipelineOutput, PipelineRequest, MAX_CANDIDATES,
};
pub use rephrase::{LlmRephraser, QueryRephraser, RephraseOutcome};
pub use retrieve::{SearxngSearcher, WebSearcher};
pub use summarize::{prompt_for, route, Backend, LlmSummarizer, Summarizer, SummaryOutcome};
