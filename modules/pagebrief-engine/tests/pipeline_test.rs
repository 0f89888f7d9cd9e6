//! Integration tests for the pipeline orchestrator: failure isolation,
//! cache idempotence, discovery filtering, and the on-error hook. All
//! backends are in-memory fakes; the real cleaner and discussion extractor
//! run against fixture markup.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use llm_client::openai::{Choice, OpenAiUsage};
use llm_client::{ChatCompletion, ChatMessage, Envelope, Role};
use pagebrief_common::{
    CacheError, CacheResult, CandidateUrl, ChatTurn, ContentKind, FetchError, FetchResult,
    PageContent, RetrievalError, RetrievalResult, SummarizeError, SummarizeResult, SummaryRecord,
    TokenUsage,
};
use pagebrief_engine::{
    AlertSink, PageFetcher, Pipeline, PipelineOutput, PipelineRequest, QueryRephraser,
    RephraseOutcome, SummaryCache, SummaryOutcome, Summarizer, WebSearcher, MAX_CANDIDATES,
};

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

struct StubRephraser {
    outcome: Option<RephraseOutcome>,
    queries: Arc<Mutex<Vec<String>>>,
}

impl StubRephraser {
    fn question(q: &str) -> Self {
        Self {
            outcome: Some(RephraseOutcome::Question(q.to_string())),
            queries: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn fixed(outcome: RephraseOutcome) -> Self {
        Self {
            outcome: Some(outcome),
            queries: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn failing() -> Self {
        Self {
            outcome: None,
            queries: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl QueryRephraser for StubRephraser {
    async fn rephrase(
        &self,
        query: &str,
        _history: &[ChatTurn],
    ) -> anyhow::Result<RephraseOutcome> {
        self.queries.lock().unwrap().push(query.to_string());
        self.outcome
            .clone()
            .ok_or_else(|| anyhow::anyhow!("rephrase backend down"))
    }
}

struct StubSearcher {
    candidates: Vec<CandidateUrl>,
    fail: bool,
    queries: Arc<Mutex<Vec<String>>>,
}

impl StubSearcher {
    fn returning(candidates: Vec<CandidateUrl>) -> Self {
        Self {
            candidates,
            fail: false,
            queries: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn failing() -> Self {
        Self {
            candidates: Vec::new(),
            fail: true,
            queries: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl WebSearcher for StubSearcher {
    async fn search(&self, query: &str) -> RetrievalResult<Vec<CandidateUrl>> {
        self.queries.lock().unwrap().push(query.to_string());
        if self.fail {
            return Err(RetrievalError::Backend("connection refused".to_string()));
        }
        Ok(self.candidates.clone())
    }
}

/// Serves canned HTML per URL; unknown URLs and `None` entries fail.
struct RecordingFetcher {
    pages: HashMap<String, Option<String>>,
    calls: Arc<AtomicUsize>,
}

impl RecordingFetcher {
    fn new(pages: HashMap<String, Option<String>>) -> Self {
        Self {
            pages,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl PageFetcher for RecordingFetcher {
    async fn render(&self, url: &str) -> FetchResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.pages.get(url) {
            Some(Some(html)) => Ok(html.clone()),
            _ => Err(FetchError::Navigation {
                url: url.to_string(),
                message: "connection refused".to_string(),
            }),
        }
    }

    fn name(&self) -> &str {
        "recording"
    }
}

/// Produces a fixed summary text wrapped in a real chat-completion envelope.
struct CannedSummarizer {
    text: String,
    fail: bool,
    calls: Arc<AtomicUsize>,
}

impl CannedSummarizer {
    fn returning(text: &str) -> Self {
        Self {
            text: text.to_string(),
            fail: false,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn failing() -> Self {
        Self {
            text: String::new(),
            fail: true,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl Summarizer for CannedSummarizer {
    async fn summarize(
        &self,
        url: &str,
        _kind: ContentKind,
        content: &PageContent,
    ) -> SummarizeResult<SummaryOutcome> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(SummarizeError::Provider {
                status: 500,
                message: "upstream overloaded".to_string(),
            });
        }

        let envelope = Envelope::Chat(ChatCompletion {
            id: "chatcmpl-test".to_string(),
            model: "gpt-4o-mini".to_string(),
            choices: vec![Choice {
                message: ChatMessage {
                    role: Role::Assistant,
                    content: self.text.clone(),
                },
                finish_reason: Some("stop".to_string()),
            }],
            usage: OpenAiUsage {
                prompt_tokens: 100,
                completion_tokens: 20,
                total_tokens: 120,
            },
        });

        let now = Utc::now();
        Ok(SummaryOutcome {
            record: SummaryRecord {
                url: url.to_string(),
                summary_text: self.text.clone(),
                model_id: "gpt-4o-mini".to_string(),
                token_usage: TokenUsage {
                    input_tokens: 100,
                    output_tokens: 20,
                },
                word_count: content.word_count,
                created_at: now,
                updated_at: now,
            },
            envelope,
        })
    }
}

type CacheEntry = (Envelope, usize, DateTime<Utc>, DateTime<Utc>);

/// In-memory cache that normalizes stored envelopes on lookup, mirroring
/// the Postgres implementation's read path.
#[derive(Clone)]
struct MemoryCache {
    entries: Arc<Mutex<HashMap<String, CacheEntry>>>,
    fail_lookup: bool,
    fail_store: bool,
}

impl MemoryCache {
    fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            fail_lookup: false,
            fail_store: false,
        }
    }

    fn failing_lookup() -> Self {
        Self {
            fail_lookup: true,
            ..Self::new()
        }
    }

    fn failing_store() -> Self {
        Self {
            fail_store: true,
            ..Self::new()
        }
    }
}

#[async_trait]
impl SummaryCache for MemoryCache {
    async fn lookup(&self, url: &str) -> CacheResult<Option<SummaryRecord>> {
        if self.fail_lookup {
            return Err(CacheError::Database(sqlx::Error::PoolClosed));
        }
        let entries = self.entries.lock().unwrap();
        let Some((envelope, word_count, created_at, updated_at)) = entries.get(url) else {
            return Ok(None);
        };
        let completion = envelope
            .normalize()
            .map_err(|e| CacheError::Envelope(e.to_string()))?;
        Ok(Some(SummaryRecord {
            url: url.to_string(),
            summary_text: completion.text,
            model_id: completion.model,
            token_usage: TokenUsage {
                input_tokens: completion.usage.input_tokens,
                output_tokens: completion.usage.output_tokens,
            },
            word_count: *word_count,
            created_at: *created_at,
            updated_at: *updated_at,
        }))
    }

    async fn store(&self, url: &str, envelope: &Envelope, word_count: usize) -> CacheResult<()> {
        if self.fail_store {
            return Err(CacheError::Database(sqlx::Error::PoolClosed));
        }
        let now = Utc::now();
        self.entries
            .lock()
            .unwrap()
            .insert(url.to_string(), (envelope.clone(), word_count, now, now));
        Ok(())
    }
}

struct CountingAlerts {
    messages: Arc<Mutex<Vec<String>>>,
}

impl CountingAlerts {
    fn new() -> Self {
        Self {
            messages: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl AlertSink for CountingAlerts {
    async fn notify(&self, text: &str) {
        self.messages.lock().unwrap().push(text.to_string());
    }
}

// ---------------------------------------------------------------------------
// Fixtures and helpers
// ---------------------------------------------------------------------------

/// A page whose condensed form is `## Report\n` plus `body_words` words,
/// i.e. `body_words + 2` words total.
fn headed_page(body_words: usize) -> String {
    let body = vec!["word"; body_words].join(" ");
    format!("<html><body><h2>Report</h2><p>{body}</p></body></html>")
}

fn summaries(output: PipelineOutput) -> Vec<SummaryRecord> {
    match output {
        PipelineOutput::Summaries(records) => records,
        PipelineOutput::Urls { .. } => panic!("expected summaries, got a URL list"),
    }
}

fn url_list(output: PipelineOutput) -> Vec<String> {
    match output {
        PipelineOutput::Urls { urls } => urls,
        PipelineOutput::Summaries(_) => panic!("expected a URL list, got summaries"),
    }
}

fn discover(query: &str) -> PipelineRequest {
    PipelineRequest::Discover {
        query: query.to_string(),
        history: vec![ChatTurn::human(query)],
    }
}

fn summarize(urls: &[&str]) -> PipelineRequest {
    PipelineRequest::Summarize {
        urls: urls.iter().map(|u| u.to_string()).collect(),
    }
}

// ---------------------------------------------------------------------------
// Summarization mode
// ---------------------------------------------------------------------------

#[tokio::test]
async fn one_bad_fetch_never_aborts_the_batch() {
    let pages = HashMap::from([
        ("https://a.example/1".to_string(), Some(headed_page(40))),
        ("https://b.example/2".to_string(), None), // fetch fails
        ("https://c.example/3".to_string(), Some(headed_page(40))),
    ]);
    let fetcher = RecordingFetcher::new(pages);
    let alerts = CountingAlerts::new();
    let messages = alerts.messages.clone();

    let pipeline = Pipeline::new(
        Box::new(StubRephraser::question("unused")),
        Box::new(StubSearcher::returning(Vec::new())),
        Box::new(fetcher),
        Box::new(CannedSummarizer::returning("X")),
        Box::new(MemoryCache::new()),
        Box::new(alerts),
        5,
    );

    let records = summaries(
        pipeline
            .run(summarize(&[
                "https://a.example/1",
                "https://b.example/2",
                "https://c.example/3",
            ]))
            .await,
    );

    assert_eq!(records.len(), 2);
    let messages = messages.lock().unwrap();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("*Error - Fetch page content *"));
    assert!(messages[0].contains("https://b.example/2"));
}

#[tokio::test]
async fn second_run_hits_the_cache_without_upstream_calls() {
    let url = "https://a.example/cached";
    let pages = HashMap::from([(url.to_string(), Some(headed_page(40)))]);
    let fetcher = RecordingFetcher::new(pages);
    let fetch_calls = fetcher.calls.clone();
    let summarizer = CannedSummarizer::returning("X");
    let llm_calls = summarizer.calls.clone();

    let pipeline = Pipeline::new(
        Box::new(StubRephraser::question("unused")),
        Box::new(StubSearcher::returning(Vec::new())),
        Box::new(fetcher),
        Box::new(summarizer),
        Box::new(MemoryCache::new()),
        Box::new(CountingAlerts::new()),
        5,
    );

    let first = summaries(pipeline.run(summarize(&[url])).await);
    assert_eq!(fetch_calls.load(Ordering::SeqCst), 1);
    assert_eq!(llm_calls.load(Ordering::SeqCst), 1);

    let second = summaries(pipeline.run(summarize(&[url])).await);
    assert_eq!(fetch_calls.load(Ordering::SeqCst), 1, "no second fetch");
    assert_eq!(llm_calls.load(Ordering::SeqCst), 1, "no second LLM call");

    assert_eq!(second.len(), 1);
    assert_eq!(second[0].url, first[0].url);
    assert_eq!(second[0].summary_text, first[0].summary_text);
    assert_eq!(second[0].model_id, first[0].model_id);
    assert_eq!(second[0].token_usage, first[0].token_usage);
    assert_eq!(second[0].word_count, first[0].word_count);
}

#[tokio::test]
async fn social_media_urls_are_skipped_entirely() {
    let fetcher = RecordingFetcher::new(HashMap::new());
    let fetch_calls = fetcher.calls.clone();
    let alerts = CountingAlerts::new();
    let messages = alerts.messages.clone();

    let pipeline = Pipeline::new(
        Box::new(StubRephraser::question("unused")),
        Box::new(StubSearcher::returning(Vec::new())),
        Box::new(fetcher),
        Box::new(CannedSummarizer::returning("X")),
        Box::new(MemoryCache::new()),
        Box::new(alerts),
        5,
    );

    let records = summaries(
        pipeline
            .run(summarize(&["https://twitter.com/someone/status/1"]))
            .await,
    );

    assert!(records.is_empty());
    assert_eq!(fetch_calls.load(Ordering::SeqCst), 0);
    assert!(messages.lock().unwrap().is_empty());
}

#[tokio::test]
async fn summarizes_headed_content_and_persists_it() {
    // 248 body words + "##" + "Report" = 250 words of condensed content.
    let url = "https://example.com/a";
    let pages = HashMap::from([(url.to_string(), Some(headed_page(248)))]);
    let cache = MemoryCache::new();
    let entries = cache.entries.clone();

    let pipeline = Pipeline::new(
        Box::new(StubRephraser::question("unused")),
        Box::new(StubSearcher::returning(Vec::new())),
        Box::new(RecordingFetcher::new(pages)),
        Box::new(CannedSummarizer::returning("X")),
        Box::new(cache),
        Box::new(CountingAlerts::new()),
        5,
    );

    let records = summaries(pipeline.run(summarize(&[url])).await);

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].url, url);
    assert_eq!(records[0].summary_text, "X");
    assert_eq!(records[0].word_count, 250);
    assert_eq!(records[0].model_id, "gpt-4o-mini");
    assert!(entries.lock().unwrap().contains_key(url));
}

#[tokio::test]
async fn summarizer_failure_drops_the_url_and_alerts() {
    let url = "https://a.example/1";
    let pages = HashMap::from([(url.to_string(), Some(headed_page(40)))]);
    let alerts = CountingAlerts::new();
    let messages = alerts.messages.clone();

    let pipeline = Pipeline::new(
        Box::new(StubRephraser::question("unused")),
        Box::new(StubSearcher::returning(Vec::new())),
        Box::new(RecordingFetcher::new(pages)),
        Box::new(CannedSummarizer::failing()),
        Box::new(MemoryCache::new()),
        Box::new(alerts),
        5,
    );

    let records = summaries(pipeline.run(summarize(&[url])).await);

    assert!(records.is_empty());
    let messages = messages.lock().unwrap();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("*Error - AI Summary*"));
}

#[tokio::test]
async fn cache_lookup_failure_degrades_to_a_miss() {
    let url = "https://a.example/1";
    let pages = HashMap::from([(url.to_string(), Some(headed_page(40)))]);
    let summarizer = CannedSummarizer::returning("X");
    let llm_calls = summarizer.calls.clone();
    let alerts = CountingAlerts::new();
    let messages = alerts.messages.clone();

    let pipeline = Pipeline::new(
        Box::new(StubRephraser::question("unused")),
        Box::new(StubSearcher::returning(Vec::new())),
        Box::new(RecordingFetcher::new(pages)),
        Box::new(summarizer),
        Box::new(MemoryCache::failing_lookup()),
        Box::new(alerts),
        5,
    );

    let records = summaries(pipeline.run(summarize(&[url])).await);

    // Still summarized, with a DB alert for the broken lookup.
    assert_eq!(records.len(), 1);
    assert_eq!(llm_calls.load(Ordering::SeqCst), 1);
    assert!(messages
        .lock()
        .unwrap()
        .iter()
        .any(|m| m.contains("*Error - DB*")));
}

#[tokio::test]
async fn cache_store_failure_still_serves_the_summary() {
    let url = "https://a.example/1";
    let pages = HashMap::from([(url.to_string(), Some(headed_page(40)))]);
    let alerts = CountingAlerts::new();
    let messages = alerts.messages.clone();

    let pipeline = Pipeline::new(
        Box::new(StubRephraser::question("unused")),
        Box::new(StubSearcher::returning(Vec::new())),
        Box::new(RecordingFetcher::new(pages)),
        Box::new(CannedSummarizer::returning("X")),
        Box::new(MemoryCache::failing_store()),
        Box::new(alerts),
        5,
    );

    let records = summaries(pipeline.run(summarize(&[url])).await);

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].summary_text, "X");
    assert!(messages
        .lock()
        .unwrap()
        .iter()
        .any(|m| m.contains("*Error - DB*")));
}

#[tokio::test]
async fn thin_discussion_posts_are_dropped_without_alerting() {
    let url = "https://reddit.com/r/laptops/comments/abc";
    let html = "<html><body><main>\
                <h1>A question</h1>\
                <div class=\"text-neutral-content\">too thin</div>\
                </main></body></html>";
    let pages = HashMap::from([(url.to_string(), Some(html.to_string()))]);
    let summarizer = CannedSummarizer::returning("X");
    let llm_calls = summarizer.calls.clone();
    let alerts = CountingAlerts::new();
    let messages = alerts.messages.clone();

    let pipeline = Pipeline::new(
        Box::new(StubRephraser::question("unused")),
        Box::new(StubSearcher::returning(Vec::new())),
        Box::new(RecordingFetcher::new(pages)),
        Box::new(summarizer),
        Box::new(MemoryCache::new()),
        Box::new(alerts),
        5,
    );

    let records = summaries(pipeline.run(summarize(&[url])).await);

    // A quality gate is not an error: no record, no LLM spend, no alert.
    assert!(records.is_empty());
    assert_eq!(llm_calls.load(Ordering::SeqCst), 0);
    assert!(messages.lock().unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// Discovery mode
// ---------------------------------------------------------------------------

#[tokio::test]
async fn discovery_filters_caps_and_preserves_order() {
    let candidates = vec![
        CandidateUrl::new("https://alpha.example/post", "Alpha"),
        CandidateUrl::new("https://twitter.com/u/status/9", "Tweet"),
        CandidateUrl::new("https://beta.example/article", "Beta"),
        CandidateUrl::new("https://alpha.example/post", "Alpha again"),
        CandidateUrl::new("https://gamma.example/read", "Gamma"),
        CandidateUrl::new("https://delta.example/piece", "Delta"),
        CandidateUrl::new("https://epsilon.example/page", "Epsilon"),
        CandidateUrl::new("https://zeta.example/entry", "Zeta"),
    ];

    let pipeline = Pipeline::new(
        Box::new(StubRephraser::question("best linux laptops")),
        Box::new(StubSearcher::returning(candidates)),
        Box::new(RecordingFetcher::new(HashMap::new())),
        Box::new(CannedSummarizer::returning("X")),
        Box::new(MemoryCache::new()),
        Box::new(CountingAlerts::new()),
        5,
    );

    let urls = url_list(pipeline.run(discover("best laptops?")).await);

    assert_eq!(urls.len(), MAX_CANDIDATES);
    assert_eq!(
        urls,
        vec![
            "https://alpha.example/post",
            "https://beta.example/article",
            "https://gamma.example/read",
            "https://delta.example/piece",
            "https://epsilon.example/page",
        ]
    );
}

#[tokio::test]
async fn discovery_returns_nothing_when_no_search_is_warranted() {
    let searcher = StubSearcher::returning(vec![CandidateUrl::new(
        "https://a.example/1",
        "Should not appear",
    )]);
    let search_queries = searcher.queries.clone();

    let pipeline = Pipeline::new(
        Box::new(StubRephraser::fixed(RephraseOutcome::NotNeeded)),
        Box::new(searcher),
        Box::new(RecordingFetcher::new(HashMap::new())),
        Box::new(CannedSummarizer::returning("X")),
        Box::new(MemoryCache::new()),
        Box::new(CountingAlerts::new()),
        5,
    );

    let urls = url_list(pipeline.run(discover("hello there")).await);

    assert!(urls.is_empty());
    assert!(search_queries.lock().unwrap().is_empty());
}

#[tokio::test]
async fn discovery_uses_explicit_links_without_searching() {
    let searcher = StubSearcher::returning(Vec::new());
    let search_queries = searcher.queries.clone();

    let pipeline = Pipeline::new(
        Box::new(StubRephraser::fixed(RephraseOutcome::Links {
            question: "summarize".to_string(),
            links: vec![
                "https://example.com/paper".to_string(),
                "https://twitter.com/u/status/1".to_string(),
            ],
        })),
        Box::new(searcher),
        Box::new(RecordingFetcher::new(HashMap::new())),
        Box::new(CannedSummarizer::returning("X")),
        Box::new(MemoryCache::new()),
        Box::new(CountingAlerts::new()),
        5,
    );

    let urls = url_list(pipeline.run(discover("summarize this link")).await);

    assert_eq!(urls, vec!["https://example.com/paper"]);
    assert!(search_queries.lock().unwrap().is_empty());
}

#[tokio::test]
async fn discovery_falls_back_to_the_raw_query_when_rephrase_fails() {
    let searcher = StubSearcher::returning(vec![CandidateUrl::new(
        "https://a.example/1",
        "Result",
    )]);
    let search_queries = searcher.queries.clone();

    let pipeline = Pipeline::new(
        Box::new(StubRephraser::failing()),
        Box::new(searcher),
        Box::new(RecordingFetcher::new(HashMap::new())),
        Box::new(CannedSummarizer::returning("X")),
        Box::new(MemoryCache::new()),
        Box::new(CountingAlerts::new()),
        5,
    );

    let urls = url_list(pipeline.run(discover("best laptops?")).await);

    assert_eq!(urls, vec!["https://a.example/1"]);
    assert_eq!(
        search_queries.lock().unwrap().as_slice(),
        ["best laptops?"]
    );
}

#[tokio::test]
async fn discovery_search_failure_degrades_to_empty_and_alerts() {
    let alerts = CountingAlerts::new();
    let messages = alerts.messages.clone();

    let pipeline = Pipeline::new(
        Box::new(StubRephraser::question("best laptops")),
        Box::new(StubSearcher::failing()),
        Box::new(RecordingFetcher::new(HashMap::new())),
        Box::new(CannedSummarizer::returning("X")),
        Box::new(MemoryCache::new()),
        Box::new(alerts),
        5,
    );

    let urls = url_list(pipeline.run(discover("best laptops?")).await);

    assert!(urls.is_empty());
    let messages = messages.lock().unwrap();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("*Error - websearch *"));
    assert!(messages[0].contains("best laptops?"));
}
