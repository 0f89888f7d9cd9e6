use std::sync::Arc;

use anyhow::Result;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use llm_client::{AnthropicClient, OpenAiClient};
use pagebrief_common::{AppConfig, FetchBackend};
use pagebrief_engine::{
    AlertSink, BrowserlessFetcher, ChromeFetcher, LlmRephraser, LlmSummarizer, NoopAlerter,
    PageFetcher, PgSummaryCache, Pipeline, SearxngSearcher, SlackAlerter,
};

mod routes;

use routes::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pagebrief=info")),
        )
        .json()
        .init();

    info!("Starting pagebrief-server");

    let config = AppConfig::from_env()?;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await?;
    info!("Connected to database");

    let cache = PgSummaryCache::new(pool);
    cache.migrate().await?;
    info!("Migrations complete");

    let fetcher: Box<dyn PageFetcher> = match config.fetch_backend {
        FetchBackend::Chrome => Box::new(ChromeFetcher::new()),
        FetchBackend::Browserless => {
            let base_url = config.browserless_url.clone().ok_or_else(|| {
                anyhow::anyhow!("BROWSERLESS_URL is required when FETCH_BACKEND=browserless")
            })?;
            Box::new(BrowserlessFetcher::new(
                &base_url,
                config.browserless_token.as_deref(),
            ))
        }
    };

    let alerts: Box<dyn AlertSink> = match (&config.slack_bot_token, &config.slack_alert_channel) {
        (Some(token), Some(channel)) => Box::new(SlackAlerter::new(token, channel)),
        _ => {
            warn!("Slack alerting not configured, pipeline failures are log-only");
            Box::new(NoopAlerter)
        }
    };

    let openai = OpenAiClient::new(&config.openai_api_key);
    let anthropic = AnthropicClient::new(&config.anthropic_api_key);

    let pipeline = Pipeline::new(
        Box::new(LlmRephraser::new(openai.clone())),
        Box::new(SearxngSearcher::new(
            &config.searxng_url,
            &config.search_language,
        )),
        fetcher,
        Box::new(LlmSummarizer::new(openai, anthropic)),
        Box::new(cache),
        alerts,
        config.fetch_concurrency,
    );

    let app = routes::build_router(Arc::new(AppState { pipeline }));

    let addr = format!("{}:{}", config.host, config.port);
    info!("pagebrief API starting on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
