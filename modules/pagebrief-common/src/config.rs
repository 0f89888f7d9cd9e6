use anyhow::Result;

/// Which rendering backend the fetcher uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchBackend {
    /// Headless Chromium subprocess on this host.
    Chrome,
    /// Browserless /content HTTP proxy.
    Browserless,
}

/// Application configuration loaded from environment variables.
/// Built once at startup and passed into component constructors;
/// nothing re-reads the environment after this.
#[derive(Debug, Clone)]
pub struct AppConfig {
    // Database
    pub database_url: String,

    // AI / LLM
    pub openai_api_key: String,
    pub anthropic_api_key: String,

    // Search
    pub searxng_url: String,
    pub search_language: String,

    // Rendering
    pub fetch_backend: FetchBackend,
    pub browserless_url: Option<String>,
    pub browserless_token: Option<String>,

    // Alerting
    pub slack_bot_token: Option<String>,
    pub slack_alert_channel: Option<String>,

    // Web server
    pub host: String,
    pub port: u16,

    // Pipeline
    pub fetch_concurrency: usize,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let fetch_backend = match std::env::var("FETCH_BACKEND").ok().as_deref() {
            Some("browserless") => FetchBackend::Browserless,
            _ => FetchBackend::Chrome,
        };

        let config = Self {
            database_url: std::env::var("DATABASE_URL")?,
            openai_api_key: std::env::var("OPENAI_API_KEY")?,
            anthropic_api_key: std::env::var("ANTHROPIC_API_KEY")?,
            searxng_url: std::env::var("SEARXNG_URL")?,
            search_language: std::env::var("SEARCH_LANGUAGE")
                .unwrap_or_else(|_| "en".to_string()),
            fetch_backend,
            browserless_url: std::env::var("BROWSERLESS_URL").ok(),
            browserless_token: std::env::var("BROWSERLESS_TOKEN").ok(),
            slack_bot_token: std::env::var("SLACK_BOT_TOKEN").ok(),
            slack_alert_channel: std::env::var("SLACK_ALERT_CHANNEL").ok(),
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "3001".to_string())
                .parse()
                .expect("PORT must be a number"),
            fetch_concurrency: std::env::var("FETCH_CONCURRENCY")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .expect("FETCH_CONCURRENCY must be a number"),
        };

        config.log_keys();
        Ok(config)
    }

    fn log_keys(&self) {
        fn preview(val: &str) -> String {
            let n = val.len().min(5);
            format!("{}...({} chars)", &val[..n], val.len())
        }
        fn preview_opt(val: &Option<String>) -> String {
            match val {
                Some(v) if !v.is_empty() => preview(v),
                _ => "<not set>".to_string(),
            }
        }

        tracing::info!("Config loaded:");
        tracing::info!("  OPENAI_API_KEY: {}", preview(&self.openai_api_key));
        tracing::info!("  ANTHROPIC_API_KEY: {}", preview(&self.anthropic_api_key));
        tracing::info!("  SEARXNG_URL: {}", self.searxng_url);
        tracing::info!("  FETCH_BACKEND: {:?}", self.fetch_backend);
        tracing::info!("  BROWSERLESS_URL: {}", preview_opt(&self.browserless_url));
        tracing::info!("  SLACK_BOT_TOKEN: {}", preview_opt(&self.slack_bot_token));
    }
}
