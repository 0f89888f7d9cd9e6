//! Rendering backends. One trait, two implementations: a local headless
//! Chromium subprocess and the Browserless HTTP proxy. Both answer the same
//! question — URL in, rendered markup out, or a typed failure — so the
//! pipeline stays agnostic about which one is configured.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Semaphore;
use tracing::{info, warn};

use browserless_client::{BrowserlessClient, BrowserlessError};
use pagebrief_common::{FetchError, FetchResult};

/// Max concurrent Chromium processes. Each instance is heavy (~100MB+ RSS,
/// multiple child processes); containers hit PID/memory limits fast.
const MAX_CONCURRENT_CHROME: usize = 2;

/// Hard cap on one rendering session. Rendering is the single
/// highest-latency, highest-failure-rate step in the pipeline.
const RENDER_TIMEOUT: Duration = Duration::from_secs(80);

/// Realistic desktop user agent; some hosts block obvious headless agents.
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/88.0.4324.96 Safari/537.36";

#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Render a URL to settled markup. A single attempt, no retries.
    async fn render(&self, url: &str) -> FetchResult<String>;
    fn name(&self) -> &str;
}

// --- Headless Chromium fetcher ---

pub struct ChromeFetcher {
    semaphore: Semaphore,
    chrome_bin: String,
}

impl ChromeFetcher {
    pub fn new() -> Self {
        let chrome_bin = std::env::var("CHROME_BIN").unwrap_or_else(|_| "chromium".to_string());
        info!(
            chrome_bin,
            max_concurrent = MAX_CONCURRENT_CHROME,
            "Using ChromeFetcher"
        );
        Self {
            semaphore: Semaphore::new(MAX_CONCURRENT_CHROME),
            chrome_bin,
        }
    }

    async fn run_chrome(&self, url: &str) -> FetchResult<String> {
        let parsed = url::Url::parse(url).map_err(|_| FetchError::InvalidUrl {
            url: url.to_string(),
        })?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(FetchError::InvalidUrl {
                url: url.to_string(),
            });
        }

        let tmp_dir = tempfile::tempdir().map_err(|e| FetchError::Navigation {
            url: url.to_string(),
            message: format!("failed to create temp profile dir: {e}"),
        })?;

        let result = tokio::time::timeout(
            RENDER_TIMEOUT,
            tokio::process::Command::new(&self.chrome_bin)
                .args([
                    "--headless",
                    "--no-sandbox",
                    "--disable-gpu",
                    "--disable-dev-shm-usage",
                    &format!("--user-data-dir={}", tmp_dir.path().display()),
                    &format!("--user-agent={USER_AGENT}"),
                    "--dump-dom",
                    url,
                ])
                .output(),
        )
        .await;

        let output = match result {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(FetchError::Navigation {
                    url: url.to_string(),
                    message: format!("failed to launch Chrome: {e}"),
                })
            }
            Err(_) => {
                return Err(FetchError::Timeout {
                    url: url.to_string(),
                })
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(FetchError::Navigation {
                url: url.to_string(),
                message: stderr.lines().last().unwrap_or("Chrome exited with error").to_string(),
            });
        }

        if output.stdout.is_empty() {
            return Err(FetchError::EmptyRender {
                url: url.to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl Default for ChromeFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PageFetcher for ChromeFetcher {
    async fn render(&self, url: &str) -> FetchResult<String> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| FetchError::Navigation {
                url: url.to_string(),
                message: "render semaphore closed".to_string(),
            })?;

        info!(url, fetcher = "chrome", "Rendering URL");

        let html = self.run_chrome(url).await?;

        info!(url, fetcher = "chrome", bytes = html.len(), "Rendered");
        Ok(html)
    }

    fn name(&self) -> &str {
        "chrome"
    }
}

// --- Browserless proxy fetcher ---

pub struct BrowserlessFetcher {
    client: BrowserlessClient,
}

impl BrowserlessFetcher {
    pub fn new(base_url: &str, token: Option<&str>) -> Self {
        info!(base_url, "Using BrowserlessFetcher");
        Self {
            client: BrowserlessClient::new(base_url, token),
        }
    }
}

#[async_trait]
impl PageFetcher for BrowserlessFetcher {
    async fn render(&self, url: &str) -> FetchResult<String> {
        info!(url, fetcher = "browserless", "Rendering URL");

        let html = self
            .client
            .content(url)
            .await
            .map_err(|e| map_browserless_error(url, e))?;

        if html.trim().is_empty() {
            warn!(url, fetcher = "browserless", "Empty HTML response");
            return Err(FetchError::EmptyRender {
                url: url.to_string(),
            });
        }

        info!(url, fetcher = "browserless", bytes = html.len(), "Rendered");
        Ok(html)
    }

    fn name(&self) -> &str {
        "browserless"
    }
}

/// A timed-out proxy render reports the same way a timed-out local
/// session does; everything else transport-shaped is a navigation failure.
fn map_browserless_error(url: &str, e: BrowserlessError) -> FetchError {
    match e {
        BrowserlessError::Api { status, message } => FetchError::Proxy { status, message },
        BrowserlessError::Network(e) if e.is_timeout() => FetchError::Timeout {
            url: url.to_string(),
        },
        BrowserlessError::Network(e) => FetchError::Navigation {
            url: url.to_string(),
            message: e.to_string(),
        },
    }
}
