use thiserror::Error;

pub type Result<T> = std::result::Result<T, BrowserlessError>;

/// Failures from the /content rendering endpoint. The reqwest source is
/// kept intact so callers can tell a timed-out render from a dead proxy.
#[derive(Debug, Error)]
pub enum BrowserlessError {
    #[error("content request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("browserless returned status {status}: {message}")]
    Api { status: u16, message: String },
}
