use thiserror::Error;

pub type Result<T> = std::result::Result<T, SearxngError>;

#[derive(Debug, Error)]
pub enum SearxngError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Malformed response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for SearxngError {
    fn from(err: reqwest::Error) -> Self {
        SearxngError::Network(err.to_string())
    }
}
