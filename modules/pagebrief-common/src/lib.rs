pub mod classify;
pub mod config;
pub mod error;
pub mod types;

pub use classify::{classify, ContentKind};
pub use config::{AppConfig, FetchBackend};
pub use error::{
    CacheError, CacheResult, FetchError, FetchResult, PipelineError, QualityReject,
    RetrievalError, RetrievalResult, SummarizeError, SummarizeResult,
};
pub use types::*;
