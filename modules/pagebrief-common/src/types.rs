use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// --- Search candidates ---

/// One search hit, before filtering. Discarded after the URL filter runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateUrl {
    pub url: String,
    pub title: String,
    pub source_domain: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl CandidateUrl {
    pub fn new(url: impl Into<String>, title: impl Into<String>) -> Self {
        let url = url.into();
        let source_domain = url::Url::parse(&url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_default();
        Self {
            url,
            title: title.into(),
            source_domain,
            image: None,
        }
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }
}

// --- Page content ---

/// Extracted text ready for summarization. Transient, never persisted as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageContent {
    pub text: String,
    pub word_count: usize,
}

impl PageContent {
    pub fn new(text: String) -> Self {
        let word_count = word_count(&text);
        Self { text, word_count }
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }
}

// --- Summary records ---

/// Token accounting, normalized across providers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// The persisted unit: one summary per URL, keyed by the URL itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryRecord {
    pub url: String,
    pub summary_text: String,
    pub model_id: String,
    pub token_usage: TokenUsage,
    pub word_count: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// --- Conversation turns ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    Human,
    Assistant,
}

impl std::fmt::Display for TurnRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TurnRole::Human => write!(f, "human"),
            TurnRole::Assistant => write!(f, "assistant"),
        }
    }
}

/// One prior conversation turn, as the query rephraser sees it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: TurnRole,
    pub content: String,
}

impl ChatTurn {
    pub fn human(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Human,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Assistant,
            content: content.into(),
        }
    }
}

/// Whitespace-separated token count.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}
