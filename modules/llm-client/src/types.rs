use serde::{Deserialize, Serialize};

use crate::anthropic::MessagesResponse;
use crate::error::Result;
use crate::openai::ChatCompletion;

// =============================================================================
// Messages
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A plain-text chat turn. Both providers accept this shape in requests;
/// OpenAI also returns it inside choices.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}

// =============================================================================
// Normalized completion
// =============================================================================

/// Token accounting with the provider-specific field names collapsed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenCounts {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// Provider-agnostic view of one completion: the first text payload,
/// the model that produced it, and what it cost.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub text: String,
    pub model: String,
    pub usage: TokenCounts,
}

// =============================================================================
// Raw envelopes
// =============================================================================

/// Either provider's raw response envelope. Callers that persist
/// responses store this shape verbatim and call [`Envelope::normalize`]
/// when they need the text back out.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Envelope {
    Messages(MessagesResponse),
    Chat(ChatCompletion),
}

impl Envelope {
    pub fn normalize(&self) -> Result<Completion> {
        match self {
            Envelope::Messages(resp) => resp.completion(),
            Envelope::Chat(resp) => resp.completion(),
        }
    }

    pub fn model(&self) -> &str {
        match self {
            Envelope::Messages(resp) => &resp.model,
            Envelope::Chat(resp) => &resp.model,
        }
    }
}
