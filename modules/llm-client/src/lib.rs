pub mod anthropic;
pub mod error;
pub mod openai;
pub mod types;

pub use anthropic::{AnthropicClient, MessagesRequest, MessagesResponse};
pub use error::{LlmError, Result};
pub use openai::{ChatCompletion, ChatRequest, OpenAiClient};
pub use types::{ChatMessage, Completion, Envelope, Role, TokenCounts};
