//! Summarization: prompt selection, backend routing, and normalization of
//! the two provider response shapes into one record.
//!
//! Routing is a fixed, total function of [`ContentKind`]: discussion threads
//! go to the conversational-reasoning backend, everything else to the general
//! chat-completion backend. Callers never pick a backend per call.

use async_trait::async_trait;
use chrono::Utc;
use tracing::info;

use llm_client::{
    AnthropicClient, ChatMessage, ChatRequest, Envelope, LlmError, MessagesRequest, OpenAiClient,
};
use pagebrief_common::{
    ContentKind, PageContent, SummarizeError, SummarizeResult, SummaryRecord, TokenUsage,
};

const GENERIC_MODEL: &str = "gpt-4o-mini";
const DISCUSSION_MODEL: &str = "claude-3-5-sonnet-20240620";

/// Low temperature keeps generic summaries factually stable.
const GENERIC_TEMPERATURE: f32 = 0.2;
const DISCUSSION_MAX_TOKENS: u32 = 4096;

const GENERIC_PROMPT: &str = r#"As a professional summarizer, create a concise and comprehensive summary of the provided text, be it an article, post, conversation, or passage, while adhering to these guidelines:

Craft a summary that is detailed, thorough, in-depth, and complex, while maintaining clarity and conciseness.

Incorporate main ideas and essential information, eliminating extraneous language and focusing on critical aspects.

Rely strictly on the provided text, without including external information.

Format the summary in paragraph form for easy understanding.

Text to summarise:
"{{page_content}}""#;

const DISCUSSION_PROMPT: &str = r#"As a professional summarizer, create a concise and comprehensive summary of the provided text, be it an article, post, conversation, or passage, while adhering to these guidelines:
Craft a summary that is detailed, thorough, in-depth, and complex, while maintaining clarity and conciseness.
Incorporate main ideas and essential information, eliminating extraneous language and focusing on critical aspects. Do not include any meta-information about the post itself, such as upvotes, comments.
Exclude all personal information, including usernames, real names, or any identifying details of the original poster or other users mentioned in the post.
Do not mention Reddit, subreddits, or any platform-specific terminology in your summary.
Rely strictly on the provided text, without including external information.
Format the summary in paragraph form for easy understanding.
Text to summarise:
{{discussion_content}}"#;

/// Which provider a content kind routes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// General chat-completion backend (OpenAI).
    Chat,
    /// Conversational-reasoning backend (Anthropic).
    Conversational,
}

/// Total routing function. Social-media URLs never reach the summarizer,
/// but the mapping stays exhaustive anyway.
pub fn route(kind: ContentKind) -> Backend {
    match kind {
        ContentKind::DiscussionPost => Backend::Conversational,
        ContentKind::Generic | ContentKind::SocialMedia => Backend::Chat,
    }
}

/// Fill the kind-appropriate prompt template with extracted text.
pub fn prompt_for(kind: ContentKind, text: &str) -> String {
    match kind {
        ContentKind::DiscussionPost => DISCUSSION_PROMPT.replace("{{discussion_content}}", text),
        ContentKind::Generic | ContentKind::SocialMedia => {
            GENERIC_PROMPT.replace("{{page_content}}", text)
        }
    }
}

/// A successful summarization: the normalized record plus the raw provider
/// envelope, which the cache persists verbatim.
#[derive(Debug, Clone)]
pub struct SummaryOutcome {
    pub record: SummaryRecord,
    pub envelope: Envelope,
}

#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(
        &self,
        url: &str,
        kind: ContentKind,
        content: &PageContent,
    ) -> SummarizeResult<SummaryOutcome>;
}

pub struct LlmSummarizer {
    openai: OpenAiClient,
    anthropic: AnthropicClient,
}

impl LlmSummarizer {
    pub fn new(openai: OpenAiClient, anthropic: AnthropicClient) -> Self {
        Self { openai, anthropic }
    }
}

#[async_trait]
impl Summarizer for LlmSummarizer {
    async fn summarize(
        &self,
        url: &str,
        kind: ContentKind,
        content: &PageContent,
    ) -> SummarizeResult<SummaryOutcome> {
        let prompt = prompt_for(kind, &content.text);

        let envelope = match route(kind) {
            Backend::Chat => {
                let request = ChatRequest::new(GENERIC_MODEL)
                    .temperature(GENERIC_TEMPERATURE)
                    .message(ChatMessage::user(prompt));
                Envelope::Chat(self.openai.chat(&request).await.map_err(map_llm_error)?)
            }
            Backend::Conversational => {
                let request = MessagesRequest::new(DISCUSSION_MODEL)
                    .max_tokens(DISCUSSION_MAX_TOKENS)
                    .message(ChatMessage::user(prompt));
                Envelope::Messages(
                    self.anthropic
                        .messages(&request)
                        .await
                        .map_err(map_llm_error)?,
                )
            }
        };

        let completion = envelope
            .normalize()
            .map_err(|_| SummarizeError::EmptyCompletion {
                model: envelope.model().to_string(),
            })?;

        info!(
            url,
            model = %completion.model,
            output_tokens = completion.usage.output_tokens,
            "Summary produced"
        );

        let now = Utc::now();
        let record = SummaryRecord {
            url: url.to_string(),
            summary_text: completion.text,
            model_id: completion.model,
            token_usage: TokenUsage {
                input_tokens: completion.usage.input_tokens,
                output_tokens: completion.usage.output_tokens,
            },
            word_count: content.word_count,
            created_at: now,
            updated_at: now,
        };

        Ok(SummaryOutcome { record, envelope })
    }
}

fn map_llm_error(e: LlmError) -> SummarizeError {
    match e {
        LlmError::Api { status, message } => SummarizeError::Provider { status, message },
        LlmError::Empty => SummarizeError::EmptyCompletion {
            model: String::new(),
        },
        other => SummarizeError::Transport(other.to_string()),
    }
}
