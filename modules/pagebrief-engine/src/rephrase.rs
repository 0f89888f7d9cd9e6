//! Standalone-question rephrasing for discovery mode.
//!
//! A raw follow-up like "what about the second one?" is useless as a search
//! query. One chat-completion call at temperature zero condenses the
//! conversation into a standalone question, flags turns that need no search
//! at all, and surfaces any URLs the user pasted so summarization can take
//! them directly.

use async_trait::async_trait;
use tracing::debug;

use llm_client::{ChatMessage, ChatRequest, OpenAiClient};
use pagebrief_common::ChatTurn;

const REPHRASE_MODEL: &str = "gpt-4o-mini";

const REPHRASE_PROMPT: &str = r#"You are an AI question rephraser. You will be given a conversation and a follow-up question, and you will rephrase the follow-up question so it is a standalone question that another LLM can use to search the web for information to answer it.
If it is a simple writing task or a greeting (unless the greeting contains a question after it) like Hi, Hello, How are you, etc. rather than a question, return `not_needed` as the response (the LLM will not need to search the web for this).
If the user asks a question about some URL, or wants a webpage or PDF summarized (via URL), return the links inside a `links` XML block and the question inside the `question` XML block. If the user wants the webpage or PDF summarized, return `summarize` inside the `question` XML block in place of a question and the link to summarize in the `links` XML block.
Always return the rephrased question inside the `question` XML block. If there are no links in the follow-up question, do not insert a `links` XML block in your response.

There are several examples attached for your reference inside the below `examples` XML block.

<examples>
1. Follow up question: What is the capital of France
Rephrased question:`
<question>
Capital of france
</question>
`

2. Hi, how are you?
Rephrased question`
<question>
not_needed
</question>
`

3. Follow up question: What is Docker?
Rephrased question: `
<question>
What is Docker
</question>
`

4. Follow up question: Can you tell me what is X from https://example.com
Rephrased question: `
<question>
Can you tell me what is X?
</question>

<links>
https://example.com
</links>
`

5. Follow up question: Summarize the content from https://example.com
Rephrased question: `
<question>
summarize
</question>

<links>
https://example.com
</links>
`
</examples>

Anything below is part of the actual conversation. Use the conversation and the follow-up question to rephrase the follow-up question as a standalone question based on the guidelines above.

<conversation>
{chat_history}
</conversation>

Follow up question: {query}
Rephrased question:
"#;

/// What the rephrase step decided about the incoming turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RephraseOutcome {
    /// A standalone question ready for the search backend.
    Question(String),
    /// The turn is a greeting or writing task; no search is warranted.
    NotNeeded,
    /// The user supplied explicit links; skip search and use them.
    Links { question: String, links: Vec<String> },
}

#[async_trait]
pub trait QueryRephraser: Send + Sync {
    async fn rephrase(&self, query: &str, history: &[ChatTurn])
        -> anyhow::Result<RephraseOutcome>;
}

pub struct LlmRephraser {
    client: OpenAiClient,
}

impl LlmRephraser {
    pub fn new(client: OpenAiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl QueryRephraser for LlmRephraser {
    async fn rephrase(
        &self,
        query: &str,
        history: &[ChatTurn],
    ) -> anyhow::Result<RephraseOutcome> {
        let chat_history = history
            .iter()
            .map(|turn| format!("{}: {}", turn.role, turn.content))
            .collect::<Vec<_>>()
            .join("\n");

        let prompt = REPHRASE_PROMPT
            .replace("{chat_history}", &chat_history)
            .replace("{query}", query);

        let request = ChatRequest::new(REPHRASE_MODEL)
            .temperature(0.0)
            .message(ChatMessage::user(prompt));

        let response = self.client.chat(&request).await?;
        let completion = response.completion()?;

        debug!(query, raw = %completion.text, "Rephrase response");
        Ok(parse_rephrase(&completion.text))
    }
}

/// Parse the model's XML-ish blocks with plain string scanning. Output with
/// no `question` block degrades to treating the whole response as the
/// question.
pub fn parse_rephrase(raw: &str) -> RephraseOutcome {
    let question = block_content(raw, "question")
        .unwrap_or_else(|| raw.trim().to_string());

    if question == "not_needed" {
        return RephraseOutcome::NotNeeded;
    }

    let links: Vec<String> = block_content(raw, "links")
        .map(|block| {
            block
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    if links.is_empty() {
        RephraseOutcome::Question(question)
    } else {
        RephraseOutcome::Links { question, links }
    }
}

fn block_content(raw: &str, tag: &str) -> Option<String> {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");
    let start = raw.find(&open)? + open.len();
    let end = raw[start..].find(&close)? + start;
    Some(raw[start..end].trim().to_string())
}
