//! Language-model orchestration for answer assembly.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::document::ScoredChunk;
use crate::error::{DocqaError, Result};

/// A chat model that completes a single prompt into answer text.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Produce a completion for `prompt`.
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Assemble the "stuff" prompt: every retrieved chunk concatenated into one
/// context block, no recursive summarization.
pub fn stuff_prompt(question: &str, context: &[ScoredChunk]) -> String {
    let mut joined = String::new();
    for (i, chunk) in context.iter().enumerate() {
        if i > 0 {
            joined.push_str("\n\n");
        }
        joined.push_str(&chunk.text);
    }
    format!(
        "Use the following pieces of context to answer the question at the end. \
         If you don't know the answer, just say that you don't know, don't try \
         to make up an answer.\n\n{joined}\n\nQuestion: {question}\nHelpful Answer:"
    )
}

const CHAT_COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";
const DEFAULT_CHAT_MODEL: &str = "gpt-3.5-turbo";

/// A [`ChatModel`] backed by the OpenAI chat completions API.
///
/// Runs at temperature 0.0: answers should restate retrieved context, not
/// improvise.
pub struct OpenAiChatModel {
    client: reqwest::Client,
    api_key: String,
    model: String,
    temperature: f32,
}

impl OpenAiChatModel {
    /// Create a chat model with the given API key and the default model.
    ///
    /// # Errors
    ///
    /// Returns [`DocqaError::Config`] if the key is empty.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(DocqaError::Config("OpenAI API key must not be empty".to_string()));
        }
        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            model: DEFAULT_CHAT_MODEL.to_string(),
            temperature: 0.0,
        })
    }

    /// Create a chat model from the `OPENAI_API_KEY` environment variable.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| {
            DocqaError::Config("OPENAI_API_KEY environment variable not set".to_string())
        })?;
        Self::new(api_key)
    }

    /// Use a different chat model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    fn llm_err(&self, message: String) -> DocqaError {
        DocqaError::Llm { provider: self.model.clone(), message }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: [ChatMessage<'a>; 1],
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[async_trait]
impl ChatModel for OpenAiChatModel {
    async fn complete(&self, prompt: &str) -> Result<String> {
        debug!(model = %self.model, prompt_len = prompt.len(), "requesting completion");

        let request = ChatRequest {
            model: &self.model,
            temperature: self.temperature,
            messages: [ChatMessage { role: "user", content: prompt }],
        };

        let response = self
            .client
            .post(CHAT_COMPLETIONS_URL)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!(model = %self.model, error = %e, "chat request failed");
                self.llm_err(format!("request failed: {e}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(model = %self.model, %status, "chat API error");
            return Err(self.llm_err(format!("API returned {status}: {body}")));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| self.llm_err(format!("failed to parse response: {e}")))?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stuff_prompt_contains_every_chunk_and_the_question() {
        let context = vec![
            ScoredChunk { id: "a".into(), text: "first chunk".into(), score: 0.9 },
            ScoredChunk { id: "b".into(), text: "second chunk".into(), score: 0.8 },
        ];
        let prompt = stuff_prompt("what is the plan?", &context);
        assert!(prompt.contains("first chunk"));
        assert!(prompt.contains("second chunk"));
        assert!(prompt.contains("Question: what is the plan?"));
        // Chunks are stuffed verbatim, in retrieval order.
        assert!(prompt.find("first chunk").unwrap() < prompt.find("second chunk").unwrap());
    }
}
