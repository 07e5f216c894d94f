mod client;
pub(crate) mod schema;
pub(crate) mod types;

pub use schema::StructuredOutput;

use crate::error::Result;
use crate::traits::{Completion, Message};
use crate::util::strip_code_blocks;

use client::OpenAiClient;
use types::{ChatRequest, WireMessage};

/// Sampling knobs for a single request. `None` leaves the provider default.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChatOptions {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl Default for ChatOptions {
    fn default() -> Self {
        Self {
            temperature: Some(0.3),
            max_tokens: None,
        }
    }
}

// =============================================================================
// OpenAi
// =============================================================================

#[derive(Clone)]
pub struct OpenAi {
    api_key: String,
    model: String,
    base_url: Option<String>,
    http: reqwest::Client,
}

impl OpenAi {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: None,
            http: reqwest::Client::new(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn client(&self) -> OpenAiClient {
        let client = OpenAiClient::new(&self.api_key, self.http.clone());
        match self.base_url {
            Some(ref url) => client.with_base_url(url),
            None => client,
        }
    }

    /// Free-form chat completion over an ordered message list.
    pub async fn chat(&self, messages: &[Message], options: ChatOptions) -> Result<Completion> {
        let request = ChatRequest::new(&self.model)
            .messages(messages.iter().map(WireMessage::from))
            .sampling(options.temperature, options.max_tokens);

        self.client().chat(&request).await
    }

    /// Strict JSON-schema completion. Returns the raw JSON text and token usage.
    pub async fn structured_output(
        &self,
        system: &str,
        user: &str,
        schema: serde_json::Value,
        options: ChatOptions,
    ) -> Result<Completion> {
        let request = ChatRequest::new(&self.model)
            .message(WireMessage::system(system))
            .message(WireMessage::user(user))
            .sampling(options.temperature, options.max_tokens)
            .json_schema(schema);

        let mut completion = self.client().chat(&request).await?;
        completion.text = strip_code_blocks(&completion.text).to_string();
        Ok(completion)
    }
}

impl std::fmt::Debug for OpenAi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAi")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AiError;

    #[test]
    fn test_openai_new() {
        let ai = OpenAi::new("sk-test", "gpt-4o-mini");
        assert_eq!(ai.model(), "gpt-4o-mini");
        assert_eq!(ai.api_key, "sk-test");
        assert!(ai.base_url.is_none());
    }

    #[test]
    fn test_openai_with_base_url() {
        let ai = OpenAi::new("sk-test", "gpt-4o-mini").with_base_url("http://localhost:9999/v1");
        assert_eq!(ai.base_url.as_deref(), Some("http://localhost:9999/v1"));
    }

    #[test]
    fn debug_output_hides_api_key() {
        let ai = OpenAi::new("sk-secret", "gpt-4o-mini");
        let rendered = format!("{ai:?}");
        assert!(rendered.contains("gpt-4o-mini"));
        assert!(!rendered.contains("sk-secret"));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_a_network_error() {
        let ai = OpenAi::new("sk-test", "gpt-4o-mini").with_base_url("http://127.0.0.1:1/v1");
        let err = ai
            .chat(&[Message::user("hello")], ChatOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AiError::Network(_)));
    }

    #[test]
    fn default_options_use_low_temperature() {
        let options = ChatOptions::default();
        assert_eq!(options.temperature, Some(0.3));
        assert_eq!(options.max_tokens, None);
    }
}
