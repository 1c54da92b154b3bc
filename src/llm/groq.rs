use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument};

use super::{api_error, ModelClient, ModelError, RawContent};

const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";
const SYSTEM_PROMPT: &str = "You are an expert Facebook video ad script writer.";

/// Groq client speaking the OpenAI-compatible chat completions format.
#[derive(Debug, Clone)]
pub struct GroqClient {
    http: Client,
    api_key: String,
    model: String,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<RawContent>,
}

impl ChatResponse {
    fn into_content(self) -> Result<RawContent, ModelError> {
        self.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ModelError::ResponseParsing("response has no choices".into()))
    }
}

impl GroqClient {
    pub fn new(http: Client, api_key: String, model: String, base_url: Option<String>) -> Self {
        let base_url = base_url.unwrap_or_else(|| DEFAULT_BASE_URL.into());
        debug!(model = %model, url = %base_url, "created groq client");
        Self {
            http,
            api_key,
            model,
            base_url,
        }
    }
}

#[async_trait]
impl ModelClient for GroqClient {
    #[instrument(skip(self, prompt), fields(model = %self.model, prompt_len = prompt.len()))]
    async fn complete(
        &self,
        prompt: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<RawContent, ModelError> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature,
            max_tokens,
        };

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url.trim_end_matches('/')))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!(error = ?e, "groq request failed");
                ModelError::Http(e)
            })?;

        if !response.status().is_success() {
            return Err(api_error(self.provider_name(), response).await);
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| ModelError::ResponseParsing(e.to_string()))?;
        debug!(choices = parsed.choices.len(), "groq response received");
        parsed.into_content()
    }

    fn provider_name(&self) -> &'static str {
        "groq"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn takes_first_choice() {
        let body = r#"{
            "id": "chatcmpl-1",
            "choices": [
                { "index": 0, "message": { "role": "assistant", "content": "Script 1: A" }, "finish_reason": "stop" },
                { "index": 1, "message": { "role": "assistant", "content": "Script 1: B" } }
            ],
            "usage": { "total_tokens": 12 }
        }"#;
        let parsed: ChatResponse = serde_json::from_str(body).unwrap();
        assert_eq!(
            parsed.into_content().unwrap(),
            RawContent::Text("Script 1: A".into())
        );
    }

    #[test]
    fn empty_choices_is_a_parsing_error() {
        let parsed: ChatResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(matches!(
            parsed.into_content(),
            Err(ModelError::ResponseParsing(_))
        ));
    }
}
