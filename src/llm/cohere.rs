use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument};

use super::{api_error, ModelClient, ModelError, RawContent};

const DEFAULT_BASE_URL: &str = "https://api.cohere.com/v2";

/// Cohere v2 chat client.
#[derive(Debug, Clone)]
pub struct CohereClient {
    http: Client,
    api_key: String,
    model: String,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    message: Option<AssistantMessage>,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: Option<RawContent>,
}

impl ChatResponse {
    fn into_content(self) -> Result<RawContent, ModelError> {
        self.message
            .and_then(|m| m.content)
            .ok_or_else(|| ModelError::ResponseParsing("response has no message content".into()))
    }
}

impl CohereClient {
    pub fn new(http: Client, api_key: String, model: String, base_url: Option<String>) -> Self {
        let base_url = base_url.unwrap_or_else(|| DEFAULT_BASE_URL.into());
        debug!(model = %model, url = %base_url, "created cohere client");
        Self {
            http,
            api_key,
            model,
            base_url,
        }
    }
}

#[async_trait]
impl ModelClient for CohereClient {
    #[instrument(skip(self, prompt), fields(model = %self.model, prompt_len = prompt.len()))]
    async fn complete(
        &self,
        prompt: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<RawContent, ModelError> {
        let body = ChatRequest {
            model: &self.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature,
            max_tokens,
            stream: false,
        };

        let response = self
            .http
            .post(format!("{}/chat", self.base_url.trim_end_matches('/')))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!(error = ?e, "cohere request failed");
                ModelError::Http(e)
            })?;

        if !response.status().is_success() {
            return Err(api_error(self.provider_name(), response).await);
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| ModelError::ResponseParsing(e.to_string()))?;
        let content = parsed.into_content()?;
        debug!("cohere response received");
        Ok(content)
    }

    fn provider_name(&self) -> &'static str {
        "cohere"
    }
}
