//! Clients for the hosted text-generation providers.

mod cohere;
mod groq;

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use serde::Deserialize;

pub use cohere::CohereClient;
pub use groq::GroqClient;

use crate::config::{ModelConfig, ModelProvider};

/// Raw model output: either one string holding every script, or a list of
/// content blocks (strings, `{ "text": ... }` objects or anything else).
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawContent {
    Text(String),
    Blocks(Vec<serde_json::Value>),
}

/// Errors from the model provider.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// Transport failure, including timeouts.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Response parsing failed: {0}")]
    ResponseParsing(String),
}

#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn complete(
        &self,
        prompt: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<RawContent, ModelError>;

    /// Name used in logs.
    fn provider_name(&self) -> &'static str;
}

/// Builds the configured provider client.
pub fn from_config(cfg: &ModelConfig) -> anyhow::Result<Arc<dyn ModelClient>> {
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(cfg.timeout_secs))
        .build()?;
    let client: Arc<dyn ModelClient> = match cfg.provider {
        ModelProvider::Cohere => Arc::new(CohereClient::new(
            http,
            cfg.api_key.clone(),
            cfg.model.clone(),
            cfg.base_url.clone(),
        )),
        ModelProvider::Groq => Arc::new(GroqClient::new(
            http,
            cfg.api_key.clone(),
            cfg.model.clone(),
            cfg.base_url.clone(),
        )),
    };
    Ok(client)
}

/// Reads a non-2xx response into [`ModelError::Api`].
async fn api_error(provider: &'static str, response: reqwest::Response) -> ModelError {
    let status = response.status();
    let message = response.text().await.unwrap_or_default();
    tracing::error!(provider, status = %status, error = %message, "API error");
    ModelError::Api {
        status: status.as_u16(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn raw_content_accepts_string_or_blocks() {
        let text: RawContent = serde_json::from_value(json!("Script 1: hi")).unwrap();
        assert_eq!(text, RawContent::Text("Script 1: hi".into()));

        let blocks: RawContent =
            serde_json::from_value(json!([{ "type": "text", "text": "a" }, "b"])).unwrap();
        match blocks {
            RawContent::Blocks(b) => assert_eq!(b.len(), 2),
            other => panic!("expected blocks, got {other:?}"),
        }
    }

    #[test]
    fn from_config_picks_provider() {
        let cfg = ModelConfig {
            provider: ModelProvider::Groq,
            api_key: "k".into(),
            model: "llama3-70b-8192".into(),
            base_url: None,
            timeout_secs: 5,
        };
        let client = from_config(&cfg).expect("client");
        assert_eq!(client.provider_name(), "groq");
    }
}
