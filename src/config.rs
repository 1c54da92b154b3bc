use std::str::FromStr;

use anyhow::{bail, Context};
use serde::Deserialize;

use crate::scripts::prompt::DEFAULT_SECTIONS;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelProvider {
    Cohere,
    Groq,
}

impl ModelProvider {
    fn parse(value: &str) -> anyhow::Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "cohere" => Ok(Self::Cohere),
            "groq" => Ok(Self::Groq),
            other => bail!("unknown MODEL_PROVIDER {other:?} (expected cohere or groq)"),
        }
    }

    fn api_key_var(self) -> &'static str {
        match self {
            Self::Cohere => "COHERE_API_KEY",
            Self::Groq => "GROQ_API_KEY",
        }
    }

    fn default_model(self) -> &'static str {
        match self {
            Self::Cohere => "command-a-03-2025",
            Self::Groq => "llama3-70b-8192",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    pub provider: ModelProvider,
    pub api_key: String,
    pub model: String,
    /// Overrides the provider's public endpoint.
    pub base_url: Option<String>,
    pub timeout_secs: u64,
}

/// Generation profile shared by the prompt builder, the normalizer and the orchestrator.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerationConfig {
    pub target_count: usize,
    pub max_tokens: u32,
    pub temperature: f32,
    pub require_sections: bool,
    pub sections: Vec<String>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            target_count: 8,
            max_tokens: 4000,
            temperature: 0.7,
            require_sections: true,
            sections: DEFAULT_SECTIONS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    /// Empty means any origin is allowed.
    pub cors_origins: Vec<String>,
    pub jwt: JwtConfig,
    pub model: ModelConfig,
    pub generation: GenerationConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(get: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| -> anyhow::Result<String> {
            get(key)
                .filter(|v| !v.trim().is_empty())
                .with_context(|| format!("{key} must be set"))
        };

        let database_url = required("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: required("JWT_SECRET")?,
            issuer: get("JWT_ISSUER").unwrap_or_else(|| "promogenie".into()),
            audience: get("JWT_AUDIENCE").unwrap_or_else(|| "promogenie-users".into()),
            ttl_minutes: parsed(&get, "JWT_TTL_MINUTES").unwrap_or(60 * 24 * 30),
        };

        let provider = match get("MODEL_PROVIDER") {
            Some(v) => ModelProvider::parse(&v)?,
            None => ModelProvider::Cohere,
        };
        let model = ModelConfig {
            provider,
            api_key: required(provider.api_key_var())?,
            model: get("MODEL_NAME").unwrap_or_else(|| provider.default_model().into()),
            base_url: get("MODEL_BASE_URL").filter(|v| !v.trim().is_empty()),
            timeout_secs: parsed(&get, "MODEL_TIMEOUT_SECS").unwrap_or(60),
        };

        let defaults = GenerationConfig::default();
        let generation = GenerationConfig {
            target_count: parsed(&get, "SCRIPT_TARGET_COUNT")
                .filter(|n: &usize| *n > 0)
                .unwrap_or(defaults.target_count),
            max_tokens: parsed(&get, "SCRIPT_MAX_TOKENS").unwrap_or(defaults.max_tokens),
            temperature: parsed(&get, "SCRIPT_TEMPERATURE").unwrap_or(defaults.temperature),
            require_sections: parsed(&get, "SCRIPT_REQUIRE_SECTIONS").unwrap_or(defaults.require_sections),
            sections: defaults.sections,
        };

        let cors_origins = get("CORS_ALLOWED_ORIGINS")
            .map(|v| {
                v.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            database_url,
            host: get("APP_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: parsed(&get, "APP_PORT").unwrap_or(5000),
            cors_origins,
            jwt,
            model,
            generation,
        })
    }
}

fn parsed<T, F>(get: &F, key: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    get(key).and_then(|v| v.trim().parse().ok())
}
