// src/config.rs

use crate::tools::llm::{OpenAiCompatibleClient, TransportError};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_OLLAMA_BASE_URL: &str = "http://localhost:11434/v1";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("unsupported provider: {0}")]
    UnsupportedProvider(String),
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    OpenAi,
    Ollama,
}

impl Provider {
    pub fn is_cloud(self) -> bool {
        matches!(self, Provider::OpenAi)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Provider::OpenAi => "openai",
            Provider::Ollama => "ollama",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Provider::OpenAi),
            "ollama" => Ok(Provider::Ollama),
            other => Err(ConfigError::UnsupportedProvider(other.to_string())),
        }
    }
}

/// Where and how to reach one model.
#[derive(Clone, Debug, PartialEq)]
pub struct ProviderConfig {
    pub provider: Provider,
    pub model: String,
    pub base_url: String,
    pub api_key: String,
}

impl ProviderConfig {
    pub fn connect(&self, timeout: Duration) -> Result<OpenAiCompatibleClient, TransportError> {
        OpenAiCompatibleClient::new(&self.base_url, &self.api_key, timeout)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PipelineConfig {
    pub primary: ProviderConfig,
    /// Cloud model used once the primary exhausts its retries.
    pub fallback: ProviderConfig,
    pub fallback_to_cloud: bool,
    pub max_retries: u32,
    pub temperature: f64,
    pub request_timeout: Duration,
    pub trials: usize,
}

fn parse_value<T: FromStr>(
    key: &'static str,
    raw: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) if value.trim().is_empty() => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { key, value }),
    }
}

impl PipelineConfig {
    /// Reads the process environment (after loading any `.env` file).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let provider: Provider = get("LLM_PROVIDER", "openai").parse()?;
        let openai_key = get("OPENAI_API_KEY", "");
        let openai_url = get("OPENAI_BASE_URL", DEFAULT_OPENAI_BASE_URL);

        let primary = ProviderConfig {
            provider,
            model: get("LLM_MODEL", "gpt-4o"),
            base_url: match provider {
                Provider::OpenAi => openai_url.clone(),
                Provider::Ollama => get("OLLAMA_BASE_URL", DEFAULT_OLLAMA_BASE_URL),
            },
            api_key: match provider {
                Provider::OpenAi => openai_key.clone(),
                Provider::Ollama => "ollama".to_string(),
            },
        };

        let fallback = ProviderConfig {
            provider: Provider::OpenAi,
            model: get("CLOUD_FALLBACK_MODEL", "gpt-4o"),
            base_url: openai_url,
            api_key: openai_key,
        };

        let fallback_to_cloud = lookup("FALLBACK_TO_CLOUD")
            .map(|v| v.trim().eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        Ok(Self {
            primary,
            fallback,
            fallback_to_cloud,
            max_retries: parse_value("MAX_RETRIES", lookup("MAX_RETRIES"), 1)?,
            temperature: parse_value("TEMPERATURE", lookup("TEMPERATURE"), 0.0)?,
            request_timeout: Duration::from_secs(parse_value(
                "REQUEST_TIMEOUT_SECS",
                lookup("REQUEST_TIMEOUT_SECS"),
                60,
            )?),
            trials: parse_value("TRIALS", lookup("TRIALS"), 1)?,
        })
    }
}
