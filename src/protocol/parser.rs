// src/protocol/parser.rs

use crate::config::{PipelineConfig, Provider, ProviderConfig};
use crate::model::TaskSpecification;
use crate::protocol::ParseAttemptResult;
use crate::tools::llm::{ChatMessage, ChatRequest, LlmClient, TransportError};
use crate::validation::schema;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a robotics planning assistant. Output ONLY valid JSON matching the schema.";

/// A model reachable through one client.
pub struct ProviderHandle {
    pub provider: Provider,
    pub model: String,
    pub client: Box<dyn LlmClient>,
}

impl ProviderHandle {
    pub fn new(provider: Provider, model: &str, client: impl LlmClient + 'static) -> Self {
        Self {
            provider,
            model: model.to_string(),
            client: Box::new(client),
        }
    }

    /// Connects to the HTTP endpoint described by `config`.
    pub fn connect(config: &ProviderConfig, timeout: Duration) -> Result<Self, TransportError> {
        Ok(Self::new(config.provider, &config.model, config.connect(timeout)?))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ParserConfig {
    pub max_retries: u32,
    pub temperature: f64,
    pub fallback_to_cloud: bool,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            max_retries: 1,
            temperature: 0.0,
            fallback_to_cloud: false,
        }
    }
}

impl From<&PipelineConfig> for ParserConfig {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            temperature: config.temperature,
            fallback_to_cloud: config.fallback_to_cloud,
        }
    }
}

/// Turns an instruction into a task specification, retrying on bad output
/// and falling back to a cloud model once when the local one gives up.
pub struct ParsingOrchestrator {
    primary: ProviderHandle,
    fallback: Option<ProviderHandle>,
    config: ParserConfig,
}

impl ParsingOrchestrator {
    pub fn new(primary: ProviderHandle, config: ParserConfig) -> Self {
        Self {
            primary,
            fallback: None,
            config,
        }
    }

    pub fn with_fallback(mut self, fallback: ProviderHandle) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Builds HTTP-backed handles for the configured primary and fallback.
    pub fn from_config(config: &PipelineConfig) -> Result<Self, TransportError> {
        let primary = ProviderHandle::connect(&config.primary, config.request_timeout)?;
        let mut orchestrator = Self::new(primary, ParserConfig::from(config));
        if config.fallback_to_cloud && !config.primary.provider.is_cloud() {
            let fallback = ProviderHandle::connect(&config.fallback, config.request_timeout)?;
            orchestrator = orchestrator.with_fallback(fallback);
        }
        Ok(orchestrator)
    }

    pub fn parse(&self, instruction: &str, system_prompt: Option<&str>) -> ParseAttemptResult {
        let system_prompt = system_prompt.unwrap_or(DEFAULT_SYSTEM_PROMPT);
        let result = self.attempt_loop(&self.primary, instruction, system_prompt);
        if result.success {
            return result;
        }

        let fallback_allowed = self.config.fallback_to_cloud && !self.primary.provider.is_cloud();
        match &self.fallback {
            Some(fallback) if fallback_allowed => {
                info!(model = %fallback.model, "falling back to cloud model");
                ParseAttemptResult {
                    fallback_occurred: true,
                    ..self.attempt_loop(fallback, instruction, system_prompt)
                }
            }
            _ => result,
        }
    }

    fn request(&self, handle: &ProviderHandle, instruction: &str, system_prompt: &str) -> ChatRequest {
        ChatRequest {
            model: handle.model.clone(),
            temperature: self.config.temperature,
            messages: vec![
                ChatMessage::system(system_prompt),
                ChatMessage::user(instruction),
            ],
            json_response: handle.provider.is_cloud(),
        }
    }

    /// Runs at most `max_retries + 1` calls against one handle.
    fn attempt_loop(
        &self,
        handle: &ProviderHandle,
        instruction: &str,
        system_prompt: &str,
    ) -> ParseAttemptResult {
        let request = self.request(handle, instruction, system_prompt);

        for attempt in 0..=self.config.max_retries {
            let started = Instant::now();
            match handle.client.complete(&request) {
                Ok(content) => {
                    let latency = started.elapsed();
                    match schema::validate(&content) {
                        Ok(data) => {
                            info!(
                                provider = %handle.provider,
                                model = %handle.model,
                                retries = attempt,
                                latency_s = latency.as_secs_f64(),
                                "instruction parsed"
                            );
                            return ParseAttemptResult {
                                data,
                                latency,
                                retries: attempt,
                                success: true,
                                provider: handle.provider.to_string(),
                                model: handle.model.clone(),
                                fallback_occurred: false,
                            };
                        }
                        Err(e) => {
                            let (hint, _) = e.hint();
                            warn!(
                                attempt = attempt.saturating_add(1),
                                model = %handle.model,
                                error = %e,
                                %hint,
                                "invalid payload"
                            );
                        }
                    }
                }
                Err(e) => error!(
                    attempt = attempt.saturating_add(1),
                    model = %handle.model,
                    error = %e,
                    "LLM call failed"
                ),
            }
        }

        ParseAttemptResult {
            data: TaskSpecification::empty(),
            latency: Duration::ZERO,
            retries: self.config.max_retries.saturating_add(1),
            success: false,
            provider: handle.provider.to_string(),
            model: handle.model.clone(),
            fallback_occurred: false,
        }
    }
}
