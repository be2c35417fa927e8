//! Summarisation: send the extracted notice text to an LLM and decode the
//! JSON it returns.
//!
//! The LLM is an opaque text-in / JSON-out collaborator. The prompt lives in
//! [`crate::prompts`]; fence stripping and JSON decoding live in
//! [`crate::pipeline::postprocess`]. This module only drives the call and
//! enforces its deadline.

use crate::config::AnalyzerConfig;
use crate::error::AnalyzerError;
use crate::pipeline::postprocess::parse_summary;
use crate::prompts::notice_prompt;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, warn};

/// Turns notice text into a structured JSON summary.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, text: &str) -> Result<serde_json::Value, AnalyzerError>;
}

/// [`Summarizer`] backed by an `edgequake_llm` provider.
pub struct LlmSummarizer {
    provider: Arc<dyn LLMProvider>,
    options: CompletionOptions,
    timeout_secs: u64,
}

impl LlmSummarizer {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &AnalyzerConfig) -> Self {
        Self {
            provider,
            options: build_options(config),
            timeout_secs: config.llm_timeout_secs,
        }
    }

    /// Create the provider named in the config.
    ///
    /// Fails when the provider's credential (e.g. `GEMINI_API_KEY`) is not
    /// present; callers treat that as "LLM capability off".
    pub fn from_config(config: &AnalyzerConfig) -> Result<Self, AnalyzerError> {
        let provider =
            ProviderFactory::create_llm_provider(&config.llm_provider, &config.llm_model)
                .map_err(|e| AnalyzerError::ProviderNotConfigured {
                    provider: config.llm_provider.clone(),
                    hint: format!("{e}"),
                })?;
        Ok(Self::new(provider, config))
    }
}

#[async_trait]
impl Summarizer for LlmSummarizer {
    async fn summarize(&self, text: &str) -> Result<serde_json::Value, AnalyzerError> {
        let start = Instant::now();
        let messages = vec![ChatMessage::user(notice_prompt(text))];

        let call = self.provider.chat(&messages, Some(&self.options));
        let response = match timeout(Duration::from_secs(self.timeout_secs), call).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                warn!(error = %e, "Summarisation call failed");
                return Err(AnalyzerError::LlmApiError {
                    message: e.to_string(),
                });
            }
            Err(_) => {
                warn!(secs = self.timeout_secs, "Summarisation call timed out");
                return Err(AnalyzerError::LlmTimeout {
                    secs: self.timeout_secs,
                });
            }
        };

        debug!(
            input_tokens = response.prompt_tokens,
            output_tokens = response.completion_tokens,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Summarisation complete"
        );

        parse_summary(&response.content).inspect_err(|e| {
            warn!(error = %e, raw = %response.content, "LLM returned a non-JSON summary");
        })
    }
}

/// Build `CompletionOptions` from the analyzer config.
fn build_options(config: &AnalyzerConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.llm_temperature),
        max_tokens: Some(config.llm_max_tokens),
        ..Default::default()
    }
}
