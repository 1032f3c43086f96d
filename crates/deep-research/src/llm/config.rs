//! LLM configuration types

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::ProviderError;

/// Supported LLM provider types
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProviderKind {
    #[default]
    OpenAI,
    Anthropic,
    Ollama,
}

impl LlmProviderKind {
    /// Model used when none is configured
    pub fn default_model(&self) -> &'static str {
        match self {
            LlmProviderKind::OpenAI => "gpt-4.1",
            LlmProviderKind::Anthropic => "claude-3-5-sonnet-latest",
            LlmProviderKind::Ollama => "llama3.2",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LlmProviderKind::OpenAI => "openai",
            LlmProviderKind::Anthropic => "anthropic",
            LlmProviderKind::Ollama => "ollama",
        }
    }
}

impl FromStr for LlmProviderKind {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(LlmProviderKind::OpenAI),
            "anthropic" | "claude" => Ok(LlmProviderKind::Anthropic),
            "ollama" => Ok(LlmProviderKind::Ollama),
            other => Err(ProviderError::Config(format!(
                "unknown LLM provider '{}' (expected openai, anthropic or ollama)",
                other
            ))),
        }
    }
}

/// LLM Provider configuration
///
/// # Example
///
/// ```
/// use deep_research::llm::{LlmConfig, LlmProviderKind};
///
/// let config = LlmConfig::new(LlmProviderKind::Ollama)
///     .with_model("deepseek-r1")
///     .with_temperature(0.2);
///
/// assert_eq!(config.model, "deepseek-r1");
/// assert_eq!(config.temperature, Some(0.2));
/// ```
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LlmConfig {
    pub provider: LlmProviderKind,
    /// Model identifier (e.g., "gpt-4.1", "claude-3-5-sonnet-latest")
    pub model: String,
    /// Sampling temperature (0.0 - 2.0)
    pub temperature: Option<f64>,
    /// Output cap applied when a call does not ask for one
    pub default_max_tokens: Option<u64>,
    /// Ollama server URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
}

impl LlmConfig {
    pub fn new(provider: LlmProviderKind) -> Self {
        Self {
            provider,
            model: provider.default_model().to_string(),
            temperature: None,
            default_max_tokens: None,
            api_base: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the sampling temperature
    pub fn with_temperature(mut self, temp: f64) -> Self {
        self.temperature = Some(temp);
        self
    }

    pub fn with_default_max_tokens(mut self, tokens: u64) -> Self {
        self.default_max_tokens = Some(tokens);
        self
    }

    /// Set a custom API base URL
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = Some(base.into());
        self
    }
}
