//! Rig-backed text generation
//!
//! Each call builds a fresh agent on the configured client, mirroring how the
//! one-shot analysis and synthesis prompts are used: no conversation history,
//! no tools.

use async_trait::async_trait;
use rig::client::{CompletionClient, Nothing};
use rig::completion::Prompt;
use rig::providers::{anthropic, ollama, openai};
use tracing::debug;

use super::config::{LlmConfig, LlmProviderKind};
use crate::error::ProviderError;
use crate::providers::{Generation, TextGenerationProvider};

/// Anthropic requires max_tokens on every request
const ANTHROPIC_DEFAULT_MAX_TOKENS: u64 = 4096;

/// Where a local Ollama server listens unless `api_base` says otherwise
const OLLAMA_DEFAULT_BASE_URL: &str = "http://localhost:11434";

enum RigClient {
    OpenAI(openai::Client),
    Anthropic(anthropic::Client),
    Ollama(ollama::Client),
}

/// [`TextGenerationProvider`] over Rig's OpenAI, Anthropic and Ollama clients.
///
/// # Example
///
/// ```rust,ignore
/// use deep_research::llm::{LlmConfig, LlmProviderKind, RigTextGenerator};
///
/// // Reads OPENAI_API_KEY
/// let llm = RigTextGenerator::from_env(LlmConfig::new(LlmProviderKind::OpenAI))?;
/// let answer = llm.generate("Say hello.", None).await?;
/// ```
pub struct RigTextGenerator {
    client: RigClient,
    config: LlmConfig,
}

impl RigTextGenerator {
    /// Create a generator for `config.provider`.
    ///
    /// OpenAI and Anthropic read `OPENAI_API_KEY` / `ANTHROPIC_API_KEY` (and
    /// `OPENAI_BASE_URL`). A missing key is a `ProviderError::Config`. Ollama
    /// needs no key and talks to `config.api_base`, or the local server.
    pub fn from_env(config: LlmConfig) -> Result<Self, ProviderError> {
        let client = match config.provider {
            LlmProviderKind::OpenAI => {
                let key = api_key("OPENAI_API_KEY")?;
                let mut builder = openai::Client::builder().api_key(&key);
                if let Ok(base) = std::env::var("OPENAI_BASE_URL") {
                    builder = builder.base_url(base);
                }
                RigClient::OpenAI(builder.build().map_err(client_error)?)
            }
            LlmProviderKind::Anthropic => {
                let key = api_key("ANTHROPIC_API_KEY")?;
                let client = anthropic::Client::builder()
                    .api_key(key)
                    .build()
                    .map_err(client_error)?;
                RigClient::Anthropic(client)
            }
            LlmProviderKind::Ollama => {
                let base = config.api_base.as_deref().unwrap_or(OLLAMA_DEFAULT_BASE_URL);
                let client = ollama::Client::builder()
                    .api_key(Nothing)
                    .base_url(base)
                    .build()
                    .map_err(client_error)?;
                RigClient::Ollama(client)
            }
        };

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &LlmConfig {
        &self.config
    }
}

fn api_key(var: &str) -> Result<String, ProviderError> {
    std::env::var(var)
        .ok()
        .filter(|key| !key.trim().is_empty())
        .ok_or_else(|| ProviderError::Config(format!("{} is not set", var)))
}

fn client_error(e: rig::http_client::Error) -> ProviderError {
    ProviderError::Config(format!("failed to build LLM client: {}", e))
}

/// The max_tokens to send: the caller's value, then the configured default.
/// Anthropic always gets one.
fn effective_max_tokens(config: &LlmConfig, requested: Option<u64>) -> Option<u64> {
    let max_tokens = requested.or(config.default_max_tokens);
    match config.provider {
        LlmProviderKind::Anthropic => Some(max_tokens.unwrap_or(ANTHROPIC_DEFAULT_MAX_TOKENS)),
        _ => max_tokens,
    }
}

/// Build a one-shot agent on `$client` and run `$prompt` through it.
macro_rules! prompt_once {
    ($client:expr, $config:expr, $prompt:expr, $max_tokens:expr) => {{
        let mut builder = $client.agent(&$config.model);
        if let Some(temperature) = $config.temperature {
            builder = builder.temperature(temperature);
        }
        if let Some(max_tokens) = $max_tokens {
            builder = builder.max_tokens(max_tokens);
        }
        let agent = builder.build();
        agent.prompt($prompt).await
    }};
}

#[async_trait]
impl TextGenerationProvider for RigTextGenerator {
    async fn generate(
        &self,
        prompt: &str,
        max_tokens: Option<u64>,
    ) -> Result<Generation, ProviderError> {
        let max_tokens = effective_max_tokens(&self.config, max_tokens);
        debug!(
            provider = self.config.provider.as_str(),
            model = %self.config.model,
            max_tokens = ?max_tokens,
            prompt_chars = prompt.len(),
            "Generating text"
        );

        let result = match &self.client {
            RigClient::OpenAI(client) => prompt_once!(client, self.config, prompt, max_tokens),
            RigClient::Anthropic(client) => prompt_once!(client, self.config, prompt, max_tokens),
            RigClient::Ollama(client) => prompt_once!(client, self.config, prompt, max_tokens),
        };

        let text = result.map_err(|e| {
            ProviderError::Llm(format!(
                "{} completion failed: {}",
                self.config.provider.as_str(),
                e
            ))
        })?;

        Ok(Generation { text })
    }

    fn name(&self) -> &str {
        self.config.provider.as_str()
    }
}
