//! # Configuration Module
//!
//! Loads the agent's settings from the environment (and an optional `.env`
//! file). Command-line flags are applied on top in `main.rs`, then
//! [`Config::validate`] fails fast on anything that would break a run.
//!
//! | Variable | Purpose | Default |
//! |----------|---------|---------|
//! | `LLM_PROVIDER` | `openai`, `anthropic` or `ollama` | `ollama` |
//! | `LLM_MODEL` | Model name | provider default |
//! | `OLLAMA_API_BASE_URL` | Ollama server | `http://localhost:11434` |
//! | `TEMPERATURE` | Sampling temperature | `0.3` |
//! | `SEARCH_BACKEND` | `firecrawl`, `tavily` or `duckduckgo` | firecrawl if keyed, else duckduckgo |
//! | `FIRECRAWL_API_KEY` / `FIRECRAWL_API_URL` | Firecrawl access | |
//! | `TAVILY_API_KEY` | Tavily access | |
//! | `MAX_DEPTH` | Research iterations | `7` |
//! | `TIME_LIMIT_SECS` | Wall-clock budget | `270` |
//! | `MAX_SEARCH_RESULTS` | Results per search | `5` |
//! | `HTTP_TIMEOUT_SECS` | Provider request timeout | `30` |

use anyhow::{Context, Result};
use clap::ValueEnum;
use deep_research::llm::LlmProviderKind;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Where web searches go
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SearchBackend {
    Firecrawl,
    Tavily,
    #[value(name = "duckduckgo", alias = "ddg")]
    DuckDuckGo,
}

impl SearchBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchBackend::Firecrawl => "firecrawl",
            SearchBackend::Tavily => "tavily",
            SearchBackend::DuckDuckGo => "duckduckgo",
        }
    }
}

/// Main configuration for the research agent.
#[derive(Debug, Clone)]
pub struct Config {
    pub llm_provider: LlmProviderKind,

    /// Model override; the provider's default model when unset
    pub model: Option<String>,

    /// Ollama server URL
    pub ollama_host: String,

    /// Temperature for LLM calls (0.0 = deterministic)
    pub temperature: f64,

    pub search_backend: SearchBackend,

    pub firecrawl_api_key: Option<String>,

    /// Self-hosted Firecrawl endpoint
    pub firecrawl_api_url: Option<String>,

    pub tavily_api_key: Option<String>,

    /// Research iterations before the final report
    pub max_depth: u32,

    pub time_limit_secs: u64,

    /// Results requested per search call
    pub max_search_results: usize,

    pub http_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            // Local inference needs no API key
            llm_provider: LlmProviderKind::Ollama,
            model: None,
            ollama_host: "http://localhost:11434".to_string(),
            temperature: 0.3,
            search_backend: SearchBackend::DuckDuckGo,
            firecrawl_api_key: None,
            firecrawl_api_url: None,
            tavily_api_key: None,
            max_depth: 7,
            time_limit_secs: 270,
            max_search_results: 5,
            http_timeout_secs: 30,
        }
    }
}

/// Read and parse `name` if it is set.
fn parse_var<T>(name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(val) => {
            let parsed = val
                .trim()
                .parse()
                .with_context(|| format!("{} has an invalid value: {:?}", name, val))?;
            Ok(Some(parsed))
        }
        Err(_) => Ok(None),
    }
}

/// Read `name`, treating blank values as unset.
fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// A `.env` file in the working directory is read first if present.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();

        let mut config = Config::default();

        if let Some(val) = non_empty_var("LLM_PROVIDER") {
            config.llm_provider = val.parse().context("LLM_PROVIDER is not recognised")?;
        }
        config.model = non_empty_var("LLM_MODEL");
        if let Some(val) = non_empty_var("OLLAMA_API_BASE_URL") {
            config.ollama_host = val;
        }
        if let Some(val) = parse_var("TEMPERATURE")? {
            config.temperature = val;
        }

        config.firecrawl_api_key = non_empty_var("FIRECRAWL_API_KEY");
        config.firecrawl_api_url = non_empty_var("FIRECRAWL_API_URL");
        config.tavily_api_key = non_empty_var("TAVILY_API_KEY");

        config.search_backend = match non_empty_var("SEARCH_BACKEND") {
            Some(val) => SearchBackend::from_str(&val, true)
                .map_err(|e| anyhow::anyhow!("SEARCH_BACKEND is not recognised: {}", e))?,
            None if config.firecrawl_api_key.is_some() => SearchBackend::Firecrawl,
            None => SearchBackend::DuckDuckGo,
        };

        if let Some(val) = parse_var("MAX_DEPTH")? {
            config.max_depth = val;
        }
        if let Some(val) = parse_var("TIME_LIMIT_SECS")? {
            config.time_limit_secs = val;
        }
        if let Some(val) = parse_var("MAX_SEARCH_RESULTS")? {
            config.max_search_results = val;
        }
        if let Some(val) = parse_var("HTTP_TIMEOUT_SECS")? {
            config.http_timeout_secs = val;
        }

        Ok(config)
    }

    /// The configured model, or the provider's default
    pub fn model_name(&self) -> &str {
        self.model
            .as_deref()
            .unwrap_or_else(|| self.llm_provider.default_model())
    }

    pub fn time_limit(&self) -> Duration {
        Duration::from_secs(self.time_limit_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Whether Firecrawl can be used for extraction
    pub fn has_firecrawl(&self) -> bool {
        self.firecrawl_api_key.is_some()
    }

    /// Validate the configuration before any client is built.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=2.0).contains(&self.temperature) {
            anyhow::bail!(
                "Temperature must be between 0.0 and 2.0, got: {}",
                self.temperature
            );
        }

        if !(1..=50).contains(&self.max_depth) {
            anyhow::bail!("MAX_DEPTH must be between 1 and 50, got: {}", self.max_depth);
        }

        if self.time_limit_secs > 3600 {
            anyhow::bail!(
                "TIME_LIMIT_SECS must be at most 3600, got: {}",
                self.time_limit_secs
            );
        }

        if self.max_search_results == 0 {
            anyhow::bail!("MAX_SEARCH_RESULTS must be at least 1");
        }

        if self.http_timeout_secs == 0 {
            anyhow::bail!("HTTP_TIMEOUT_SECS must be at least 1");
        }

        if self.model_name().trim().is_empty() {
            anyhow::bail!("LLM_MODEL cannot be empty");
        }

        match self.search_backend {
            SearchBackend::Firecrawl if self.firecrawl_api_key.is_none() => {
                anyhow::bail!("SEARCH_BACKEND=firecrawl requires FIRECRAWL_API_KEY")
            }
            SearchBackend::Tavily if self.tavily_api_key.is_none() => {
                anyhow::bail!("SEARCH_BACKEND=tavily requires TAVILY_API_KEY")
            }
            _ => {}
        }

        // Rig's hosted clients read their key from the environment
        let key_var = match self.llm_provider {
            LlmProviderKind::OpenAI => Some("OPENAI_API_KEY"),
            LlmProviderKind::Anthropic => Some("ANTHROPIC_API_KEY"),
            LlmProviderKind::Ollama => None,
        };
        if let Some(var) = key_var {
            if non_empty_var(var).is_none() {
                anyhow::bail!(
                    "LLM_PROVIDER={} requires {}",
                    self.llm_provider.as_str(),
                    var
                );
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.llm_provider, LlmProviderKind::Ollama);
        assert_eq!(config.model_name(), "llama3.2");
        assert_eq!(config.ollama_host, "http://localhost:11434");
        assert_eq!(config.search_backend, SearchBackend::DuckDuckGo);
        assert_eq!(config.max_depth, 7);
        assert_eq!(config.time_limit(), Duration::from_secs(270));
    }

    #[test]
    fn test_config_validation_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_model_override() {
        let config = Config {
            model: Some("qwen2.5".to_string()),
            ..Config::default()
        };
        assert_eq!(config.model_name(), "qwen2.5");
    }

    #[test]
    fn test_config_validation_ranges() {
        let mut config = Config::default();
        config.temperature = 3.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.max_depth = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.time_limit_secs = 7200;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.max_search_results = 0;
        assert!(config.validate().is_err());

        // A zero time limit is allowed: the run goes straight to synthesis
        let mut config = Config::default();
        config.time_limit_secs = 0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_backend_keys() {
        let mut config = Config::default();
        config.search_backend = SearchBackend::Firecrawl;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("FIRECRAWL_API_KEY"));

        config.firecrawl_api_key = Some("fc-test".to_string());
        assert!(config.validate().is_ok());

        config.search_backend = SearchBackend::Tavily;
        assert!(config.validate().is_err());
        config.tavily_api_key = Some("tvly-test".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_search_backend_names() {
        assert_eq!(
            SearchBackend::from_str("DuckDuckGo", true).unwrap(),
            SearchBackend::DuckDuckGo
        );
        assert_eq!(SearchBackend::from_str("ddg", true).unwrap(), SearchBackend::DuckDuckGo);
        assert_eq!(SearchBackend::from_str("tavily", true).unwrap(), SearchBackend::Tavily);
        assert!(SearchBackend::from_str("bing", true).is_err());
        assert_eq!(SearchBackend::Firecrawl.as_str(), "firecrawl");
    }
}
