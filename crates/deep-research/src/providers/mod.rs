//! External collaborator contracts
//!
//! The research core talks to three providers and nothing else:
//!
//! ```text
//! ┌──────────────────────┐   search(query)            ┌──────────────────┐
//! │                      │ ─────────────────────────▶ │  SearchProvider  │
//! │                      │   extract(urls, prompt)    ├──────────────────┤
//! │ ResearchController   │ ─────────────────────────▶ │  ExtractProvider │
//! │                      │   generate(prompt, max)    ├──────────────────┤
//! │                      │ ─────────────────────────▶ │ TextGeneration   │
//! └──────────────────────┘                            └──────────────────┘
//! ```
//!
//! Concrete adapters live in the submodules; tests supply their own.

pub mod duckduckgo;
pub mod firecrawl;
pub mod http;
pub mod page;
pub mod tavily;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

pub use duckduckgo::DuckDuckGoSearch;
pub use firecrawl::FirecrawlClient;
pub use page::PageExtractor;
pub use tavily::TavilySearch;

/// A candidate page returned by a search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub url: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl Source {
    pub fn new(
        url: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            description: description.into(),
        }
    }
}

/// Raw search response as reported by the provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResponse {
    pub success: bool,
    #[serde(default, alias = "data")]
    pub results: Vec<Source>,
    #[serde(default)]
    pub error: Option<String>,
}

impl SearchResponse {
    pub fn ok(results: Vec<Source>) -> Self {
        Self {
            success: true,
            results,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            results: Vec::new(),
            error: Some(error.into()),
        }
    }
}

/// One extracted chunk in the list form of an extract response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractItem {
    pub data: serde_json::Value,
}

/// Extracted content: a list of chunks, plain text, or a structured object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExtractData {
    Items(Vec<ExtractItem>),
    Text(String),
    Structured(serde_json::Value),
}

impl ExtractData {
    /// Flatten into text chunks, one per finding.
    pub fn into_texts(self) -> Vec<String> {
        match self {
            ExtractData::Items(items) => items.into_iter().map(|i| value_text(i.data)).collect(),
            ExtractData::Text(text) => vec![text],
            ExtractData::Structured(value) => vec![value_text(value)],
        }
    }
}

fn value_text(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        other => serde_json::to_string_pretty(&other).unwrap_or_else(|_| other.to_string()),
    }
}

/// Raw extract response as reported by the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractResponse {
    pub success: bool,
    #[serde(default)]
    pub data: Option<ExtractData>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ExtractResponse {
    pub fn ok(data: ExtractData) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }
}

/// Output of a text generation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    pub text: String,
}

/// Web search provider
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, query: &str) -> Result<SearchResponse, ProviderError>;

    fn name(&self) -> &str;
}

/// Page content extraction provider
#[async_trait]
pub trait ExtractProvider: Send + Sync {
    async fn extract(&self, urls: &[String], prompt: &str)
        -> Result<ExtractResponse, ProviderError>;

    fn name(&self) -> &str;
}

/// Reasoning model used for both analysis (JSON-shaped text) and synthesis.
#[async_trait]
pub trait TextGenerationProvider: Send + Sync {
    async fn generate(
        &self,
        prompt: &str,
        max_tokens: Option<u64>,
    ) -> Result<Generation, ProviderError>;

    fn name(&self) -> &str;
}

/// Extract the host part of a URL, e.g. `www.example.com`.
pub fn host_of(url: &str) -> Option<String> {
    reqwest::Url::parse(url).ok()?.host_str().map(str::to_string)
}
