//! Tavily search provider
//!
//! Alternative [`SearchProvider`] backed by the Tavily Search API. Tavily's
//! `content` snippet becomes the source description.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

use super::http::{send_json, RetryPolicy, DEFAULT_TIMEOUT_SECS};
use super::{SearchProvider, SearchResponse, Source};
use crate::error::ProviderError;

/// Public Tavily API endpoint
pub const DEFAULT_BASE_URL: &str = "https://api.tavily.com";

/// Search depth for Tavily API
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SearchDepth {
    /// Fast search with basic results
    #[default]
    Basic,
    /// More thorough search with detailed results
    Advanced,
}

/// Topic filter for Tavily API
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Topic {
    /// General web search
    #[default]
    General,
    /// Recent news articles
    News,
}

/// Tavily search provider
pub struct TavilySearch {
    api_key: String,
    base_url: String,
    client: Client,
    timeout: Duration,
    retry: RetryPolicy,
    max_results: u32,
    search_depth: SearchDepth,
    topic: Topic,
}

impl TavilySearch {
    /// Create a new provider with the given API key
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            client: Client::new(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            retry: RetryPolicy::default(),
            max_results: 5,
            search_depth: SearchDepth::default(),
            topic: Topic::default(),
        }
    }

    /// Create from environment variable TAVILY_API_KEY
    pub fn from_env() -> Result<Self, ProviderError> {
        let api_key = std::env::var("TAVILY_API_KEY").map_err(|_| {
            ProviderError::Config("TAVILY_API_KEY environment variable not set".to_string())
        })?;
        Ok(Self::new(api_key))
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set custom timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set custom retry policy
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Clamp to Tavily's accepted range of 1..=20
    pub fn with_max_results(mut self, max_results: u32) -> Self {
        self.max_results = max_results.clamp(1, 20);
        self
    }

    pub fn with_search_depth(mut self, depth: SearchDepth) -> Self {
        self.search_depth = depth;
        self
    }

    pub fn with_topic(mut self, topic: Topic) -> Self {
        self.topic = topic;
        self
    }
}

/// Request body for Tavily API
#[derive(Debug, Serialize)]
struct TavilyRequest<'a> {
    query: &'a str,
    max_results: u32,
    search_depth: SearchDepth,
    topic: Topic,
    include_answer: bool,
    include_raw_content: bool,
}

/// Response from Tavily API
#[derive(Debug, Deserialize)]
struct TavilyResponse {
    /// Search results
    results: Vec<TavilyResult>,
}

/// Individual search result
#[derive(Debug, Deserialize)]
struct TavilyResult {
    title: String,
    url: String,
    #[serde(default)]
    content: String,
}

impl From<TavilyResult> for Source {
    fn from(result: TavilyResult) -> Self {
        Source::new(result.url, result.title, result.content)
    }
}

#[async_trait]
impl SearchProvider for TavilySearch {
    async fn search(&self, query: &str) -> Result<SearchResponse, ProviderError> {
        info!(query = %query, "Tavily search");

        if query.len() > 400 {
            return Ok(SearchResponse::failed("Query too long (max 400 characters)"));
        }

        let request = TavilyRequest {
            query,
            max_results: self.max_results,
            search_depth: self.search_depth,
            topic: self.topic,
            include_answer: false,
            include_raw_content: false,
        };
        let url = format!("{}/search", self.base_url);

        let response: TavilyResponse = self
            .retry
            .run("tavily", || {
                send_json(
                    self.client
                        .post(&url)
                        .bearer_auth(&self.api_key)
                        .timeout(self.timeout)
                        .json(&request),
                )
            })
            .await?;

        debug!(query = %query, count = response.results.len(), "Tavily search answered");

        Ok(SearchResponse::ok(
            response.results.into_iter().map(Source::from).collect(),
        ))
    }

    fn name(&self) -> &str {
        "tavily"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_depth_serialization() {
        assert_eq!(
            serde_json::to_string(&SearchDepth::Advanced).unwrap(),
            "\"advanced\""
        );
        assert_eq!(serde_json::to_string(&Topic::News).unwrap(), "\"news\"");
    }

    #[test]
    fn test_max_results_clamped() {
        assert_eq!(TavilySearch::new("k").with_max_results(0).max_results, 1);
        assert_eq!(TavilySearch::new("k").with_max_results(99).max_results, 20);
    }

    #[tokio::test]
    async fn test_overlong_query_reported_as_failure() {
        let tavily = TavilySearch::new("k");
        let response = tavily.search(&"x".repeat(401)).await.unwrap();
        assert!(!response.success);
    }
}
