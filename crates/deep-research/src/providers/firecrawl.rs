//! Firecrawl client - web search and LLM-backed page extraction
//!
//! Implements both [`SearchProvider`] and [`ExtractProvider`] against the
//! Firecrawl v1 HTTP API.
//!
//! # Production Features
//!
//! - HTTP timeout and retry with exponential backoff
//! - Typed error handling for rate limits and timeouts
//! - Asynchronous extract jobs are polled until they settle
//! - Base URL override for self-hosted deployments

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::http::{send_json, RetryPolicy, DEFAULT_TIMEOUT_SECS};
use super::{ExtractData, ExtractProvider, ExtractResponse, SearchProvider, SearchResponse};
use crate::error::ProviderError;

/// Public Firecrawl API endpoint
pub const DEFAULT_BASE_URL: &str = "https://api.firecrawl.dev";

/// Default number of results requested per search
const DEFAULT_SEARCH_LIMIT: u32 = 5;

/// Delay between extract job status checks
const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

/// Maximum number of status checks before an extract job is abandoned
const DEFAULT_MAX_POLLS: u32 = 60;

/// Firecrawl API client
///
/// # Example
/// ```ignore
/// let firecrawl = FirecrawlClient::new("fc-...").with_search_limit(5);
/// let results = firecrawl.search("Rust async runtimes").await?;
/// ```
#[derive(Debug, Clone)]
pub struct FirecrawlClient {
    api_key: String,
    base_url: String,
    client: Client,
    timeout: Duration,
    retry: RetryPolicy,
    search_limit: u32,
    poll_interval: Duration,
    max_polls: u32,
}

impl FirecrawlClient {
    /// Create a new client with the given API key
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            client: Client::new(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            retry: RetryPolicy::default(),
            search_limit: DEFAULT_SEARCH_LIMIT,
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            max_polls: DEFAULT_MAX_POLLS,
        }
    }

    /// Create from environment variables `FIRECRAWL_API_KEY` and, optionally,
    /// `FIRECRAWL_API_URL`
    pub fn from_env() -> Result<Self, ProviderError> {
        let api_key = std::env::var("FIRECRAWL_API_KEY").map_err(|_| {
            ProviderError::Config("FIRECRAWL_API_KEY environment variable not set".to_string())
        })?;
        let mut client = Self::new(api_key);
        if let Ok(url) = std::env::var("FIRECRAWL_API_URL") {
            client = client.with_base_url(url);
        }
        Ok(client)
    }

    /// Point the client at another deployment
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

    /// Set the number of results requested per search
    pub fn with_search_limit(mut self, limit: u32) -> Self {
        self.search_limit = limit.max(1);
        self
    }

    /// Set how extract jobs are polled
    pub fn with_polling(mut self, interval: Duration, max_polls: u32) -> Self {
        self.poll_interval = interval;
        self.max_polls = max_polls;
        self
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn post<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> reqwest::RequestBuilder {
        self.client
            .post(self.endpoint(path))
            .bearer_auth(&self.api_key)
            .timeout(self.timeout)
            .json(body)
    }

    async fn poll_extract_job(&self, id: &str) -> Result<ExtractResponse, ProviderError> {
        let url = self.endpoint(&format!("/v1/extract/{}", id));

        for poll in 0..self.max_polls {
            tokio::time::sleep(self.poll_interval).await;

            let status: ExtractJobResponse = self
                .retry
                .run("firecrawl", || {
                    send_json(
                        self.client
                            .get(&url)
                            .bearer_auth(&self.api_key)
                            .timeout(self.timeout),
                    )
                })
                .await?;

            debug!(job_id = %id, poll, status = ?status.status, "Polled extract job");

            match status.status {
                Some(JobStatus::Completed) => {
                    return Ok(match status.data {
                        Some(data) => ExtractResponse::ok(data),
                        None => ExtractResponse::failed("extract job completed without data"),
                    });
                }
                Some(JobStatus::Failed) | Some(JobStatus::Cancelled) => {
                    return Ok(ExtractResponse::failed(
                        status
                            .error
                            .unwrap_or_else(|| "extract job did not complete".to_string()),
                    ));
                }
                Some(JobStatus::Processing) | None => {}
            }

            if !status.success {
                return Ok(ExtractResponse::failed(
                    status.error.unwrap_or_else(|| "extract job failed".to_string()),
                ));
            }
        }

        warn!(job_id = %id, polls = self.max_polls, "Extract job did not settle in time");
        Err(ProviderError::Timeout)
    }
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    limit: u32,
}

#[derive(Debug, Serialize)]
struct ExtractRequest<'a> {
    urls: &'a [String],
    prompt: &'a str,
}

/// Initial answer to an extract request: either inline data or a job id.
#[derive(Debug, Deserialize)]
struct ExtractStartResponse {
    success: bool,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    data: Option<ExtractData>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum JobStatus {
    Processing,
    Completed,
    Failed,
    Cancelled,
}

#[derive(Debug, Deserialize)]
struct ExtractJobResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    status: Option<JobStatus>,
    #[serde(default)]
    data: Option<ExtractData>,
    #[serde(default)]
    error: Option<String>,
}

#[async_trait]
impl SearchProvider for FirecrawlClient {
    async fn search(&self, query: &str) -> Result<SearchResponse, ProviderError> {
        info!(query = %query, "Firecrawl search");

        let request = SearchRequest {
            query,
            limit: self.search_limit,
        };
        let response: SearchResponse = self
            .retry
            .run("firecrawl", || send_json(self.post("/v1/search", &request)))
            .await?;

        debug!(
            query = %query,
            success = response.success,
            count = response.results.len(),
            "Firecrawl search answered"
        );
        Ok(response)
    }

    fn name(&self) -> &str {
        "firecrawl"
    }
}

#[async_trait]
impl ExtractProvider for FirecrawlClient {
    async fn extract(
        &self,
        urls: &[String],
        prompt: &str,
    ) -> Result<ExtractResponse, ProviderError> {
        debug!(urls = ?urls, "Firecrawl extract");

        let request = ExtractRequest { urls, prompt };
        let started: ExtractStartResponse = self
            .retry
            .run("firecrawl", || send_json(self.post("/v1/extract", &request)))
            .await?;

        if !started.success {
            return Ok(ExtractResponse::failed(
                started.error.unwrap_or_else(|| "extract rejected".to_string()),
            ));
        }

        match (started.data, started.id) {
            (Some(data), _) => Ok(ExtractResponse::ok(data)),
            (None, Some(id)) => self.poll_extract_job(&id).await,
            (None, None) => Err(ProviderError::ParseError(
                "extract response carried neither data nor job id".to_string(),
            )),
        }
    }

    fn name(&self) -> &str {
        "firecrawl"
    }
}
