//! DuckDuckGo search provider
//!
//! Keyless [`SearchProvider`] that scrapes the DuckDuckGo HTML endpoint.
//! DuckDuckGo has no free web search API, so results are recovered from the
//! markup with a few fallback strategies and carry only a domain as title.

use async_trait::async_trait;
use reqwest::Client;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::http::DEFAULT_TIMEOUT_SECS;
use super::{host_of, SearchProvider, SearchResponse, Source};
use crate::error::ProviderError;

const DEFAULT_BASE_URL: &str = "https://html.duckduckgo.com";

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Politeness delay before each request
const REQUEST_DELAY_MS: u64 = 500;

/// DuckDuckGo HTML search provider
#[derive(Debug, Clone)]
pub struct DuckDuckGoSearch {
    max_results: usize,
    base_url: String,
    timeout: Duration,
    request_delay: Duration,
}

impl DuckDuckGoSearch {
    pub fn new(max_results: usize) -> Self {
        Self {
            max_results: max_results.max(1),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            request_delay: Duration::from_millis(REQUEST_DELAY_MS),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = delay;
        self
    }

    async fn fetch_html(&self, query: &str) -> Result<String, ProviderError> {
        let client = Client::builder()
            .timeout(self.timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ProviderError::Config(e.to_string()))?;

        let url = format!("{}/html/?q={}", self.base_url, urlencoding::encode(query));
        debug!(url = %url, "Fetching search results");

        let response = client
            .get(&url)
            .send()
            .await
            .map_err(ProviderError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(status.as_u16(), body));
        }

        response.text().await.map_err(ProviderError::from_transport)
    }

    /// Parse DuckDuckGo HTML to extract results.
    /// Uses multiple strategies to handle different HTML formats.
    fn parse_html(&self, html: &str) -> Vec<Source> {
        let mut collector = Collector::new(self.max_results);

        // Strategy 1: result links carrying the uddg redirect parameter
        for segment in html.split("uddg=").skip(1) {
            if collector.is_full() {
                break;
            }
            if let Some(end) = segment.find(['&', '"', '\'']) {
                if let Ok(url) = urlencoding::decode(&segment[..end]) {
                    if url.starts_with("http") && !url.contains("duckduckgo.com") {
                        collector.push(url.into_owned(), "Search result from DuckDuckGo");
                    }
                }
            }
        }

        // Strategy 2: the result__url class holding the visible URL
        for segment in html.split("result__url").skip(1) {
            if collector.is_full() {
                break;
            }
            let Some(href_start) = segment.find("href=\"") else {
                continue;
            };
            let after_href = &segment[href_start + 6..];
            let Some(href_end) = after_href.find('"') else {
                continue;
            };
            let href = &after_href[..href_end];
            let url = if let Some(rest) = href.strip_prefix("//") {
                format!("https://{}", rest)
            } else if href.starts_with("http") {
                href.to_string()
            } else {
                continue;
            };
            if !url.contains("duckduckgo.com") {
                collector.push(url, "Search result");
            }
        }

        // Strategy 3: any bare https:// URL that is not an asset
        for segment in html.split("https://").skip(1) {
            if collector.is_full() {
                break;
            }
            let Some(end) = segment.find(['"', '\'', '<', '>', ' ', ')']) else {
                continue;
            };
            let domain_path = &segment[..end];
            let is_asset = [".js", ".css", ".png", ".ico", "cdn."]
                .iter()
                .any(|marker| domain_path.contains(marker));
            if !domain_path.starts_with("duckduckgo")
                && !domain_path.starts_with("improving.duckduckgo")
                && !is_asset
                && domain_path.contains('.')
                && domain_path.len() > 5
            {
                collector.push(format!("https://{}", domain_path), "Search result");
            }
        }

        collector.results
    }
}

/// De-duplicating, capped result accumulator
struct Collector {
    results: Vec<Source>,
    seen: HashSet<String>,
    limit: usize,
}

impl Collector {
    fn new(limit: usize) -> Self {
        Self {
            results: Vec::new(),
            seen: HashSet::new(),
            limit,
        }
    }

    fn is_full(&self) -> bool {
        self.results.len() >= self.limit
    }

    fn push(&mut self, url: String, description: &str) {
        if self.is_full() || !self.seen.insert(url.clone()) {
            return;
        }
        let title = host_of(&url).unwrap_or_else(|| "Result".to_string());
        self.results.push(Source::new(url, title, description));
    }
}

#[async_trait]
impl SearchProvider for DuckDuckGoSearch {
    async fn search(&self, query: &str) -> Result<SearchResponse, ProviderError> {
        info!(query = %query, "Performing web search");

        tokio::time::sleep(self.request_delay).await;

        let html = self.fetch_html(query).await?;
        let results = self.parse_html(&html);

        if results.is_empty() {
            warn!(query = %query, "No search results found");
        } else {
            info!(query = %query, count = results.len(), "Search completed");
        }

        Ok(SearchResponse::ok(results))
    }

    fn name(&self) -> &str {
        "duckduckgo"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const SAMPLE_HTML: &str = r#"
        <div class="result">
          <a class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fwww.rust-lang.org%2Flearn&amp;rut=abc">Learn Rust</a>
          <a class="result__url" href="//doc.rust-lang.org/book/">doc.rust-lang.org/book</a>
        </div>
        <div class="result">
          <a class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fwww.rust-lang.org%2Flearn&amp;rut=dup">Duplicate</a>
        </div>
        <script src="https://duckduckgo.com/dist/app.js"></script>
        <link href="https://cdn.example.com/style.css">
        <p>See https://blog.rust-lang.org/2024/ for news</p>
    "#;

    #[test]
    fn test_parse_html_strategies_and_dedup() {
        let ddg = DuckDuckGoSearch::new(10);
        let results = ddg.parse_html(SAMPLE_HTML);

        let urls: Vec<&str> = results.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(urls[0], "https://www.rust-lang.org/learn");
        assert!(urls.contains(&"https://doc.rust-lang.org/book/"));
        assert!(urls.contains(&"https://blog.rust-lang.org/2024/"));
        assert_eq!(
            urls.iter().filter(|u| **u == "https://www.rust-lang.org/learn").count(),
            1
        );
        assert!(urls.iter().all(|u| !u.contains("duckduckgo.com")));
        assert!(urls.iter().all(|u| !u.contains("cdn.")));
        assert_eq!(results[0].title, "www.rust-lang.org");
    }

    #[test]
    fn test_parse_html_respects_limit() {
        let ddg = DuckDuckGoSearch::new(1);
        assert_eq!(ddg.parse_html(SAMPLE_HTML).len(), 1);
    }

    #[test]
    fn test_parse_html_empty() {
        let ddg = DuckDuckGoSearch::new(5);
        assert!(ddg.parse_html("<html><body>No results.</body></html>").is_empty());
    }

    #[tokio::test]
    async fn test_search_against_mock() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/html/"))
            .and(query_param("q", "rust book"))
            .respond_with(ResponseTemplate::new(200).set_body_string(SAMPLE_HTML))
            .mount(&mock_server)
            .await;

        let ddg = DuckDuckGoSearch::new(5)
            .with_base_url(mock_server.uri())
            .with_request_delay(Duration::ZERO);
        let response = ddg.search("rust book").await.unwrap();

        assert!(response.success);
        assert!(!response.results.is_empty());
    }

    #[tokio::test]
    async fn test_search_rate_limited() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/html/"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&mock_server)
            .await;

        let ddg = DuckDuckGoSearch::new(5)
            .with_base_url(mock_server.uri())
            .with_request_delay(Duration::ZERO);

        assert!(matches!(
            ddg.search("rust").await,
            Err(ProviderError::RateLimited)
        ));
    }
}
