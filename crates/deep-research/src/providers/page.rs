//! Keyless page extractor
//!
//! Fetches each page directly, reduces the HTML to readable text and lets the
//! reasoning model pull out what the extraction prompt asks for. Used when no
//! hosted extraction service is configured.

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tracing::debug;

use super::http::DEFAULT_TIMEOUT_SECS;
use super::{ExtractData, ExtractItem, ExtractProvider, ExtractResponse, TextGenerationProvider};
use crate::error::ProviderError;

/// Page text beyond this many characters is cut before prompting
const DEFAULT_MAX_PAGE_CHARS: usize = 12_000;

/// Output budget for one page extraction
const EXTRACTION_MAX_TOKENS: u64 = 2048;

/// LLM-backed extractor over raw page fetches
pub struct PageExtractor {
    client: Client,
    llm: Arc<dyn TextGenerationProvider>,
    timeout: Duration,
    max_page_chars: usize,
}

impl PageExtractor {
    pub fn new(llm: Arc<dyn TextGenerationProvider>) -> Self {
        Self {
            client: Client::new(),
            llm,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_page_chars: DEFAULT_MAX_PAGE_CHARS,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_page_chars(mut self, max: usize) -> Self {
        self.max_page_chars = max;
        self
    }

    async fn fetch_text(&self, url: &str) -> Result<String, ProviderError> {
        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(ProviderError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(status.as_u16(), body));
        }

        let html = response.text().await.map_err(ProviderError::from_transport)?;
        Ok(truncate_chars(&html_to_text(&html), self.max_page_chars))
    }

    async fn extract_one(&self, url: &str, prompt: &str) -> Result<String, ProviderError> {
        let text = self.fetch_text(url).await?;
        if text.is_empty() {
            return Err(ProviderError::Rejected(format!("{} has no readable text", url)));
        }
        debug!(url = %url, chars = text.len(), "Page fetched for extraction");

        let request = format!(
            "{prompt}\n\nSource URL: {url}\n\nPage content:\n{text}\n\n\
             Respond with the extracted information only."
        );
        let generation = self.llm.generate(&request, Some(EXTRACTION_MAX_TOKENS)).await?;
        Ok(generation.text)
    }
}

#[async_trait]
impl ExtractProvider for PageExtractor {
    async fn extract(
        &self,
        urls: &[String],
        prompt: &str,
    ) -> Result<ExtractResponse, ProviderError> {
        let mut items = Vec::with_capacity(urls.len());
        for url in urls {
            let text = self.extract_one(url, prompt).await?;
            items.push(ExtractItem {
                data: serde_json::Value::String(text),
            });
        }
        Ok(ExtractResponse::ok(ExtractData::Items(items)))
    }

    fn name(&self) -> &str {
        "page"
    }
}

fn strip_patterns() -> &'static [Regex; 3] {
    static PATTERNS: OnceLock<[Regex; 3]> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            Regex::new(r"(?is)<(script|style|noscript|svg|head)\b.*?</(script|style|noscript|svg|head)>")
                .unwrap(),
            Regex::new(r"(?s)<[^>]*>").unwrap(),
            Regex::new(r"\s+").unwrap(),
        ]
    })
}

/// Reduce an HTML document to whitespace-normalized text.
pub fn html_to_text(html: &str) -> String {
    let [blocks, tags, spaces] = strip_patterns();
    let without_blocks = blocks.replace_all(html, " ");
    let without_tags = tags.replace_all(&without_blocks, " ");
    let decoded = without_tags
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'");
    spaces.replace_all(&decoded, " ").trim().to_string()
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...[truncated]", &text[..idx]),
        None => text.to_string(),
    }
}
