//! # Agent Module
//!
//! Wires the configured providers into a [`ResearchController`] and offers a
//! quick single-search mode that skips the research loop.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, info, warn};

use deep_research::llm::{LlmConfig, LlmProviderKind, RigTextGenerator};
use deep_research::providers::{
    host_of, DuckDuckGoSearch, FirecrawlClient, PageExtractor, TavilySearch,
};
use deep_research::research::DeliveryReport;
use deep_research::{
    ExtractProvider, ProgressSink, ResearchConfig, ResearchController, ResearchResult,
    SearchProvider, Source, TextGenerationProvider,
};

use crate::config::{Config, SearchBackend};

/// Favicon lookup for a host
pub fn favicon_url(host: &str) -> String {
    format!(
        "https://www.google.com/s2/favicons?domain={}&sz=32",
        urlencoding::encode(host)
    )
}

/// Render search results as a numbered Markdown list.
pub fn format_sources(query: &str, sources: &[Source]) -> String {
    if sources.is_empty() {
        return format!("No results found for: {}", query);
    }

    let formatted: String = sources
        .iter()
        .enumerate()
        .map(|(i, s)| {
            let title = if s.title.is_empty() { &s.url } else { &s.title };
            let favicon = host_of(&s.url)
                .map(|host| favicon_url(&host))
                .unwrap_or_default();
            let mut entry = format!("{}. ![]({}) **{}**\n", i + 1, favicon, title);
            if !s.description.is_empty() {
                entry.push_str(&format!("   {}\n", s.description));
            }
            entry.push_str(&format!("   URL: {}\n", s.url));
            entry
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!("## Search Results\n\n{}", formatted)
}

/// The research agent: configured providers plus loop settings.
pub struct ResearchAgent {
    config: Config,
    search: Arc<dyn SearchProvider>,
    extract: Arc<dyn ExtractProvider>,
    llm: Arc<dyn TextGenerationProvider>,
}

impl ResearchAgent {
    /// Build providers from a validated configuration.
    pub fn new(config: Config) -> Result<Self> {
        let mut llm_config = LlmConfig::new(config.llm_provider)
            .with_model(config.model_name())
            .with_temperature(config.temperature);
        if config.llm_provider == LlmProviderKind::Ollama {
            llm_config = llm_config.with_api_base(config.ollama_host.clone());
        }
        let llm: Arc<dyn TextGenerationProvider> = Arc::new(
            RigTextGenerator::from_env(llm_config).context("Failed to create the LLM client")?,
        );

        let firecrawl = config.firecrawl_api_key.as_ref().map(|key| {
            let client = FirecrawlClient::new(key.clone())
                .with_timeout(config.http_timeout())
                .with_search_limit(config.max_search_results as u32);
            match &config.firecrawl_api_url {
                Some(url) => client.with_base_url(url.clone()),
                None => client,
            }
        });

        let search: Arc<dyn SearchProvider> = match config.search_backend {
            SearchBackend::Firecrawl => Arc::new(
                firecrawl
                    .clone()
                    .context("Firecrawl search selected but FIRECRAWL_API_KEY is not set")?,
            ),
            SearchBackend::Tavily => {
                let key = config
                    .tavily_api_key
                    .clone()
                    .context("Tavily search selected but TAVILY_API_KEY is not set")?;
                Arc::new(
                    TavilySearch::new(key)
                        .with_timeout(config.http_timeout())
                        .with_max_results(config.max_search_results as u32),
                )
            }
            SearchBackend::DuckDuckGo => Arc::new(
                DuckDuckGoSearch::new(config.max_search_results).with_timeout(config.http_timeout()),
            ),
        };

        // Firecrawl extracts when a key exists; otherwise pages are fetched and
        // summarised by the model.
        let extract: Arc<dyn ExtractProvider> = match firecrawl {
            Some(client) => Arc::new(client),
            None => Arc::new(PageExtractor::new(llm.clone()).with_timeout(config.http_timeout())),
        };

        debug!(
            search = search.name(),
            extract = extract.name(),
            llm = llm.name(),
            model = %config.model_name(),
            "Providers configured"
        );

        Ok(Self::with_providers(config, search, extract, llm))
    }

    /// Assemble an agent from ready-made providers.
    pub fn with_providers(
        config: Config,
        search: Arc<dyn SearchProvider>,
        extract: Arc<dyn ExtractProvider>,
        llm: Arc<dyn TextGenerationProvider>,
    ) -> Self {
        Self {
            config,
            search,
            extract,
            llm,
        }
    }

    pub fn research_config(&self) -> ResearchConfig {
        ResearchConfig::new()
            .with_max_depth(self.config.max_depth)
            .with_time_limit(self.config.time_limit())
    }

    /// Run the full research loop, streaming progress into `sink`.
    ///
    /// The delivery report says whether every event reached the sink.
    pub async fn research(
        &self,
        topic: &str,
        sink: Arc<dyn ProgressSink>,
    ) -> (ResearchResult, DeliveryReport) {
        info!(topic = %topic, "Starting research task");

        let controller = ResearchController::new(
            self.search.clone(),
            self.extract.clone(),
            self.llm.clone(),
        )
        .with_config(self.research_config());

        let (result, delivery) = controller.run_with_sink(topic, sink).await;
        if delivery.dropped > 0 || delivery.failed > 0 {
            warn!(?delivery, "Some progress events were not delivered");
        } else {
            debug!(?delivery, "Progress delivery");
        }
        (result, delivery)
    }

    /// One search, formatted, without extraction or synthesis.
    pub async fn quick_search(&self, query: &str) -> Result<String> {
        info!(query = %query, search = self.search.name(), "Performing quick search");

        let response = self
            .search
            .search(query)
            .await
            .with_context(|| format!("Search failed for \"{}\"", query))?;
        if !response.success {
            anyhow::bail!(
                "Search failed for \"{}\": {}",
                query,
                response.error.unwrap_or_else(|| "unknown error".to_string())
            );
        }

        Ok(format_sources(query, &response.results))
    }
}
