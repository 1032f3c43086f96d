use futures::future::join_all;
use tracing::{debug, warn};

use super::StepContext;
use crate::providers::{host_of, ExtractProvider, Source};
use crate::research::events::{ActivityKind, ActivityStatus};
use crate::research::state::Finding;

/// URLs to extract this iteration: the carried `url_to_search` hint first,
/// then the top `limit` search results, without blanks or repeats.
pub fn extraction_targets(url_to_search: &str, results: &[Source], limit: usize) -> Vec<String> {
    let mut targets: Vec<String> = Vec::with_capacity(limit + 1);
    let candidates = std::iter::once(url_to_search).chain(results.iter().take(limit).map(|s| s.url.as_str()));
    for url in candidates {
        let url = url.trim();
        if !url.is_empty() && !targets.iter().any(|t| t == url) {
            targets.push(url.to_string());
        }
    }
    targets
}

/// Fetch every URL concurrently and flatten what succeeded.
///
/// A failing URL contributes nothing; this never fails as a whole.
pub async fn extract(
    provider: &dyn ExtractProvider,
    urls: &[String],
    prompt: &str,
    ctx: &StepContext<'_>,
) -> Vec<Finding> {
    let fetches = urls.iter().map(|url| extract_one(provider, url, prompt, ctx));
    let findings: Vec<Finding> = join_all(fetches).await.into_iter().flatten().collect();

    debug!(
        provider = provider.name(),
        urls = urls.len(),
        findings = findings.len(),
        "Extraction complete"
    );
    findings
}

async fn extract_one(
    provider: &dyn ExtractProvider,
    url: &str,
    prompt: &str,
    ctx: &StepContext<'_>,
) -> Vec<Finding> {
    let host = host_of(url).unwrap_or_else(|| url.to_string());
    ctx.report(
        ActivityKind::Extract,
        ActivityStatus::Pending,
        format!("Analyzing {}", host),
    );

    let error = match provider.extract(&[url.to_string()], prompt).await {
        Ok(response) if response.success => {
            let findings: Vec<Finding> = response
                .data
                .map(|data| data.into_texts())
                .unwrap_or_default()
                .into_iter()
                .map(|text| Finding::new(text, url))
                .collect();
            // One step per finding, at least one per extracted page
            ctx.report_steps(
                ActivityKind::Extract,
                ActivityStatus::Complete,
                format!("Extracted from {}", host),
                findings.len().max(1) as u32,
            );
            return findings;
        }
        Ok(response) => response
            .error
            .unwrap_or_else(|| "extract reported failure".to_string()),
        Err(e) => e.to_string(),
    };

    warn!(url = %url, error = %error, "Extraction failed, skipping");
    ctx.report(
        ActivityKind::Extract,
        ActivityStatus::Error,
        format!("Failed to extract from {}", host),
    );
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;
    use crate::providers::{ExtractData, ExtractItem, ExtractResponse};
    use crate::research::emitter::{CollectingSink, ProgressEmitter, StepCounter};
    use crate::research::events::ProgressEvent;
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::time::Duration;

    /// Answers by URL: `bad` hosts error, `empty` hosts report failure,
    /// `slow` hosts wait before answering.
    struct ByHost;

    #[async_trait]
    impl ExtractProvider for ByHost {
        async fn extract(
            &self,
            urls: &[String],
            _prompt: &str,
        ) -> Result<ExtractResponse, ProviderError> {
            let url = &urls[0];
            if url.contains("bad") {
                return Err(ProviderError::Timeout);
            }
            if url.contains("empty") {
                return Ok(ExtractResponse::failed("blocked"));
            }
            if url.contains("slow") {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
            Ok(ExtractResponse::ok(ExtractData::Items(vec![
                ExtractItem { data: serde_json::json!(format!("{} one", url)) },
                ExtractItem { data: serde_json::json!(format!("{} two", url)) },
            ])))
        }

        fn name(&self) -> &str {
            "by-host"
        }
    }

    async fn run(urls: &[&str]) -> (Vec<Finding>, Vec<ProgressEvent>, u32) {
        let sink = CollectingSink::new();
        let (emitter, handle) = ProgressEmitter::spawn(Arc::new(sink.clone()), 64);
        let steps = StepCounter::new(10);
        let urls: Vec<String> = urls.iter().map(|u| u.to_string()).collect();
        let findings = extract(&ByHost, &urls, "prompt", &StepContext::new(&emitter, &steps, 2)).await;
        drop(emitter);
        handle.finish().await;
        (findings, sink.events(), steps.completed())
    }

    #[test]
    fn test_extraction_targets() {
        let results = vec![
            Source::new("https://a.com", "", ""),
            Source::new("https://hint.com", "", ""),
            Source::new("https://b.com", "", ""),
            Source::new("https://c.com", "", ""),
        ];
        assert_eq!(
            extraction_targets("https://hint.com", &results, 3),
            vec!["https://hint.com", "https://a.com", "https://b.com"]
        );
        assert_eq!(
            extraction_targets("", &results, 3),
            vec!["https://a.com", "https://hint.com", "https://b.com"]
        );
        assert!(extraction_targets("", &[], 3).is_empty());
    }

    #[tokio::test]
    async fn test_failures_are_absorbed() {
        let (findings, events, completed) =
            run(&["https://good.com", "https://bad.com", "https://empty.com"]).await;

        assert_eq!(findings.len(), 2);
        assert!(findings.iter().all(|f| f.source == "https://good.com"));
        // Two findings from the one page that worked
        assert_eq!(completed, 2);

        let errors: Vec<String> = events
            .iter()
            .filter_map(|e| e.as_activity())
            .filter(|a| a.activity.status == ActivityStatus::Error)
            .map(|a| a.activity.message.clone())
            .collect();
        assert_eq!(errors.len(), 2);
        assert!(errors.contains(&"Failed to extract from bad.com".to_string()));
    }

    #[tokio::test]
    async fn test_findings_keep_url_order() {
        let (findings, _events, completed) = run(&["https://slow.com", "https://fast.com"]).await;
        let sources: Vec<&str> = findings.iter().map(|f| f.source.as_str()).collect();
        assert_eq!(
            sources,
            vec!["https://slow.com", "https://slow.com", "https://fast.com", "https://fast.com"]
        );
        assert_eq!(completed, 4);
    }

    #[tokio::test]
    async fn test_pending_precedes_terminal_per_url() {
        let (_findings, events, _) = run(&["https://slow.com", "https://bad.com", "https://fast.com"]).await;

        for host in ["slow.com", "bad.com", "fast.com"] {
            let positions: Vec<(usize, ActivityStatus)> = events
                .iter()
                .enumerate()
                .filter_map(|(i, e)| e.as_activity().map(|a| (i, a)))
                .filter(|(_, a)| a.activity.message.ends_with(host))
                .map(|(i, a)| (i, a.activity.status))
                .collect();
            assert_eq!(positions.len(), 2, "two events for {}", host);
            assert_eq!(positions[0].1, ActivityStatus::Pending);
            assert_ne!(positions[1].1, ActivityStatus::Pending);
            assert!(positions[0].0 < positions[1].0);
            assert!(events
                .iter()
                .filter_map(|e| e.as_activity())
                .all(|a| a.activity.depth == 2));
        }
    }

    #[tokio::test]
    async fn test_no_urls_no_findings() {
        let (findings, events, _) = run(&[]).await;
        assert!(findings.is_empty());
        assert!(events.is_empty());
    }
}
