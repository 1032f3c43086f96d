use tracing::{debug, warn};

use super::StepContext;
use crate::error::ProviderError;
use crate::providers::{SearchProvider, Source};
use crate::research::events::{ActivityKind, ActivityStatus, ProgressEvent};

/// Run one search. A provider-reported `success: false` is a failure; an
/// empty result list is not.
///
/// Sources are pushed to the emitter after the `complete` activity. No retry
/// happens here.
pub async fn search(
    provider: &dyn SearchProvider,
    query: &str,
    ctx: &StepContext<'_>,
) -> Result<Vec<Source>, ProviderError> {
    ctx.report(
        ActivityKind::Search,
        ActivityStatus::Pending,
        format!("Searching for \"{}\"", query),
    );

    let outcome = match provider.search(query).await {
        Ok(response) if response.success => Ok(response.results),
        Ok(response) => Err(ProviderError::Rejected(
            response
                .error
                .unwrap_or_else(|| "search reported failure".to_string()),
        )),
        Err(e) => Err(e),
    };

    match outcome {
        Ok(results) => {
            debug!(provider = provider.name(), query = %query, count = results.len(), "Search complete");
            ctx.report(
                ActivityKind::Search,
                ActivityStatus::Complete,
                format!("Found {} relevant results", results.len()),
            );
            for source in &results {
                ctx.emitter.emit(ProgressEvent::SourceDelta(source.clone()));
            }
            Ok(results)
        }
        Err(e) => {
            warn!(provider = provider.name(), query = %query, error = %e, "Search failed");
            ctx.report(
                ActivityKind::Search,
                ActivityStatus::Error,
                format!("Search failed for \"{}\"", query),
            );
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::SearchResponse;
    use crate::research::emitter::{CollectingSink, ProgressEmitter, StepCounter};
    use async_trait::async_trait;
    use std::sync::Arc;

    struct FixedSearch(Result<SearchResponse, ProviderError>);

    #[async_trait]
    impl SearchProvider for FixedSearch {
        async fn search(&self, _query: &str) -> Result<SearchResponse, ProviderError> {
            self.0.clone()
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    async fn run(provider: FixedSearch) -> (Result<Vec<Source>, ProviderError>, Vec<ProgressEvent>, u32) {
        let sink = CollectingSink::new();
        let (emitter, handle) = ProgressEmitter::spawn(Arc::new(sink.clone()), 32);
        let steps = StepCounter::new(10);
        let result = search(&provider, "rust", &StepContext::new(&emitter, &steps, 1)).await;
        drop(emitter);
        handle.finish().await;
        (result, sink.events(), steps.completed())
    }

    #[tokio::test]
    async fn test_success_emits_complete_then_sources() {
        let response = SearchResponse::ok(vec![
            Source::new("https://a.com", "A", ""),
            Source::new("https://b.com", "B", ""),
        ]);
        let (result, events, completed) = run(FixedSearch(Ok(response))).await;

        assert_eq!(result.unwrap().len(), 2);
        assert_eq!(completed, 1);
        let kinds: Vec<&str> = events.iter().map(|e| e.kind()).collect();
        assert_eq!(
            kinds,
            vec!["activity-delta", "activity-delta", "source-delta", "source-delta"]
        );
        let complete = events[1].as_activity().unwrap();
        assert_eq!(complete.activity.message, "Found 2 relevant results");
        assert_eq!(complete.activity.depth, 1);
    }

    #[tokio::test]
    async fn test_zero_results_is_success() {
        let (result, _events, completed) = run(FixedSearch(Ok(SearchResponse::ok(vec![])))).await;
        assert!(result.unwrap().is_empty());
        assert_eq!(completed, 1);
    }

    #[tokio::test]
    async fn test_reported_failure_is_an_error() {
        let (result, events, completed) =
            run(FixedSearch(Ok(SearchResponse::failed("quota exceeded")))).await;

        assert!(matches!(result, Err(ProviderError::Rejected(ref m)) if m == "quota exceeded"));
        assert_eq!(completed, 0);
        let last = events.last().and_then(|e| e.as_activity()).unwrap();
        assert_eq!(last.activity.status, ActivityStatus::Error);
        assert_eq!(last.activity.message, "Search failed for \"rust\"");
    }

    #[tokio::test]
    async fn test_transport_error_passes_through() {
        let (result, _events, _) = run(FixedSearch(Err(ProviderError::Timeout))).await;
        assert!(matches!(result, Err(ProviderError::Timeout)));
    }
}
