//! Research controller
//!
//! Drives the bounded loop and owns all mutable state:
//!
//! ```text
//!           ┌─────────── budget left? ───────────┐
//!           ▼                                    │ yes
//!   Search ──▶ Extract ──▶ Analyze ──continue?───┘
//!     │ fail                  │ fail / stop / no gaps
//!     └──threshold──▶ Synthesize ◀──────┘
//! ```
//!
//! Every exit path, whether time, depth, model decision or failure threshold,
//! attempts exactly one synthesis before returning.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use super::budget::BudgetTracker;
use super::emitter::{DeliveryReport, ProgressEmitter, ProgressSink, DEFAULT_EVENT_BUFFER};
use super::events::{ActivityKind, ActivityStatus, DepthDelta, ProgressEvent, ProgressInit};
use super::prompts::extraction_prompt;
use super::state::{Finding, ResearchState, StopReason, MAX_FAILED_ATTEMPTS, STEPS_PER_DEPTH};
use super::steps::{self, StepContext};
use crate::error::ResearchError;
use crate::providers::{ExtractProvider, SearchProvider, TextGenerationProvider};

/// Default number of loop iterations
pub const DEFAULT_MAX_DEPTH: u32 = 7;

/// Default wall-clock budget (4.5 minutes)
pub const DEFAULT_TIME_LIMIT: Duration = Duration::from_millis(270_000);

/// Search results extracted per iteration
pub const DEFAULT_RESULTS_PER_ITERATION: usize = 3;

/// Token ceiling for the final report
pub const DEFAULT_SYNTHESIS_MAX_TOKENS: u64 = 16_000;

/// Loop limits and model settings for one research run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchConfig {
    pub max_depth: u32,

    #[serde(with = "humantime_serde")]
    pub time_limit: Duration,

    pub max_failed_attempts: u32,

    /// How many top search results are extracted each iteration
    pub results_per_iteration: usize,

    pub synthesis_max_tokens: u64,

    /// Token ceiling for analysis calls; provider default when unset
    #[serde(default)]
    pub analysis_max_tokens: Option<u64>,

    /// Progress events buffered before new ones are dropped
    pub event_buffer: usize,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            time_limit: DEFAULT_TIME_LIMIT,
            max_failed_attempts: MAX_FAILED_ATTEMPTS,
            results_per_iteration: DEFAULT_RESULTS_PER_ITERATION,
            synthesis_max_tokens: DEFAULT_SYNTHESIS_MAX_TOKENS,
            analysis_max_tokens: None,
            event_buffer: DEFAULT_EVENT_BUFFER,
        }
    }
}

impl ResearchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_depth(mut self, max_depth: u32) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_time_limit(mut self, time_limit: Duration) -> Self {
        self.time_limit = time_limit;
        self
    }

    pub fn with_max_failed_attempts(mut self, attempts: u32) -> Self {
        self.max_failed_attempts = attempts;
        self
    }

    pub fn with_results_per_iteration(mut self, count: usize) -> Self {
        self.results_per_iteration = count;
        self
    }

    pub fn with_synthesis_max_tokens(mut self, max_tokens: u64) -> Self {
        self.synthesis_max_tokens = max_tokens;
        self
    }

    pub fn with_analysis_max_tokens(mut self, max_tokens: u64) -> Self {
        self.analysis_max_tokens = Some(max_tokens);
        self
    }

    pub fn with_event_buffer(mut self, capacity: usize) -> Self {
        self.event_buffer = capacity;
        self
    }

    /// Expected step count reported to clients
    pub fn total_steps(&self) -> u32 {
        self.max_depth.saturating_mul(STEPS_PER_DEPTH)
    }
}

/// What a research run hands back. Always returned, never an `Err`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchResult {
    pub success: bool,
    /// Final report; empty when synthesis failed
    pub report: String,
    pub findings: Vec<Finding>,
    pub completed_steps: u32,
    pub total_steps: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub stop_reason: StopReason,
    /// Depth reached when the loop ended
    pub depth: u32,
}

/// Runs the search → extract → analyze loop against injected providers.
///
/// # Example
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use deep_research::{CollectingSink, ResearchConfig, ResearchController};
///
/// let controller = ResearchController::new(search, extract, llm)
///     .with_config(ResearchConfig::new().with_max_depth(3));
/// let (result, _delivery) = controller
///     .run_with_sink("state of WebAssembly GC", Arc::new(CollectingSink::new()))
///     .await;
/// println!("{}", result.report);
/// ```
#[derive(Clone)]
pub struct ResearchController {
    search: Arc<dyn SearchProvider>,
    extract: Arc<dyn ExtractProvider>,
    llm: Arc<dyn TextGenerationProvider>,
    config: ResearchConfig,
}

impl ResearchController {
    pub fn new(
        search: Arc<dyn SearchProvider>,
        extract: Arc<dyn ExtractProvider>,
        llm: Arc<dyn TextGenerationProvider>,
    ) -> Self {
        Self {
            search,
            extract,
            llm,
            config: ResearchConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ResearchConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &ResearchConfig {
        &self.config
    }

    /// Run with a fresh emitter over `sink`, waiting for every event to be
    /// delivered before returning.
    pub async fn run_with_sink(
        &self,
        topic: &str,
        sink: Arc<dyn ProgressSink>,
    ) -> (ResearchResult, DeliveryReport) {
        let (emitter, handle) = ProgressEmitter::spawn(sink, self.config.event_buffer);
        let result = self.run(topic, &emitter).await;
        drop(emitter);
        (result, handle.finish().await)
    }

    /// Research `topic`, reporting progress through `emitter`.
    pub async fn run(&self, topic: &str, emitter: &ProgressEmitter) -> ResearchResult {
        let config = &self.config;
        let mut state = ResearchState::new(topic, config.max_depth, config.max_failed_attempts);
        let budget = BudgetTracker::start(config.time_limit, config.max_depth);

        info!(
            topic = %topic,
            max_depth = config.max_depth,
            time_limit = ?config.time_limit,
            search = self.search.name(),
            extract = self.extract.name(),
            llm = self.llm.name(),
            "Starting deep research"
        );
        emitter.emit(ProgressEvent::ProgressInit(ProgressInit {
            max_depth: state.max_depth,
            total_steps: state.total_steps(),
        }));

        let stop_reason = self.iterate(&mut state, &budget, emitter).await;
        info!(
            stop_reason = ?stop_reason,
            depth = state.current_depth,
            findings = state.findings.len(),
            failed_attempts = state.failed_attempts,
            elapsed = ?budget.elapsed(),
            "Research loop finished"
        );

        let ctx = StepContext::new(emitter, &state.steps, state.current_depth);
        let synthesis = steps::synthesize(
            self.llm.as_ref(),
            &state.topic,
            &state.findings,
            &state.summaries,
            config.synthesis_max_tokens,
            &ctx,
        )
        .await
        .map_err(ResearchError::Synthesis);

        match synthesis {
            Ok(report) => {
                emitter.emit(ProgressEvent::Finish(report.clone()));
                self.finish(state, true, report, None, stop_reason)
            }
            Err(e) => {
                error!(error = %e, "Research failed");
                ctx.report(
                    ActivityKind::Thought,
                    ActivityStatus::Error,
                    format!("Research failed: {}", e),
                );
                self.finish(state, false, String::new(), Some(e.to_string()), StopReason::Fatal)
            }
        }
    }

    /// The bounded loop. Returns why it stopped.
    async fn iterate(
        &self,
        state: &mut ResearchState,
        budget: &BudgetTracker,
        emitter: &ProgressEmitter,
    ) -> StopReason {
        loop {
            if budget.time_exhausted() {
                return StopReason::TimeLimit;
            }
            if budget.depth_exhausted(state.current_depth) {
                return StopReason::MaxDepth;
            }

            state.current_depth += 1;
            emitter.emit(ProgressEvent::DepthDelta(DepthDelta {
                current: state.current_depth,
                max: state.max_depth,
                completed_steps: state.completed_steps(),
                total_steps: state.total_steps(),
            }));
            let ctx = StepContext::new(emitter, &state.steps, state.current_depth);

            let sources = match steps::search(self.search.as_ref(), state.search_query(), &ctx).await {
                Ok(sources) => sources,
                Err(_) => {
                    if state.record_failure() {
                        warn!(failed_attempts = state.failed_attempts, "Failure threshold reached");
                        return StopReason::FailureThreshold;
                    }
                    continue;
                }
            };

            let targets = steps::extraction_targets(
                &state.url_to_search,
                &sources,
                self.config.results_per_iteration,
            );
            let prompt = extraction_prompt(&state.topic);
            let findings = steps::extract(self.extract.as_ref(), &targets, &prompt, &ctx).await;
            state.findings.extend(findings);

            let verdict = steps::analyze(
                self.llm.as_ref(),
                &state.topic,
                &state.findings,
                budget.remaining_minutes(),
                self.config.analysis_max_tokens,
                &ctx,
            )
            .await;

            match verdict {
                Ok(verdict) => {
                    state.summaries.push(verdict.summary);
                    state.next_search_topic = verdict.next_search_topic.unwrap_or_default();
                    state.url_to_search = verdict.url_to_search.unwrap_or_default();

                    if !verdict.should_continue {
                        return StopReason::ModelStopped;
                    }
                    if !state.follow_top_gap(verdict.gaps) {
                        return StopReason::NoGaps;
                    }
                }
                Err(_) => {
                    state.next_search_topic.clear();
                    state.url_to_search.clear();
                    if state.record_failure() {
                        warn!(failed_attempts = state.failed_attempts, "Failure threshold reached");
                        return StopReason::FailureThreshold;
                    }
                }
            }
        }
    }

    fn finish(
        &self,
        state: ResearchState,
        success: bool,
        report: String,
        error: Option<String>,
        stop_reason: StopReason,
    ) -> ResearchResult {
        ResearchResult {
            success,
            report,
            completed_steps: state.completed_steps(),
            total_steps: state.total_steps(),
            error,
            stop_reason,
            depth: state.current_depth,
            findings: state.findings,
        }
    }
}

/// Run a research pass with default settings apart from depth and time.
pub async fn run_research(
    search: Arc<dyn SearchProvider>,
    extract: Arc<dyn ExtractProvider>,
    llm: Arc<dyn TextGenerationProvider>,
    topic: &str,
    max_depth: u32,
    time_limit: Duration,
    sink: Arc<dyn ProgressSink>,
) -> ResearchResult {
    let config = ResearchConfig::default()
        .with_max_depth(max_depth)
        .with_time_limit(time_limit);
    let (result, delivery) = ResearchController::new(search, extract, llm)
        .with_config(config)
        .run_with_sink(topic, sink)
        .await;
    if delivery.dropped > 0 || delivery.failed > 0 {
        warn!(?delivery, "Some progress events were not delivered");
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ResearchConfig::default();
        assert_eq!(config.max_depth, 7);
        assert_eq!(config.time_limit, Duration::from_secs(270));
        assert_eq!(config.max_failed_attempts, 3);
        assert_eq!(config.results_per_iteration, 3);
        assert_eq!(config.synthesis_max_tokens, 16_000);
        assert!(config.analysis_max_tokens.is_none());
        assert_eq!(config.total_steps(), 35);
    }

    #[test]
    fn test_config_builder() {
        let config = ResearchConfig::new()
            .with_max_depth(2)
            .with_time_limit(Duration::from_secs(30))
            .with_max_failed_attempts(5)
            .with_results_per_iteration(1)
            .with_analysis_max_tokens(800)
            .with_event_buffer(8);

        assert_eq!(config.max_depth, 2);
        assert_eq!(config.total_steps(), 10);
        assert_eq!(config.max_failed_attempts, 5);
        assert_eq!(config.analysis_max_tokens, Some(800));
        assert_eq!(config.event_buffer, 8);
    }

    #[test]
    fn test_config_time_limit_is_human_readable() {
        let json = serde_json::to_value(ResearchConfig::default()).unwrap();
        assert_eq!(json["time_limit"], "4m 30s");

        let parsed: ResearchConfig = serde_json::from_value(serde_json::json!({
            "max_depth": 3,
            "time_limit": "90s",
            "max_failed_attempts": 3,
            "results_per_iteration": 3,
            "synthesis_max_tokens": 16000,
            "event_buffer": 64
        }))
        .unwrap();
        assert_eq!(parsed.time_limit, Duration::from_secs(90));
        assert_eq!(parsed.analysis_max_tokens, None);
    }

    #[test]
    fn test_result_wire_shape() {
        let result = ResearchResult {
            success: true,
            report: "done".into(),
            findings: vec![Finding::new("fact", "https://a.com")],
            completed_steps: 3,
            total_steps: 35,
            error: None,
            stop_reason: StopReason::NoGaps,
            depth: 1,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["completedSteps"], 3);
        assert_eq!(json["stopReason"], "no-gaps");
        assert!(json.get("error").is_none());
    }
}
