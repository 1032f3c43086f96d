//! Research run state
//!
//! Owned by the controller and mutated only there. Steps receive slices of
//! it and hand back new values.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::emitter::StepCounter;

/// Consecutive-failure threshold before the loop gives up
pub const MAX_FAILED_ATTEMPTS: u32 = 3;

/// Steps budgeted per depth (search, extract, analyze, and slack)
pub const STEPS_PER_DEPTH: u32 = 5;

/// One extracted content chunk and the page it came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub text: String,
    pub source: String,
}

impl Finding {
    pub fn new(text: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source: source.into(),
        }
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[From {}]: {}", self.source, self.text)
    }
}

/// Why the research loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StopReason {
    TimeLimit,
    MaxDepth,
    ModelStopped,
    NoGaps,
    FailureThreshold,
    Fatal,
}

/// Mutable state of one research run
#[derive(Debug)]
pub struct ResearchState {
    /// Current working topic, replaced by the top gap after each analysis.
    /// Synthesis writes about whatever it holds when the loop ends.
    pub topic: String,
    pub findings: Vec<Finding>,
    pub summaries: Vec<String>,
    pub next_search_topic: String,
    pub url_to_search: String,
    pub current_depth: u32,
    pub max_depth: u32,
    pub failed_attempts: u32,
    pub max_failed_attempts: u32,
    pub steps: StepCounter,
}

impl ResearchState {
    pub fn new(topic: impl Into<String>, max_depth: u32, max_failed_attempts: u32) -> Self {
        let topic = topic.into();
        Self {
            topic,
            findings: Vec::new(),
            summaries: Vec::new(),
            next_search_topic: String::new(),
            url_to_search: String::new(),
            current_depth: 0,
            max_depth,
            failed_attempts: 0,
            max_failed_attempts,
            steps: StepCounter::new(max_depth.saturating_mul(STEPS_PER_DEPTH)),
        }
    }

    /// Query for the next search: the carried hint, else the working topic
    pub fn search_query(&self) -> &str {
        if self.next_search_topic.is_empty() {
            &self.topic
        } else {
            &self.next_search_topic
        }
    }

    /// Move the working topic to the top gap. A blank top gap keeps the
    /// current topic. Returns false when there are no gaps at all.
    pub fn follow_top_gap(&mut self, gaps: Vec<String>) -> bool {
        let Some(gap) = gaps.into_iter().next() else {
            return false;
        };
        if !gap.trim().is_empty() {
            self.topic = gap;
        }
        true
    }

    /// Count a search or analysis failure; true once the threshold is hit.
    ///
    /// The counter is shared across failure sources and never reset.
    pub fn record_failure(&mut self) -> bool {
        self.failed_attempts += 1;
        self.failed_attempts >= self.max_failed_attempts
    }

    pub fn total_steps(&self) -> u32 {
        self.steps.total()
    }

    pub fn completed_steps(&self) -> u32 {
        self.steps.completed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state() {
        let state = ResearchState::new("Rust async runtimes", 7, MAX_FAILED_ATTEMPTS);
        assert_eq!(state.topic, "Rust async runtimes");
        assert_eq!(state.current_depth, 0);
        assert_eq!(state.total_steps(), 35);
        assert_eq!(state.completed_steps(), 0);
        assert!(state.findings.is_empty());
    }

    #[test]
    fn test_follow_top_gap() {
        let mut state = ResearchState::new("original topic", 7, MAX_FAILED_ATTEMPTS);

        assert!(state.follow_top_gap(vec![String::new(), "second".into()]));
        assert_eq!(state.topic, "original topic");

        assert!(state.follow_top_gap(vec!["  ".into()]));
        assert_eq!(state.topic, "original topic");

        assert!(state.follow_top_gap(vec!["tokio internals".into(), "other".into()]));
        assert_eq!(state.topic, "tokio internals");

        assert!(!state.follow_top_gap(Vec::new()));
        assert_eq!(state.topic, "tokio internals");
    }

    #[test]
    fn test_search_query_prefers_hint() {
        let mut state = ResearchState::new("topic", 3, 3);
        assert_eq!(state.search_query(), "topic");
        state.next_search_topic = "narrower topic".into();
        assert_eq!(state.search_query(), "narrower topic");
    }

    #[test]
    fn test_failure_threshold() {
        let mut state = ResearchState::new("topic", 3, 3);
        assert!(!state.record_failure());
        assert!(!state.record_failure());
        assert!(state.record_failure());
        assert_eq!(state.failed_attempts, 3);
    }

    #[test]
    fn test_finding_display() {
        let finding = Finding::new("Tokio is a runtime", "https://tokio.rs");
        assert_eq!(finding.to_string(), "[From https://tokio.rs]: Tokio is a runtime");
    }
}
