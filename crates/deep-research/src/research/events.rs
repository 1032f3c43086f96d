//! Progress events streamed to the client
//!
//! Every event serializes as `{"type": "<kind>", "content": {...}}`, the
//! shape the host's data stream forwards verbatim.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::providers::Source;

/// Which phase an activity belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    Search,
    Extract,
    Analyze,
    Synthesis,
    Thought,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityStatus {
    Pending,
    Complete,
    Error,
}

/// A timestamped phase notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    pub status: ActivityStatus,
    pub message: String,
    /// RFC 3339 with millisecond precision, UTC
    pub timestamp: String,
    pub depth: u32,
}

impl Activity {
    pub fn new(
        kind: ActivityKind,
        status: ActivityStatus,
        message: impl Into<String>,
        depth: u32,
    ) -> Self {
        Self {
            kind,
            status,
            message: message.into(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            depth,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressInit {
    pub max_depth: u32,
    pub total_steps: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepthDelta {
    pub current: u32,
    pub max: u32,
    pub completed_steps: u32,
    pub total_steps: u32,
}

/// An [`Activity`] stamped with the step counters at emission time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityDelta {
    #[serde(flatten)]
    pub activity: Activity,
    pub completed_steps: u32,
    pub total_steps: u32,
}

/// One entry of the progress stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "content", rename_all = "kebab-case")]
pub enum ProgressEvent {
    ProgressInit(ProgressInit),
    DepthDelta(DepthDelta),
    SourceDelta(Source),
    ActivityDelta(ActivityDelta),
    /// The final report text
    Finish(String),
}

impl ProgressEvent {
    /// Wire name of the event kind
    pub fn kind(&self) -> &'static str {
        match self {
            ProgressEvent::ProgressInit(_) => "progress-init",
            ProgressEvent::DepthDelta(_) => "depth-delta",
            ProgressEvent::SourceDelta(_) => "source-delta",
            ProgressEvent::ActivityDelta(_) => "activity-delta",
            ProgressEvent::Finish(_) => "finish",
        }
    }

    pub fn as_activity(&self) -> Option<&ActivityDelta> {
        match self {
            ProgressEvent::ActivityDelta(delta) => Some(delta),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_activity_delta_wire_shape() {
        let event = ProgressEvent::ActivityDelta(ActivityDelta {
            activity: Activity::new(
                ActivityKind::Search,
                ActivityStatus::Complete,
                "Found 3 relevant results",
                2,
            ),
            completed_steps: 4,
            total_steps: 35,
        });

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "activity-delta");
        assert_eq!(json["content"]["type"], "search");
        assert_eq!(json["content"]["status"], "complete");
        assert_eq!(json["content"]["depth"], 2);
        assert_eq!(json["content"]["completedSteps"], 4);
        assert_eq!(json["content"]["totalSteps"], 35);
        assert!(json["content"]["timestamp"].as_str().unwrap().ends_with('Z'));
    }

    #[test]
    fn test_progress_init_and_depth_wire_shape() {
        let init = serde_json::to_value(ProgressEvent::ProgressInit(ProgressInit {
            max_depth: 7,
            total_steps: 35,
        }))
        .unwrap();
        assert_eq!(
            init,
            serde_json::json!({"type": "progress-init", "content": {"maxDepth": 7, "totalSteps": 35}})
        );

        let depth = serde_json::to_value(ProgressEvent::DepthDelta(DepthDelta {
            current: 1,
            max: 7,
            completed_steps: 0,
            total_steps: 35,
        }))
        .unwrap();
        assert_eq!(depth["type"], "depth-delta");
        assert_eq!(depth["content"]["completedSteps"], 0);
    }

    #[test]
    fn test_source_and_finish_round_trip() {
        let source = ProgressEvent::SourceDelta(Source::new("https://a.com", "A", "about a"));
        let json = serde_json::to_string(&source).unwrap();
        let back: ProgressEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, source);
        assert_eq!(back.kind(), "source-delta");

        let finish = serde_json::to_value(ProgressEvent::Finish("report".into())).unwrap();
        assert_eq!(finish, serde_json::json!({"type": "finish", "content": "report"}));
    }
}
