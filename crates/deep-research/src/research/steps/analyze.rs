use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, warn};

use super::StepContext;
use crate::error::{AnalysisError, AnalysisParseError};
use crate::providers::TextGenerationProvider;
use crate::research::events::{ActivityKind, ActivityStatus};
use crate::research::prompts::analysis_prompt;
use crate::research::state::Finding;

/// The model's judgement of the findings so far
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Verdict {
    pub summary: String,
    pub gaps: Vec<String>,
    pub next_steps: Vec<String>,
    pub should_continue: bool,
    #[serde(default, deserialize_with = "blank_as_none", skip_serializing_if = "Option::is_none")]
    pub next_search_topic: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none", skip_serializing_if = "Option::is_none")]
    pub url_to_search: Option<String>,
}

fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

/// Remove a surrounding Markdown code fence, if any.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (e.g. "json") on the opening line
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Decode model output into a [`Verdict`].
///
/// Accepts `{"analysis": {...}}` or a bare verdict object, optionally inside
/// a code fence. Anything else is an error.
pub fn parse_verdict(raw: &str) -> Result<Verdict, AnalysisParseError> {
    let fail = |reason: String| AnalysisParseError {
        reason,
        raw: raw.to_string(),
    };

    let mut value: serde_json::Value =
        serde_json::from_str(strip_code_fence(raw)).map_err(|e| fail(e.to_string()))?;

    if let Some(inner) = value.get_mut("analysis").map(serde_json::Value::take) {
        value = inner;
    }

    serde_json::from_value(value).map_err(|e| fail(e.to_string()))
}

/// Ask the model to evaluate `findings` and decode its verdict.
///
/// No retry; the caller decides what a failure costs.
pub async fn analyze(
    llm: &dyn TextGenerationProvider,
    topic: &str,
    findings: &[Finding],
    remaining_minutes: f64,
    max_tokens: Option<u64>,
    ctx: &StepContext<'_>,
) -> Result<Verdict, AnalysisError> {
    ctx.report(ActivityKind::Analyze, ActivityStatus::Pending, "Analyzing findings");

    let prompt = analysis_prompt(topic, findings, remaining_minutes);
    let result = match llm.generate(&prompt, max_tokens).await {
        Ok(generation) => parse_verdict(&generation.text).map_err(AnalysisError::from),
        Err(e) => Err(AnalysisError::from(e)),
    };

    match result {
        Ok(verdict) => {
            debug!(
                gaps = verdict.gaps.len(),
                should_continue = verdict.should_continue,
                "Analysis verdict"
            );
            ctx.report(ActivityKind::Analyze, ActivityStatus::Complete, verdict.summary.clone());
            Ok(verdict)
        }
        Err(e) => {
            match &e {
                AnalysisError::Parse(parse) => {
                    warn!(error = %e, raw = %parse.raw, "Could not decode analysis")
                }
                AnalysisError::Provider(_) => warn!(error = %e, "Analysis call failed"),
            }
            ctx.report(
                ActivityKind::Analyze,
                ActivityStatus::Error,
                "Failed to analyze findings",
            );
            Err(e)
        }
    }
}
