use tracing::{error, info};

use super::StepContext;
use crate::error::ProviderError;
use crate::providers::TextGenerationProvider;
use crate::research::events::{ActivityKind, ActivityStatus};
use crate::research::prompts::synthesis_prompt;
use crate::research::state::Finding;

/// Produce the final report from everything gathered.
pub async fn synthesize(
    llm: &dyn TextGenerationProvider,
    topic: &str,
    findings: &[Finding],
    summaries: &[String],
    max_tokens: u64,
    ctx: &StepContext<'_>,
) -> Result<String, ProviderError> {
    ctx.report(
        ActivityKind::Synthesis,
        ActivityStatus::Pending,
        "Preparing final analysis",
    );

    let prompt = synthesis_prompt(topic, findings, summaries);
    match llm.generate(&prompt, Some(max_tokens)).await {
        Ok(generation) => {
            info!(
                findings = findings.len(),
                summaries = summaries.len(),
                chars = generation.text.len(),
                "Synthesis complete"
            );
            ctx.report(
                ActivityKind::Synthesis,
                ActivityStatus::Complete,
                "Research completed",
            );
            Ok(generation.text)
        }
        Err(e) => {
            error!(error = %e, "Synthesis failed");
            ctx.report(
                ActivityKind::Synthesis,
                ActivityStatus::Error,
                "Failed to synthesize findings",
            );
            Err(e)
        }
    }
}
