//! Prompt templates for extraction, analysis and synthesis

use super::state::Finding;

/// Render findings as `[From <source>]: <text>` lines.
pub fn findings_block(findings: &[Finding]) -> String {
    findings
        .iter()
        .map(Finding::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

fn summaries_block(summaries: &[String]) -> String {
    summaries
        .iter()
        .map(|s| format!("[Summary]: {}", s))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Instruction sent with every extraction request
pub fn extraction_prompt(topic: &str) -> String {
    format!(
        "Extract key information about {topic}. Focus on facts, data, and expert opinions. \
         The extraction should be detailed and comprehensive."
    )
}

/// Ask the model to judge the findings and reply with a JSON verdict.
pub fn analysis_prompt(topic: &str, findings: &[Finding], remaining_minutes: f64) -> String {
    format!(
        r#"You are a research agent analyzing findings about: {topic}
You have {remaining_minutes:.1} minutes remaining to complete the research, but you do not need to use all of it.

Current findings:
{findings}

What has been learned? What gaps remain? Which specific aspects should be investigated next, if any?
If more information is needed, include a nextSearchTopic.
If a specific page should be read next, include a urlToSearch.
If less than 1 minute remains, set shouldContinue to false so there is time for the final synthesis.
If the findings are already sufficient, set shouldContinue to false.

Respond with JSON only, in exactly this format:
{{
  "analysis": {{
    "summary": "summary of findings",
    "gaps": ["gap1", "gap2"],
    "nextSteps": ["step1", "step2"],
    "shouldContinue": true,
    "nextSearchTopic": "optional topic",
    "urlToSearch": "optional url"
  }}
}}"#,
        findings = findings_block(findings),
    )
}

/// Ask for the final long-form report.
pub fn synthesis_prompt(topic: &str, findings: &[Finding], summaries: &[String]) -> String {
    format!(
        "Write a comprehensive, long analysis of {topic} based on these findings:\n\
         {findings}\n\
         {summaries}\n\n\
         Cover the reasoning behind the conclusions: detailed findings, key insights, \
         conclusions and any remaining uncertainties. Cite sources where appropriate. \
         The report is expected to be long, detailed and thorough.",
        findings = findings_block(findings),
        summaries = summaries_block(summaries),
    )
}
