//! One wrapper per research phase
//!
//! Steps never touch `ResearchState`: they take what they need by reference,
//! call their provider, report activities, and return a value for the
//! controller to fold in.

mod analyze;
mod extract;
mod search;
mod synthesize;

pub use analyze::{analyze, parse_verdict, Verdict};
pub use extract::{extract, extraction_targets};
pub use search::search;
pub use synthesize::synthesize;

use super::emitter::{ProgressEmitter, StepCounter};
use super::events::{Activity, ActivityKind, ActivityStatus};

/// Where a step reports its activities
#[derive(Clone, Copy)]
pub struct StepContext<'a> {
    pub emitter: &'a ProgressEmitter,
    pub steps: &'a StepCounter,
    pub depth: u32,
}

impl<'a> StepContext<'a> {
    pub fn new(emitter: &'a ProgressEmitter, steps: &'a StepCounter, depth: u32) -> Self {
        Self {
            emitter,
            steps,
            depth,
        }
    }

    pub(crate) fn report(&self, kind: ActivityKind, status: ActivityStatus, message: impl Into<String>) {
        self.emitter
            .activity(self.steps, Activity::new(kind, status, message, self.depth));
    }

    /// Report an activity whose completion counts as `weight` steps.
    pub(crate) fn report_steps(
        &self,
        kind: ActivityKind,
        status: ActivityStatus,
        message: impl Into<String>,
        weight: u32,
    ) {
        self.emitter.weighted_activity(
            self.steps,
            Activity::new(kind, status, message, self.depth),
            weight,
        );
    }
}
