//! The bounded research loop
//!
//! - [`controller`]: the state machine and its configuration
//! - [`steps`]: search, extract, analyze and synthesize wrappers
//! - [`emitter`] / [`events`]: the ordered progress stream
//! - [`budget`] / [`state`]: per-run bookkeeping

pub mod budget;
pub mod controller;
pub mod emitter;
pub mod events;
pub mod prompts;
pub mod state;
pub mod steps;

pub use budget::BudgetTracker;
pub use controller::{run_research, ResearchConfig, ResearchController, ResearchResult};
pub use emitter::{
    CollectingSink, DeliveryReport, EmitterHandle, ProgressEmitter, ProgressSink, StepCounter,
    TracingSink,
};
pub use events::{Activity, ActivityDelta, ActivityKind, ActivityStatus, DepthDelta, ProgressEvent, ProgressInit};
pub use state::{Finding, ResearchState, StopReason};
pub use steps::Verdict;
