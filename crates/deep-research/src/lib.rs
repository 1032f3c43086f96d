//! # deep-research
//!
//! A time- and depth-bounded research agent. Given a topic it repeatedly
//! searches the web, extracts page content, asks a reasoning model what is
//! still missing, and finally writes a long-form report from everything it
//! gathered. Progress is streamed as ordered events while the run proceeds.
//!
//! The core only depends on three provider traits ([`SearchProvider`],
//! [`ExtractProvider`], [`TextGenerationProvider`]) and a [`ProgressSink`].
//! Adapters for Firecrawl, Tavily, DuckDuckGo, plain page fetching and
//! Rig-backed models are included.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use deep_research::prelude::*;
//!
//! let firecrawl = Arc::new(FirecrawlClient::from_env()?);
//! let llm = Arc::new(RigTextGenerator::from_env(LlmConfig::new(LlmProviderKind::OpenAI))?);
//!
//! let controller = ResearchController::new(firecrawl.clone(), firecrawl, llm);
//! let (result, _) = controller
//!     .run_with_sink("io_uring adoption in Rust", Arc::new(TracingSink))
//!     .await;
//! println!("{}", result.report);
//! ```

pub mod error;
pub mod llm;
pub mod providers;
pub mod research;

pub use error::{AnalysisError, AnalysisParseError, ProviderError, ResearchError, SinkError};
pub use providers::{
    ExtractProvider, ExtractResponse, Generation, SearchProvider, SearchResponse, Source,
    TextGenerationProvider,
};
pub use research::{
    run_research, CollectingSink, Finding, ProgressEmitter, ProgressEvent, ProgressSink,
    ResearchConfig, ResearchController, ResearchResult, StopReason, TracingSink,
};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::error::{ProviderError, ResearchError};
    pub use crate::llm::{LlmConfig, LlmProviderKind, RigTextGenerator};
    pub use crate::providers::{
        DuckDuckGoSearch, ExtractProvider, FirecrawlClient, PageExtractor, SearchProvider, Source,
        TavilySearch, TextGenerationProvider,
    };
    pub use crate::research::{
        run_research, Activity, ActivityKind, ActivityStatus, CollectingSink, Finding,
        ProgressEmitter, ProgressEvent, ProgressSink, ResearchConfig, ResearchController,
        ResearchResult, StopReason, TracingSink,
    };
}
