//! Reasoning model access
//!
//! Bridges the research core's [`TextGenerationProvider`] contract onto
//! Rig's native provider clients.
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │   Analysis step / Synthesis step        │
//! └─────────────────┬───────────────────────┘
//!                   │ generate(prompt, max_tokens)
//!                   ▼
//! ┌─────────────────────────────────────────┐
//! │         RigTextGenerator                │
//! └─────────────────┬───────────────────────┘
//!          ┌────────┼────────┐
//!          ▼        ▼        ▼
//!       OpenAI  Anthropic  Ollama
//! ```
//!
//! [`TextGenerationProvider`]: crate::providers::TextGenerationProvider

mod config;
mod rig_backend;

pub use config::{LlmConfig, LlmProviderKind};
pub use rig_backend::RigTextGenerator;
