//! # Deep Research Agent
//!
//! Command-line front-end for the bounded research loop in `deep-research`.
//! Given a topic it searches, extracts, lets the model decide what is still
//! missing, and prints a long-form report when the budget runs out or the
//! model is satisfied.
//!
//! ## Quick Start
//! ```bash
//! cargo run -- "What are the latest developments in Rust async?"
//! ```

/// Configuration management
mod config;

/// Provider wiring and quick search
mod agent;

/// Console and NDJSON progress sinks
mod progress;

use anyhow::Result;
use clap::Parser;
use deep_research::llm::LlmProviderKind;
use deep_research::{ProgressSink, ProviderError};
use std::sync::Arc;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use crate::agent::ResearchAgent;
use crate::config::{Config, SearchBackend};
use crate::progress::{ConsoleSink, JsonLinesSink};

fn parse_provider(s: &str) -> Result<LlmProviderKind, ProviderError> {
    s.parse()
}

#[derive(Parser, Debug)]
#[command(
    name = "deep-research-agent",
    version,
    about = "Time- and depth-bounded deep research: search, extract, analyze, report",
    long_about = r#"
Deep Research Agent

Researches a topic in rounds. Each round searches the web, extracts the most
relevant pages, and asks the model what is still unknown. The next round
follows the biggest gap. When the model is satisfied, or the time or depth
budget runs out, everything gathered is synthesized into one report.

PREREQUISITES (default local setup):
  1. Install Ollama: https://ollama.ai
  2. Pull a model: ollama pull llama3.2
  3. Start Ollama: ollama serve

EXAMPLES:
  # Research with the defaults (7 rounds, 270 seconds)
  deep-research-agent "State of WebAssembly garbage collection"

  # A shorter run on OpenAI with Firecrawl search
  deep-research-agent --provider openai --search firecrawl --max-depth 3 "Rust in the Linux kernel"

  # Just list search results
  deep-research-agent --quick "Rust web frameworks"

  # Stream progress events as JSON lines
  deep-research-agent --json "io_uring adoption" > events.ndjson
"#
)]
struct Args {
    /// The research topic or question
    #[arg(value_name = "TOPIC")]
    topic: String,

    /// Maximum research rounds (overrides MAX_DEPTH)
    #[arg(long = "max-depth", value_name = "N")]
    max_depth: Option<u32>,

    /// Time budget in seconds (overrides TIME_LIMIT_SECS)
    #[arg(long = "time-limit", value_name = "SECS")]
    time_limit: Option<u64>,

    /// Model to use
    #[arg(short = 'm', long = "model", env = "LLM_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic or ollama
    #[arg(long = "provider", env = "LLM_PROVIDER", value_parser = parse_provider)]
    provider: Option<LlmProviderKind>,

    /// Search backend
    #[arg(long = "search", env = "SEARCH_BACKEND", value_enum, ignore_case = true)]
    search: Option<SearchBackend>,

    /// Quick search mode (one search, no research loop)
    #[arg(short = 'q', long = "quick")]
    quick: bool,

    /// Write progress events to stdout as JSON lines
    #[arg(long = "json")]
    json: bool,

    /// Enable verbose/debug logging
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,
}

impl Args {
    /// Apply command-line overrides on top of the environment.
    fn apply(&self, config: &mut Config) {
        if let Some(provider) = self.provider {
            config.llm_provider = provider;
        }
        if let Some(model) = &self.model {
            config.model = Some(model.clone());
        }
        if let Some(search) = self.search {
            config.search_backend = search;
        }
        if let Some(max_depth) = self.max_depth {
            config.max_depth = max_depth;
        }
        if let Some(secs) = self.time_limit {
            config.time_limit_secs = secs;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Make .env values visible to clap's `env` lookups
    let _ = dotenvy::dotenv();
    let args = Args::parse();

    init_logging(args.verbose)?;

    let mut config = Config::from_env()?;
    args.apply(&mut config);
    config.validate()?;

    info!(
        provider = config.llm_provider.as_str(),
        model = %config.model_name(),
        search = config.search_backend.as_str(),
        max_depth = config.max_depth,
        time_limit_secs = config.time_limit_secs,
        "Configuration loaded"
    );

    let agent = ResearchAgent::new(config)?;

    if args.quick {
        let results = agent.quick_search(&args.topic).await?;
        println!("{}", results);
        return Ok(());
    }

    let json_sink = args.json.then(|| Arc::new(JsonLinesSink::stdout()));
    let sink: Arc<dyn ProgressSink> = match &json_sink {
        Some(json) => json.clone(),
        None => Arc::new(ConsoleSink),
    };
    let (result, delivery) = agent.research(&args.topic, sink).await;

    if !result.success {
        let message = result.error.unwrap_or_else(|| "unknown error".to_string());
        error!(error = %message, findings = result.findings.len(), "Research failed");
        anyhow::bail!("Research failed: {}", message);
    }

    info!(
        stop_reason = ?result.stop_reason,
        depth = result.depth,
        findings = result.findings.len(),
        completed_steps = result.completed_steps,
        "Research completed"
    );

    match json_sink {
        // The report goes out as the `finish` line, written here if the
        // event was dropped on the way
        Some(json) => {
            if json.ensure_finish(&result.report).await? {
                warn!(?delivery, "Finish event was not delivered, wrote the report directly");
            }
        }
        None => {
            println!("\n{}", "=".repeat(60));
            println!("RESEARCH REPORT");
            println!("{}\n", "=".repeat(60));
            println!("{}", result.report);
            println!("\n{}", "=".repeat(60));
        }
    }

    Ok(())
}

/// Install the global tracing subscriber, writing to stderr.
fn init_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to set logging subscriber: {}", e))?;

    Ok(())
}
