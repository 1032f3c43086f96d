//! Terminal progress output
//!
//! `ConsoleSink` prints one readable line per event on stderr.
//! `JsonLinesSink` writes each event as a `{"type", "content"}` JSON object
//! per line, for piping into another process.

use async_trait::async_trait;
use deep_research::research::{ActivityStatus, ProgressEvent};
use deep_research::{ProgressSink, SinkError};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;

/// Human-readable progress on stderr
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleSink;

/// Render an event as a console line; `None` for events not shown.
pub fn format_event(event: &ProgressEvent) -> Option<String> {
    match event {
        ProgressEvent::ProgressInit(init) => Some(format!(
            "Researching (up to {} rounds, {} steps)",
            init.max_depth, init.total_steps
        )),
        ProgressEvent::DepthDelta(depth) => Some(format!(
            "── Round {}/{} ── [{}/{} steps]",
            depth.current, depth.max, depth.completed_steps, depth.total_steps
        )),
        ProgressEvent::SourceDelta(source) => {
            let title = if source.title.is_empty() {
                source.url.as_str()
            } else {
                source.title.as_str()
            };
            Some(format!("    · {} <{}>", title, source.url))
        }
        ProgressEvent::ActivityDelta(delta) => {
            let marker = match delta.activity.status {
                ActivityStatus::Pending => "…",
                ActivityStatus::Complete => "✓",
                ActivityStatus::Error => "✗",
            };
            Some(format!(
                "  {} [{:?}] {}",
                marker, delta.activity.kind, delta.activity.message
            ))
        }
        // The report itself is printed once the run returns
        ProgressEvent::Finish(_) => None,
    }
}

#[async_trait]
impl ProgressSink for ConsoleSink {
    async fn deliver(&self, event: &ProgressEvent) -> Result<(), SinkError> {
        if let Some(line) = format_event(event) {
            eprintln!("{}", line);
        }
        Ok(())
    }
}

/// Newline-delimited JSON events
pub struct JsonLinesSink<W> {
    writer: Mutex<W>,
    /// Set once a `finish` line has been written
    finished: AtomicBool,
}

impl JsonLinesSink<tokio::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(tokio::io::stdout())
    }
}

impl<W> JsonLinesSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
            finished: AtomicBool::new(false),
        }
    }

    /// Write the `finish` line for `report` unless one already went out.
    /// Returns whether it had to be written here.
    ///
    /// The emitter drops events when its queue is full, so the report
    /// can miss the stream on a slow reader.
    pub async fn ensure_finish(&self, report: &str) -> Result<bool, SinkError> {
        if self.finished.load(Ordering::SeqCst) {
            return Ok(false);
        }
        self.write_event(&ProgressEvent::Finish(report.to_string())).await?;
        Ok(true)
    }

    async fn write_event(&self, event: &ProgressEvent) -> Result<(), SinkError> {
        let mut line = serde_json::to_vec(event)?;
        line.push(b'\n');

        let mut writer = self.writer.lock().await;
        writer.write_all(&line).await?;
        writer.flush().await?;
        if matches!(event, ProgressEvent::Finish(_)) {
            self.finished.store(true, Ordering::SeqCst);
        }
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

#[async_trait]
impl<W> ProgressSink for JsonLinesSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn deliver(&self, event: &ProgressEvent) -> Result<(), SinkError> {
        self.write_event(event).await
    }
}
