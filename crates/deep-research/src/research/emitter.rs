//! Progress emitter
//!
//! A single ordered queue between the research loop and whatever forwards
//! events to the client. Producers never wait on the sink:
//!
//! ```text
//!  controller / steps ──try_send──▶ [ bounded mpsc ] ──▶ consumer task ──▶ ProgressSink
//! ```
//!
//! A full buffer drops the newest event; a vanished consumer discards it.
//! Either way the research run carries on.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::events::{Activity, ActivityDelta, ActivityKind, ActivityStatus, ProgressEvent};
use crate::error::SinkError;

/// Default number of buffered events
pub const DEFAULT_EVENT_BUFFER: usize = 256;

/// Destination for progress events
#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn deliver(&self, event: &ProgressEvent) -> Result<(), SinkError>;
}

/// Soft accounting of finished steps against the expected total.
///
/// Only `complete` activities of the per-depth phases (search, extract,
/// analyze) count. A successful extraction counts once per finding it
/// produced. The total is `max_depth × 5` and is not a cap.
#[derive(Debug)]
pub struct StepCounter {
    completed: AtomicU32,
    total: u32,
}

impl StepCounter {
    pub fn new(total: u32) -> Self {
        Self {
            completed: AtomicU32::new(0),
            total,
        }
    }

    pub fn completed(&self) -> u32 {
        self.completed.load(Ordering::SeqCst)
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    /// Count `activity` as `weight` steps and return the counter value
    /// after it.
    fn record(&self, activity: &Activity, weight: u32) -> u32 {
        let counted = matches!(
            activity.kind,
            ActivityKind::Search | ActivityKind::Extract | ActivityKind::Analyze
        );
        if counted && activity.status == ActivityStatus::Complete {
            self.completed.fetch_add(weight, Ordering::SeqCst) + weight
        } else {
            self.completed()
        }
    }
}

#[derive(Debug, Default)]
struct QueueStats {
    accepted: AtomicU64,
    dropped: AtomicU64,
}

/// Producer side of the progress queue. Cheap to clone.
#[derive(Clone)]
pub struct ProgressEmitter {
    tx: mpsc::Sender<ProgressEvent>,
    stats: Arc<QueueStats>,
}

/// Delivery statistics reported once the queue is drained
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Events handed to the sink successfully
    pub delivered: u64,
    /// Events the sink rejected
    pub failed: u64,
    /// Events that never entered the queue
    pub dropped: u64,
}

/// Consumer side: owns the forwarding task.
pub struct EmitterHandle {
    task: JoinHandle<(u64, u64)>,
    stats: Arc<QueueStats>,
}

impl EmitterHandle {
    /// Wait until every producer is dropped and the queue is drained.
    pub async fn finish(self) -> DeliveryReport {
        let (delivered, failed) = match self.task.await {
            Ok(counts) => counts,
            Err(e) => {
                warn!(error = %e, "Progress consumer task ended abnormally");
                (0, 0)
            }
        };
        let report = DeliveryReport {
            delivered,
            failed,
            dropped: self.stats.dropped.load(Ordering::SeqCst),
        };
        debug!(?report, "Progress stream closed");
        report
    }
}

impl ProgressEmitter {
    /// Start the consumer task forwarding to `sink`.
    pub fn spawn(sink: Arc<dyn ProgressSink>, capacity: usize) -> (Self, EmitterHandle) {
        let (tx, mut rx) = mpsc::channel::<ProgressEvent>(capacity.max(1));
        let stats = Arc::new(QueueStats::default());

        let task = tokio::spawn(async move {
            let mut delivered = 0u64;
            let mut failed = 0u64;
            while let Some(event) = rx.recv().await {
                match sink.deliver(&event).await {
                    Ok(()) => delivered += 1,
                    Err(e) => {
                        failed += 1;
                        warn!(kind = event.kind(), error = %e, "Progress sink rejected event");
                    }
                }
            }
            (delivered, failed)
        });

        (
            Self {
                tx,
                stats: Arc::clone(&stats),
            },
            EmitterHandle { task, stats },
        )
    }

    /// Queue an event without waiting. Never fails the caller.
    pub fn emit(&self, event: ProgressEvent) {
        match self.tx.try_send(event) {
            Ok(()) => {
                self.stats.accepted.fetch_add(1, Ordering::SeqCst);
            }
            Err(TrySendError::Full(event)) => {
                self.stats.dropped.fetch_add(1, Ordering::SeqCst);
                warn!(kind = event.kind(), "Progress buffer full, dropping event");
            }
            Err(TrySendError::Closed(event)) => {
                self.stats.dropped.fetch_add(1, Ordering::SeqCst);
                debug!(kind = event.kind(), "Progress consumer gone, discarding event");
            }
        }
    }

    /// Count the activity against `steps` and queue it with the counters
    /// stamped on.
    pub fn activity(&self, steps: &StepCounter, activity: Activity) {
        self.weighted_activity(steps, activity, 1);
    }

    /// Like [`activity`](Self::activity), counting a completion as `weight`
    /// steps.
    pub fn weighted_activity(&self, steps: &StepCounter, activity: Activity, weight: u32) {
        let completed_steps = steps.record(&activity, weight);
        self.emit(ProgressEvent::ActivityDelta(ActivityDelta {
            activity,
            completed_steps,
            total_steps: steps.total(),
        }));
    }

    /// Number of events accepted into the queue so far
    pub fn accepted(&self) -> u64 {
        self.stats.accepted.load(Ordering::SeqCst)
    }
}

/// In-memory sink, useful for embedding and tests
#[derive(Debug, Clone, Default)]
pub struct CollectingSink {
    events: Arc<Mutex<Vec<ProgressEvent>>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything delivered so far
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ProgressSink for CollectingSink {
    async fn deliver(&self, event: &ProgressEvent) -> Result<(), SinkError> {
        self.events
            .lock()
            .map_err(|_| SinkError::Closed)?
            .push(event.clone());
        Ok(())
    }
}

/// Sink that writes events to the tracing log
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

#[async_trait]
impl ProgressSink for TracingSink {
    async fn deliver(&self, event: &ProgressEvent) -> Result<(), SinkError> {
        match event {
            ProgressEvent::ActivityDelta(delta) => info!(
                kind = ?delta.activity.kind,
                status = ?delta.activity.status,
                depth = delta.activity.depth,
                completed = delta.completed_steps,
                total = delta.total_steps,
                "{}",
                delta.activity.message
            ),
            ProgressEvent::DepthDelta(depth) => {
                info!(current = depth.current, max = depth.max, "Research depth")
            }
            ProgressEvent::SourceDelta(source) => debug!(url = %source.url, title = %source.title, "Source"),
            ProgressEvent::ProgressInit(init) => {
                info!(max_depth = init.max_depth, total_steps = init.total_steps, "Research started")
            }
            ProgressEvent::Finish(report) => info!(chars = report.len(), "Report ready"),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::Source;

    struct FailingSink;

    #[async_trait]
    impl ProgressSink for FailingSink {
        async fn deliver(&self, _event: &ProgressEvent) -> Result<(), SinkError> {
            Err(SinkError::Closed)
        }
    }

    fn source(n: usize) -> ProgressEvent {
        ProgressEvent::SourceDelta(Source::new(format!("https://{}.com", n), "", ""))
    }

    #[tokio::test]
    async fn test_events_delivered_in_order() {
        let sink = CollectingSink::new();
        let (emitter, handle) = ProgressEmitter::spawn(Arc::new(sink.clone()), 16);

        for n in 0..10 {
            emitter.emit(source(n));
        }
        drop(emitter);
        let report = handle.finish().await;

        assert_eq!(report.delivered, 10);
        assert_eq!(report.dropped, 0);
        let urls: Vec<String> = sink
            .events()
            .into_iter()
            .map(|e| match e {
                ProgressEvent::SourceDelta(s) => s.url,
                other => panic!("unexpected event {:?}", other),
            })
            .collect();
        let expected: Vec<String> = (0..10).map(|n| format!("https://{}.com", n)).collect();
        assert_eq!(urls, expected);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_full_buffer_drops_without_blocking() {
        let sink = CollectingSink::new();
        let (emitter, handle) = ProgressEmitter::spawn(Arc::new(sink.clone()), 2);

        // The consumer cannot run until we yield, so only two fit.
        for n in 0..5 {
            emitter.emit(source(n));
        }
        assert_eq!(emitter.accepted(), 2);
        drop(emitter);
        let report = handle.finish().await;

        assert_eq!(report.delivered, 2);
        assert_eq!(report.dropped, 3);
        assert_eq!(sink.events().len(), 2);
    }

    #[tokio::test]
    async fn test_sink_failures_do_not_stop_the_stream() {
        let (emitter, handle) = ProgressEmitter::spawn(Arc::new(FailingSink), 8);
        emitter.emit(source(1));
        emitter.emit(source(2));
        drop(emitter);

        let report = handle.finish().await;
        assert_eq!(report.delivered, 0);
        assert_eq!(report.failed, 2);
    }

    #[tokio::test]
    async fn test_activity_counts_only_complete() {
        let sink = CollectingSink::new();
        let (emitter, handle) = ProgressEmitter::spawn(Arc::new(sink.clone()), 8);
        let steps = StepCounter::new(10);

        for status in [
            ActivityStatus::Pending,
            ActivityStatus::Complete,
            ActivityStatus::Error,
            ActivityStatus::Complete,
        ] {
            emitter.activity(&steps, Activity::new(ActivityKind::Search, status, "step", 1));
        }
        drop(emitter);
        handle.finish().await;

        assert_eq!(steps.completed(), 2);
        let stamped: Vec<u32> = sink
            .events()
            .iter()
            .filter_map(|e| e.as_activity().map(|a| a.completed_steps))
            .collect();
        assert_eq!(stamped, vec![0, 1, 1, 2]);
    }

    #[tokio::test]
    async fn test_synthesis_and_thought_are_not_counted() {
        let (emitter, handle) = ProgressEmitter::spawn(Arc::new(CollectingSink::new()), 8);
        let steps = StepCounter::new(5);

        emitter.activity(
            &steps,
            Activity::new(ActivityKind::Analyze, ActivityStatus::Complete, "done", 1),
        );
        emitter.activity(
            &steps,
            Activity::new(ActivityKind::Synthesis, ActivityStatus::Complete, "Research completed", 1),
        );
        emitter.activity(
            &steps,
            Activity::new(ActivityKind::Thought, ActivityStatus::Complete, "note", 1),
        );
        drop(emitter);
        handle.finish().await;

        assert_eq!(steps.completed(), 1);
    }

    #[tokio::test]
    async fn test_weighted_completion() {
        let sink = CollectingSink::new();
        let (emitter, handle) = ProgressEmitter::spawn(Arc::new(sink.clone()), 8);
        let steps = StepCounter::new(10);

        emitter.weighted_activity(
            &steps,
            Activity::new(ActivityKind::Extract, ActivityStatus::Complete, "two findings", 1),
            2,
        );
        emitter.weighted_activity(
            &steps,
            Activity::new(ActivityKind::Extract, ActivityStatus::Error, "failed", 1),
            2,
        );
        drop(emitter);
        handle.finish().await;

        assert_eq!(steps.completed(), 2);
        let stamped: Vec<u32> = sink
            .events()
            .iter()
            .filter_map(|e| e.as_activity().map(|a| a.completed_steps))
            .collect();
        assert_eq!(stamped, vec![2, 2]);
    }
}
