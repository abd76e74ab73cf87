//! Bounded, asynchronous delivery.
//!
//! [`QueuedSink::record`] only enqueues; a [`QueueWorker`] drains the queue
//! into the real sink on its own task. When the queue is full the oldest
//! pending event is dropped to make room, so a slow sink never blocks an
//! action and memory stays bounded.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::anyhow;
use async_trait::async_trait;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use cage_core::UserId;

use crate::kind::EventKind;
use crate::sink::EventSink;

/// Queue capacity used when none is configured.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

struct Pending {
    kind: EventKind,
    description: String,
    actor: Option<UserId>,
}

struct Shared {
    queue: Mutex<VecDeque<Pending>>,
    capacity: usize,
    wake: Notify,
    closed: AtomicBool,
    dropped: AtomicU64,
}

impl Shared {
    fn lock(&self) -> Option<MutexGuard<'_, VecDeque<Pending>>> {
        self.queue.lock().ok()
    }
}

/// The producer half of an event queue.
#[derive(Clone)]
pub struct QueuedSink {
    shared: Arc<Shared>,
}

/// The consumer half: forwards queued events to the inner sink.
pub struct QueueWorker {
    shared: Arc<Shared>,
    inner: Arc<dyn EventSink>,
}

impl QueuedSink {
    /// Create a queue in front of `inner`. The worker must be run (or
    /// spawned) for anything to reach `inner`.
    pub fn new(inner: Arc<dyn EventSink>, capacity: usize) -> (Self, QueueWorker) {
        let shared = Arc::new(Shared {
            queue: Mutex::new(VecDeque::with_capacity(capacity.min(DEFAULT_QUEUE_CAPACITY))),
            capacity: capacity.max(1),
            wake: Notify::new(),
            closed: AtomicBool::new(false),
            dropped: AtomicU64::new(0),
        });
        let worker = QueueWorker {
            shared: Arc::clone(&shared),
            inner,
        };
        (Self { shared }, worker)
    }

    /// Create a queue and spawn its worker on the current runtime.
    pub fn spawn(inner: Arc<dyn EventSink>, capacity: usize) -> (Self, JoinHandle<()>) {
        let (sink, worker) = Self::new(inner, capacity);
        (sink, tokio::spawn(worker.run()))
    }

    /// Stop accepting events. The worker drains what is queued, then exits.
    pub fn close(&self) {
        self.shared.closed.store(true, Ordering::SeqCst);
        self.shared.wake.notify_one();
    }

    /// Events discarded because the queue was full.
    pub fn dropped(&self) -> u64 {
        self.shared.dropped.load(Ordering::Relaxed)
    }

    /// Events waiting for the worker.
    pub fn pending(&self) -> usize {
        self.shared.lock().map_or(0, |q| q.len())
    }
}

#[async_trait]
impl EventSink for QueuedSink {
    async fn record(
        &self,
        kind: EventKind,
        description: &str,
        actor: Option<&UserId>,
    ) -> anyhow::Result<()> {
        if self.shared.closed.load(Ordering::SeqCst) {
            return Err(anyhow!("event queue is closed"));
        }

        {
            let mut queue = self
                .shared
                .lock()
                .ok_or_else(|| anyhow!("event queue lock poisoned"))?;
            if queue.len() >= self.shared.capacity {
                if let Some(oldest) = queue.pop_front() {
                    self.shared.dropped.fetch_add(1, Ordering::Relaxed);
                    warn!(kind = oldest.kind.as_str(), "event queue full, dropping oldest");
                }
            }
            queue.push_back(Pending {
                kind,
                description: description.to_string(),
                actor: actor.cloned(),
            });
        }

        self.shared.wake.notify_one();
        Ok(())
    }
}

impl QueueWorker {
    /// Deliver events until the queue is closed and empty.
    pub async fn run(self) {
        loop {
            let next = match self.shared.lock() {
                Some(mut queue) => queue.pop_front(),
                None => {
                    warn!("event queue lock poisoned, stopping worker");
                    return;
                }
            };

            match next {
                Some(event) => {
                    if let Err(e) = self
                        .inner
                        .record(event.kind, &event.description, event.actor.as_ref())
                        .await
                    {
                        warn!(kind = event.kind.as_str(), error = %e, "failed to record queued event");
                    }
                }
                None if self.shared.closed.load(Ordering::SeqCst) => {
                    debug!("event queue drained");
                    return;
                }
                None => self.shared.wake.notified().await,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemorySink;

    #[tokio::test]
    async fn test_queue_delivers_in_order() {
        let inner = Arc::new(MemorySink::new());
        let (sink, handle) = QueuedSink::spawn(inner.clone(), 16);

        sink.record(EventKind::Login, "first", None).await.unwrap();
        sink.record(EventKind::Logout, "second", None).await.unwrap();
        sink.close();
        handle.await.unwrap();

        assert_eq!(inner.kinds(), vec![EventKind::Login, EventKind::Logout]);
        assert_eq!(sink.dropped(), 0);
    }

    #[tokio::test]
    async fn test_full_queue_drops_oldest() {
        let inner = Arc::new(MemorySink::new());
        let (sink, worker) = QueuedSink::new(inner.clone(), 3);

        for i in 0..5 {
            sink.record(EventKind::CommentCreate, &format!("c{i}"), None)
                .await
                .unwrap();
        }
        assert_eq!(sink.pending(), 3);
        assert_eq!(sink.dropped(), 2);

        sink.close();
        worker.run().await;

        let descriptions: Vec<String> = inner.events().into_iter().map(|e| e.description).collect();
        assert_eq!(descriptions, vec!["c2", "c3", "c4"]);
    }

    #[tokio::test]
    async fn test_closed_queue_refuses() {
        let inner = Arc::new(MemorySink::new());
        let (sink, _worker) = QueuedSink::new(inner, 4);
        sink.close();
        assert!(sink.record(EventKind::Login, "late", None).await.is_err());
    }

    #[tokio::test]
    async fn test_inner_failure_does_not_stop_worker() {
        let inner = Arc::new(MemorySink::failing());
        let (sink, worker) = QueuedSink::new(inner.clone(), 4);

        sink.record(EventKind::Login, "lost", None).await.unwrap();
        sink.close();
        worker.run().await;

        assert!(inner.is_empty());
        assert_eq!(sink.pending(), 0);
    }
}
