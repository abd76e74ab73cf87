//! A sink that keeps events in memory.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use anyhow::anyhow;
use async_trait::async_trait;

use cage_core::UserId;

use crate::kind::EventKind;
use crate::sink::EventSink;

/// An event as a [`MemorySink`] received it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedEvent {
    pub kind: EventKind,
    pub description: String,
    pub actor: Option<UserId>,
}

/// Collects events for inspection. Can be told to fail.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<RecordedEvent>>,
    failing: AtomicBool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink whose every `record` call fails.
    pub fn failing() -> Self {
        let sink = Self::default();
        sink.set_failing(true);
        sink
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn lock(&self) -> MutexGuard<'_, Vec<RecordedEvent>> {
        // Events pushed before a poisoning panic are still whole.
        self.events.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn events(&self) -> Vec<RecordedEvent> {
        self.lock().clone()
    }

    pub fn kinds(&self) -> Vec<EventKind> {
        self.lock().iter().map(|e| e.kind).collect()
    }

    /// Number of recorded events of `kind`.
    pub fn count(&self, kind: EventKind) -> usize {
        self.lock().iter().filter(|e| e.kind == kind).count()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}

#[async_trait]
impl EventSink for MemorySink {
    async fn record(
        &self,
        kind: EventKind,
        description: &str,
        actor: Option<&UserId>,
    ) -> anyhow::Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(anyhow!("memory sink is set to fail"));
        }
        self.lock().push(RecordedEvent {
            kind,
            description: description.to_string(),
            actor: actor.cloned(),
        });
        Ok(())
    }
}
