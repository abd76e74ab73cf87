//! The sink trait and the non-test implementations.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use cage_core::{Clock, SystemClock, UserId};
use cage_store::Store;

use crate::kind::EventKind;

/// Destination for audit events.
///
/// Failures are opaque to callers; the [`Notifier`](crate::Notifier) logs
/// and drops them.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn record(
        &self,
        kind: EventKind,
        description: &str,
        actor: Option<&UserId>,
    ) -> anyhow::Result<()>;
}

#[async_trait]
impl<S: EventSink + ?Sized> EventSink for Arc<S> {
    async fn record(
        &self,
        kind: EventKind,
        description: &str,
        actor: Option<&UserId>,
    ) -> anyhow::Result<()> {
        (**self).record(kind, description, actor).await
    }
}

/// Persists events through a [`Store`].
pub struct StoreSink {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
}

impl StoreSink {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    pub fn with_clock(store: Arc<dyn Store>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }
}

#[async_trait]
impl EventSink for StoreSink {
    async fn record(
        &self,
        kind: EventKind,
        description: &str,
        actor: Option<&UserId>,
    ) -> anyhow::Result<()> {
        self.store
            .insert_event(kind.as_str(), description, actor, self.clock.now_millis())
            .await?;
        Ok(())
    }
}

/// Writes events to the log only.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

#[async_trait]
impl EventSink for TracingSink {
    async fn record(
        &self,
        kind: EventKind,
        description: &str,
        actor: Option<&UserId>,
    ) -> anyhow::Result<()> {
        info!(
            kind = kind.as_str(),
            actor = actor.map(UserId::as_str).unwrap_or("-"),
            "{}",
            description
        );
        Ok(())
    }
}
