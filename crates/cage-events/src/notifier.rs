//! Best-effort delivery to a sink.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use cage_core::UserId;

use crate::kind::EventKind;
use crate::sink::EventSink;

/// Forwards events to a sink and never reports failure.
#[derive(Clone)]
pub struct Notifier {
    sink: Arc<dyn EventSink>,
}

impl Notifier {
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self { sink }
    }

    /// Record an event. Sink errors are logged at `warn` and dropped.
    pub async fn notify(&self, kind: EventKind, description: &str, actor: Option<&UserId>) {
        match self.sink.record(kind, description, actor).await {
            Ok(()) => debug!(kind = kind.as_str(), "event recorded"),
            Err(e) => warn!(
                kind = kind.as_str(),
                error = %e,
                "failed to record event"
            ),
        }
    }
}

impl fmt::Debug for Notifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notifier").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemorySink;

    #[tokio::test]
    async fn test_notify_forwards() {
        let sink = Arc::new(MemorySink::new());
        let notifier = Notifier::new(sink.clone());
        notifier
            .notify(EventKind::CommentCreate, "Comment on hello", None)
            .await;
        assert_eq!(sink.count(EventKind::CommentCreate), 1);
    }

    #[tokio::test]
    async fn test_notify_swallows_failure() {
        let sink = Arc::new(MemorySink::failing());
        let notifier = Notifier::new(sink.clone());
        // Completes without panicking or returning an error.
        notifier.notify(EventKind::Exception, "boom", None).await;
        assert!(sink.is_empty());
    }
}
