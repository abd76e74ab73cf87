//! # Cage Events
//!
//! Audit trail plumbing: where "something happened" records go after an
//! action succeeds.
//!
//! ## Overview
//!
//! Actions never talk to a sink directly. They hand the event to a
//! [`Notifier`], which forwards it to an [`EventSink`] and swallows any
//! failure after logging it. An audit write that fails must not undo or
//! fail the mutation it describes.
//!
//! ## Sinks
//!
//! - [`StoreSink`]: appends to the store's `events` table
//! - [`TracingSink`]: emits a `tracing` event, nothing persisted
//! - [`MemorySink`]: collects events for assertions in tests
//! - [`QueuedSink`]: bounded queue in front of another sink, drained by a
//!   background worker; drops the oldest entry when full
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use cage_events::{EventKind, MemorySink, Notifier};
//!
//! async fn example() {
//!     let sink = Arc::new(MemorySink::new());
//!     let notifier = Notifier::new(sink.clone());
//!     notifier.notify(EventKind::CategoryCreate, "Create category Tech", None).await;
//!     assert_eq!(sink.count(EventKind::CategoryCreate), 1);
//! }
//! ```

pub mod kind;
pub mod memory;
pub mod notifier;
pub mod queue;
pub mod sink;

pub use kind::EventKind;
pub use memory::{MemorySink, RecordedEvent};
pub use notifier::Notifier;
pub use queue::{QueueWorker, QueuedSink, DEFAULT_QUEUE_CAPACITY};
pub use sink::{EventSink, StoreSink, TracingSink};
