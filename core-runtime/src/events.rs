//! # Event Bus
//!
//! Decoupled communication between the pipeline core and its host using
//! `tokio::sync::broadcast`. The host renders queue state from events instead
//! of polling the scheduler.
//!
//! ## Overview
//!
//! - **Event Types**: strongly-typed enums per domain (queue, job, settings)
//! - **EventBus**: central broadcast channel for publishing events
//! - **Subscription**: any number of independent subscribers
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{EventBus, CoreEvent, JobEvent};
//!
//! let bus = EventBus::new(100);
//! let mut stream = bus.subscribe();
//!
//! bus.emit(CoreEvent::Job(JobEvent::Progress {
//!     item_id: "item-1".to_string(),
//!     percent: 40,
//! }))
//! .ok();
//! ```
//!
//! Subscribers receive `RecvError::Lagged(n)` when they fall behind; that is
//! non-fatal. `RecvError::Closed` signals shutdown.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event enum encompassing all event categories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Queue-level events (admission, rejection, packaging)
    Queue(QueueEvent),
    /// Per-item job lifecycle events
    Job(JobEvent),
    /// Settings propagation events
    Settings(SettingsEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Queue(e) => e.description(),
            CoreEvent::Job(e) => e.description(),
            CoreEvent::Settings(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Queue(QueueEvent::FilesRejected { .. }) => EventSeverity::Warning,
            CoreEvent::Job(JobEvent::Failed { .. }) => EventSeverity::Error,
            CoreEvent::Job(JobEvent::Completed { .. }) => EventSeverity::Info,
            CoreEvent::Job(JobEvent::Retrying { .. }) => EventSeverity::Warning,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    /// Debug-level events (verbose)
    Debug,
    /// Informational events
    Info,
    /// Warning events
    Warning,
    /// Error events
    Error,
}

// ============================================================================
// Queue Events
// ============================================================================

/// Events about the queue as a whole.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum QueueEvent {
    /// Files passed validation and entered the queue.
    FilesAdmitted {
        /// Ids of the admitted items, in drop order.
        item_ids: Vec<String>,
    },
    /// Files were rejected by validation and never entered the queue.
    FilesRejected {
        /// One human-readable reason per rejected file.
        reasons: Vec<String>,
    },
    /// An item was removed by the user.
    ItemRemoved {
        /// The removed item id.
        item_id: String,
        /// Whether a running job was cancelled by the removal.
        was_running: bool,
    },
    /// Finished outputs were packaged into a single archive.
    ResultsPackaged {
        /// Number of entries in the archive.
        entry_count: usize,
        /// Archive size in bytes.
        archive_bytes: u64,
    },
}

impl QueueEvent {
    fn description(&self) -> &str {
        match self {
            QueueEvent::FilesAdmitted { .. } => "Files admitted to queue",
            QueueEvent::FilesRejected { .. } => "Files rejected by validation",
            QueueEvent::ItemRemoved { .. } => "Item removed",
            QueueEvent::ResultsPackaged { .. } => "Results packaged",
        }
    }
}

// ============================================================================
// Job Events
// ============================================================================

/// Per-item lifecycle events.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum JobEvent {
    /// Item started running on a worker.
    Started {
        /// The item id.
        item_id: String,
        /// Attempt number, 0 for the first run.
        attempt: u32,
    },
    /// Progress update from the worker.
    Progress {
        /// The item id.
        item_id: String,
        /// Progress percentage (0-100), monotonically non-decreasing per run.
        percent: u8,
    },
    /// Item finished successfully.
    Completed {
        /// The item id.
        item_id: String,
        /// Output size in bytes.
        output_bytes: u64,
    },
    /// Item failed and will be retried after a cooldown.
    Retrying {
        /// The item id.
        item_id: String,
        /// Attempt that just failed, 0-based.
        attempt: u32,
        /// Cooldown before resubmission, in milliseconds.
        delay_ms: u64,
        /// Raw failure reason.
        reason: String,
    },
    /// Item failed terminally.
    Failed {
        /// The item id.
        item_id: String,
        /// Short user-facing message, never a raw error dump.
        message: String,
        /// Total attempts consumed.
        attempts: u32,
    },
}

impl JobEvent {
    fn description(&self) -> &str {
        match self {
            JobEvent::Started { .. } => "Job started",
            JobEvent::Progress { .. } => "Job progress",
            JobEvent::Completed { .. } => "Job completed",
            JobEvent::Retrying { .. } => "Job retrying",
            JobEvent::Failed { .. } => "Job failed",
        }
    }
}

// ============================================================================
// Settings Events
// ============================================================================

/// Settings propagation events.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum SettingsEvent {
    /// Global settings were rewritten; items still bound to them re-run.
    GlobalUpdated {
        /// Items reset to pending by the update.
        reset_item_ids: Vec<String>,
    },
    /// One item forked its own settings copy.
    ItemForked {
        /// The forked item id.
        item_id: String,
    },
    /// One value set was applied to every item (explicit user action).
    AppliedToAll {
        /// Number of items affected.
        item_count: usize,
    },
}

impl SettingsEvent {
    fn description(&self) -> &str {
        match self {
            SettingsEvent::GlobalUpdated { .. } => "Global settings updated",
            SettingsEvent::ItemForked { .. } => "Item settings forked",
            SettingsEvent::AppliedToAll { .. } => "Settings applied to all items",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central event bus for publishing and subscribing to core events.
///
/// Thread-safe and cheaply cloneable; clones share the same channel.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Create an event bus with the given buffer size.
    pub fn new(buffer_size: usize) -> Self {
        let (sender, _) = broadcast::channel(buffer_size);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// Returns the number of subscribers that received the event. Publishing
    /// with no subscribers is not an error worth surfacing; callers typically
    /// ignore the result with `.ok()`.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Subscribe to all future events.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_emit_and_receive() {
        let bus = EventBus::new(10);
        let mut stream = bus.subscribe();

        bus.emit(CoreEvent::Job(JobEvent::Progress {
            item_id: "item-1".to_string(),
            percent: 50,
        }))
        .unwrap();

        let event = stream.recv().await.unwrap();
        assert_eq!(
            event,
            CoreEvent::Job(JobEvent::Progress {
                item_id: "item-1".to_string(),
                percent: 50,
            })
        );
    }

    #[tokio::test]
    async fn test_multiple_subscribers_receive_independently() {
        let bus = EventBus::new(10);
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();

        bus.emit(CoreEvent::Settings(SettingsEvent::AppliedToAll {
            item_count: 3,
        }))
        .unwrap();

        assert!(a.recv().await.is_ok());
        assert!(b.recv().await.is_ok());
    }

    #[test]
    fn test_emit_without_subscribers_is_err_not_panic() {
        let bus = EventBus::new(10);
        let result = bus.emit(CoreEvent::Queue(QueueEvent::FilesAdmitted {
            item_ids: vec![],
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_severity_classification() {
        let failed = CoreEvent::Job(JobEvent::Failed {
            item_id: "x".to_string(),
            message: "corrupt".to_string(),
            attempts: 3,
        });
        assert_eq!(failed.severity(), EventSeverity::Error);

        let rejected = CoreEvent::Queue(QueueEvent::FilesRejected {
            reasons: vec!["too big".to_string()],
        });
        assert_eq!(rejected.severity(), EventSeverity::Warning);
    }

    #[test]
    fn test_events_serialize_with_tags() {
        let event = CoreEvent::Job(JobEvent::Started {
            item_id: "item-9".to_string(),
            attempt: 1,
        });
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"Job\""));
        assert!(json.contains("\"event\":\"Started\""));
    }
}
