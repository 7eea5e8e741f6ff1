//! Worker message protocol.
//!
//! Tagged unions exchanged with an isolated worker context. A run request
//! carries the one-shot payload in; progress and exactly one terminal message
//! (completed or failed) come back. Messages on a single channel arrive in
//! send order; there is no ordering guarantee across channels.

use bytes::Bytes;
use codec_traits::{JobOutput, OperationParams};
use uuid::Uuid;

/// Unique identifier correlating a run request with its messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Create a new random request ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the string representation of this ID
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One-shot job submission to a worker context.
///
/// # Ownership
///
/// `binary` is **transferred**: submitting the request moves the buffer into
/// the worker without copying. `params` is a plain value copy.
#[derive(Debug)]
pub struct RunRequest {
    /// Correlation id for all messages of this run
    pub request_id: RequestId,
    /// File content; ownership moves to the worker
    pub binary: Bytes,
    /// Operation parameters; copied
    pub params: OperationParams,
}

impl RunRequest {
    pub fn new(binary: Bytes, params: OperationParams) -> Self {
        Self {
            request_id: RequestId::new(),
            binary,
            params,
        }
    }
}

/// Message from a worker context back to the coordinator.
///
/// Zero or more `Progress` messages precede exactly one terminal message
/// (`Completed` or `Failed`) per request.
#[derive(Debug)]
pub enum WorkerMessage {
    /// Progress update, percent 0-100
    Progress { request_id: RequestId, percent: u8 },
    /// Conversion finished; ownership of the output moves to the receiver
    Completed {
        request_id: RequestId,
        output: JobOutput,
    },
    /// Conversion failed; `reason` carries the codec's error text for
    /// classification upstream
    Failed {
        request_id: RequestId,
        reason: String,
    },
}

impl WorkerMessage {
    /// The request this message belongs to.
    pub fn request_id(&self) -> RequestId {
        match self {
            WorkerMessage::Progress { request_id, .. } => *request_id,
            WorkerMessage::Completed { request_id, .. } => *request_id,
            WorkerMessage::Failed { request_id, .. } => *request_id,
        }
    }

    /// Whether this message resolves its request.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            WorkerMessage::Completed { .. } | WorkerMessage::Failed { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_ids_are_unique() {
        assert_ne!(RequestId::new(), RequestId::new());
    }

    #[test]
    fn test_terminal_classification() {
        let id = RequestId::new();
        assert!(!WorkerMessage::Progress {
            request_id: id,
            percent: 10
        }
        .is_terminal());
        assert!(WorkerMessage::Failed {
            request_id: id,
            reason: "x".to_string()
        }
        .is_terminal());
    }
}
