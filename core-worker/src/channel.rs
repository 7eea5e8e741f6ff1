//! # Worker Channel
//!
//! A bidirectional message-passing connection to one isolated background
//! execution context.
//!
//! ## Overview
//!
//! Each channel owns a dedicated worker thread running the blocking codec.
//! Requests flow in over a synchronous channel (the worker blocks waiting for
//! work); progress and terminal messages flow back over an async channel the
//! coordinator awaits without blocking.
//!
//! ## Execution model
//!
//! A channel processes at most one run at a time. The worker context blocks
//! inside the codec until it yields progress or a terminal result, so
//! concurrency across files is achieved with multiple channels, never by
//! multiplexing one.
//!
//! ## Termination
//!
//! `terminate` consumes the channel; a terminated context is never reused.
//! The worker thread is detached: if it is mid-conversion it finishes in the
//! background and its remaining messages land in a closed channel and are
//! discarded, so invalidated completions can never fire.

use crate::error::{Result, WorkerError};
use crate::messages::{RequestId, RunRequest, WorkerMessage};
use codec_traits::{FileCodec, JobInput};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::mpsc as sync_mpsc;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

/// Message-passing handle to one background worker context.
pub struct WorkerChannel {
    request_tx: sync_mpsc::Sender<RunRequest>,
    message_rx: mpsc::UnboundedReceiver<WorkerMessage>,
    in_flight: Option<RequestId>,
}

impl WorkerChannel {
    /// Spawn a new worker context running `codec`.
    ///
    /// # Errors
    ///
    /// Returns [`WorkerError::SpawnFailed`] if the OS refuses the thread.
    pub fn spawn(codec: Arc<dyn FileCodec>) -> Result<Self> {
        let (request_tx, request_rx) = sync_mpsc::channel::<RunRequest>();
        let (message_tx, message_rx) = mpsc::unbounded_channel();

        std::thread::Builder::new()
            .name(format!("fileworks-{}", codec.kind()))
            .spawn(move || worker_loop(codec, request_rx, message_tx))
            .map_err(|e| WorkerError::SpawnFailed(e.to_string()))?;

        Ok(Self {
            request_tx,
            message_rx,
            in_flight: None,
        })
    }

    /// Submit a run request, transferring ownership of its binary payload to
    /// the worker.
    ///
    /// # Errors
    ///
    /// Returns [`WorkerError::ChannelBusy`] if a previous request has not
    /// resolved yet, and [`WorkerError::ChannelClosed`] if the worker context
    /// is gone.
    pub fn submit(&mut self, request: RunRequest) -> Result<()> {
        if let Some(request_id) = self.in_flight {
            return Err(WorkerError::ChannelBusy { request_id });
        }

        let request_id = request.request_id;
        self.request_tx
            .send(request)
            .map_err(|_| WorkerError::ChannelClosed)?;
        self.in_flight = Some(request_id);

        trace!(request_id = %request_id, "Submitted run request");
        Ok(())
    }

    /// Receive the next message from the worker context.
    ///
    /// Returns `None` when the context has shut down without a terminal
    /// message (a crash beyond the codec boundary); the caller must resolve
    /// the in-flight request as a failure exactly once.
    pub async fn recv(&mut self) -> Option<WorkerMessage> {
        let message = self.message_rx.recv().await?;
        if message.is_terminal() {
            self.in_flight = None;
        }
        Some(message)
    }

    /// The request currently awaiting a terminal message, if any.
    pub fn in_flight(&self) -> Option<RequestId> {
        self.in_flight
    }

    /// Hard-stop the channel, discarding the context and any in-flight work.
    ///
    /// Returns the invalidated in-flight request, which the caller must
    /// resolve as cancelled. Consumes the channel: a terminated context is
    /// never reused.
    pub fn terminate(mut self) -> Option<RequestId> {
        let invalidated = self.in_flight.take();
        self.message_rx.close();
        if let Some(request_id) = invalidated {
            debug!(request_id = %request_id, "Terminated channel with in-flight request");
        }
        invalidated
    }
}

/// Worker thread body: one blocking conversion per request, exactly one
/// terminal message per request.
fn worker_loop(
    codec: Arc<dyn FileCodec>,
    request_rx: sync_mpsc::Receiver<RunRequest>,
    message_tx: mpsc::UnboundedSender<WorkerMessage>,
) {
    while let Ok(request) = request_rx.recv() {
        let request_id = request.request_id;
        let progress_tx = message_tx.clone();

        let outcome = catch_unwind(AssertUnwindSafe(|| {
            codec.run(
                JobInput::new(request.binary, request.params),
                &move |percent| {
                    progress_tx
                        .send(WorkerMessage::Progress {
                            request_id,
                            percent,
                        })
                        .ok();
                },
            )
        }));

        let terminal = match outcome {
            Ok(Ok(output)) => WorkerMessage::Completed { request_id, output },
            Ok(Err(e)) => WorkerMessage::Failed {
                request_id,
                reason: e.to_string(),
            },
            Err(panic) => {
                let reason = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                warn!(request_id = %request_id, reason = %reason, "Worker context crashed");
                WorkerMessage::Failed {
                    request_id,
                    reason: format!("worker crashed: {}", reason),
                }
            }
        };

        // Send failure means the coordinator terminated the channel; the
        // terminal message is intentionally discarded.
        if message_tx.send(terminal).is_err() {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use codec_traits::testing::{FailureScript, ScriptedCodec};
    use codec_traits::{OperationKind, OperationParams};

    fn request() -> RunRequest {
        RunRequest::new(
            Bytes::from_static(b"payload"),
            OperationParams::new(OperationKind::ConvertImage),
        )
    }

    #[tokio::test]
    async fn test_run_to_completion_with_progress() {
        let codec = Arc::new(ScriptedCodec::succeeding(OperationKind::ConvertImage));
        let mut channel = WorkerChannel::spawn(codec).unwrap();

        let req = request();
        let request_id = req.request_id;
        channel.submit(req).unwrap();
        assert_eq!(channel.in_flight(), Some(request_id));

        let mut progress = Vec::new();
        loop {
            match channel.recv().await.unwrap() {
                WorkerMessage::Progress { percent, .. } => progress.push(percent),
                WorkerMessage::Completed {
                    request_id: id,
                    output,
                } => {
                    assert_eq!(id, request_id);
                    assert_eq!(&output.binary[..], b"daolyap");
                    break;
                }
                WorkerMessage::Failed { reason, .. } => panic!("unexpected failure: {}", reason),
            }
        }

        assert_eq!(progress, vec![25, 50, 75, 100]);
        assert_eq!(channel.in_flight(), None);
    }

    #[tokio::test]
    async fn test_second_submit_while_in_flight_is_rejected() {
        let codec = Arc::new(
            ScriptedCodec::succeeding(OperationKind::ConvertImage)
                .with_run_delay(std::time::Duration::from_millis(100)),
        );
        let mut channel = WorkerChannel::spawn(codec).unwrap();

        channel.submit(request()).unwrap();
        let result = channel.submit(request());
        assert!(matches!(result, Err(WorkerError::ChannelBusy { .. })));
    }

    #[tokio::test]
    async fn test_codec_error_resolves_as_failed() {
        let codec = Arc::new(ScriptedCodec::always_failing(
            OperationKind::CompressPdf,
            FailureScript::CorruptInput,
        ));
        let mut channel = WorkerChannel::spawn(codec).unwrap();
        channel.submit(request()).unwrap();

        match channel.recv().await.unwrap() {
            WorkerMessage::Failed { reason, .. } => assert!(reason.contains("corrupt")),
            other => panic!("expected failure, got {:?}", other),
        }
        assert_eq!(channel.in_flight(), None);
    }

    #[tokio::test]
    async fn test_codec_panic_resolves_as_failed_once() {
        let codec = Arc::new(ScriptedCodec::always_failing(
            OperationKind::MergePdf,
            FailureScript::Panic,
        ));
        let mut channel = WorkerChannel::spawn(codec).unwrap();
        channel.submit(request()).unwrap();

        match channel.recv().await.unwrap() {
            WorkerMessage::Failed { reason, .. } => assert!(reason.contains("worker crashed")),
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_terminate_reports_invalidated_request() {
        let codec = Arc::new(
            ScriptedCodec::succeeding(OperationKind::ConvertImage)
                .with_run_delay(std::time::Duration::from_millis(200)),
        );
        let mut channel = WorkerChannel::spawn(codec).unwrap();

        let req = request();
        let request_id = req.request_id;
        channel.submit(req).unwrap();

        assert_eq!(channel.terminate(), Some(request_id));
    }

    #[tokio::test]
    async fn test_terminate_idle_channel_invalidates_nothing() {
        let codec = Arc::new(ScriptedCodec::succeeding(OperationKind::ConvertImage));
        let channel = WorkerChannel::spawn(codec).unwrap();
        assert_eq!(channel.terminate(), None);
    }
}
