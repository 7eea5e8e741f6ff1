//! # Worker Pool
//!
//! Explicit spawn/terminate lifecycle for a bounded set of worker channels,
//! one channel per running job.
//!
//! ## Overview
//!
//! The pool enforces the concurrency bound (at most `max_concurrent` channels
//! alive), routes messages from whichever channel speaks next back to the
//! caller, and guarantees that every submitted request resolves exactly once:
//! with the worker's own terminal message, with a synthesized failure if the
//! context dies silently, or not at all after an explicit `cancel` (the
//! caller resolves cancelled requests itself).
//!
//! Two different jobs' progress messages may interleave arbitrarily; order is
//! only guaranteed per channel.

use crate::channel::WorkerChannel;
use crate::error::{Result, WorkerError};
use crate::messages::{RequestId, RunRequest, WorkerMessage};
use codec_traits::FileCodec;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

struct ActiveJob {
    channel: WorkerChannel,
    last_message_at: Instant,
}

/// Bounded pool of single-job worker channels.
pub struct WorkerPool {
    active: HashMap<RequestId, ActiveJob>,
    max_concurrent: usize,
}

impl WorkerPool {
    /// Create a pool allowing at most `max_concurrent` live channels.
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            active: HashMap::new(),
            max_concurrent,
        }
    }

    /// Number of live channels.
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Whether another job can be admitted.
    pub fn has_capacity(&self) -> bool {
        self.active.len() < self.max_concurrent
    }

    /// Spawn a fresh channel for `codec` and submit `request` on it.
    ///
    /// The request's binary payload moves into the worker.
    ///
    /// # Errors
    ///
    /// Returns [`WorkerError::CapacityExhausted`] when the bound is reached.
    pub fn submit(&mut self, codec: Arc<dyn FileCodec>, request: RunRequest) -> Result<RequestId> {
        if !self.has_capacity() {
            return Err(WorkerError::CapacityExhausted {
                max: self.max_concurrent,
            });
        }

        let request_id = request.request_id;
        let mut channel = WorkerChannel::spawn(codec)?;
        channel.submit(request)?;

        self.active.insert(
            request_id,
            ActiveJob {
                channel,
                last_message_at: Instant::now(),
            },
        );

        debug!(
            request_id = %request_id,
            active = self.active.len(),
            max = self.max_concurrent,
            "Job submitted to worker pool"
        );
        Ok(request_id)
    }

    /// Await the next message from any live channel.
    ///
    /// Returns `None` when the pool is idle. A terminal message drops its
    /// channel. A channel that closes without a terminal message yields a
    /// synthesized `Failed` exactly once.
    pub async fn recv(&mut self) -> Option<(RequestId, WorkerMessage)> {
        if self.active.is_empty() {
            return None;
        }

        let futures: Vec<_> = self
            .active
            .iter_mut()
            .map(|(id, job)| {
                let id = *id;
                Box::pin(async move { (id, job.channel.recv().await) })
            })
            .collect();

        let ((request_id, message), _, _) = futures::future::select_all(futures).await;

        match message {
            Some(message) => {
                if message.is_terminal() {
                    self.active.remove(&request_id);
                } else if let Some(job) = self.active.get_mut(&request_id) {
                    job.last_message_at = Instant::now();
                }
                Some((request_id, message))
            }
            None => {
                // Context died without a terminal message; resolve it here so
                // it resolves exactly once.
                warn!(request_id = %request_id, "Worker channel closed without terminal message");
                self.active.remove(&request_id);
                Some((
                    request_id,
                    WorkerMessage::Failed {
                        request_id,
                        reason: "worker channel closed unexpectedly".to_string(),
                    },
                ))
            }
        }
    }

    /// Hard-stop the channel running `request_id`, discarding its work.
    ///
    /// Returns `true` if the request was active. The caller is responsible
    /// for resolving the cancelled request; no further messages for it will
    /// be delivered.
    pub fn cancel(&mut self, request_id: RequestId) -> bool {
        match self.active.remove(&request_id) {
            Some(job) => {
                job.channel.terminate();
                debug!(request_id = %request_id, "Cancelled in-flight job");
                true
            }
            None => false,
        }
    }

    /// Requests whose channel has been silent longer than `timeout`.
    ///
    /// The caller decides what to do with them (typically `cancel` plus a
    /// failure resolution). Channels suspected of being wedged are never
    /// reused.
    pub fn expired(&self, timeout: Duration) -> Vec<RequestId> {
        self.active
            .iter()
            .filter(|(_, job)| job.last_message_at.elapsed() > timeout)
            .map(|(id, _)| *id)
            .collect()
    }

    /// Terminate every live channel.
    pub fn shutdown(&mut self) {
        for (request_id, job) in self.active.drain() {
            job.channel.terminate();
            debug!(request_id = %request_id, "Terminated channel on shutdown");
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}
