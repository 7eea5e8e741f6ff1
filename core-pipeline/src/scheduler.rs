//! # Job Scheduler
//!
//! Orchestrates the whole pipeline: admission, dispatch, worker messages,
//! retries, settings propagation, and result packaging.
//!
//! ## Overview
//!
//! The scheduler is the single writer over the item store, the resource
//! tracker, and the worker pool. Hosts feed it candidate files and drive it
//! with [`JobScheduler::run`] (or [`JobScheduler::run_until_idle`] in
//! batch-style hosts); everything the UI needs to render flows out as events
//! on the shared [`EventBus`].
//!
//! ## Dispatch order
//!
//! Pending work is dispatched FIFO in admission order, except that items
//! whose retry cooldown has elapsed go first. A cooling-down item never
//! blocks the items behind it.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let bus = EventBus::default();
//! let mut scheduler = JobScheduler::new(config, OperationKind::CompressPdf, bus)?;
//!
//! scheduler.admit(candidates);
//! scheduler.run_until_idle().await?;
//! let archive = scheduler.package_results().await?;
//! ```

use crate::error::{PipelineError, Result};
use crate::failure::FailureInfo;
use crate::item::{FileItem, FileItemId, ItemStatus};
use crate::resources::ResourceTracker;
use crate::retry::{RetryController, RetryDecision, RetryPolicy};
use crate::settings::{ResetOutcome, SettingsModel, SettingsPatch};
use crate::store::{FileItemView, ItemStore};
use crate::validate::{validate_batch, FileCandidate, ValidationError, ValidationPolicy};
use bytes::Bytes;
use codec_traits::{ArchiveEntry, OperationKind, OperationParams};
use core_runtime::{CoreConfig, CoreEvent, EventBus, JobEvent, QueueEvent, SettingsEvent};
use core_worker::{RequestId, RunRequest, WorkerMessage, WorkerPool};
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// How long `run` waits on the pool before re-checking timeouts and retries.
const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Outcome of admitting one batch of files.
#[derive(Debug)]
pub struct BatchAdmission {
    /// Ids of the items created, in drop order
    pub admitted: Vec<FileItemId>,
    /// One reason per refused file
    pub rejected: Vec<ValidationError>,
}

/// Aggregate queue counters for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    pub total: usize,
    pub pending: usize,
    pub running: usize,
    pub done: usize,
    pub failed: usize,
    /// Items waiting out a retry cooldown (counted under `pending` too)
    pub awaiting_retry: usize,
    /// Concurrency ceiling from the configuration
    pub max_concurrent: usize,
    /// Bytes of converted output currently held in memory
    pub live_result_bytes: usize,
}

/// Single-writer orchestrator over the store, tracker, and worker pool.
pub struct JobScheduler {
    config: CoreConfig,
    operation: OperationKind,
    store: ItemStore,
    settings: SettingsModel,
    tracker: ResourceTracker,
    pool: WorkerPool,
    retry: RetryController,
    events: EventBus,
    /// In-flight requests mapped back to their items. A request id missing
    /// here is stale (cancelled or removed) and its messages are ignored.
    active: HashMap<RequestId, FileItemId>,
    /// Items whose next run is a retry, in the order their failures resolved
    retry_queue: VecDeque<FileItemId>,
    /// Earliest dispatch time per cooling-down item
    cooldowns: HashMap<FileItemId, Instant>,
}

impl JobScheduler {
    /// Create a scheduler for one operation.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::NoCodec`] if the config has no codec
    /// registered for `operation`.
    pub fn new(config: CoreConfig, operation: OperationKind, events: EventBus) -> Result<Self> {
        if config.codec_for(operation).is_none() {
            return Err(PipelineError::NoCodec {
                operation: operation.to_string(),
            });
        }

        let pool = WorkerPool::new(config.max_concurrent_jobs);
        let retry = RetryController::new(RetryPolicy::new(
            config.max_attempts,
            config.initial_backoff_ms,
        ));
        let settings = SettingsModel::new(OperationParams::new(operation));

        Ok(Self {
            config,
            operation,
            store: ItemStore::new(),
            settings,
            tracker: ResourceTracker::new(),
            pool,
            retry,
            events,
            active: HashMap::new(),
            retry_queue: VecDeque::new(),
            cooldowns: HashMap::new(),
        })
    }

    // ========================================================================
    // Admission
    // ========================================================================

    /// Validate a batch of files and queue the ones that pass.
    ///
    /// Dispatch starts immediately for as many items as the concurrency
    /// bound allows.
    pub fn admit(&mut self, candidates: Vec<FileCandidate>) -> BatchAdmission {
        let policy = ValidationPolicy::from_config(&self.config);
        let batch = validate_batch(candidates, &policy, self.store.len());

        let mut admitted = Vec::with_capacity(batch.admitted.len());
        for candidate in batch.admitted {
            let item = FileItem::new(candidate.name, candidate.mime_type, candidate.bytes);
            admitted.push(item.id);
            self.store.insert(item);
        }

        if !admitted.is_empty() {
            info!(count = admitted.len(), "Files admitted");
            self.events
                .emit(CoreEvent::Queue(QueueEvent::FilesAdmitted {
                    item_ids: admitted.iter().map(|id| id.as_str()).collect(),
                }))
                .ok();
        }
        if !batch.rejected.is_empty() {
            warn!(count = batch.rejected.len(), "Files rejected");
            self.events
                .emit(CoreEvent::Queue(QueueEvent::FilesRejected {
                    reasons: batch.rejected.iter().map(|e| e.to_string()).collect(),
                }))
                .ok();
        }

        self.tick();
        BatchAdmission {
            admitted,
            rejected: batch.rejected,
        }
    }

    // ========================================================================
    // Dispatch
    // ========================================================================

    /// Dispatch pending work until the pool is full or nothing is eligible.
    ///
    /// Idempotent; safe to call at any time.
    pub fn tick(&mut self) {
        while self.pool.has_capacity() {
            let Some(item_id) = self.next_eligible() else {
                break;
            };
            if let Err(e) = self.dispatch(item_id) {
                error!(item_id = %item_id, error = %e, "Dispatch failed");
                break;
            }
        }
    }

    /// Next item to run: elapsed retries first, then fresh FIFO order.
    fn next_eligible(&mut self) -> Option<FileItemId> {
        let now = Instant::now();

        // Drop retry entries whose item vanished or was reset elsewhere.
        self.retry_queue.retain(|id| {
            self.store
                .get(id)
                .map(|item| item.status == ItemStatus::Pending)
                .unwrap_or(false)
        });

        if let Some(pos) = self.retry_queue.iter().position(|id| {
            self.cooldowns
                .get(id)
                .map(|deadline| *deadline <= now)
                .unwrap_or(true)
        }) {
            let item_id = self.retry_queue.remove(pos)?;
            self.cooldowns.remove(&item_id);
            return Some(item_id);
        }

        let retry_queue = &self.retry_queue;
        self.store
            .next_pending(|id| !retry_queue.contains(&id))
    }

    fn dispatch(&mut self, item_id: FileItemId) -> Result<()> {
        let codec = self
            .config
            .codec_for(self.operation)
            .ok_or(PipelineError::NoCodec {
                operation: self.operation.to_string(),
            })?;

        let item = self
            .store
            .get_mut(&item_id)
            .ok_or(PipelineError::ItemNotFound { item_id })?;
        item.start()?;
        let params = self.settings.effective(item).clone();
        let source = item.source.clone();
        let attempt = item.attempts;

        match self.pool.submit(codec, RunRequest::new(source, params)) {
            Ok(request_id) => {
                self.active.insert(request_id, item_id);
                info!(item_id = %item_id, attempt, "Job started");
                self.events
                    .emit(CoreEvent::Job(JobEvent::Started {
                        item_id: item_id.as_str(),
                        attempt,
                    }))
                    .ok();
                Ok(())
            }
            Err(e) => {
                // The run never reached a worker; resolve it like any other
                // failed attempt so retries apply.
                warn!(item_id = %item_id, error = %e, "Worker submission failed");
                self.resolve_failure(item_id, format!("worker submission failed: {}", e));
                Ok(())
            }
        }
    }

    // ========================================================================
    // Worker messages
    // ========================================================================

    /// Apply one message from the worker pool to the owning item.
    ///
    /// Messages for request ids not in the active map are stale responses
    /// from cancelled or removed jobs and are dropped.
    fn process_message(&mut self, request_id: RequestId, message: WorkerMessage) -> Result<()> {
        let Some(&item_id) = self.active.get(&request_id) else {
            debug!(request_id = %request_id, "Dropping stale worker message");
            return Ok(());
        };

        match message {
            WorkerMessage::Progress { percent, .. } => {
                let item = self
                    .store
                    .get_mut(&item_id)
                    .ok_or(PipelineError::ItemNotFound { item_id })?;
                item.set_progress(percent)?;
                let percent = item.progress;
                self.events
                    .emit(CoreEvent::Job(JobEvent::Progress {
                        item_id: item_id.as_str(),
                        percent,
                    }))
                    .ok();
            }
            WorkerMessage::Completed { output, .. } => {
                self.active.remove(&request_id);
                let item = self
                    .store
                    .get_mut(&item_id)
                    .ok_or(PipelineError::ItemNotFound { item_id })?;

                let output_bytes = output.binary.len() as u64;
                let old = item.result.take();
                let handle = self.tracker.retrack(item_id, output.binary, old);
                if let Some(displaced) = item.complete(handle)? {
                    self.tracker.release(displaced);
                }

                info!(item_id = %item_id, output_bytes, "Job completed");
                self.events
                    .emit(CoreEvent::Job(JobEvent::Completed {
                        item_id: item_id.as_str(),
                        output_bytes,
                    }))
                    .ok();
                self.tick();
            }
            WorkerMessage::Failed { reason, .. } => {
                self.active.remove(&request_id);
                self.resolve_failure(item_id, reason);
                self.tick();
            }
        }
        Ok(())
    }

    /// Record a failed run and either queue a retry or leave the item failed.
    fn resolve_failure(&mut self, item_id: FileItemId, reason: String) {
        let info = FailureInfo::from_reason(reason.clone());
        let kind = info.kind;

        let Some(item) = self.store.get_mut(&item_id) else {
            debug!(item_id = %item_id, "Failure for removed item dropped");
            return;
        };
        if let Err(e) = item.fail(info) {
            error!(item_id = %item_id, error = %e, "Could not record failure");
            return;
        }
        let attempts = item.attempts;

        match self.retry.decide(attempts, &kind) {
            RetryDecision::Retry { delay } => {
                if let Err(e) = item.prepare_retry() {
                    error!(item_id = %item_id, error = %e, "Could not requeue retry");
                    return;
                }
                self.retry_queue.push_back(item_id);
                self.cooldowns.insert(item_id, Instant::now() + delay);
                warn!(
                    item_id = %item_id,
                    attempt = attempts - 1,
                    delay_ms = delay.as_millis() as u64,
                    reason = %reason,
                    "Job failed, retrying"
                );
                self.events
                    .emit(CoreEvent::Job(JobEvent::Retrying {
                        item_id: item_id.as_str(),
                        attempt: attempts - 1,
                        delay_ms: delay.as_millis() as u64,
                        reason,
                    }))
                    .ok();
            }
            RetryDecision::GiveUp => {
                error!(item_id = %item_id, attempts, reason = %reason, "Job failed terminally");
                self.events
                    .emit(CoreEvent::Job(JobEvent::Failed {
                        item_id: item_id.as_str(),
                        message: kind.user_message().to_string(),
                        attempts,
                    }))
                    .ok();
            }
        }
    }

    /// Cancel and fail jobs whose worker has been silent past the deadline.
    fn sweep_timeouts(&mut self) {
        let Some(timeout) = self.config.job_timeout else {
            return;
        };
        for request_id in self.pool.expired(timeout) {
            self.pool.cancel(request_id);
            if let Some(item_id) = self.active.remove(&request_id) {
                warn!(item_id = %item_id, timeout_ms = timeout.as_millis() as u64, "Job timed out");
                self.resolve_failure(
                    item_id,
                    format!("worker timed out after {}ms", timeout.as_millis()),
                );
            }
        }
    }

    // ========================================================================
    // Driving
    // ========================================================================

    /// Process events until the shutdown token fires.
    pub async fn run(&mut self, shutdown: CancellationToken) -> Result<()> {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    self.pool.shutdown();
                    info!("Scheduler shut down");
                    return Ok(());
                }
                result = self.step() => result?,
            }
        }
    }

    /// Process events until every admitted item is terminal.
    pub async fn run_until_idle(&mut self) -> Result<()> {
        while !self.is_idle() {
            self.step().await?;
        }
        Ok(())
    }

    /// Whether no work remains: nothing running, nothing pending, no retry
    /// waiting out its cooldown.
    pub fn is_idle(&self) -> bool {
        self.active.is_empty()
            && self.retry_queue.is_empty()
            && self.store.count_status(ItemStatus::Pending) == 0
    }

    async fn step(&mut self) -> Result<()> {
        self.sweep_timeouts();
        self.tick();

        if !self.active.is_empty() {
            if let Ok(Some((request_id, message))) =
                tokio::time::timeout(POLL_INTERVAL, self.pool.recv()).await
            {
                self.process_message(request_id, message)?;
            }
        } else if let Some(wait) = self.time_until_next_retry() {
            tokio::time::sleep(wait).await;
        } else {
            tokio::time::sleep(POLL_INTERVAL).await;
        }
        Ok(())
    }

    fn time_until_next_retry(&self) -> Option<Duration> {
        let deadline = self
            .retry_queue
            .iter()
            .filter_map(|id| self.cooldowns.get(id))
            .min()?;
        Some(deadline.saturating_duration_since(Instant::now()))
    }

    // ========================================================================
    // User actions
    // ========================================================================

    /// Remove an item, cancelling its running job and freeing its payloads.
    ///
    /// # Errors
    ///
    /// Returns an error if the item does not exist
    pub fn remove_item(&mut self, item_id: FileItemId) -> Result<()> {
        let item = self
            .store
            .remove(&item_id)
            .ok_or(PipelineError::ItemNotFound { item_id })?;

        let was_running = item.status == ItemStatus::Running;
        if let Some(request_id) = self.request_for(item_id) {
            self.pool.cancel(request_id);
            self.active.remove(&request_id);
        }
        self.retry_queue.retain(|id| *id != item_id);
        self.cooldowns.remove(&item_id);

        if let Some(handle) = item.result {
            self.tracker.release(handle);
        }
        self.tracker.release_all(item_id);

        info!(item_id = %item_id, was_running, "Item removed");
        self.events
            .emit(CoreEvent::Queue(QueueEvent::ItemRemoved {
                item_id: item_id.as_str(),
                was_running,
            }))
            .ok();
        self.tick();
        Ok(())
    }

    /// Manually resubmit a failed item with a fresh attempt budget.
    ///
    /// # Errors
    ///
    /// Returns an error if the item does not exist or is not failed
    pub fn retry_item(&mut self, item_id: FileItemId) -> Result<()> {
        let item = self
            .store
            .get_mut(&item_id)
            .ok_or(PipelineError::ItemNotFound { item_id })?;
        if item.status != ItemStatus::Failed {
            return Err(PipelineError::UnexpectedStatus {
                item_id,
                status: item.status,
                expected: ItemStatus::Failed,
            });
        }

        if let Some(handle) = item.reset() {
            self.tracker.release(handle);
        }
        self.retry_queue.retain(|id| *id != item_id);
        self.cooldowns.remove(&item_id);

        info!(item_id = %item_id, "Item manually resubmitted");
        self.tick();
        Ok(())
    }

    // ========================================================================
    // Settings
    // ========================================================================

    /// Edit the global settings; items still bound to them re-run.
    pub fn update_global_settings(&mut self, patch: &SettingsPatch) -> Vec<FileItemId> {
        let outcome = self.settings.update_global(patch, &mut self.store);
        let reset = outcome.reset.clone();
        self.events
            .emit(CoreEvent::Settings(SettingsEvent::GlobalUpdated {
                reset_item_ids: reset.iter().map(|id| id.as_str()).collect(),
            }))
            .ok();
        self.apply_reset(outcome);
        reset
    }

    /// Edit one item's settings, forking it off global; it re-runs.
    ///
    /// # Errors
    ///
    /// Returns an error if the item does not exist
    pub fn update_item_settings(
        &mut self,
        item_id: FileItemId,
        patch: &SettingsPatch,
    ) -> Result<()> {
        let outcome = self.settings.update_item(item_id, patch, &mut self.store)?;
        self.events
            .emit(CoreEvent::Settings(SettingsEvent::ItemForked {
                item_id: item_id.as_str(),
            }))
            .ok();
        self.apply_reset(outcome);
        Ok(())
    }

    /// Rebind every item to the current global settings; all re-run.
    pub fn apply_settings_to_all(&mut self) -> usize {
        let outcome = self.settings.apply_global_to_all(&mut self.store);
        let count = outcome.reset.len();
        self.events
            .emit(CoreEvent::Settings(SettingsEvent::AppliedToAll {
                item_count: count,
            }))
            .ok();
        self.apply_reset(outcome);
        count
    }

    /// Make one item's settings the new global values; all items re-run.
    ///
    /// # Errors
    ///
    /// Returns an error if the item does not exist
    pub fn adopt_item_settings(&mut self, item_id: FileItemId) -> Result<usize> {
        let outcome = self.settings.adopt_item_as_global(item_id, &mut self.store)?;
        let count = outcome.reset.len();
        self.events
            .emit(CoreEvent::Settings(SettingsEvent::AppliedToAll {
                item_count: count,
            }))
            .ok();
        self.apply_reset(outcome);
        Ok(count)
    }

    /// The current global settings.
    pub fn global_settings(&self) -> &OperationParams {
        self.settings.global()
    }

    /// Cancel running jobs for reset items, release displaced results, and
    /// redispatch.
    fn apply_reset(&mut self, outcome: ResetOutcome) {
        for item_id in &outcome.reset {
            if let Some(request_id) = self.request_for(*item_id) {
                self.pool.cancel(request_id);
                self.active.remove(&request_id);
            }
            self.retry_queue.retain(|id| id != item_id);
            self.cooldowns.remove(item_id);
        }
        for handle in outcome.released {
            self.tracker.release(handle);
        }
        self.tick();
    }

    // ========================================================================
    // Results
    // ========================================================================

    /// Package every finished output into one archive.
    ///
    /// Item state is untouched; a packaging failure loses nothing.
    ///
    /// # Errors
    ///
    /// Returns an error if no packager is configured, nothing is finished,
    /// or the packager itself fails
    pub async fn package_results(&self) -> Result<Bytes> {
        let packager = self
            .config
            .packager
            .clone()
            .ok_or(PipelineError::PackagerUnavailable)?;

        let mut used_names: HashMap<String, u32> = HashMap::new();
        let mut entries = Vec::new();
        for item in self.store.iter() {
            if item.status != ItemStatus::Done {
                continue;
            }
            let Some(data) = item.result.as_ref().and_then(|h| self.tracker.get(h)) else {
                continue;
            };
            let extension = self.settings.effective(item).format.extension();
            let name = unique_entry_name(&item.name, extension, &mut used_names);
            entries.push(ArchiveEntry::new(name, data.clone()));
        }

        if entries.is_empty() {
            return Err(PipelineError::NothingToPackage);
        }

        let entry_count = entries.len();
        let archive = packager
            .package(entries)
            .await
            .map_err(|e| PipelineError::Packaging(e.to_string()))?;

        info!(entry_count, archive_bytes = archive.len(), "Results packaged");
        self.events
            .emit(CoreEvent::Queue(QueueEvent::ResultsPackaged {
                entry_count,
                archive_bytes: archive.len() as u64,
            }))
            .ok();
        Ok(archive)
    }

    // ========================================================================
    // Inspection
    // ========================================================================

    /// Read-only snapshot of every item, in admission order.
    pub fn snapshot(&self) -> Vec<FileItemView> {
        self.store
            .iter()
            .map(|item| FileItemView {
                id: item.id,
                name: item.name.clone(),
                mime_type: item.mime_type.clone(),
                status: item.status,
                progress: item.progress,
                attempts: item.attempts,
                failure: item.failure.as_ref().map(|f| f.message.clone()),
                settings: self.settings.effective(item).clone(),
                own_settings: !item.settings.is_global(),
                result: item
                    .result
                    .as_ref()
                    .and_then(|h| self.tracker.get(h))
                    .cloned(),
            })
            .collect()
    }

    /// Aggregate queue counters.
    pub fn stats(&self) -> QueueStats {
        QueueStats {
            total: self.store.len(),
            pending: self.store.count_status(ItemStatus::Pending),
            running: self.store.count_status(ItemStatus::Running),
            done: self.store.count_status(ItemStatus::Done),
            failed: self.store.count_status(ItemStatus::Failed),
            awaiting_retry: self.retry_queue.len(),
            max_concurrent: self.config.max_concurrent_jobs,
            live_result_bytes: self.tracker.live_bytes(),
        }
    }

    fn request_for(&self, item_id: FileItemId) -> Option<RequestId> {
        self.active
            .iter()
            .find(|(_, id)| **id == item_id)
            .map(|(request_id, _)| *request_id)
    }
}

/// Output entry name: original stem, new extension, deduplicated with a
/// counter suffix when two inputs share a stem.
fn unique_entry_name(
    original: &str,
    extension: &str,
    used: &mut HashMap<String, u32>,
) -> String {
    let stem = original
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .unwrap_or(original);
    let count = used.entry(format!("{}.{}", stem, extension)).or_insert(0);
    *count += 1;
    if *count == 1 {
        format!("{}.{}", stem, extension)
    } else {
        format!("{} ({}).{}", stem, count, extension)
    }
}
