//! # Core Pipeline
//!
//! Client-side file processing pipeline: validated admission, background
//! conversion with bounded concurrency, progress reporting, automatic
//! retries with backoff, and explicit result memory accounting.
//!
//! ## Overview
//!
//! Files enter through batch validation and become state-machine items in an
//! insertion-ordered store. The [`JobScheduler`] dispatches pending items to
//! the worker pool, applies worker messages back to items, retries transient
//! failures, propagates settings edits, and packages finished outputs.
//!
//! ## Components
//!
//! - **Validation** (`validate`): per-file admission checks, whole batches
//!   never fail atomically
//! - **Items** (`item`, `store`): lifecycle state machine over an
//!   insertion-ordered store
//! - **Settings** (`settings`): global parameters with explicit per-item
//!   forks
//! - **Resources** (`resources`): move-only handles over in-memory results
//! - **Retries** (`failure`, `retry`): failure classification and bounded
//!   exponential backoff
//! - **Scheduling** (`scheduler`): the single-writer orchestrator

pub mod error;
pub mod failure;
pub mod item;
pub mod resources;
pub mod retry;
pub mod scheduler;
pub mod settings;
pub mod store;
pub mod validate;

pub use error::{PipelineError, Result};
pub use failure::{classify, FailureInfo, FailureKind};
pub use item::{FileItem, FileItemId, ItemStatus};
pub use resources::{ResourceHandle, ResourceTracker};
pub use retry::{RetryController, RetryDecision, RetryPolicy};
pub use scheduler::{BatchAdmission, JobScheduler, QueueStats};
pub use settings::{SettingsBinding, SettingsModel, SettingsPatch};
pub use store::{FileItemView, ItemStore};
pub use validate::{validate_batch, BatchValidation, FileCandidate, ValidationError, ValidationPolicy};
