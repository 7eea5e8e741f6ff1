//! # Core Configuration Module
//!
//! Configuration for the file processing pipeline.
//!
//! ## Overview
//!
//! `CoreConfig` is built with a builder that enforces fail-fast validation:
//! the host must register at least one codec before the pipeline can start,
//! and numeric limits are checked at build time instead of surfacing as
//! confusing behavior later.
//!
//! ## Required Dependencies
//!
//! - At least one [`FileCodec`] registration - the pipeline has nothing to
//!   run without conversion algorithms
//!
//! ## Optional Dependencies
//!
//! - [`ArchivePackager`] - batch ZIP download; "download all" is unavailable
//!   without it
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .codec(Arc::new(MyImageCodec))
//!     .codec(Arc::new(MyPdfCompressor))
//!     .packager(Arc::new(MyZipPackager))
//!     .max_concurrent_jobs(2)
//!     .max_attempts(3)
//!     .build()
//!     .expect("Failed to build config");
//! ```

use crate::error::{Error, Result};
use codec_traits::{ArchivePackager, FileCodec, OperationKind};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Default bound on concurrently running jobs. Kept low because each running
/// job pins a full file payload in memory.
pub const DEFAULT_MAX_CONCURRENT_JOBS: usize = 2;

/// Default retry attempt bound.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default initial retry backoff in milliseconds.
pub const DEFAULT_INITIAL_BACKOFF_MS: u64 = 500;

/// Default per-file size limit (100 MB).
pub const DEFAULT_MAX_FILE_SIZE_BYTES: u64 = 100 * 1024 * 1024;

/// Default bound on queued files.
pub const DEFAULT_MAX_FILES: usize = 20;

/// Core configuration for the file processing pipeline.
///
/// Use [`CoreConfig::builder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Registered codecs by operation
    pub codecs: HashMap<OperationKind, Arc<dyn FileCodec>>,

    /// Batch archive packager (optional)
    pub packager: Option<Arc<dyn ArchivePackager>>,

    /// Maximum jobs running simultaneously
    pub max_concurrent_jobs: usize,

    /// Retry attempt bound per item
    pub max_attempts: u32,

    /// Initial retry backoff; doubles per attempt
    pub initial_backoff_ms: u64,

    /// Optional per-job timeout. A job with no worker message within this
    /// window is failed and its channel terminated.
    pub job_timeout: Option<Duration>,

    /// Per-file size limit in bytes
    pub max_file_size_bytes: u64,

    /// Maximum number of files in the queue
    pub max_files: usize,

    /// MIME types accepted by validation
    pub allowed_mime_types: Vec<String>,

    /// File extensions accepted by validation (without the dot)
    pub allowed_extensions: Vec<String>,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("codecs", &self.codecs.keys().collect::<Vec<_>>())
            .field("packager", &self.packager.as_ref().map(|_| "ArchivePackager { ... }"))
            .field("max_concurrent_jobs", &self.max_concurrent_jobs)
            .field("max_attempts", &self.max_attempts)
            .field("initial_backoff_ms", &self.initial_backoff_ms)
            .field("job_timeout", &self.job_timeout)
            .field("max_file_size_bytes", &self.max_file_size_bytes)
            .field("max_files", &self.max_files)
            .finish()
    }
}

impl CoreConfig {
    /// Start building a configuration.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Look up the codec registered for an operation.
    pub fn codec_for(&self, operation: OperationKind) -> Option<Arc<dyn FileCodec>> {
        self.codecs.get(&operation).cloned()
    }
}

/// Builder for [`CoreConfig`] with fail-fast validation.
#[derive(Default)]
pub struct CoreConfigBuilder {
    codecs: HashMap<OperationKind, Arc<dyn FileCodec>>,
    packager: Option<Arc<dyn ArchivePackager>>,
    max_concurrent_jobs: Option<usize>,
    max_attempts: Option<u32>,
    initial_backoff_ms: Option<u64>,
    job_timeout: Option<Duration>,
    max_file_size_bytes: Option<u64>,
    max_files: Option<usize>,
    allowed_mime_types: Option<Vec<String>>,
    allowed_extensions: Option<Vec<String>>,
}

impl CoreConfigBuilder {
    /// Register a codec under the operation it reports via
    /// [`FileCodec::kind`]. Registering twice for one operation replaces the
    /// earlier codec.
    pub fn codec(mut self, codec: Arc<dyn FileCodec>) -> Self {
        self.codecs.insert(codec.kind(), codec);
        self
    }

    /// Set the batch archive packager.
    pub fn packager(mut self, packager: Arc<dyn ArchivePackager>) -> Self {
        self.packager = Some(packager);
        self
    }

    /// Bound on concurrently running jobs (must be at least 1).
    pub fn max_concurrent_jobs(mut self, n: usize) -> Self {
        self.max_concurrent_jobs = Some(n);
        self
    }

    /// Retry attempt bound per item (must be at least 1).
    pub fn max_attempts(mut self, n: u32) -> Self {
        self.max_attempts = Some(n);
        self
    }

    /// Initial retry backoff in milliseconds.
    pub fn initial_backoff_ms(mut self, ms: u64) -> Self {
        self.initial_backoff_ms = Some(ms);
        self
    }

    /// Optional per-job timeout.
    pub fn job_timeout(mut self, timeout: Duration) -> Self {
        self.job_timeout = Some(timeout);
        self
    }

    /// Per-file size limit in bytes.
    pub fn max_file_size_bytes(mut self, bytes: u64) -> Self {
        self.max_file_size_bytes = Some(bytes);
        self
    }

    /// Maximum number of files in the queue.
    pub fn max_files(mut self, n: usize) -> Self {
        self.max_files = Some(n);
        self
    }

    /// MIME types accepted by validation.
    pub fn allowed_mime_types(mut self, types: Vec<String>) -> Self {
        self.allowed_mime_types = Some(types);
        self
    }

    /// File extensions accepted by validation (without the dot).
    pub fn allowed_extensions(mut self, extensions: Vec<String>) -> Self {
        self.allowed_extensions = Some(extensions);
        self
    }

    /// Build the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CapabilityMissing`] when no codec is registered and
    /// [`Error::Config`] for out-of-range limits.
    pub fn build(self) -> Result<CoreConfig> {
        if self.codecs.is_empty() {
            return Err(Error::CapabilityMissing {
                capability: "FileCodec".to_string(),
                message: "register at least one codec with CoreConfigBuilder::codec() \
                          before building"
                    .to_string(),
            });
        }

        let max_concurrent_jobs = self
            .max_concurrent_jobs
            .unwrap_or(DEFAULT_MAX_CONCURRENT_JOBS);
        if max_concurrent_jobs == 0 {
            return Err(Error::Config(
                "max_concurrent_jobs must be at least 1".to_string(),
            ));
        }

        let max_attempts = self.max_attempts.unwrap_or(DEFAULT_MAX_ATTEMPTS);
        if max_attempts == 0 {
            return Err(Error::Config("max_attempts must be at least 1".to_string()));
        }

        let max_files = self.max_files.unwrap_or(DEFAULT_MAX_FILES);
        if max_files == 0 {
            return Err(Error::Config("max_files must be at least 1".to_string()));
        }

        Ok(CoreConfig {
            codecs: self.codecs,
            packager: self.packager,
            max_concurrent_jobs,
            max_attempts,
            initial_backoff_ms: self.initial_backoff_ms.unwrap_or(DEFAULT_INITIAL_BACKOFF_MS),
            job_timeout: self.job_timeout,
            max_file_size_bytes: self
                .max_file_size_bytes
                .unwrap_or(DEFAULT_MAX_FILE_SIZE_BYTES),
            max_files,
            allowed_mime_types: self.allowed_mime_types.unwrap_or_else(default_mime_types),
            allowed_extensions: self.allowed_extensions.unwrap_or_else(default_extensions),
        })
    }
}

fn default_mime_types() -> Vec<String> {
    [
        "application/pdf",
        "image/jpeg",
        "image/png",
        "image/webp",
        "image/gif",
        "image/bmp",
        "text/plain",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_extensions() -> Vec<String> {
    ["pdf", "jpg", "jpeg", "png", "webp", "gif", "bmp", "txt"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}
