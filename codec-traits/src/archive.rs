//! Batch ZIP packaging boundary.
//!
//! Packaging finished outputs into one downloadable archive is an external
//! collaborator, not part of the orchestration core. The pipeline hands an
//! ordered list of named entries and receives a single archive binary.

use crate::error::Result;
use bytes::Bytes;

/// One named file inside an archive.
#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    /// Entry name as it should appear in the archive
    pub name: String,
    /// Entry content. Ownership moves to the packager.
    pub data: Bytes,
}

impl ArchiveEntry {
    pub fn new(name: impl Into<String>, data: Bytes) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }
}

/// Async batch archive packager.
///
/// Invoked from the coordinating context once at least one item has finished;
/// a packaging failure never disturbs item state.
#[async_trait::async_trait]
pub trait ArchivePackager: Send + Sync {
    /// Package the entries, in order, into a single archive binary.
    async fn package(&self, entries: Vec<ArchiveEntry>) -> Result<Bytes>;
}
