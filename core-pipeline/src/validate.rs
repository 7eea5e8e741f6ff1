//! # Batch Validation
//!
//! Admission control for files the user drops on the queue.
//!
//! ## Overview
//!
//! Every candidate file is checked against the queue policy before an item
//! is created for it: remaining queue quota first, then size, then type.
//! Validation never throws away a whole batch; passing files are admitted
//! and each failing file gets its own rejection reason.

use bytes::Bytes;
use core_runtime::CoreConfig;
use thiserror::Error;

/// A file offered to the queue, before it becomes an item.
#[derive(Debug, Clone)]
pub struct FileCandidate {
    /// Original file name, including extension
    pub name: String,
    /// Declared MIME type
    pub mime_type: String,
    /// File content
    pub bytes: Bytes,
}

impl FileCandidate {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: Bytes) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    fn extension(&self) -> Option<String> {
        self.name.rsplit_once('.').map(|(_, ext)| ext.to_lowercase())
    }
}

/// Why a candidate was refused admission.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{name}: queue is limited to {max} files")]
    TooManyFiles { name: String, max: usize },

    #[error("{name}: {size} bytes exceeds the {max} byte limit")]
    TooLarge { name: String, size: u64, max: u64 },

    #[error("{name}: unsupported file type {mime_type}")]
    UnsupportedType { name: String, mime_type: String },
}

/// Limits applied during admission.
#[derive(Debug, Clone)]
pub struct ValidationPolicy {
    pub max_file_size_bytes: u64,
    pub max_files: usize,
    pub allowed_mime_types: Vec<String>,
    pub allowed_extensions: Vec<String>,
}

impl ValidationPolicy {
    pub fn from_config(config: &CoreConfig) -> Self {
        Self {
            max_file_size_bytes: config.max_file_size_bytes,
            max_files: config.max_files,
            allowed_mime_types: config.allowed_mime_types.clone(),
            allowed_extensions: config.allowed_extensions.clone(),
        }
    }

    /// A type is acceptable if either the MIME type or the file extension is
    /// on the allow list. Browsers and shells disagree about MIME detection
    /// often enough that extension is accepted as a fallback signal.
    fn accepts_type(&self, candidate: &FileCandidate) -> bool {
        if self
            .allowed_mime_types
            .iter()
            .any(|m| m.eq_ignore_ascii_case(&candidate.mime_type))
        {
            return true;
        }
        match candidate.extension() {
            Some(ext) => self.allowed_extensions.iter().any(|e| *e == ext),
            None => false,
        }
    }
}

/// Outcome of validating one batch.
#[derive(Debug)]
pub struct BatchValidation {
    /// Candidates that passed, in their original order
    pub admitted: Vec<FileCandidate>,
    /// One reason per refused candidate
    pub rejected: Vec<ValidationError>,
}

/// Validate a batch of candidates against `policy`, given how many items the
/// queue already holds.
///
/// Checks run per candidate in order: quota, size, type. A candidate
/// rejected for size or type does not consume quota.
pub fn validate_batch(
    candidates: Vec<FileCandidate>,
    policy: &ValidationPolicy,
    current_count: usize,
) -> BatchValidation {
    let remaining = policy.max_files.saturating_sub(current_count);
    let mut admitted = Vec::new();
    let mut rejected = Vec::new();

    for candidate in candidates {
        if admitted.len() >= remaining {
            rejected.push(ValidationError::TooManyFiles {
                name: candidate.name,
                max: policy.max_files,
            });
            continue;
        }

        let size = candidate.bytes.len() as u64;
        if size > policy.max_file_size_bytes {
            rejected.push(ValidationError::TooLarge {
                name: candidate.name,
                size,
                max: policy.max_file_size_bytes,
            });
            continue;
        }

        if !policy.accepts_type(&candidate) {
            rejected.push(ValidationError::UnsupportedType {
                name: candidate.name,
                mime_type: candidate.mime_type,
            });
            continue;
        }

        admitted.push(candidate);
    }

    BatchValidation { admitted, rejected }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> ValidationPolicy {
        ValidationPolicy {
            max_file_size_bytes: 1024,
            max_files: 3,
            allowed_mime_types: vec!["application/pdf".to_string(), "image/png".to_string()],
            allowed_extensions: vec!["pdf".to_string(), "png".to_string()],
        }
    }

    fn pdf(name: &str, size: usize) -> FileCandidate {
        FileCandidate::new(name, "application/pdf", Bytes::from(vec![0u8; size]))
    }

    #[test]
    fn test_mixed_batch_splits_per_file() {
        let batch = validate_batch(
            vec![
                pdf("ok.pdf", 100),
                pdf("big.pdf", 4096),
                FileCandidate::new("notes.docx", "application/msword", Bytes::new()),
            ],
            &policy(),
            0,
        );

        assert_eq!(batch.admitted.len(), 1);
        assert_eq!(batch.admitted[0].name, "ok.pdf");
        assert_eq!(batch.rejected.len(), 2);
        assert!(matches!(
            batch.rejected[0],
            ValidationError::TooLarge { size: 4096, .. }
        ));
        assert!(matches!(
            batch.rejected[1],
            ValidationError::UnsupportedType { .. }
        ));
    }

    #[test]
    fn test_quota_counts_existing_items() {
        let batch = validate_batch(
            vec![pdf("a.pdf", 1), pdf("b.pdf", 1)],
            &policy(),
            2,
        );

        assert_eq!(batch.admitted.len(), 1);
        assert!(matches!(
            batch.rejected[0],
            ValidationError::TooManyFiles { max: 3, .. }
        ));
    }

    #[test]
    fn test_rejected_files_do_not_consume_quota() {
        // Two oversize rejects followed by three good files into an empty
        // queue of capacity three: all three good files fit.
        let batch = validate_batch(
            vec![
                pdf("big1.pdf", 9999),
                pdf("big2.pdf", 9999),
                pdf("a.pdf", 1),
                pdf("b.pdf", 1),
                pdf("c.pdf", 1),
            ],
            &policy(),
            0,
        );

        assert_eq!(batch.admitted.len(), 3);
        assert_eq!(batch.rejected.len(), 2);
    }

    #[test]
    fn test_extension_fallback_when_mime_is_generic() {
        let batch = validate_batch(
            vec![FileCandidate::new(
                "scan.PDF",
                "application/octet-stream",
                Bytes::from_static(b"%PDF"),
            )],
            &policy(),
            0,
        );

        assert_eq!(batch.admitted.len(), 1);
    }

    #[test]
    fn test_boundary_size_is_admitted() {
        let batch = validate_batch(vec![pdf("edge.pdf", 1024)], &policy(), 0);
        assert_eq!(batch.admitted.len(), 1);
    }
}
