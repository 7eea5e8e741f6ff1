//! # Failure Classification
//!
//! Maps raw worker failure reasons onto a small taxonomy the retry logic and
//! the UI can act on. Workers report failures as free-form strings (codec
//! errors, panic payloads, channel diagnostics); classification is the single
//! place that turns those strings into decisions.

use serde::{Deserialize, Serialize};

/// What went wrong with a conversion attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The input requires a password the pipeline does not have.
    PasswordProtected,
    /// The input's structure is broken beyond what the codec tolerates.
    CorruptInput,
    /// The worker ran out of memory or another bounded resource.
    ResourceExhausted,
    /// The job was cancelled before it produced a result.
    Cancelled,
    /// The worker went silent past the configured deadline.
    Timeout,
    /// Anything we could not classify.
    Unknown,
}

impl FailureKind {
    /// Whether the failure is a property of the input itself.
    ///
    /// Re-running the same bytes cannot fix a password prompt or a corrupt
    /// structure, so these kinds are never retried.
    pub fn is_terminal_input(&self) -> bool {
        matches!(self, Self::PasswordProtected | Self::CorruptInput)
    }

    /// Short user-facing explanation, free of worker internals.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::PasswordProtected => "This file is password protected",
            Self::CorruptInput => "This file appears to be damaged",
            Self::ResourceExhausted => "This file is too large to process",
            Self::Cancelled => "Processing was cancelled",
            Self::Timeout => "Processing took too long and was stopped",
            Self::Unknown => "Something went wrong while processing this file",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PasswordProtected => "password_protected",
            Self::CorruptInput => "corrupt_input",
            Self::ResourceExhausted => "resource_exhausted",
            Self::Cancelled => "cancelled",
            Self::Timeout => "timeout",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Classify a raw failure reason string from a worker.
pub fn classify(reason: &str) -> FailureKind {
    let lowered = reason.to_lowercase();

    if lowered.contains("password") || lowered.contains("encrypted") {
        FailureKind::PasswordProtected
    } else if lowered.contains("corrupt") || lowered.contains("malformed") {
        FailureKind::CorruptInput
    } else if lowered.contains("resource exhausted")
        || lowered.contains("out of memory")
        || lowered.contains("allocation")
    {
        FailureKind::ResourceExhausted
    } else if lowered.contains("cancel") {
        FailureKind::Cancelled
    } else if lowered.contains("timed out") || lowered.contains("timeout") {
        FailureKind::Timeout
    } else {
        FailureKind::Unknown
    }
}

/// A classified failure attached to an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureInfo {
    pub kind: FailureKind,
    /// User-facing message for display.
    pub message: String,
    /// Raw worker reason, kept for logs only.
    pub raw_reason: String,
}

impl FailureInfo {
    /// Build failure info from a raw worker reason.
    pub fn from_reason(reason: impl Into<String>) -> Self {
        let raw_reason = reason.into();
        let kind = classify(&raw_reason);
        Self {
            kind,
            message: kind.user_message().to_string(),
            raw_reason,
        }
    }

    /// Failure info for a job whose worker exceeded its deadline.
    pub fn timed_out() -> Self {
        Self {
            kind: FailureKind::Timeout,
            message: FailureKind::Timeout.user_message().to_string(),
            raw_reason: "worker deadline exceeded".to_string(),
        }
    }
}
