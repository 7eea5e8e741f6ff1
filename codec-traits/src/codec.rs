//! One-shot file conversion boundary.
//!
//! A [`FileCodec`] is the opaque algorithm behind one [`OperationKind`]:
//! PDF merge, PDF compression, image re-encode, text layout. The pipeline
//! never inspects the conversion; it moves a binary payload in and receives
//! progress plus a terminal result.
//!
//! # Execution model
//!
//! `run` is *blocking* and is always invoked from an isolated worker context
//! owned by the worker channel layer, never from the coordinating task. The
//! codec cooperates by reporting progress through the provided sink; there is
//! no cancellation signal into a running codec (cancellation is channel
//! termination, handled outside).
//!
//! # Ownership
//!
//! The [`JobInput`] binary is **consumed**: ownership of the buffer moves to
//! the codec. Parameters are copied. The output buffer moves back to the
//! caller in [`JobOutput`].

use crate::error::Result;
use crate::params::{OperationKind, OperationParams};
use bytes::Bytes;

/// Progress callback handed to a running codec.
///
/// Implementations must accept values 0-100 in any order; consumers are
/// responsible for enforcing monotonicity.
pub type ProgressSink = dyn Fn(u8) + Send + Sync;

/// One-shot input payload for a conversion run.
#[derive(Debug, Clone)]
pub struct JobInput {
    /// File content. Ownership moves to the codec.
    pub binary: Bytes,
    /// Operation parameters. Copied, never shared.
    pub params: OperationParams,
}

impl JobInput {
    pub fn new(binary: Bytes, params: OperationParams) -> Self {
        Self { binary, params }
    }
}

/// Metadata describing a conversion output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputMeta {
    /// MIME type of the produced binary
    pub mime_type: String,
    /// Suggested file extension without the dot
    pub extension: String,
}

/// Terminal result of a successful conversion run.
#[derive(Debug, Clone)]
pub struct JobOutput {
    /// Produced file content. Ownership moves to the caller.
    pub binary: Bytes,
    /// Output metadata
    pub meta: OutputMeta,
}

/// Blocking one-shot conversion algorithm.
///
/// Implementations must be `Send + Sync`: the pipeline shares one codec
/// instance across worker contexts and may run several conversions of the
/// same kind concurrently.
pub trait FileCodec: Send + Sync {
    /// The operation this codec implements.
    fn kind(&self) -> OperationKind;

    /// Run one conversion to completion.
    ///
    /// Blocks the calling context until the conversion yields. Progress is
    /// reported through `progress` zero or more times before returning.
    ///
    /// # Errors
    ///
    /// Returns a [`CodecError`](crate::CodecError) carrying enough category
    /// and text for the pipeline to classify the failure (password-protected,
    /// corrupt, resource exhaustion, other).
    fn run(&self, input: JobInput, progress: &ProgressSink) -> Result<JobOutput>;
}
