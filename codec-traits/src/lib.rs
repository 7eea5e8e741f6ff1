//! # Codec Boundary Traits
//!
//! Contracts between the processing pipeline and the external conversion
//! collaborators it orchestrates.
//!
//! ## Overview
//!
//! This crate defines the boundary between the orchestration core and the
//! actual encoding/decoding algorithms (PDF merge/compress, image re-encode,
//! text layout, ZIP packaging). The core never looks inside a conversion; it
//! hands a one-shot binary payload plus parameters to an implementation of
//! these traits and consumes progress and terminal results.
//!
//! ## Traits
//!
//! - [`FileCodec`](codec::FileCodec) - Blocking one-shot conversion with a
//!   progress sink. Runs inside an isolated worker context.
//! - [`ArchivePackager`](archive::ArchivePackager) - Async batch ZIP
//!   packaging of finished outputs.
//!
//! ## Ownership
//!
//! Binary payloads cross these boundaries as [`bytes::Bytes`]: handing a
//! [`JobInput`](codec::JobInput) to a codec *moves* the buffer, it is never
//! copied. Parameter bundles are plain values and are copied freely.

pub mod archive;
pub mod codec;
pub mod error;
pub mod params;
pub mod testing;

pub use archive::{ArchiveEntry, ArchivePackager};
pub use codec::{FileCodec, JobInput, JobOutput, OutputMeta, ProgressSink};
pub use error::{CodecError, Result};
pub use params::{OperationKind, OperationParams, OutputFormat};
