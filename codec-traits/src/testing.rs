//! Deterministic codec doubles for pipeline tests.
//!
//! Downstream crates exercise scheduler, retry, and channel behavior against
//! a scripted codec instead of real conversion libraries. The script controls
//! how many runs fail, how each failure presents, and the progress ramp a
//! successful run emits.

use crate::codec::{FileCodec, JobInput, JobOutput, OutputMeta, ProgressSink};
use crate::error::{CodecError, Result};
use crate::params::OperationKind;
use bytes::Bytes;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

/// How a scripted failure presents to the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureScript {
    /// Report a password-protected input
    PasswordProtected,
    /// Report a corrupt input
    CorruptInput,
    /// Report resource exhaustion
    ResourceExhausted,
    /// Report a generic failure
    Generic,
    /// Panic inside the run, simulating a crashed worker context
    Panic,
}

impl FailureScript {
    fn into_error(self) -> CodecError {
        match self {
            FailureScript::PasswordProtected => CodecError::PasswordProtected,
            FailureScript::CorruptInput => {
                CodecError::CorruptInput("scripted corrupt page".to_string())
            }
            FailureScript::ResourceExhausted => {
                CodecError::ResourceExhausted("scripted memory pressure".to_string())
            }
            FailureScript::Generic => CodecError::OperationFailed("scripted failure".to_string()),
            FailureScript::Panic => unreachable!("panic script does not build an error"),
        }
    }
}

/// Codec that fails its first `fail_count` runs and succeeds afterwards.
///
/// Successful runs emit the configured progress ramp and return the input
/// bytes reversed, so tests can assert the output actually came from this
/// codec. Run counting is atomic: one instance can be shared across worker
/// contexts.
pub struct ScriptedCodec {
    kind: OperationKind,
    remaining_failures: AtomicU32,
    failure: FailureScript,
    progress_ramp: Vec<u8>,
    run_delay: Option<Duration>,
    runs: AtomicU32,
}

impl ScriptedCodec {
    /// A codec that always succeeds.
    pub fn succeeding(kind: OperationKind) -> Self {
        Self::failing_first(kind, 0, FailureScript::Generic)
    }

    /// A codec that fails its first `fail_count` runs with `failure`.
    pub fn failing_first(kind: OperationKind, fail_count: u32, failure: FailureScript) -> Self {
        Self {
            kind,
            remaining_failures: AtomicU32::new(fail_count),
            failure,
            progress_ramp: vec![25, 50, 75, 100],
            run_delay: None,
            runs: AtomicU32::new(0),
        }
    }

    /// A codec that never succeeds.
    pub fn always_failing(kind: OperationKind, failure: FailureScript) -> Self {
        Self::failing_first(kind, u32::MAX, failure)
    }

    /// Override the progress values a successful run reports.
    pub fn with_progress_ramp(mut self, ramp: Vec<u8>) -> Self {
        self.progress_ramp = ramp;
        self
    }

    /// Keep each run alive for at least `delay`, for concurrency-bound tests.
    pub fn with_run_delay(mut self, delay: Duration) -> Self {
        self.run_delay = Some(delay);
        self
    }

    /// Total number of runs started so far.
    pub fn runs(&self) -> u32 {
        self.runs.load(Ordering::SeqCst)
    }
}

impl FileCodec for ScriptedCodec {
    fn kind(&self) -> OperationKind {
        self.kind
    }

    fn run(&self, input: JobInput, progress: &ProgressSink) -> Result<JobOutput> {
        self.runs.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.run_delay {
            std::thread::sleep(delay);
        }

        let should_fail = self
            .remaining_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if should_fail {
            if self.failure == FailureScript::Panic {
                panic!("scripted codec panic");
            }
            return Err(self.failure.into_error());
        }

        for &percent in &self.progress_ramp {
            progress(percent);
        }

        let mut reversed: Vec<u8> = input.binary.to_vec();
        reversed.reverse();

        Ok(JobOutput {
            binary: Bytes::from(reversed),
            meta: OutputMeta {
                mime_type: input.params.format.mime_type().to_string(),
                extension: input.params.format.extension().to_string(),
            },
        })
    }
}
