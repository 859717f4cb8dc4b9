//! Execution isolation for CPU-heavy parsing.
//!
//! Small files and providers that opt out run inline on the caller's worker
//! thread. Everything else is parsed in an isolated child process: true
//! parallelism for CPU-bound work, and the worker's memory goes back to the
//! operating system afterwards, which an in-process call cannot guarantee.
//!
//! The child is this crate's own binary invoked with the hidden `worker`
//! subcommand. It writes exactly one tagged result to stdout (the one-shot
//! channel); the parent reads the message and joins the child
//! unconditionally, including on decode errors. No timeout bounds the
//! child; a hung parse stalls the request.

use std::process::{Command, Stdio};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PipelineError, ProcessingError, ProcessingErrorKind};
use crate::models::{Chunk, ChunkOptions, SourceFile};

/// Decision rule: inline unless the provider benefits from isolation and the
/// file is at or above the configured threshold.
pub fn should_isolate(multiprocessable: bool, file_size: u64, threshold: u64) -> bool {
    multiprocessable && file_size >= threshold
}

/// Tagged result sent from the worker to the parent.
#[derive(Debug, Serialize, Deserialize)]
pub enum WorkerResult {
    Ok(Vec<Chunk>),
    Err(WorkerFailure),
}

/// A classified failure crossing the process boundary.
#[derive(Debug, Serialize, Deserialize)]
pub struct WorkerFailure {
    pub kind: WorkerFailureKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerFailureKind {
    InvalidInput,
    PayloadTooLarge,
    UnsupportedFormat,
    Other,
}

impl WorkerFailure {
    pub fn from_error(error: &PipelineError) -> Self {
        match error {
            PipelineError::UnsupportedFormat => Self {
                kind: WorkerFailureKind::UnsupportedFormat,
                message: error.to_string(),
            },
            PipelineError::Processing(e) => Self {
                kind: match e.kind {
                    ProcessingErrorKind::InvalidInput => WorkerFailureKind::InvalidInput,
                    ProcessingErrorKind::PayloadTooLarge => WorkerFailureKind::PayloadTooLarge,
                },
                message: e.message.clone(),
            },
            other => Self {
                kind: WorkerFailureKind::Other,
                message: other.to_string(),
            },
        }
    }

    /// Re-raise in the parent with the original classification preserved.
    pub fn into_error(self) -> PipelineError {
        match self.kind {
            WorkerFailureKind::UnsupportedFormat => PipelineError::UnsupportedFormat,
            WorkerFailureKind::InvalidInput => ProcessingError::invalid(self.message).into(),
            WorkerFailureKind::PayloadTooLarge => ProcessingError::too_large(self.message).into(),
            WorkerFailureKind::Other => PipelineError::Worker(self.message),
        }
    }
}

/// Run the named provider over the file in an isolated worker process.
pub fn run_in_worker(
    provider_name: &str,
    file: &SourceFile,
    opts: &ChunkOptions,
) -> Result<Vec<Chunk>, PipelineError> {
    let exe = std::env::current_exe()?;

    let mut command = Command::new(exe);
    command
        .arg("worker")
        .args(["--provider", provider_name])
        .args(["--file-id", &file.id])
        .arg("--path")
        .arg(&file.path)
        .args(["--file-name", &file.file_name])
        .args(["--mime-type", &file.mime_type])
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit());

    if let Some(chunk_size) = opts.chunk_size {
        command.args(["--chunk-size", &chunk_size.to_string()]);
    }
    if let Some(chunk_overlap) = opts.chunk_overlap {
        command.args(["--chunk-overlap", &chunk_overlap.to_string()]);
    }

    debug!(provider = provider_name, file_id = %file.id, "spawning isolated worker");
    let child = command
        .spawn()
        .map_err(|e| PipelineError::Worker(format!("failed to spawn worker: {e}")))?;

    // blocks on the one-shot message, then joins the child
    let output = child
        .wait_with_output()
        .map_err(|e| PipelineError::Worker(format!("failed to join worker: {e}")))?;

    let message: WorkerResult = serde_json::from_slice(&output.stdout).map_err(|_| {
        // a crashed or killed worker (e.g. OOM) leaves no valid message
        PipelineError::Worker(format!(
            "worker exited with {} without sending a result",
            output.status
        ))
    })?;

    match message {
        WorkerResult::Ok(chunks) => Ok(chunks),
        WorkerResult::Err(failure) => Err(failure.into_error()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decision_rule() {
        // provider opted out: always inline
        assert!(!should_isolate(false, 10_000_000, 100_000));
        // small file: inline
        assert!(!should_isolate(true, 99_999, 100_000));
        // large multiprocessable file: isolate
        assert!(should_isolate(true, 100_000, 100_000));
    }

    #[test]
    fn test_worker_result_roundtrip() {
        let chunks = vec![Chunk::new("hello").meta("page", 1)];
        let encoded = serde_json::to_string(&WorkerResult::Ok(chunks)).unwrap();
        let decoded: WorkerResult = serde_json::from_str(&encoded).unwrap();
        match decoded {
            WorkerResult::Ok(chunks) => {
                assert_eq!(chunks.len(), 1);
                assert_eq!(chunks[0].content, "hello");
                assert_eq!(chunks[0].meta_i64("page"), Some(1));
            }
            WorkerResult::Err(_) => panic!("expected ok variant"),
        }
    }

    #[test]
    fn test_classification_survives_the_boundary() {
        let original: PipelineError =
            ProcessingError::too_large("File too large. The limit is 25 MiB.").into();
        let failure = WorkerFailure::from_error(&original);
        let encoded = serde_json::to_string(&failure).unwrap();
        let decoded: WorkerFailure = serde_json::from_str(&encoded).unwrap();

        match decoded.into_error() {
            PipelineError::Processing(e) => {
                assert_eq!(e.kind, ProcessingErrorKind::PayloadTooLarge);
                assert_eq!(e.message, "File too large. The limit is 25 MiB.");
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn test_unsupported_format_survives_the_boundary() {
        let failure = WorkerFailure::from_error(&PipelineError::UnsupportedFormat);
        assert!(matches!(
            failure.into_error(),
            PipelineError::UnsupportedFormat
        ));
    }
}
