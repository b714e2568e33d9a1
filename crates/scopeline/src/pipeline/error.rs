//! Stage failure and abort types.
//!
//! Failures inside a stage are values, not exceptions: the orchestrator
//! converts a `StageError` into the job's failure status and error message,
//! and nothing escapes past that boundary except caller-input errors.

use thiserror::Error;

use crate::extract::ExtractError;
use crate::gateway::GatewayError;
use crate::job::JobStatus;
use crate::store::StoreError;

/// A failure that parks the job in a failure state. The message is recorded
/// verbatim on the job for the UI to show next to the resume action.
#[derive(Error, Debug)]
pub enum StageError {
    #[error("Document extraction failed: {0}")]
    Extraction(#[from] ExtractError),

    #[error("Model gateway failed: {0}")]
    Gateway(GatewayError),

    #[error("Model output was not valid JSON and could not be repaired")]
    UnrepairableOutput,
}

/// Why a running stage stopped before producing its artifact.
#[derive(Debug)]
pub enum StageAbort {
    /// The caller's cancellation signal fired. The job keeps the
    /// in-progress status it had, and no error is recorded.
    Cancelled,
    Failed(StageError),
}

impl From<ExtractError> for StageAbort {
    fn from(e: ExtractError) -> Self {
        StageAbort::Failed(StageError::Extraction(e))
    }
}

impl From<GatewayError> for StageAbort {
    fn from(e: GatewayError) -> Self {
        match e {
            GatewayError::Cancelled => StageAbort::Cancelled,
            other => StageAbort::Failed(StageError::Gateway(other)),
        }
    }
}

/// Errors surfaced by orchestrator entry points. Everything else becomes
/// job state.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Job {id} has already been started (status {status})")]
    AlreadyStarted { id: String, status: JobStatus },

    #[error("Job {id} cannot be resumed from status {status}")]
    NotResumable { id: String, status: JobStatus },
}
