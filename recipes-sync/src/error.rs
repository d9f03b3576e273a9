//! Error types for recipes-sync.

use std::path::PathBuf;

use thiserror::Error;

use recipes_core::SpecError;

/// Failures talking to the external scheduler.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The tool call itself failed (transport error, timeout, tool error).
    #[error("scheduler unavailable: {0}")]
    Unavailable(String),

    /// The scheduler answered, but not with the expected JSON.
    #[error("malformed scheduler response to '{action}': {reason}; raw: {raw}")]
    MalformedResponse {
        action: &'static str,
        reason: String,
        raw: String,
    },

    /// `add` succeeded at the transport level without returning a job id.
    #[error("scheduler did not return a job id for 'add'; raw: {raw}")]
    MissingIdInResponse { raw: String },
}

/// Returned by a transport that reached the scheduler but could not make
/// sense of its reply. Surfaces as [`SchedulerError::MalformedResponse`].
#[derive(Debug, Error)]
#[error("malformed reply: {reason}")]
pub struct MalformedReply {
    pub reason: String,
    pub raw: String,
}

/// All errors that can arise from a reconciliation pass.
///
/// Any of these aborts the pass before the mapping store is written.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("invalid cron job spec: {0}")]
    Spec(#[from] SpecError),

    /// Listing jobs failed before any declared job was processed.
    #[error("failed to list scheduler jobs: {0}")]
    List(#[source] SchedulerError),

    /// A scheduler call failed while processing declared job `job_id`.
    #[error("cron job '{job_id}': {source}")]
    Job {
        job_id: String,
        #[source]
        source: SchedulerError,
    },

    /// A scheduler call failed while disabling the orphaned entry `key`.
    #[error("orphaned cron job '{key}': {source}")]
    Orphan {
        key: String,
        #[source]
        source: SchedulerError,
    },

    /// The interactive confirmation could not be read.
    #[error("confirmation prompt failed: {0}")]
    Prompt(String),

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization error (mapping store).
    #[error("mapping store JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
