// src/error.rs

use thiserror::Error;

use crate::models::JobId;

/// Which side of a merge a job id was given for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeRole {
    Source,
    Target,
}

impl std::fmt::Display for MergeRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MergeRole::Source => f.write_str("source"),
            MergeRole::Target => f.write_str("target"),
        }
    }
}

/// Reasons a merge does not happen.
///
/// Everything except `Storage` is an expected outcome and is reported back as an
/// unsuccessful `MergeResult` rather than an error.
#[derive(Error, Debug)]
pub enum MergeError {
    #[error("Cannot merge job {0} into itself")]
    InvalidArgument(JobId),

    #[error("{role} job {id} not found")]
    NotFound { role: MergeRole, id: JobId },

    /// Source disappeared between locking and the compare-and-delete
    #[error("Source job {0} was removed by a concurrent operation")]
    Conflict(JobId),

    #[error("Storage error: {0:#}")]
    Storage(#[from] anyhow::Error),
}

impl MergeError {
    /// True for outcomes callers should see as `success = false`
    pub fn is_expected(&self) -> bool {
        !matches!(self, MergeError::Storage(_))
    }
}
