// src/results.rs

use serde::{Deserialize, Serialize};

use crate::models::{Job, JobId};

/// Outcome of matching an incoming (email-derived) job reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    pub is_match: bool,
    pub matched_job: Option<Job>,
    /// Company similarity of the accepted candidate; 0 when nothing matched.
    pub similarity: f64,
}

impl MatchResult {
    pub fn no_match() -> Self {
        Self {
            is_match: false,
            matched_job: None,
            similarity: 0.0,
        }
    }

    pub fn matched(job: Job, similarity: f64) -> Self {
        Self {
            is_match: true,
            matched_job: Some(job),
            similarity,
        }
    }
}

/// A duplicate suggestion for human review
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PotentialMatch {
    pub job: Job,
    /// Composite (title + 2 * company) / 3 similarity
    pub similarity: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeResult {
    pub success: bool,
    pub message: String,
}

impl MergeResult {
    pub fn succeeded(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// What enrichment did with an analyzed email
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum EnrichmentOutcome {
    /// Attached to an existing job found by MatchIncoming
    Attached {
        job_id: JobId,
        similarity: f64,
        status_changed: bool,
    },
    /// No existing job matched, so one was created from the email
    Created { job_id: JobId },
    /// The reference no longer exists
    ReferenceMissing,
    /// Title or company was blank
    Skipped,
}
