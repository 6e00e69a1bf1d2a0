// src/progression.rs

//! Arbitration between two tracked statuses for the same user and job.
//!
//! The forward pipeline is ranked explicitly. `Rejected` sits outside the
//! ranking and always wins. Every other status (New, Pending, Archived,
//! Ghosting) is not eligible to progress in either direction.

use crate::models::JobStatus;

/// Position of a status in the forward pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progression {
    Ranked(u8),
    /// Absorbing terminal state
    Terminal,
    NotEligible,
}

/// Rank table for the pipeline. Exhaustive on purpose: adding a status
/// variant forces a decision here.
pub fn progression(status: JobStatus) -> Progression {
    match status {
        JobStatus::Applied => Progression::Ranked(0),
        JobStatus::Reviewed => Progression::Ranked(1),
        JobStatus::Interviewing => Progression::Ranked(2),
        JobStatus::TechnicalAssessment => Progression::Ranked(3),
        JobStatus::Offered => Progression::Ranked(4),
        JobStatus::Rejected => Progression::Terminal,
        JobStatus::New | JobStatus::Pending | JobStatus::Archived | JobStatus::Ghosting => {
            Progression::NotEligible
        }
    }
}

/// Whether a link currently at `current` should take on `candidate`.
pub fn should_adopt(current: JobStatus, candidate: JobStatus) -> bool {
    match (progression(current), progression(candidate)) {
        (_, Progression::Terminal) => true,
        (Progression::Ranked(cur), Progression::Ranked(cand)) => cand > cur,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use JobStatus::*;

    const PIPELINE: [JobStatus; 5] = [Applied, Reviewed, Interviewing, TechnicalAssessment, Offered];
    const UNRANKED: [JobStatus; 4] = [New, Pending, Archived, Ghosting];

    #[test]
    fn test_rank_table() {
        for (rank, status) in PIPELINE.iter().enumerate() {
            assert_eq!(progression(*status), Progression::Ranked(rank as u8));
        }
        assert_eq!(progression(Rejected), Progression::Terminal);
        for status in UNRANKED {
            assert_eq!(progression(status), Progression::NotEligible);
        }
    }

    #[test]
    fn test_forward_progress_is_adopted() {
        assert!(should_adopt(Applied, Offered));
        assert!(should_adopt(Applied, Reviewed));
        assert!(should_adopt(Interviewing, TechnicalAssessment));
    }

    #[test]
    fn test_regression_is_refused() {
        assert!(!should_adopt(Interviewing, Reviewed));
        assert!(!should_adopt(Offered, Applied));
    }

    #[test]
    fn test_equal_status_is_refused() {
        for status in PIPELINE {
            assert!(!should_adopt(status, status));
        }
    }

    #[test]
    fn test_rejected_always_wins() {
        for current in JobStatus::ALL {
            assert!(should_adopt(current, Rejected), "{:?}", current);
        }
    }

    #[test]
    fn test_unranked_statuses_never_adopt() {
        for current in JobStatus::ALL {
            for candidate in UNRANKED {
                assert!(!should_adopt(current, candidate));
            }
        }
        for current in UNRANKED {
            for candidate in PIPELINE {
                assert!(!should_adopt(current, candidate));
            }
        }
    }

    #[test]
    fn test_nothing_leaves_rejected_except_rejected() {
        for candidate in JobStatus::ALL {
            assert_eq!(should_adopt(Rejected, candidate), candidate == Rejected);
        }
    }

    #[test]
    fn test_full_grid_matches_rank_order() {
        for (i, current) in PIPELINE.iter().enumerate() {
            for (j, candidate) in PIPELINE.iter().enumerate() {
                assert_eq!(should_adopt(*current, *candidate), j > i);
            }
        }
    }
}
