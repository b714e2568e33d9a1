//! Job status state machine.

use serde::{Deserialize, Serialize};

/// Lifecycle status of an assessment job.
///
/// `Complete` is terminal. The failure states are terminal until a resume
/// re-enters the stage that failed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    GenerationInProgress,
    GenerationComplete,
    EstimationInProgress,
    EstimationComplete,
    Complete,
    FailedGeneration,
    FailedEstimation,
}

impl JobStatus {
    /// Stable text encoding used in the database and over the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::GenerationInProgress => "generation_in_progress",
            JobStatus::GenerationComplete => "generation_complete",
            JobStatus::EstimationInProgress => "estimation_in_progress",
            JobStatus::EstimationComplete => "estimation_complete",
            JobStatus::Complete => "complete",
            JobStatus::FailedGeneration => "failed_generation",
            JobStatus::FailedEstimation => "failed_estimation",
        }
    }

    /// Parses the text encoding back into a status.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(JobStatus::Pending),
            "generation_in_progress" => Some(JobStatus::GenerationInProgress),
            "generation_complete" => Some(JobStatus::GenerationComplete),
            "estimation_in_progress" => Some(JobStatus::EstimationInProgress),
            "estimation_complete" => Some(JobStatus::EstimationComplete),
            "complete" => Some(JobStatus::Complete),
            "failed_generation" => Some(JobStatus::FailedGeneration),
            "failed_estimation" => Some(JobStatus::FailedEstimation),
            _ => None,
        }
    }

    /// True once the job has produced its final assessment.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Complete)
    }

    /// True while a stage is actively executing (or was abandoned mid-stage
    /// by a cancellation).
    pub fn is_in_progress(&self) -> bool {
        matches!(
            self,
            JobStatus::GenerationInProgress | JobStatus::EstimationInProgress
        )
    }

    /// True when the job is parked in a failure state awaiting resume.
    pub fn is_failed(&self) -> bool {
        matches!(
            self,
            JobStatus::FailedGeneration | JobStatus::FailedEstimation
        )
    }

    /// Legal transition edges.
    ///
    /// The in-progress self-edges exist so a stale in-progress job (left
    /// behind by a cancelled invocation) can be reclaimed by a resume; the
    /// revision compare-and-set in the store serializes concurrent
    /// reclaimers.
    pub fn may_transition_to(&self, next: JobStatus) -> bool {
        use JobStatus::*;
        matches!(
            (self, next),
            (Pending, GenerationInProgress)
                | (GenerationInProgress, GenerationComplete)
                | (GenerationInProgress, FailedGeneration)
                | (GenerationInProgress, GenerationInProgress)
                | (GenerationComplete, EstimationInProgress)
                | (EstimationInProgress, EstimationComplete)
                | (EstimationInProgress, FailedEstimation)
                | (EstimationInProgress, EstimationInProgress)
                | (EstimationComplete, Complete)
                | (FailedGeneration, GenerationInProgress)
                | (FailedEstimation, EstimationInProgress)
        )
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Pending => write!(f, "Pending"),
            JobStatus::GenerationInProgress => write!(f, "Generation in progress"),
            JobStatus::GenerationComplete => write!(f, "Generation complete"),
            JobStatus::EstimationInProgress => write!(f, "Estimation in progress"),
            JobStatus::EstimationComplete => write!(f, "Estimation complete"),
            JobStatus::Complete => write!(f, "Complete"),
            JobStatus::FailedGeneration => write!(f, "Generation failed"),
            JobStatus::FailedEstimation => write!(f, "Estimation failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: &[JobStatus] = &[
        JobStatus::Pending,
        JobStatus::GenerationInProgress,
        JobStatus::GenerationComplete,
        JobStatus::EstimationInProgress,
        JobStatus::EstimationComplete,
        JobStatus::Complete,
        JobStatus::FailedGeneration,
        JobStatus::FailedEstimation,
    ];

    #[test]
    fn test_parse_round_trip() {
        for status in ALL {
            assert_eq!(JobStatus::parse(status.as_str()), Some(*status));
        }
        assert_eq!(JobStatus::parse("bogus"), None);
    }

    #[test]
    fn test_complete_is_terminal() {
        for status in ALL {
            assert_eq!(status.is_terminal(), *status == JobStatus::Complete);
            assert!(
                !status.is_terminal() || !ALL.iter().any(|n| status.may_transition_to(*n)),
                "terminal state must have no outgoing edges"
            );
        }
    }

    #[test]
    fn test_happy_path_edges() {
        assert!(JobStatus::Pending.may_transition_to(JobStatus::GenerationInProgress));
        assert!(JobStatus::GenerationInProgress.may_transition_to(JobStatus::GenerationComplete));
        assert!(JobStatus::GenerationComplete.may_transition_to(JobStatus::EstimationInProgress));
        assert!(JobStatus::EstimationInProgress.may_transition_to(JobStatus::EstimationComplete));
        assert!(JobStatus::EstimationComplete.may_transition_to(JobStatus::Complete));
    }

    #[test]
    fn test_failure_and_resume_edges() {
        assert!(JobStatus::GenerationInProgress.may_transition_to(JobStatus::FailedGeneration));
        assert!(JobStatus::EstimationInProgress.may_transition_to(JobStatus::FailedEstimation));
        assert!(JobStatus::FailedGeneration.may_transition_to(JobStatus::GenerationInProgress));
        assert!(JobStatus::FailedEstimation.may_transition_to(JobStatus::EstimationInProgress));
    }

    #[test]
    fn test_no_stage_skipping() {
        assert!(!JobStatus::Pending.may_transition_to(JobStatus::EstimationInProgress));
        assert!(!JobStatus::Pending.may_transition_to(JobStatus::GenerationComplete));
        assert!(!JobStatus::GenerationComplete.may_transition_to(JobStatus::Complete));
        assert!(!JobStatus::FailedGeneration.may_transition_to(JobStatus::EstimationInProgress));
        assert!(!JobStatus::FailedEstimation.may_transition_to(JobStatus::GenerationInProgress));
    }

    #[test]
    fn test_stale_in_progress_reclaim_edges() {
        assert!(
            JobStatus::GenerationInProgress.may_transition_to(JobStatus::GenerationInProgress)
        );
        assert!(
            JobStatus::EstimationInProgress.may_transition_to(JobStatus::EstimationInProgress)
        );
        assert!(!JobStatus::GenerationInProgress
            .may_transition_to(JobStatus::EstimationInProgress));
    }
}
