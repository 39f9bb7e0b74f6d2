//! Error types for the progress engine
//!
//! Every failure crossing the engine boundary is a typed variant. The
//! taxonomy: validation errors (caller fixes input), concurrency
//! conflicts (caller retries), state errors (caller is out of sync with
//! the workflow), and storage failures (infrastructure).

use crate::{MilestoneId, MilestoneStatus, ProjectId, SubmissionId, WorkflowStatus};

/// Errors that can occur in progress-engine operations
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("milestone weights sum to {sum:.2}%, must equal 100% (tolerance {tolerance})")]
    InvalidWeightDistribution { sum: f64, tolerance: f64 },

    #[error("duplicate milestone ordering index: {order}")]
    DuplicateOrder { order: u32 },

    #[error("milestone set must contain at least one milestone")]
    EmptyMilestoneSet,

    #[error("unknown milestone: {0}")]
    UnknownMilestone(MilestoneId),

    #[error("invalid progress {progress} for milestone {milestone} in status {status}")]
    InvalidProgress {
        milestone: MilestoneId,
        progress: f64,
        status: MilestoneStatus,
    },

    #[error("a submission is already in flight for this project: {0}")]
    ConcurrentSubmissionExists(SubmissionId),

    #[error("invalid transition from {status} on {event}")]
    InvalidTransition { status: WorkflowStatus, event: String },

    #[error("secretariat review must give a verdict for every open division; missing: {missing}")]
    IncompleteVerdicts { missing: String },

    #[error("project not found: {0}")]
    ProjectNotFound(ProjectId),

    #[error("submission not found: {0}")]
    SubmissionNotFound(SubmissionId),

    #[error("submission {submission} is not reviewable in status {status}")]
    SubmissionNotReviewable {
        submission: SubmissionId,
        status: String,
    },

    #[error("storage error: {0}")]
    Storage(String),
}

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;
