//! Notification intents
//!
//! The engine's obligation ends at producing a correct, deduplicated
//! recipient set with a machine-readable category per workflow edge.
//! Message construction, delivery, and persistence are external.

use crate::{MilestoneId, ProjectId, SubmissionId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which workflow edge fired
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationCategory {
    /// Field unit submitted an update; implementing office must review
    SubmissionReceived,
    /// Implementing office compiled the submission for the secretariat
    CompiledForSecretariat,
    /// Secretariat issued a verdict (approval or mixed)
    VerdictIssued,
    /// At least one division was rejected; field unit must resubmit
    RevisionRequested,
    /// All milestone weight applied; project finished
    ProjectCompleted,
    /// A milestone passed its due date without delivery
    MilestoneOverdue,
}

impl std::fmt::Display for NotificationCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::SubmissionReceived => "submission_received",
            Self::CompiledForSecretariat => "compiled_for_secretariat",
            Self::VerdictIssued => "verdict_issued",
            Self::RevisionRequested => "revision_requested",
            Self::ProjectCompleted => "project_completed",
            Self::MilestoneOverdue => "milestone_overdue",
        };
        write!(f, "{s}")
    }
}

/// An addressed notice to one responsible party
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NotificationIntent {
    pub recipient: UserId,
    pub category: NotificationCategory,
    pub project_id: ProjectId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submission_id: Option<SubmissionId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub milestone_id: Option<MilestoneId>,
    /// One-line human-readable summary for the delivery layer
    pub summary: String,
    pub created_at: DateTime<Utc>,
}

impl NotificationIntent {
    pub fn new(
        recipient: UserId,
        category: NotificationCategory,
        project_id: ProjectId,
        summary: impl Into<String>,
    ) -> Self {
        Self {
            recipient,
            category,
            project_id,
            submission_id: None,
            milestone_id: None,
            summary: summary.into(),
            created_at: Utc::now(),
        }
    }

    pub fn with_submission(mut self, id: SubmissionId) -> Self {
        self.submission_id = Some(id);
        self
    }

    pub fn with_milestone(mut self, id: MilestoneId) -> Self {
        self.milestone_id = Some(id);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intent_builder() {
        let intent = NotificationIntent::new(
            UserId::new("io-1"),
            NotificationCategory::SubmissionReceived,
            ProjectId::new("p-1"),
            "New submission for Drainage rehabilitation",
        )
        .with_submission(SubmissionId::new("s-1"));

        assert_eq!(intent.recipient, UserId::new("io-1"));
        assert_eq!(intent.submission_id, Some(SubmissionId::new("s-1")));
        assert!(intent.milestone_id.is_none());
    }

    #[test]
    fn test_category_tag_format() {
        assert_eq!(
            NotificationCategory::RevisionRequested.to_string(),
            "revision_requested"
        );
    }
}
