//! Projects and their workflow status
//!
//! A project references exactly one implementing-office user and one
//! field-unit user. Its progress fields are derived values owned by the
//! engine; nothing else writes them. `WorkflowStatus` is a closed enum —
//! transitions happen only through the workflow state machine.

use crate::{ProgressSummary, ProjectId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Approval-workflow status of a project
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    /// Milestones defined (or not yet); no submission has been made
    Draft,
    /// A field-unit submission awaits implementing-office review
    Submitted,
    /// Implementing office approved; awaiting secretariat verdict
    CompiledForSecretariat,
    /// Secretariat issued a fully-approving verdict (momentary; the
    /// workflow advances to `ValidatedBySecretariat` in the same step)
    SecretariatApproved,
    /// The verdict has been applied to the committed ledger
    ValidatedBySecretariat,
    /// Work visibly underway between review cycles
    Ongoing,
    /// All milestone weight applied; terminal
    Completed,
}

impl WorkflowStatus {
    /// Terminal states accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed)
    }

    /// States in which the field unit may open a new submission
    /// (provided none is already in flight).
    pub fn accepts_submissions(&self) -> bool {
        matches!(
            self,
            Self::Draft | Self::Submitted | Self::ValidatedBySecretariat | Self::Ongoing
        )
    }

    /// States with a submission under review.
    pub fn has_review_in_flight(&self) -> bool {
        matches!(self, Self::Submitted | Self::CompiledForSecretariat)
    }
}

impl std::fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Draft => "draft",
            Self::Submitted => "submitted",
            Self::CompiledForSecretariat => "compiled_for_secretariat",
            Self::SecretariatApproved => "secretariat_approved",
            Self::ValidatedBySecretariat => "validated_by_secretariat",
            Self::Ongoing => "ongoing",
            Self::Completed => "completed",
        };
        write!(f, "{s}")
    }
}

/// A monitored project
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    /// Human-facing project code, e.g. "INFRA-2026-014"
    pub code: String,
    pub name: String,
    /// First-line reviewer of field submissions
    pub implementing_office: UserId,
    /// Field reporter assigned to this project
    pub field_unit: UserId,
    pub workflow_status: WorkflowStatus,
    /// Derived percentages, engine-owned
    pub overall_progress: f64,
    pub timeline_progress: f64,
    pub budget_progress: f64,
    pub physical_progress: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_progress_update: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Project {
    /// Create a draft project with zeroed progress.
    pub fn new(new: NewProject) -> Self {
        Self {
            id: ProjectId::generate(),
            code: new.code,
            name: new.name,
            implementing_office: new.implementing_office,
            field_unit: new.field_unit,
            workflow_status: WorkflowStatus::Draft,
            overall_progress: 0.0,
            timeline_progress: 0.0,
            budget_progress: 0.0,
            physical_progress: 0.0,
            last_progress_update: None,
            created_at: Utc::now(),
        }
    }

    /// Write a computed summary into the derived fields.
    pub fn apply_progress(&mut self, summary: &ProgressSummary) {
        self.overall_progress = summary.overall;
        self.timeline_progress = summary.timeline;
        self.budget_progress = summary.budget;
        self.physical_progress = summary.physical;
        self.last_progress_update = Some(Utc::now());
    }

    pub fn progress_summary(&self) -> ProgressSummary {
        ProgressSummary {
            overall: self.overall_progress,
            timeline: self.timeline_progress,
            budget: self.budget_progress,
            physical: self.physical_progress,
        }
    }
}

/// Input for registering a project
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NewProject {
    pub code: String,
    pub name: String,
    pub implementing_office: UserId,
    pub field_unit: UserId,
}

impl NewProject {
    pub fn new(
        code: impl Into<String>,
        name: impl Into<String>,
        implementing_office: UserId,
        field_unit: UserId,
    ) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            implementing_office,
            field_unit,
        }
    }
}
