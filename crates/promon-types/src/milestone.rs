//! Milestones: weighted portions of a project's deliverables
//!
//! A milestone carries a weight (percent of the whole project), a
//! completion status, and — while in progress — a sub-percentage. The
//! weights of a project's milestone set must sum to 100; that invariant
//! is enforced by the ledger, not here.

use crate::{MilestoneId, ProjectId};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Completion status of a single milestone
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MilestoneStatus {
    /// Work has not started
    Pending,
    /// Work underway; `progress` carries the sub-percentage
    InProgress,
    /// Fully delivered; the whole weight is applied
    Completed,
}

impl std::fmt::Display for MilestoneStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::InProgress => write!(f, "in_progress"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

/// A persisted milestone belonging to exactly one project
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Milestone {
    pub id: MilestoneId,
    pub project_id: ProjectId,
    pub title: String,
    /// Percent of the project this milestone represents
    pub weight: f64,
    pub status: MilestoneStatus,
    /// Percent complete within the milestone; meaningful only while
    /// status is `InProgress`, zero otherwise
    pub progress: f64,
    /// Position in the project's ordered milestone sequence
    pub order: u32,
    pub planned_budget: f64,
    pub due_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_notes: Option<String>,
}

impl Milestone {
    /// Create a pending milestone from an edit-time spec.
    pub fn from_spec(project_id: ProjectId, spec: MilestoneSpec) -> Self {
        Self {
            id: MilestoneId::generate(),
            project_id,
            title: spec.title,
            weight: spec.weight,
            status: MilestoneStatus::Pending,
            progress: 0.0,
            order: spec.order,
            planned_budget: spec.planned_budget,
            due_date: spec.due_date,
            completed_at: None,
            completion_notes: None,
        }
    }

    /// The portion of this milestone's weight counted toward progress.
    pub fn applied_weight(&self) -> f64 {
        match self.status {
            MilestoneStatus::Completed => self.weight,
            MilestoneStatus::InProgress => self.weight * (self.progress / 100.0),
            MilestoneStatus::Pending => 0.0,
        }
    }

    /// Whether the milestone is past its due date and not yet delivered.
    pub fn is_overdue(&self, as_of: NaiveDate) -> bool {
        self.status != MilestoneStatus::Completed && self.due_date < as_of
    }

    /// Freeze the reviewable fields for a submission snapshot.
    pub fn snapshot(&self) -> MilestoneSnapshot {
        MilestoneSnapshot {
            milestone_id: self.id.clone(),
            weight: self.weight,
            status: self.status,
            progress: self.progress,
        }
    }
}

/// Edit-time input for defining or replacing a project's milestone set
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MilestoneSpec {
    pub title: String,
    pub weight: f64,
    pub order: u32,
    pub planned_budget: f64,
    pub due_date: NaiveDate,
}

impl MilestoneSpec {
    pub fn new(title: impl Into<String>, weight: f64, order: u32, due_date: NaiveDate) -> Self {
        Self {
            title: title.into(),
            weight,
            order,
            planned_budget: 0.0,
            due_date,
        }
    }

    pub fn with_planned_budget(mut self, budget: f64) -> Self {
        self.planned_budget = budget;
        self
    }
}

/// Frozen view of one milestone at submission time
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MilestoneSnapshot {
    pub milestone_id: MilestoneId,
    pub weight: f64,
    pub status: MilestoneStatus,
    pub progress: f64,
}

impl MilestoneSnapshot {
    pub fn applied_weight(&self) -> f64 {
        match self.status {
            MilestoneStatus::Completed => self.weight,
            MilestoneStatus::InProgress => self.weight * (self.progress / 100.0),
            MilestoneStatus::Pending => 0.0,
        }
    }
}

/// A proposed state change for one milestone inside a submission
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MilestoneDelta {
    pub milestone_id: MilestoneId,
    pub status: MilestoneStatus,
    pub progress: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl MilestoneDelta {
    pub fn new(milestone_id: MilestoneId, status: MilestoneStatus, progress: f64) -> Self {
        Self {
            milestone_id,
            status,
            progress,
            note: None,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn due(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn test_applied_weight_by_status() {
        let mut m = Milestone::from_spec(
            ProjectId::new("p"),
            MilestoneSpec::new("Site prep", 40.0, 1, due("2026-03-01")),
        );
        assert_eq!(m.applied_weight(), 0.0);

        m.status = MilestoneStatus::InProgress;
        m.progress = 50.0;
        assert!((m.applied_weight() - 20.0).abs() < f64::EPSILON);

        m.status = MilestoneStatus::Completed;
        assert!((m.applied_weight() - 40.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_overdue_only_when_undelivered() {
        let mut m = Milestone::from_spec(
            ProjectId::new("p"),
            MilestoneSpec::new("Procurement", 30.0, 2, due("2026-01-15")),
        );
        assert!(m.is_overdue(due("2026-02-01")));
        assert!(!m.is_overdue(due("2026-01-10")));

        m.status = MilestoneStatus::Completed;
        assert!(!m.is_overdue(due("2026-02-01")));
    }

    #[test]
    fn test_snapshot_freezes_state() {
        let mut m = Milestone::from_spec(
            ProjectId::new("p"),
            MilestoneSpec::new("Foundation", 25.0, 3, due("2026-06-30")),
        );
        m.status = MilestoneStatus::InProgress;
        m.progress = 80.0;

        let snap = m.snapshot();
        m.progress = 10.0;

        assert_eq!(snap.progress, 80.0);
        assert!((snap.applied_weight() - 20.0).abs() < 1e-9);
    }
}
