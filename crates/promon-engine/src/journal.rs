//! Transition journal: records every workflow status change
//!
//! Each step a project takes through the approval chain is appended
//! here with the event that caused it and the actor who triggered it.
//! The chain can be replayed to understand exactly how a project
//! reached its current status.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use promon_types::{ProjectId, UserId, WorkflowStatus};
use serde::{Deserialize, Serialize};

/// One recorded workflow transition
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub from: WorkflowStatus,
    pub to: WorkflowStatus,
    /// Machine-readable event tag (`submission_created`, ...)
    pub event: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor: Option<UserId>,
    pub occurred_at: DateTime<Utc>,
}

impl TransitionRecord {
    pub fn new(from: WorkflowStatus, to: WorkflowStatus, event: impl Into<String>) -> Self {
        Self {
            from,
            to,
            event: event.into(),
            actor: None,
            occurred_at: Utc::now(),
        }
    }

    pub fn with_actor(mut self, actor: UserId) -> Self {
        self.actor = Some(actor);
        self
    }
}

/// Append-only per-project transition history
#[derive(Default)]
pub struct TransitionJournal {
    records: DashMap<ProjectId, Vec<TransitionRecord>>,
}

impl TransitionJournal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one transition.
    pub fn record(&self, project_id: &ProjectId, record: TransitionRecord) {
        tracing::info!(
            project = %project_id,
            from = %record.from,
            to = %record.to,
            event = %record.event,
            "workflow transition"
        );
        self.records
            .entry(project_id.clone())
            .or_default()
            .push(record);
    }

    /// Record a multi-status path produced by a single event (e.g. a
    /// fully approving verdict passes through intermediate statuses).
    pub fn record_path(
        &self,
        project_id: &ProjectId,
        start: WorkflowStatus,
        path: &[WorkflowStatus],
        event: &str,
        actor: Option<&UserId>,
    ) {
        let mut from = start;
        for to in path {
            let mut record = TransitionRecord::new(from, *to, event);
            if let Some(actor) = actor {
                record = record.with_actor(actor.clone());
            }
            self.record(project_id, record);
            from = *to;
        }
    }

    /// Full history for a project, oldest first.
    pub fn history(&self, project_id: &ProjectId) -> Vec<TransitionRecord> {
        self.records
            .get(project_id)
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    pub fn len(&self, project_id: &ProjectId) -> usize {
        self.records.get(project_id).map(|r| r.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use WorkflowStatus::*;

    #[test]
    fn test_record_and_history() {
        let journal = TransitionJournal::new();
        let p = ProjectId::new("p-1");

        journal.record(
            &p,
            TransitionRecord::new(Draft, Submitted, "submission_created")
                .with_actor(UserId::new("fu-1")),
        );

        let history = journal.history(&p);
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].to, Submitted);
        assert_eq!(history[0].actor, Some(UserId::new("fu-1")));
    }

    #[test]
    fn test_record_path_chains_statuses() {
        let journal = TransitionJournal::new();
        let p = ProjectId::new("p-1");

        journal.record_path(
            &p,
            CompiledForSecretariat,
            &[SecretariatApproved, ValidatedBySecretariat, Ongoing],
            "secretariat_validated",
            None,
        );

        let history = journal.history(&p);
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].from, CompiledForSecretariat);
        assert_eq!(history[1].from, SecretariatApproved);
        assert_eq!(history[2].to, Ongoing);
    }

    #[test]
    fn test_unknown_project_has_empty_history() {
        let journal = TransitionJournal::new();
        assert!(journal.history(&ProjectId::new("nope")).is_empty());
        assert_eq!(journal.len(&ProjectId::new("nope")), 0);
    }
}
