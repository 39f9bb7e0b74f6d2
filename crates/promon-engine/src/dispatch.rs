//! Notification dispatch contract and recipient resolution
//!
//! The engine resolves one responsible party per workflow edge, builds
//! deduplicated `NotificationIntent`s, and hands them to a dispatcher.
//! Everything past that point (message construction, delivery,
//! persistence) is external. Dispatch is fire-and-forget relative to
//! the workflow: a failed dispatch never rolls back a transition.

use crate::directory::UserDirectory;
use async_trait::async_trait;
use promon_types::{
    Milestone, NotificationCategory, NotificationIntent, Project, Result, SubmissionRecord,
    UserId,
};
use std::collections::BTreeSet;
use std::sync::Arc;

/// A delivery-layer failure; logged by the engine, never propagated
/// into workflow results.
#[derive(Debug, thiserror::Error)]
#[error("notification dispatch failed: {0}")]
pub struct DispatchError(pub String);

/// Trait for notification delivery backends.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn dispatch(&self, intents: &[NotificationIntent]) -> std::result::Result<(), DispatchError>;
}

/// Dispatcher that drops everything (embedding without notifications)
#[derive(Default)]
pub struct NullDispatcher;

#[async_trait]
impl NotificationDispatcher for NullDispatcher {
    async fn dispatch(&self, _intents: &[NotificationIntent]) -> std::result::Result<(), DispatchError> {
        Ok(())
    }
}

/// Dispatcher that records intents; used in tests and as a buffer for
/// polling delivery layers
#[derive(Default)]
pub struct RecordingDispatcher {
    sent: tokio::sync::Mutex<Vec<NotificationIntent>>,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn sent(&self) -> Vec<NotificationIntent> {
        self.sent.lock().await.clone()
    }

    pub async fn drain(&self) -> Vec<NotificationIntent> {
        std::mem::take(&mut *self.sent.lock().await)
    }
}

#[async_trait]
impl NotificationDispatcher for RecordingDispatcher {
    async fn dispatch(&self, intents: &[NotificationIntent]) -> std::result::Result<(), DispatchError> {
        self.sent.lock().await.extend_from_slice(intents);
        Ok(())
    }
}

/// Resolves the responsible parties for each workflow edge
pub struct RecipientResolver {
    directory: Arc<dyn UserDirectory>,
}

impl RecipientResolver {
    pub fn new(directory: Arc<dyn UserDirectory>) -> Self {
        Self { directory }
    }

    /// A field-unit submission landed: the assigned implementing office
    /// must review it.
    pub async fn submission_received(
        &self,
        project: &Project,
        submission: &SubmissionRecord,
    ) -> Result<Vec<NotificationIntent>> {
        let mut intents = Vec::new();
        if self.directory.is_active(&project.implementing_office).await? {
            intents.push(
                NotificationIntent::new(
                    project.implementing_office.clone(),
                    NotificationCategory::SubmissionReceived,
                    project.id.clone(),
                    format!("New milestone submission for \"{}\"", project.name),
                )
                .with_submission(submission.id.clone()),
            );
        } else {
            tracing::warn!(
                project = %project.id,
                user = %project.implementing_office,
                "implementing office inactive; submission notice dropped"
            );
        }
        Ok(intents)
    }

    /// The implementing office compiled a submission: the secretariat
    /// pool must issue verdicts.
    pub async fn compiled_for_secretariat(
        &self,
        project: &Project,
        submission: &SubmissionRecord,
    ) -> Result<Vec<NotificationIntent>> {
        let pool = self.directory.secretariat_pool().await?;
        let recipients: BTreeSet<UserId> = pool.into_iter().collect();
        Ok(recipients
            .into_iter()
            .map(|user| {
                NotificationIntent::new(
                    user,
                    NotificationCategory::CompiledForSecretariat,
                    project.id.clone(),
                    format!("\"{}\" compiled and awaiting verdict", project.name),
                )
                .with_submission(submission.id.clone())
            })
            .collect())
    }

    /// The secretariat ruled. The field unit hears the outcome (as a
    /// revision request when anything was rejected); the implementing
    /// office always hears the verdict.
    pub async fn verdict_issued(
        &self,
        project: &Project,
        submission: &SubmissionRecord,
        any_rejected: bool,
    ) -> Result<Vec<NotificationIntent>> {
        let mut intents = Vec::new();

        let field_category = if any_rejected {
            NotificationCategory::RevisionRequested
        } else {
            NotificationCategory::VerdictIssued
        };
        let field_summary = if any_rejected {
            format!(
                "Revision requested on \"{}\": resubmit the rejected divisions",
                project.name
            )
        } else {
            format!("Submission for \"{}\" fully validated", project.name)
        };
        intents.push(
            NotificationIntent::new(
                project.field_unit.clone(),
                field_category,
                project.id.clone(),
                field_summary,
            )
            .with_submission(submission.id.clone()),
        );

        if project.implementing_office != project.field_unit {
            intents.push(
                NotificationIntent::new(
                    project.implementing_office.clone(),
                    NotificationCategory::VerdictIssued,
                    project.id.clone(),
                    format!("Secretariat verdict issued for \"{}\"", project.name),
                )
                .with_submission(submission.id.clone()),
            );
        }

        Ok(intents)
    }

    /// The implementing office returned a submission at the first gate:
    /// the field unit must correct and resubmit.
    pub async fn office_rejected(
        &self,
        project: &Project,
        submission: &SubmissionRecord,
    ) -> Result<Vec<NotificationIntent>> {
        Ok(vec![NotificationIntent::new(
            project.field_unit.clone(),
            NotificationCategory::RevisionRequested,
            project.id.clone(),
            format!(
                "Implementing office returned the submission for \"{}\"",
                project.name
            ),
        )
        .with_submission(submission.id.clone())])
    }

    /// Every milestone weight applied: broad broadcast.
    pub async fn project_completed(&self, project: &Project) -> Result<Vec<NotificationIntent>> {
        let mut recipients: BTreeSet<UserId> = BTreeSet::new();
        recipients.insert(project.field_unit.clone());
        recipients.insert(project.implementing_office.clone());
        recipients.extend(self.directory.secretariat_pool().await?);
        recipients.extend(self.directory.broadcast_pool().await?);

        Ok(recipients
            .into_iter()
            .map(|user| {
                NotificationIntent::new(
                    user,
                    NotificationCategory::ProjectCompleted,
                    project.id.clone(),
                    format!("Project \"{}\" completed", project.name),
                )
            })
            .collect())
    }

    /// A milestone passed its due date undelivered: the field unit must
    /// submit an update.
    pub async fn milestone_overdue(
        &self,
        project: &Project,
        milestone: &Milestone,
    ) -> Result<Vec<NotificationIntent>> {
        Ok(vec![NotificationIntent::new(
            project.field_unit.clone(),
            NotificationCategory::MilestoneOverdue,
            project.id.clone(),
            format!(
                "Milestone \"{}\" in \"{}\" is overdue",
                milestone.title, project.name
            ),
        )
        .with_milestone(milestone.id.clone())])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::StaticDirectory;
    use promon_types::NewProject;

    fn project() -> Project {
        Project::new(NewProject::new(
            "C-9",
            "Health station",
            UserId::new("io-1"),
            UserId::new("fu-1"),
        ))
    }

    fn submission(p: &Project) -> SubmissionRecord {
        SubmissionRecord::new(p.id.clone(), p.field_unit.clone(), vec![], vec![], 10.0)
    }

    fn resolver(dir: StaticDirectory) -> RecipientResolver {
        RecipientResolver::new(Arc::new(dir))
    }

    #[tokio::test]
    async fn test_submission_notice_targets_assigned_office() {
        let r = resolver(StaticDirectory::new().with_user(UserId::new("io-1")));
        let p = project();
        let intents = r.submission_received(&p, &submission(&p)).await.unwrap();
        assert_eq!(intents.len(), 1);
        assert_eq!(intents[0].recipient, UserId::new("io-1"));
        assert_eq!(
            intents[0].category,
            NotificationCategory::SubmissionReceived
        );
    }

    #[tokio::test]
    async fn test_inactive_office_drops_notice() {
        let r = resolver(StaticDirectory::new().with_inactive_user(UserId::new("io-1")));
        let p = project();
        let intents = r.submission_received(&p, &submission(&p)).await.unwrap();
        assert!(intents.is_empty());
    }

    #[tokio::test]
    async fn test_compiled_goes_to_whole_pool_deduplicated() {
        let r = resolver(
            StaticDirectory::new()
                .with_secretariat(UserId::new("sec-1"))
                .with_secretariat(UserId::new("sec-2"))
                .with_secretariat(UserId::new("sec-1")),
        );
        let p = project();
        let intents = r.compiled_for_secretariat(&p, &submission(&p)).await.unwrap();
        assert_eq!(intents.len(), 2);
    }

    #[tokio::test]
    async fn test_rejection_flags_revision_for_field_unit() {
        let r = resolver(StaticDirectory::new());
        let p = project();
        let intents = r.verdict_issued(&p, &submission(&p), true).await.unwrap();
        assert_eq!(intents.len(), 2);
        assert_eq!(intents[0].recipient, UserId::new("fu-1"));
        assert_eq!(
            intents[0].category,
            NotificationCategory::RevisionRequested
        );
        assert_eq!(intents[1].category, NotificationCategory::VerdictIssued);
    }

    #[tokio::test]
    async fn test_completion_broadcast_is_deduplicated() {
        let r = resolver(
            StaticDirectory::new()
                .with_secretariat(UserId::new("sec-1"))
                .with_broadcast_member(UserId::new("exec-1"))
                // field unit also sits in the broadcast pool
                .with_broadcast_member(UserId::new("fu-1")),
        );
        let p = project();
        let intents = r.project_completed(&p).await.unwrap();
        // fu-1, io-1, sec-1, exec-1 — fu-1 only once
        assert_eq!(intents.len(), 4);
        let recipients: Vec<&UserId> = intents.iter().map(|i| &i.recipient).collect();
        assert_eq!(
            recipients.iter().filter(|u| ***u == UserId::new("fu-1")).count(),
            1
        );
    }
}
