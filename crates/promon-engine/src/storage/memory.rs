//! In-memory implementation of the storage trait
//!
//! Suitable for tests and embedded use. Atomicity of `commit` relies on
//! the service's per-project critical section: within it this backend
//! is the only writer for the affected project, so the three map writes
//! cannot interleave with a competing commit. Persistent backends
//! should map `commit` onto a real transaction.

use crate::storage::traits::{ProgressStore, StateCommit};
use async_trait::async_trait;
use dashmap::DashMap;
use promon_types::{
    Milestone, Project, ProjectId, Result, SubmissionId, SubmissionRecord,
};

/// In-memory progress store
#[derive(Default)]
pub struct MemoryStore {
    projects: DashMap<ProjectId, Project>,
    milestones: DashMap<ProjectId, Vec<Milestone>>,
    submissions: DashMap<SubmissionId, SubmissionRecord>,
    by_project: DashMap<ProjectId, Vec<SubmissionId>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProgressStore for MemoryStore {
    async fn insert_project(&self, project: Project) -> Result<()> {
        self.projects.insert(project.id.clone(), project);
        Ok(())
    }

    async fn project(&self, id: &ProjectId) -> Result<Option<Project>> {
        Ok(self.projects.get(id).map(|p| p.clone()))
    }

    async fn projects(&self) -> Result<Vec<Project>> {
        Ok(self.projects.iter().map(|p| p.value().clone()).collect())
    }

    async fn milestones(&self, project_id: &ProjectId) -> Result<Vec<Milestone>> {
        let mut set = self
            .milestones
            .get(project_id)
            .map(|m| m.clone())
            .unwrap_or_default();
        set.sort_by_key(|m| m.order);
        Ok(set)
    }

    async fn submission(&self, id: &SubmissionId) -> Result<Option<SubmissionRecord>> {
        Ok(self.submissions.get(id).map(|s| s.clone()))
    }

    async fn submissions_for(&self, project_id: &ProjectId) -> Result<Vec<SubmissionRecord>> {
        let ids = self
            .by_project
            .get(project_id)
            .map(|v| v.clone())
            .unwrap_or_default();
        let mut records: Vec<SubmissionRecord> = ids
            .iter()
            .filter_map(|id| self.submissions.get(id).map(|s| s.clone()))
            .collect();
        records.sort_by_key(|s| s.submitted_at);
        Ok(records)
    }

    async fn in_flight_submission(
        &self,
        project_id: &ProjectId,
    ) -> Result<Option<SubmissionRecord>> {
        Ok(self
            .submissions_for(project_id)
            .await?
            .into_iter()
            .find(|s| s.status.is_in_flight()))
    }

    async fn commit(&self, commit: StateCommit) -> Result<()> {
        if let Some((project_id, set)) = commit.milestones {
            self.milestones.insert(project_id, set);
        }
        if let Some(submission) = commit.submission {
            let mut ids = self.by_project.entry(submission.project_id.clone()).or_default();
            if !ids.contains(&submission.id) {
                ids.push(submission.id.clone());
            }
            drop(ids);
            self.submissions.insert(submission.id.clone(), submission);
        }
        if let Some(project) = commit.project {
            self.projects.insert(project.id.clone(), project);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use promon_types::{MilestoneSpec, NewProject, UserId};

    fn project() -> Project {
        Project::new(NewProject::new(
            "C-1",
            "Road widening",
            UserId::new("io"),
            UserId::new("fu"),
        ))
    }

    #[tokio::test]
    async fn test_milestones_come_back_ordered() {
        let store = MemoryStore::new();
        let p = project();
        store.insert_project(p.clone()).await.unwrap();

        let due = NaiveDate::from_ymd_opt(2026, 6, 1).unwrap();
        let set = vec![
            Milestone::from_spec(p.id.clone(), MilestoneSpec::new("b", 50.0, 2, due)),
            Milestone::from_spec(p.id.clone(), MilestoneSpec::new("a", 50.0, 1, due)),
        ];
        store
            .commit(StateCommit::new().with_milestones(p.id.clone(), set))
            .await
            .unwrap();

        let loaded = store.milestones(&p.id).await.unwrap();
        assert_eq!(loaded[0].title, "a");
        assert_eq!(loaded[1].title, "b");
    }

    #[tokio::test]
    async fn test_in_flight_lookup() {
        let store = MemoryStore::new();
        let p = project();
        store.insert_project(p.clone()).await.unwrap();
        assert!(store.in_flight_submission(&p.id).await.unwrap().is_none());

        let record = SubmissionRecord::new(p.id.clone(), UserId::new("fu"), vec![], vec![], 10.0);
        let id = record.id.clone();
        store
            .commit(StateCommit::new().with_submission(record))
            .await
            .unwrap();

        let found = store.in_flight_submission(&p.id).await.unwrap().unwrap();
        assert_eq!(found.id, id);
    }

    #[tokio::test]
    async fn test_commit_updates_existing_submission_without_duplicating() {
        let store = MemoryStore::new();
        let p = project();
        store.insert_project(p.clone()).await.unwrap();

        let mut record =
            SubmissionRecord::new(p.id.clone(), UserId::new("fu"), vec![], vec![], 10.0);
        store
            .commit(StateCommit::new().with_submission(record.clone()))
            .await
            .unwrap();

        record.mark_rejected(
            promon_types::ReviewNote::new(UserId::new("io"), None),
            promon_types::ActorRole::ImplementingOffice,
        );
        store
            .commit(StateCommit::new().with_submission(record.clone()))
            .await
            .unwrap();

        let all = store.submissions_for(&p.id).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].status, promon_types::SubmissionStatus::Rejected);
        assert!(store.in_flight_submission(&p.id).await.unwrap().is_none());
    }
}
