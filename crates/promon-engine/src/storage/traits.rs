//! Storage trait definition.
//!
//! One trait covers all engine persistence. Reads are plain lookups;
//! every write goes through `commit`, which must land the whole
//! `StateCommit` atomically — milestone state, submission status, and
//! project fields never desynchronize, whatever the backend.

use async_trait::async_trait;
use promon_types::{
    Milestone, Project, ProjectId, Result, SubmissionId, SubmissionRecord,
};

/// The unit of persistence: everything a workflow step changed
#[derive(Clone, Debug, Default)]
pub struct StateCommit {
    pub project: Option<Project>,
    /// Full replacement of the project's milestone set
    pub milestones: Option<(ProjectId, Vec<Milestone>)>,
    pub submission: Option<SubmissionRecord>,
}

impl StateCommit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_project(mut self, project: Project) -> Self {
        self.project = Some(project);
        self
    }

    pub fn with_milestones(mut self, project_id: ProjectId, milestones: Vec<Milestone>) -> Self {
        self.milestones = Some((project_id, milestones));
        self
    }

    pub fn with_submission(mut self, submission: SubmissionRecord) -> Self {
        self.submission = Some(submission);
        self
    }
}

/// Trait for engine persistence backends.
#[async_trait]
pub trait ProgressStore: Send + Sync {
    /// Register a new project.
    async fn insert_project(&self, project: Project) -> Result<()>;

    /// Load a project by id.
    async fn project(&self, id: &ProjectId) -> Result<Option<Project>>;

    /// All projects, unordered.
    async fn projects(&self) -> Result<Vec<Project>>;

    /// The project's milestone set, ordered by `order`.
    async fn milestones(&self, project_id: &ProjectId) -> Result<Vec<Milestone>>;

    /// Load a submission by id.
    async fn submission(&self, id: &SubmissionId) -> Result<Option<SubmissionRecord>>;

    /// All submissions for a project, oldest first.
    async fn submissions_for(&self, project_id: &ProjectId) -> Result<Vec<SubmissionRecord>>;

    /// The submission currently blocking new ones, if any.
    async fn in_flight_submission(&self, project_id: &ProjectId)
        -> Result<Option<SubmissionRecord>>;

    /// Apply a commit set atomically.
    async fn commit(&self, commit: StateCommit) -> Result<()>;
}
