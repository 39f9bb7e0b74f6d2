//! Progress service: the engine facade
//!
//! One entry point per operation contract. Every mutating operation
//! acquires the project's exclusive lock and runs the whole
//! {validate → apply → aggregate → transition → commit} sequence inside
//! it, then fires notifications outside the persistence path. The
//! commit is a single `StateCommit`: milestone state, submission
//! status, and project fields land together or not at all.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::aggregator::{round2, ProgressAggregator};
use crate::directory::UserDirectory;
use crate::dispatch::{NotificationDispatcher, RecipientResolver};
use crate::journal::{TransitionJournal, TransitionRecord};
use crate::ledger::{MilestoneLedger, WEIGHT_TOLERANCE};
use crate::state_machine::{WorkflowEvent, WorkflowStateMachine};
use crate::storage::{ProgressStore, StateCommit};
use promon_types::{
    ActorRole, Division, DivisionReview, DivisionVerdict, EngineError, Milestone, MilestoneDelta,
    MilestoneSpec, MilestoneStatus, NewProject, NotificationIntent, ProgressSummary, Project,
    ProjectId, ReconciliationReport, Result, ReviewNote, SubmissionId, SubmissionRecord,
    SubmissionStatus, UserId, WorkflowStatus,
};

/// Engine configuration
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Tolerance on the weights-sum-to-100 invariant and on the
    /// applied-weight completion guard
    pub weight_tolerance: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            weight_tolerance: WEIGHT_TOLERANCE,
        }
    }
}

/// Implementing-office review input
#[derive(Clone, Debug)]
pub struct OfficeReview {
    pub approve: bool,
    /// Override of the claimed overall progress, if the reviewer
    /// adjusts the field unit's numbers
    pub adjusted_progress: Option<f64>,
    pub remarks: Option<String>,
}

impl OfficeReview {
    pub fn approval() -> Self {
        Self {
            approve: true,
            adjusted_progress: None,
            remarks: None,
        }
    }

    pub fn rejection() -> Self {
        Self {
            approve: false,
            adjusted_progress: None,
            remarks: None,
        }
    }

    pub fn with_adjusted_progress(mut self, progress: f64) -> Self {
        self.adjusted_progress = Some(progress);
        self
    }

    pub fn with_remarks(mut self, remarks: impl Into<String>) -> Self {
        self.remarks = Some(remarks.into());
        self
    }
}

/// The milestone-weighted progress engine
pub struct ProgressService {
    store: Arc<dyn ProgressStore>,
    dispatcher: Arc<dyn NotificationDispatcher>,
    resolver: RecipientResolver,
    aggregator: ProgressAggregator,
    ledger: MilestoneLedger,
    machine: WorkflowStateMachine,
    journal: TransitionJournal,
    locks: DashMap<ProjectId, Arc<Mutex<()>>>,
}

impl ProgressService {
    pub fn new(
        store: Arc<dyn ProgressStore>,
        directory: Arc<dyn UserDirectory>,
        dispatcher: Arc<dyn NotificationDispatcher>,
    ) -> Self {
        Self::with_config(EngineConfig::default(), store, directory, dispatcher)
    }

    pub fn with_config(
        config: EngineConfig,
        store: Arc<dyn ProgressStore>,
        directory: Arc<dyn UserDirectory>,
        dispatcher: Arc<dyn NotificationDispatcher>,
    ) -> Self {
        Self {
            ledger: MilestoneLedger::new(store.clone(), config.weight_tolerance),
            machine: WorkflowStateMachine::new(config.weight_tolerance),
            resolver: RecipientResolver::new(directory),
            aggregator: ProgressAggregator::new(),
            journal: TransitionJournal::new(),
            locks: DashMap::new(),
            store,
            dispatcher,
        }
    }

    // ── Operations ───────────────────────────────────────────────────

    /// Register a draft project.
    pub async fn register_project(&self, new: NewProject) -> Result<Project> {
        let project = Project::new(new);
        info!(project = %project.id, code = %project.code, "project registered");
        self.store.insert_project(project.clone()).await?;
        Ok(project)
    }

    /// Replace or initialize the project's milestone set.
    ///
    /// Refused while a review is in flight — a submission always
    /// snapshots the full set it was made against. Progress fields are
    /// untouched; they are recomputed by the workflow.
    pub async fn define_milestones(
        &self,
        project_id: &ProjectId,
        specs: Vec<MilestoneSpec>,
    ) -> Result<Project> {
        let _guard = self.lock_project(project_id).await;
        let project = self.require_project(project_id).await?;

        if project.workflow_status.has_review_in_flight() || project.workflow_status.is_terminal()
        {
            return Err(EngineError::InvalidTransition {
                status: project.workflow_status,
                event: "define_milestones".to_string(),
            });
        }

        let set = self.ledger.build_set(project_id, specs)?;
        self.store
            .commit(StateCommit::new().with_milestones(project_id.clone(), set))
            .await?;
        info!(project = %project_id, "milestone set defined");
        Ok(project)
    }

    /// Open a field-unit submission against the current milestone set.
    pub async fn submit_update(
        &self,
        project_id: &ProjectId,
        submitter: &UserId,
        deltas: Vec<MilestoneDelta>,
    ) -> Result<SubmissionRecord> {
        let _guard = self.lock_project(project_id).await;
        let mut project = self.require_project(project_id).await?;

        if !project.workflow_status.accepts_submissions() {
            return Err(EngineError::InvalidTransition {
                status: project.workflow_status,
                event: WorkflowEvent::SubmissionCreated.tag().to_string(),
            });
        }
        if let Some(existing) = self.store.in_flight_submission(project_id).await? {
            return Err(EngineError::ConcurrentSubmissionExists(existing.id));
        }

        let milestones = self.ledger.get_milestones(project_id).await?;
        self.ledger.validate_weights(&milestones)?;
        for delta in &deltas {
            MilestoneLedger::validate_delta(&milestones, delta)?;
        }

        let projected = self.aggregator.apply_deltas(&milestones, &deltas);
        let claimed = self.aggregator.summarize_snapshot(&projected).overall;
        let snapshot = milestones.iter().map(Milestone::snapshot).collect();

        let mut record = SubmissionRecord::new(
            project_id.clone(),
            submitter.clone(),
            snapshot,
            deltas,
            claimed,
        );

        // A resubmission after a secretariat rejection inherits the
        // divisions already approved in that cycle.
        if let Some(last) = self.store.submissions_for(project_id).await?.pop() {
            if last.status == SubmissionStatus::Rejected {
                record = record.with_carried_reviews(last.division_reviews);
            }
        }

        let event = WorkflowEvent::SubmissionCreated;
        let start = project.workflow_status;
        let path = self.machine.advance(start, &event)?;
        project.workflow_status = path.last().copied().unwrap_or(start);
        self.journal
            .record_path(project_id, start, &path, event.tag(), Some(submitter));

        self.store
            .commit(
                StateCommit::new()
                    .with_project(project.clone())
                    .with_submission(record.clone()),
            )
            .await?;

        info!(
            project = %project_id,
            submission = %record.id,
            claimed = record.claimed_progress,
            "submission created"
        );
        self.notify(self.resolver.submission_received(&project, &record).await)
            .await;
        Ok(record)
    }

    /// First review gate: the implementing office approves (optionally
    /// adjusting the claim) or returns the submission.
    pub async fn review_as_implementing_office(
        &self,
        submission_id: &SubmissionId,
        reviewer: &UserId,
        review: OfficeReview,
    ) -> Result<Project> {
        let project_id = self.require_submission(submission_id).await?.project_id;
        let _guard = self.lock_project(&project_id).await;

        // Reload under the lock; the record may have been resolved by a
        // racing reviewer.
        let mut submission = self.require_submission(submission_id).await?;
        let mut project = self.require_project(&project_id).await?;

        if submission.status != SubmissionStatus::Submitted {
            return Err(EngineError::SubmissionNotReviewable {
                submission: submission.id.clone(),
                status: submission.status.to_string(),
            });
        }

        let milestones = self.ledger.get_milestones(&project_id).await?;
        let note = ReviewNote::new(reviewer.clone(), review.remarks.clone());
        let start = project.workflow_status;

        if review.approve {
            let adjusted = round2(
                review
                    .adjusted_progress
                    .unwrap_or(submission.claimed_progress)
                    .clamp(0.0, 100.0),
            );
            submission.mark_office_approved(note, adjusted);

            let event = WorkflowEvent::ImplementingOfficeApproved;
            let path = self.machine.advance(start, &event)?;
            project.workflow_status = path.last().copied().unwrap_or(start);
            // Provisional view ahead of the secretariat verdict; the
            // committed ledger is untouched until validation.
            project.apply_progress(&self.aggregator.from_applied(adjusted));
            self.journal
                .record_path(&project_id, start, &path, event.tag(), Some(reviewer));

            self.store
                .commit(
                    StateCommit::new()
                        .with_project(project.clone())
                        .with_submission(submission.clone()),
                )
                .await?;

            info!(
                project = %project_id,
                submission = %submission.id,
                adjusted,
                "submission compiled for secretariat"
            );
            self.notify(
                self.resolver
                    .compiled_for_secretariat(&project, &submission)
                    .await,
            )
            .await;
        } else {
            submission.mark_rejected(note, ActorRole::ImplementingOffice);

            let work_started = milestones
                .iter()
                .any(|m| m.status != MilestoneStatus::Pending);
            let event = WorkflowEvent::ImplementingOfficeRejected { work_started };
            let path = self.machine.advance(start, &event)?;
            project.workflow_status = path.last().copied().unwrap_or(start);
            // Progress fields fall back to the committed ledger.
            project.apply_progress(&self.aggregator.summarize(&milestones));
            self.journal
                .record_path(&project_id, start, &path, event.tag(), Some(reviewer));

            self.store
                .commit(
                    StateCommit::new()
                        .with_project(project.clone())
                        .with_submission(submission.clone()),
                )
                .await?;

            info!(
                project = %project_id,
                submission = %submission.id,
                "submission returned by implementing office"
            );
            self.notify(self.resolver.office_rejected(&project, &submission).await)
                .await;
        }

        Ok(project)
    }

    /// Final review gate: the secretariat rules per division. Every
    /// division without a carried approval needs a verdict. Any
    /// rejection returns the whole submission; approvals already issued
    /// are retained for the next cycle.
    pub async fn review_as_secretariat(
        &self,
        submission_id: &SubmissionId,
        reviewer: &UserId,
        verdicts: BTreeMap<Division, DivisionVerdict>,
        remarks: Option<String>,
    ) -> Result<Project> {
        let project_id = self.require_submission(submission_id).await?.project_id;
        let _guard = self.lock_project(&project_id).await;

        let mut submission = self.require_submission(submission_id).await?;
        let mut project = self.require_project(&project_id).await?;

        if submission.status != SubmissionStatus::ImplementingOfficeApproved {
            return Err(EngineError::SubmissionNotReviewable {
                submission: submission.id.clone(),
                status: submission.status.to_string(),
            });
        }

        let open = submission.open_divisions();
        let missing: Vec<String> = open
            .iter()
            .filter(|d| !verdicts.contains_key(*d))
            .map(|d| d.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(EngineError::IncompleteVerdicts {
                missing: missing.join(", "),
            });
        }

        // Each approved division records its computed contribution at
        // verdict time (the equal split of the adjusted overall).
        let division_value = round2((submission.effective_progress() / 3.0).clamp(0.0, 100.0));
        for (division, verdict) in &verdicts {
            submission.division_reviews.insert(
                *division,
                DivisionReview {
                    verdict: *verdict,
                    progress: match verdict {
                        DivisionVerdict::Approved => division_value,
                        DivisionVerdict::Rejected => 0.0,
                    },
                    remarks: None,
                    carried_forward: false,
                },
            );
        }

        let note = ReviewNote::new(reviewer.clone(), remarks);
        let mut milestones = self.ledger.get_milestones(&project_id).await?;
        let start = project.workflow_status;

        if submission.all_divisions_approved() {
            // Validation commits the deltas to the ledger.
            let deltas = submission.deltas.clone();
            for delta in &deltas {
                MilestoneLedger::apply_delta(&mut milestones, delta)?;
            }
            let committed = self.aggregator.summarize(&milestones);
            let applied = self.aggregator.applied_weight(&milestones);
            let work_started = milestones
                .iter()
                .any(|m| m.status != MilestoneStatus::Pending);

            submission.mark_validated(note, committed.overall);

            let event = WorkflowEvent::SecretariatValidated {
                applied_weight: applied,
                work_started,
            };
            let path = self.machine.advance(start, &event)?;
            project.workflow_status = path.last().copied().unwrap_or(start);
            project.apply_progress(&committed);
            self.journal
                .record_path(&project_id, start, &path, event.tag(), Some(reviewer));

            self.store
                .commit(
                    StateCommit::new()
                        .with_project(project.clone())
                        .with_milestones(project_id.clone(), milestones)
                        .with_submission(submission.clone()),
                )
                .await?;

            info!(
                project = %project_id,
                submission = %submission.id,
                overall = committed.overall,
                "submission validated by secretariat"
            );
            self.notify(
                self.resolver
                    .verdict_issued(&project, &submission, false)
                    .await,
            )
            .await;
            if project.workflow_status == WorkflowStatus::Completed {
                self.notify(self.resolver.project_completed(&project).await)
                    .await;
            }
        } else {
            submission.mark_rejected(note, ActorRole::Secretariat);

            let event = WorkflowEvent::SecretariatRejected;
            let path = self.machine.advance(start, &event)?;
            project.workflow_status = path.last().copied().unwrap_or(start);
            // The proposed contribution is subtracted: fields return to
            // the committed ledger values.
            project.apply_progress(&self.aggregator.summarize(&milestones));
            self.journal
                .record_path(&project_id, start, &path, event.tag(), Some(reviewer));

            self.store
                .commit(
                    StateCommit::new()
                        .with_project(project.clone())
                        .with_submission(submission.clone()),
                )
                .await?;

            info!(
                project = %project_id,
                submission = %submission.id,
                rejected = ?submission.rejected_divisions(),
                "submission rejected by secretariat"
            );
            self.notify(
                self.resolver
                    .verdict_issued(&project, &submission, true)
                    .await,
            )
            .await;
        }

        Ok(project)
    }

    // ── Reads ────────────────────────────────────────────────────────

    /// Current derived progress. Idempotent: identical values until the
    /// next committed mutation.
    pub async fn project_progress(&self, project_id: &ProjectId) -> Result<ProgressSummary> {
        Ok(self.require_project(project_id).await?.progress_summary())
    }

    /// The project's committed milestone set, ordered.
    pub async fn milestones(&self, project_id: &ProjectId) -> Result<Vec<Milestone>> {
        self.require_project(project_id).await?;
        self.ledger.get_milestones(project_id).await
    }

    /// Recompute expected progress from the committed ledger and report
    /// drift against the stored fields.
    pub async fn reconcile(&self, project_id: &ProjectId) -> Result<ReconciliationReport> {
        let project = self.require_project(project_id).await?;
        let milestones = self.ledger.get_milestones(project_id).await?;
        let report = self.aggregator.reconcile(&project, &milestones);
        if !report.is_consistent() {
            warn!(
                project = %project_id,
                stored = report.stored.overall,
                expected = report.expected.overall,
                "stored progress drifts from ledger"
            );
        } else {
            debug!(project = %project_id, "progress consistent with ledger");
        }
        Ok(report)
    }

    /// Milestones past their due date and not yet delivered, as of the
    /// given date. Emits one overdue intent per milestone to the field
    /// unit.
    pub async fn scan_overdue(
        &self,
        project_id: &ProjectId,
        as_of: NaiveDate,
    ) -> Result<Vec<Milestone>> {
        let project = self.require_project(project_id).await?;
        let overdue: Vec<Milestone> = self
            .ledger
            .get_milestones(project_id)
            .await?
            .into_iter()
            .filter(|m| m.is_overdue(as_of))
            .collect();

        for milestone in &overdue {
            self.notify(self.resolver.milestone_overdue(&project, milestone).await)
                .await;
        }
        Ok(overdue)
    }

    /// Workflow transition history, oldest first.
    pub fn history(&self, project_id: &ProjectId) -> Vec<TransitionRecord> {
        self.journal.history(project_id)
    }

    // ── Internal helpers ─────────────────────────────────────────────

    async fn lock_project(&self, project_id: &ProjectId) -> tokio::sync::OwnedMutexGuard<()> {
        let lock = self
            .locks
            .entry(project_id.clone())
            .or_default()
            .clone();
        lock.lock_owned().await
    }

    async fn require_project(&self, project_id: &ProjectId) -> Result<Project> {
        self.store
            .project(project_id)
            .await?
            .ok_or_else(|| EngineError::ProjectNotFound(project_id.clone()))
    }

    async fn require_submission(&self, submission_id: &SubmissionId) -> Result<SubmissionRecord> {
        self.store
            .submission(submission_id)
            .await?
            .ok_or_else(|| EngineError::SubmissionNotFound(submission_id.clone()))
    }

    /// Fire intents without letting delivery problems touch the
    /// workflow outcome.
    async fn notify(&self, intents: Result<Vec<NotificationIntent>>) {
        match intents {
            Ok(intents) if !intents.is_empty() => {
                if let Err(err) = self.dispatcher.dispatch(&intents).await {
                    warn!(error = %err, "notification dispatch failed; transition unaffected");
                }
            }
            Ok(_) => {}
            Err(err) => {
                warn!(error = %err, "recipient resolution failed; transition unaffected");
            }
        }
    }
}
