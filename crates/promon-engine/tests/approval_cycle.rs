//! End-to-end workflow tests against the in-memory backend:
//! submission, two-stage review, partial rejection with carry-forward,
//! and automatic completion.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use promon_engine::{
    MemoryStore, OfficeReview, ProgressService, RecordingDispatcher, StaticDirectory,
};
use promon_types::{
    Division, DivisionVerdict, EngineError, MilestoneDelta, MilestoneId, MilestoneSpec,
    MilestoneStatus, NewProject, NotificationCategory, Project, SubmissionRecord,
    SubmissionStatus, UserId, WorkflowStatus,
};

struct Harness {
    service: ProgressService,
    dispatcher: Arc<RecordingDispatcher>,
}

fn harness() -> Harness {
    let dispatcher = Arc::new(RecordingDispatcher::new());
    let directory = StaticDirectory::new()
        .with_user(UserId::new("io-1"))
        .with_user(UserId::new("fu-1"))
        .with_secretariat(UserId::new("sec-1"))
        .with_broadcast_member(UserId::new("exec-1"));
    let service = ProgressService::new(
        Arc::new(MemoryStore::new()),
        Arc::new(directory),
        dispatcher.clone(),
    );
    Harness {
        service,
        dispatcher,
    }
}

fn due(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

/// Register a project and define the canonical 40/35/25 milestone set.
async fn seeded_project(h: &Harness) -> Project {
    let project = h
        .service
        .register_project(NewProject::new(
            "INFRA-2026-014",
            "Drainage rehabilitation",
            UserId::new("io-1"),
            UserId::new("fu-1"),
        ))
        .await
        .unwrap();

    h.service
        .define_milestones(
            &project.id,
            vec![
                MilestoneSpec::new("Site preparation", 40.0, 1, due("2026-03-31")),
                MilestoneSpec::new("Civil works", 35.0, 2, due("2026-08-31")),
                MilestoneSpec::new("Handover", 25.0, 3, due("2026-11-30")),
            ],
        )
        .await
        .unwrap();

    project
}

async fn milestone_ids(h: &Harness, project: &Project) -> Vec<MilestoneId> {
    h.service
        .milestones(&project.id)
        .await
        .unwrap()
        .into_iter()
        .map(|m| m.id)
        .collect()
}

/// The standard first report: milestone 1 done, milestone 2 halfway.
async fn submit_standard(h: &Harness, project: &Project) -> SubmissionRecord {
    let ids = milestone_ids(h, project).await;
    h.service
        .submit_update(
            &project.id,
            &UserId::new("fu-1"),
            vec![
                MilestoneDelta::new(ids[0].clone(), MilestoneStatus::Completed, 0.0),
                MilestoneDelta::new(ids[1].clone(), MilestoneStatus::InProgress, 50.0),
            ],
        )
        .await
        .unwrap()
}

fn verdicts(entries: &[(Division, DivisionVerdict)]) -> BTreeMap<Division, DivisionVerdict> {
    entries.iter().copied().collect()
}

fn all_approved() -> BTreeMap<Division, DivisionVerdict> {
    verdicts(&[
        (Division::Timeline, DivisionVerdict::Approved),
        (Division::Budget, DivisionVerdict::Approved),
        (Division::Physical, DivisionVerdict::Approved),
    ])
}

#[tokio::test]
async fn full_cycle_reaches_ongoing_with_committed_progress() {
    let h = harness();
    let project = seeded_project(&h).await;

    assert_eq!(
        h.service.project_progress(&project.id).await.unwrap().overall,
        0.0
    );
    assert!(h.service.history(&project.id).is_empty());

    let submission = submit_standard(&h, &project).await;
    assert_eq!(submission.claimed_progress, 57.5);
    assert_eq!(submission.status, SubmissionStatus::Submitted);

    // Implementing office approves without adjustment.
    let project_after_io = h
        .service
        .review_as_implementing_office(
            &submission.id,
            &UserId::new("io-1"),
            OfficeReview::approval(),
        )
        .await
        .unwrap();
    assert_eq!(
        project_after_io.workflow_status,
        WorkflowStatus::CompiledForSecretariat
    );
    // Provisional fields reflect the adjusted claim.
    assert_eq!(project_after_io.overall_progress, 57.5);

    // Secretariat approves all three divisions.
    let validated = h
        .service
        .review_as_secretariat(
            &submission.id,
            &UserId::new("sec-1"),
            all_approved(),
            Some("verified on site".into()),
        )
        .await
        .unwrap();

    assert_eq!(validated.workflow_status, WorkflowStatus::Ongoing);
    assert_eq!(validated.overall_progress, 57.5);
    assert_eq!(validated.timeline_progress, 19.17);
    assert_eq!(validated.budget_progress, 19.17);
    assert_eq!(validated.physical_progress, 19.17);

    // The committed ledger carries the deltas now.
    let milestones = h.service.milestones(&project.id).await.unwrap();
    assert_eq!(milestones[0].status, MilestoneStatus::Completed);
    assert!(milestones[0].completed_at.is_some());
    assert_eq!(milestones[1].progress, 50.0);

    // Reads are idempotent and consistent with the ledger.
    let p1 = h.service.project_progress(&project.id).await.unwrap();
    let p2 = h.service.project_progress(&project.id).await.unwrap();
    assert_eq!(p1, p2);
    assert!(h.service.reconcile(&project.id).await.unwrap().is_consistent());

    // Draft -> Submitted, -> Compiled, then the three-step validation path.
    let history = h.service.history(&project.id);
    assert_eq!(history.len(), 5);
    assert_eq!(history[0].from, WorkflowStatus::Draft);
    assert_eq!(history[4].to, WorkflowStatus::Ongoing);

    // Notification chain: office, secretariat pool, then both parties.
    let sent = h.dispatcher.sent().await;
    let categories: Vec<NotificationCategory> = sent.iter().map(|i| i.category).collect();
    assert_eq!(
        categories,
        vec![
            NotificationCategory::SubmissionReceived,
            NotificationCategory::CompiledForSecretariat,
            NotificationCategory::VerdictIssued,
            NotificationCategory::VerdictIssued,
        ]
    );
    assert_eq!(sent[0].recipient, UserId::new("io-1"));
    assert_eq!(sent[1].recipient, UserId::new("sec-1"));
}

#[tokio::test]
async fn partial_rejection_returns_project_and_carries_approvals() {
    let h = harness();
    let project = seeded_project(&h).await;
    let submission = submit_standard(&h, &project).await;

    h.service
        .review_as_implementing_office(
            &submission.id,
            &UserId::new("io-1"),
            OfficeReview::approval(),
        )
        .await
        .unwrap();

    // Budget alone is rejected.
    let returned = h
        .service
        .review_as_secretariat(
            &submission.id,
            &UserId::new("sec-1"),
            verdicts(&[
                (Division::Timeline, DivisionVerdict::Approved),
                (Division::Budget, DivisionVerdict::Rejected),
                (Division::Physical, DivisionVerdict::Approved),
            ]),
            Some("budget breakdown missing".into()),
        )
        .await
        .unwrap();

    assert_eq!(returned.workflow_status, WorkflowStatus::Submitted);
    // Nothing was committed: the proposed contribution is subtracted.
    assert_eq!(returned.overall_progress, 0.0);
    let milestones = h.service.milestones(&project.id).await.unwrap();
    assert!(milestones
        .iter()
        .all(|m| m.status == MilestoneStatus::Pending));

    let sent = h.dispatcher.drain().await;
    let revision = sent
        .iter()
        .find(|i| i.category == NotificationCategory::RevisionRequested)
        .unwrap();
    assert_eq!(revision.recipient, UserId::new("fu-1"));

    // Resubmission inherits the two approvals; only budget is open.
    let resubmission = submit_standard(&h, &project).await;
    assert_eq!(resubmission.open_divisions(), vec![Division::Budget]);
    assert!(resubmission.division_reviews[&Division::Timeline].carried_forward);

    h.service
        .review_as_implementing_office(
            &resubmission.id,
            &UserId::new("io-1"),
            OfficeReview::approval(),
        )
        .await
        .unwrap();

    // Only the re-solicited division needs a verdict now.
    let validated = h
        .service
        .review_as_secretariat(
            &resubmission.id,
            &UserId::new("sec-1"),
            verdicts(&[(Division::Budget, DivisionVerdict::Approved)]),
            None,
        )
        .await
        .unwrap();

    assert_eq!(validated.workflow_status, WorkflowStatus::Ongoing);
    assert_eq!(validated.overall_progress, 57.5);
}

#[tokio::test]
async fn incomplete_verdicts_are_rejected() {
    let h = harness();
    let project = seeded_project(&h).await;
    let submission = submit_standard(&h, &project).await;
    h.service
        .review_as_implementing_office(
            &submission.id,
            &UserId::new("io-1"),
            OfficeReview::approval(),
        )
        .await
        .unwrap();

    let err = h
        .service
        .review_as_secretariat(
            &submission.id,
            &UserId::new("sec-1"),
            verdicts(&[(Division::Timeline, DivisionVerdict::Approved)]),
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::IncompleteVerdicts { .. }));
}

#[tokio::test]
async fn second_cycle_to_full_weight_completes_project() {
    let h = harness();
    let project = seeded_project(&h).await;

    // Cycle 1 commits 57.5.
    let s1 = submit_standard(&h, &project).await;
    h.service
        .review_as_implementing_office(&s1.id, &UserId::new("io-1"), OfficeReview::approval())
        .await
        .unwrap();
    h.service
        .review_as_secretariat(&s1.id, &UserId::new("sec-1"), all_approved(), None)
        .await
        .unwrap();
    h.dispatcher.drain().await;

    // Cycle 2 completes the remaining milestones.
    let ids = milestone_ids(&h, &project).await;
    let s2 = h
        .service
        .submit_update(
            &project.id,
            &UserId::new("fu-1"),
            vec![
                MilestoneDelta::new(ids[1].clone(), MilestoneStatus::Completed, 0.0),
                MilestoneDelta::new(ids[2].clone(), MilestoneStatus::Completed, 0.0)
                    .with_note("inspection passed"),
            ],
        )
        .await
        .unwrap();
    assert_eq!(s2.claimed_progress, 100.0);

    h.service
        .review_as_implementing_office(&s2.id, &UserId::new("io-1"), OfficeReview::approval())
        .await
        .unwrap();
    let completed = h
        .service
        .review_as_secretariat(&s2.id, &UserId::new("sec-1"), all_approved(), None)
        .await
        .unwrap();

    assert_eq!(completed.workflow_status, WorkflowStatus::Completed);
    assert_eq!(completed.overall_progress, 100.0);

    // Completion broadcast reaches every party once.
    let sent = h.dispatcher.sent().await;
    let broadcast: Vec<&UserId> = sent
        .iter()
        .filter(|i| i.category == NotificationCategory::ProjectCompleted)
        .map(|i| &i.recipient)
        .collect();
    assert_eq!(broadcast.len(), 4); // fu, io, sec, exec

    // Terminal: no further submissions.
    let err = h
        .service
        .submit_update(&project.id, &UserId::new("fu-1"), vec![])
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidTransition { .. }));
}

#[tokio::test]
async fn single_in_flight_submission_is_enforced() {
    let h = harness();
    let project = seeded_project(&h).await;
    let first = submit_standard(&h, &project).await;

    let ids = milestone_ids(&h, &project).await;
    let err = h
        .service
        .submit_update(
            &project.id,
            &UserId::new("fu-1"),
            vec![MilestoneDelta::new(
                ids[2].clone(),
                MilestoneStatus::InProgress,
                10.0,
            )],
        )
        .await
        .unwrap_err();

    match err {
        EngineError::ConcurrentSubmissionExists(id) => assert_eq!(id, first.id),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn office_adjustment_overrides_claim() {
    let h = harness();
    let project = seeded_project(&h).await;
    let submission = submit_standard(&h, &project).await;

    let adjusted = h
        .service
        .review_as_implementing_office(
            &submission.id,
            &UserId::new("io-1"),
            OfficeReview::approval()
                .with_adjusted_progress(50.0)
                .with_remarks("civil works closer to 30%"),
        )
        .await
        .unwrap();

    assert_eq!(adjusted.overall_progress, 50.0);
}

#[tokio::test]
async fn office_rejection_falls_back_to_draft() {
    let h = harness();
    let project = seeded_project(&h).await;
    let submission = submit_standard(&h, &project).await;

    let returned = h
        .service
        .review_as_implementing_office(
            &submission.id,
            &UserId::new("io-1"),
            OfficeReview::rejection().with_remarks("photos missing"),
        )
        .await
        .unwrap();

    assert_eq!(returned.workflow_status, WorkflowStatus::Draft);
    assert_eq!(returned.overall_progress, 0.0);

    // The record is terminal; reviewing it again is refused.
    let err = h
        .service
        .review_as_implementing_office(
            &submission.id,
            &UserId::new("io-1"),
            OfficeReview::approval(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::SubmissionNotReviewable { .. }));
}

#[tokio::test]
async fn secretariat_review_requires_office_approval_first() {
    let h = harness();
    let project = seeded_project(&h).await;
    let submission = submit_standard(&h, &project).await;

    let err = h
        .service
        .review_as_secretariat(&submission.id, &UserId::new("sec-1"), all_approved(), None)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::SubmissionNotReviewable { .. }));
}

#[tokio::test]
async fn invalid_weight_distribution_never_stores() {
    let h = harness();
    let project = h
        .service
        .register_project(NewProject::new(
            "INFRA-2026-015",
            "Water system",
            UserId::new("io-1"),
            UserId::new("fu-1"),
        ))
        .await
        .unwrap();

    let err = h
        .service
        .define_milestones(
            &project.id,
            vec![
                MilestoneSpec::new("Phase 1", 50.0, 1, due("2026-06-30")),
                MilestoneSpec::new("Phase 2", 50.02, 2, due("2026-12-31")),
            ],
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidWeightDistribution { .. }));

    // Nothing was stored; a submission finds no milestone set.
    let submit_err = h
        .service
        .submit_update(&project.id, &UserId::new("fu-1"), vec![])
        .await
        .unwrap_err();
    assert!(matches!(submit_err, EngineError::EmptyMilestoneSet));
}

#[tokio::test]
async fn regressing_a_committed_milestone_is_rejected() {
    let h = harness();
    let project = seeded_project(&h).await;

    let s1 = submit_standard(&h, &project).await;
    h.service
        .review_as_implementing_office(&s1.id, &UserId::new("io-1"), OfficeReview::approval())
        .await
        .unwrap();
    h.service
        .review_as_secretariat(&s1.id, &UserId::new("sec-1"), all_approved(), None)
        .await
        .unwrap();

    // Civil works is committed at in-progress 50; claiming 30 now would
    // lower applied weight.
    let ids = milestone_ids(&h, &project).await;
    let err = h
        .service
        .submit_update(
            &project.id,
            &UserId::new("fu-1"),
            vec![MilestoneDelta::new(
                ids[1].clone(),
                MilestoneStatus::InProgress,
                30.0,
            )],
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidProgress { .. }));
}

#[tokio::test]
async fn overdue_scan_notifies_field_unit() {
    let h = harness();
    let project = seeded_project(&h).await;

    let overdue = h
        .service
        .scan_overdue(&project.id, due("2026-09-15"))
        .await
        .unwrap();
    // Site preparation (March) and civil works (August) are overdue.
    assert_eq!(overdue.len(), 2);

    let sent = h.dispatcher.sent().await;
    assert_eq!(sent.len(), 2);
    assert!(sent
        .iter()
        .all(|i| i.category == NotificationCategory::MilestoneOverdue
            && i.recipient == UserId::new("fu-1")));
}
