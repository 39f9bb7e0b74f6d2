//! Submission records: the claim under review
//!
//! A submission freezes the full milestone set at submission time and
//! carries the field unit's proposed deltas through two review gates:
//! implementing office first, then the secretariat with an independent
//! verdict per division. Once a submission reaches a terminal status it
//! is never mutated again.

use crate::{MilestoneDelta, MilestoneSnapshot, ProjectId, SubmissionId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Role of an actor touching the workflow
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    FieldUnit,
    ImplementingOffice,
    Secretariat,
}

impl std::fmt::Display for ActorRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FieldUnit => write!(f, "field_unit"),
            Self::ImplementingOffice => write!(f, "implementing_office"),
            Self::Secretariat => write!(f, "secretariat"),
        }
    }
}

/// One of the three tracked progress dimensions
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Division {
    Timeline,
    Budget,
    Physical,
}

impl Division {
    pub const ALL: [Division; 3] = [Division::Timeline, Division::Budget, Division::Physical];
}

impl std::fmt::Display for Division {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Timeline => write!(f, "timeline"),
            Self::Budget => write!(f, "budget"),
            Self::Physical => write!(f, "physical"),
        }
    }
}

/// Secretariat verdict on one division of a submission
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DivisionVerdict {
    Approved,
    Rejected,
}

/// The recorded review of one division
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DivisionReview {
    pub verdict: DivisionVerdict,
    /// The division's computed progress value at verdict time
    pub progress: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
    /// True when the approval was inherited from a prior submission
    /// cycle rather than re-solicited
    #[serde(default)]
    pub carried_forward: bool,
}

/// Review status of a submission
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    /// Awaiting implementing-office review
    Submitted,
    /// Passed first-line review; awaiting secretariat verdict
    ImplementingOfficeApproved,
    /// Fully validated; deltas applied to the committed ledger
    SecretariatValidated,
    /// Rejected at either gate; a fresh submission must follow
    Rejected,
}

impl SubmissionStatus {
    /// In-flight submissions block new ones for the same project.
    pub fn is_in_flight(&self) -> bool {
        matches!(self, Self::Submitted | Self::ImplementingOfficeApproved)
    }
}

impl std::fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Submitted => "submitted",
            Self::ImplementingOfficeApproved => "implementing_office_approved",
            Self::SecretariatValidated => "secretariat_validated",
            Self::Rejected => "rejected",
        };
        write!(f, "{s}")
    }
}

/// Metadata for one review pass over a submission
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReviewNote {
    pub reviewer: UserId,
    pub reviewed_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
}

impl ReviewNote {
    pub fn new(reviewer: UserId, remarks: Option<String>) -> Self {
        Self {
            reviewer,
            reviewed_at: Utc::now(),
            remarks,
        }
    }
}

/// An immutable-once-resolved record of a reported update
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SubmissionRecord {
    pub id: SubmissionId,
    pub project_id: ProjectId,
    pub submitted_by: UserId,
    pub submitter_role: ActorRole,
    /// Full milestone set at submission time
    pub snapshot: Vec<MilestoneSnapshot>,
    /// The proposed state changes
    pub deltas: Vec<MilestoneDelta>,
    /// Overall progress the deltas would yield, computed at submission
    pub claimed_progress: f64,
    /// Overall progress after implementing-office adjustment
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adjusted_progress: Option<f64>,
    /// Committed overall progress after secretariat validation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_progress: Option<f64>,
    pub status: SubmissionStatus,
    /// Per-division secretariat reviews, including approvals carried
    /// forward from a previous cycle
    #[serde(default)]
    pub division_reviews: BTreeMap<Division, DivisionReview>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub office_review: Option<ReviewNote>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secretariat_review: Option<ReviewNote>,
    pub submitted_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
}

impl SubmissionRecord {
    pub fn new(
        project_id: ProjectId,
        submitted_by: UserId,
        snapshot: Vec<MilestoneSnapshot>,
        deltas: Vec<MilestoneDelta>,
        claimed_progress: f64,
    ) -> Self {
        Self {
            id: SubmissionId::generate(),
            project_id,
            submitted_by,
            submitter_role: ActorRole::FieldUnit,
            snapshot,
            deltas,
            claimed_progress,
            adjusted_progress: None,
            final_progress: None,
            status: SubmissionStatus::Submitted,
            division_reviews: BTreeMap::new(),
            office_review: None,
            secretariat_review: None,
            submitted_at: Utc::now(),
            resolved_at: None,
        }
    }

    /// Inherit approved division reviews from a prior rejected cycle.
    pub fn with_carried_reviews(
        mut self,
        reviews: BTreeMap<Division, DivisionReview>,
    ) -> Self {
        for (division, mut review) in reviews {
            if review.verdict == DivisionVerdict::Approved {
                review.carried_forward = true;
                self.division_reviews.insert(division, review);
            }
        }
        self
    }

    // ── Review transitions ───────────────────────────────────────────

    /// First gate passed: record reviewer and the adjusted claim.
    pub fn mark_office_approved(&mut self, note: ReviewNote, adjusted_progress: f64) {
        self.status = SubmissionStatus::ImplementingOfficeApproved;
        self.adjusted_progress = Some(adjusted_progress);
        self.office_review = Some(note);
    }

    /// Final gate passed: pin the committed progress value.
    pub fn mark_validated(&mut self, note: ReviewNote, final_progress: f64) {
        self.status = SubmissionStatus::SecretariatValidated;
        self.final_progress = Some(final_progress);
        self.secretariat_review = Some(note);
        self.resolved_at = Some(Utc::now());
    }

    /// Rejected at either gate; the record is terminal.
    pub fn mark_rejected(&mut self, note: ReviewNote, gate: ActorRole) {
        self.status = SubmissionStatus::Rejected;
        match gate {
            ActorRole::Secretariat => self.secretariat_review = Some(note),
            _ => self.office_review = Some(note),
        }
        self.resolved_at = Some(Utc::now());
    }

    // ── Query methods ────────────────────────────────────────────────

    /// Divisions the secretariat still needs to rule on: everything not
    /// already carrying an approval from a prior cycle.
    pub fn open_divisions(&self) -> Vec<Division> {
        Division::ALL
            .into_iter()
            .filter(|d| {
                self.division_reviews
                    .get(d)
                    .map(|r| r.verdict != DivisionVerdict::Approved)
                    .unwrap_or(true)
            })
            .collect()
    }

    pub fn rejected_divisions(&self) -> Vec<Division> {
        self.division_reviews
            .iter()
            .filter(|(_, r)| r.verdict == DivisionVerdict::Rejected)
            .map(|(d, _)| *d)
            .collect()
    }

    pub fn all_divisions_approved(&self) -> bool {
        Division::ALL.iter().all(|d| {
            self.division_reviews
                .get(d)
                .map(|r| r.verdict == DivisionVerdict::Approved)
                .unwrap_or(false)
        })
    }

    /// The progress value the next stage should start from.
    pub fn effective_progress(&self) -> f64 {
        self.final_progress
            .or(self.adjusted_progress)
            .unwrap_or(self.claimed_progress)
    }
}
