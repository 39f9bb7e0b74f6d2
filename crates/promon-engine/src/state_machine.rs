//! Workflow state machine: fixed, domain-specific transitions
//!
//! The approval chain is a closed table over `WorkflowStatus` — there is
//! no configurable graph. Every status change in the system goes through
//! `advance`, which returns the full path traversed (some events pass
//! through intermediate statuses in a single step, e.g. a fully
//! approving secretariat verdict).

use promon_types::{EngineError, Result, WorkflowStatus};

/// The events that can move a project through the approval chain
#[derive(Clone, Debug, PartialEq)]
pub enum WorkflowEvent {
    /// Field unit opened a submission (first or resubmission)
    SubmissionCreated,
    /// Implementing office approved the in-flight submission
    ImplementingOfficeApproved,
    /// Implementing office rejected the in-flight submission
    ImplementingOfficeRejected {
        /// Whether any milestone has left `Pending` in the committed
        /// ledger (decides the reporting state to fall back to)
        work_started: bool,
    },
    /// Secretariat approved every division
    SecretariatValidated {
        /// Committed applied weight after the deltas landed
        applied_weight: f64,
        work_started: bool,
    },
    /// Secretariat rejected at least one division
    SecretariatRejected,
}

impl WorkflowEvent {
    /// Machine-readable tag, used in journal entries and error messages.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::SubmissionCreated => "submission_created",
            Self::ImplementingOfficeApproved => "implementing_office_approved",
            Self::ImplementingOfficeRejected { .. } => "implementing_office_rejected",
            Self::SecretariatValidated { .. } => "secretariat_validated",
            Self::SecretariatRejected => "secretariat_rejected",
        }
    }
}

impl std::fmt::Display for WorkflowEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// Advances project workflow status along the fixed transition table
#[derive(Clone, Debug)]
pub struct WorkflowStateMachine {
    /// Tolerance on the applied-weight == 100 completion guard
    tolerance: f64,
}

impl WorkflowStateMachine {
    pub fn new(tolerance: f64) -> Self {
        Self { tolerance }
    }

    /// Compute the status path for an event.
    ///
    /// Returns every status traversed, last element being the resting
    /// status. Rejects with `InvalidTransition` when the table has no
    /// edge for `(current, event)`.
    pub fn advance(
        &self,
        current: WorkflowStatus,
        event: &WorkflowEvent,
    ) -> Result<Vec<WorkflowStatus>> {
        use WorkflowStatus::*;

        let path = match (current, event) {
            // Field unit reports. Resubmission after a rejection leaves
            // the project in Submitted, so Submitted -> Submitted is a
            // legal (self) edge; the single-in-flight guard lives in the
            // service, not here.
            (Draft | Ongoing | ValidatedBySecretariat | Submitted, WorkflowEvent::SubmissionCreated) => {
                vec![Submitted]
            }

            (Submitted, WorkflowEvent::ImplementingOfficeApproved) => {
                vec![CompiledForSecretariat]
            }

            (Submitted, WorkflowEvent::ImplementingOfficeRejected { work_started }) => {
                vec![if *work_started { Ongoing } else { Draft }]
            }

            (
                CompiledForSecretariat,
                WorkflowEvent::SecretariatValidated {
                    applied_weight,
                    work_started,
                },
            ) => {
                let mut path = vec![SecretariatApproved, ValidatedBySecretariat];
                if *applied_weight >= 100.0 - self.tolerance {
                    path.push(Completed);
                } else if *work_started {
                    path.push(Ongoing);
                }
                path
            }

            (CompiledForSecretariat, WorkflowEvent::SecretariatRejected) => vec![Submitted],

            _ => {
                return Err(EngineError::InvalidTransition {
                    status: current,
                    event: event.tag().to_string(),
                })
            }
        };

        Ok(path)
    }
}
