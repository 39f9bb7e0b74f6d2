//! Milestone ledger: single source of truth for a project's milestones
//!
//! Every path that creates or mutates milestones goes through this one
//! gate — weight-sum validation lives here and nowhere else. The ledger
//! loads and validates; the service commits the resulting set inside
//! its atomic `StateCommit`, together with the submission and project
//! changes that authorized it.

use crate::storage::ProgressStore;
use chrono::Utc;
use promon_types::{
    EngineError, Milestone, MilestoneDelta, MilestoneSpec, MilestoneStatus, ProjectId, Result,
};
use std::collections::HashSet;
use std::sync::Arc;

/// Tolerance on the weights-sum-to-100 invariant.
pub const WEIGHT_TOLERANCE: f64 = 0.01;

/// Guards the milestone weight invariant and state updates
pub struct MilestoneLedger {
    store: Arc<dyn ProgressStore>,
    tolerance: f64,
}

impl MilestoneLedger {
    pub fn new(store: Arc<dyn ProgressStore>, tolerance: f64) -> Self {
        Self { store, tolerance }
    }

    /// Validate an edit-time milestone set: non-empty, unique ordering
    /// indexes, weights summing to 100 within tolerance.
    pub fn validate_specs(&self, specs: &[MilestoneSpec]) -> Result<()> {
        if specs.is_empty() {
            return Err(EngineError::EmptyMilestoneSet);
        }

        let mut seen = HashSet::new();
        for spec in specs {
            if !seen.insert(spec.order) {
                return Err(EngineError::DuplicateOrder { order: spec.order });
            }
        }

        let sum: f64 = specs.iter().map(|s| s.weight).sum();
        if (sum - 100.0).abs() > self.tolerance {
            return Err(EngineError::InvalidWeightDistribution {
                sum,
                tolerance: self.tolerance,
            });
        }

        Ok(())
    }

    /// Re-check the weight invariant on a stored set. Submissions are
    /// refused against a set whose weights no longer sum to 100.
    pub fn validate_weights(&self, milestones: &[Milestone]) -> Result<()> {
        if milestones.is_empty() {
            return Err(EngineError::EmptyMilestoneSet);
        }
        let sum: f64 = milestones.iter().map(|m| m.weight).sum();
        if (sum - 100.0).abs() > self.tolerance {
            return Err(EngineError::InvalidWeightDistribution {
                sum,
                tolerance: self.tolerance,
            });
        }
        Ok(())
    }

    /// Build a fresh (all-pending) milestone set from specs. Does not
    /// touch progress fields; those are recomputed separately.
    pub fn build_set(
        &self,
        project_id: &ProjectId,
        specs: Vec<MilestoneSpec>,
    ) -> Result<Vec<Milestone>> {
        self.validate_specs(&specs)?;
        let mut set: Vec<Milestone> = specs
            .into_iter()
            .map(|spec| Milestone::from_spec(project_id.clone(), spec))
            .collect();
        set.sort_by_key(|m| m.order);
        Ok(set)
    }

    /// Ordered milestone set for a project.
    pub async fn get_milestones(&self, project_id: &ProjectId) -> Result<Vec<Milestone>> {
        self.store.milestones(project_id).await
    }

    /// Validate a proposed delta against the current set.
    ///
    /// Rejects unknown milestones, progress outside [0, 100], nonzero
    /// progress while pending/completed, and any change that would
    /// lower the milestone's applied weight — committed progress is
    /// monotone under approvals.
    pub fn validate_delta(milestones: &[Milestone], delta: &MilestoneDelta) -> Result<()> {
        let current = milestones
            .iter()
            .find(|m| m.id == delta.milestone_id)
            .ok_or_else(|| EngineError::UnknownMilestone(delta.milestone_id.clone()))?;

        let out_of_range = !(0.0..=100.0).contains(&delta.progress);
        let stray_progress =
            delta.status != MilestoneStatus::InProgress && delta.progress != 0.0;
        if out_of_range || stray_progress {
            return Err(EngineError::InvalidProgress {
                milestone: delta.milestone_id.clone(),
                progress: delta.progress,
                status: delta.status,
            });
        }

        let proposed = match delta.status {
            MilestoneStatus::Completed => current.weight,
            MilestoneStatus::InProgress => current.weight * (delta.progress / 100.0),
            MilestoneStatus::Pending => 0.0,
        };
        if proposed + 1e-9 < current.applied_weight() {
            return Err(EngineError::InvalidProgress {
                milestone: delta.milestone_id.clone(),
                progress: delta.progress,
                status: delta.status,
            });
        }

        Ok(())
    }

    /// Apply a validated delta to the loaded set. Used only by the
    /// workflow when a submission clears its final review gate.
    pub fn apply_delta(milestones: &mut [Milestone], delta: &MilestoneDelta) -> Result<()> {
        Self::validate_delta(milestones, delta)?;

        for m in milestones.iter_mut() {
            if m.id == delta.milestone_id {
                m.status = delta.status;
                m.progress = if delta.status == MilestoneStatus::InProgress {
                    delta.progress
                } else {
                    0.0
                };
                if delta.status == MilestoneStatus::Completed {
                    m.completed_at = Some(Utc::now());
                    if m.completion_notes.is_none() {
                        m.completion_notes = delta.note.clone();
                    }
                }
                tracing::debug!(
                    milestone = %m.id,
                    status = %m.status,
                    progress = m.progress,
                    "milestone state updated"
                );
            }
        }
        Ok(())
    }
}
