//! Progress aggregator: pure computation from milestone state
//!
//! No side effects, no I/O. Given a milestone set the aggregator
//! produces the applied weight, the overall percentage, and the three
//! division percentages. Because it is a total function over any
//! milestone set, reconciliation tooling can re-run it at any time and
//! compare against stored values.
//!
//! Applied weight: completed milestones contribute their full weight,
//! in-progress milestones contribute weight * progress / 100, pending
//! milestones contribute nothing.

use promon_types::{
    Milestone, MilestoneDelta, MilestoneSnapshot, MilestoneStatus, ProgressSummary, Project,
    ReconciliationReport,
};

/// Round to 2 fraction digits; display layers may round further.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Computes progress values from milestone state
#[derive(Clone, Debug, Default)]
pub struct ProgressAggregator;

impl ProgressAggregator {
    pub fn new() -> Self {
        Self
    }

    /// Total applied weight of a committed milestone set.
    pub fn applied_weight(&self, milestones: &[Milestone]) -> f64 {
        milestones.iter().map(Milestone::applied_weight).sum()
    }

    /// Summary from a committed milestone set.
    pub fn summarize(&self, milestones: &[Milestone]) -> ProgressSummary {
        self.from_applied(self.applied_weight(milestones))
    }

    /// Summary from a frozen submission snapshot.
    pub fn summarize_snapshot(&self, snapshot: &[MilestoneSnapshot]) -> ProgressSummary {
        self.from_applied(snapshot.iter().map(MilestoneSnapshot::applied_weight).sum())
    }

    /// Build the four percentages from an applied-weight total.
    ///
    /// The clamp guards against floating-point overshoot when weights
    /// sum to slightly over 100 within tolerance. The three divisions
    /// track in lock-step at overall / 3 — applied weight is treated as
    /// dimension-agnostic and distributed evenly.
    pub fn from_applied(&self, applied: f64) -> ProgressSummary {
        let overall = round2(applied.clamp(0.0, 100.0));
        let division = round2((overall / 3.0).clamp(0.0, 100.0));
        ProgressSummary {
            overall,
            timeline: division,
            budget: division,
            physical: division,
        }
    }

    /// The snapshot a delta set would produce against the given
    /// milestone set. Deltas referencing unknown milestones are skipped;
    /// callers validate through the ledger first.
    pub fn apply_deltas(
        &self,
        milestones: &[Milestone],
        deltas: &[MilestoneDelta],
    ) -> Vec<MilestoneSnapshot> {
        milestones
            .iter()
            .map(|m| {
                let mut snap = m.snapshot();
                if let Some(delta) = deltas.iter().find(|d| d.milestone_id == m.id) {
                    snap.status = delta.status;
                    snap.progress = if delta.status == MilestoneStatus::InProgress {
                        delta.progress
                    } else {
                        0.0
                    };
                }
                snap
            })
            .collect()
    }

    /// Compare a project's stored progress fields against a fresh
    /// recomputation from the committed ledger.
    pub fn reconcile(&self, project: &Project, milestones: &[Milestone]) -> ReconciliationReport {
        ReconciliationReport::new(project.progress_summary(), self.summarize(milestones))
    }
}
