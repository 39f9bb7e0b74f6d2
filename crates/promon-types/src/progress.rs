//! Computed progress values
//!
//! The engine derives these; they are never hand-edited. The three
//! division values track in lock-step (each is overall / 3) — the
//! domain does not yet attribute milestones to individual divisions.

use serde::{Deserialize, Serialize};

/// The four derived percentages for a project
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProgressSummary {
    pub overall: f64,
    pub timeline: f64,
    pub budget: f64,
    pub physical: f64,
}

impl ProgressSummary {
    pub fn zero() -> Self {
        Self {
            overall: 0.0,
            timeline: 0.0,
            budget: 0.0,
            physical: 0.0,
        }
    }
}

/// Drift report between stored project fields and a recomputation from
/// the committed milestone ledger
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReconciliationReport {
    pub stored: ProgressSummary,
    pub expected: ProgressSummary,
    /// Absolute difference on the overall percentage
    pub overall_drift: f64,
}

impl ReconciliationReport {
    pub fn new(stored: ProgressSummary, expected: ProgressSummary) -> Self {
        let overall_drift = (stored.overall - expected.overall).abs();
        Self {
            stored,
            expected,
            overall_drift,
        }
    }

    /// Whether stored and expected agree within rounding noise.
    pub fn is_consistent(&self) -> bool {
        self.overall_drift < 0.005
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reconciliation_drift() {
        let stored = ProgressSummary {
            overall: 57.5,
            timeline: 19.17,
            budget: 19.17,
            physical: 19.17,
        };
        let expected = ProgressSummary {
            overall: 60.0,
            timeline: 20.0,
            budget: 20.0,
            physical: 20.0,
        };
        let report = ReconciliationReport::new(stored, expected);
        assert!((report.overall_drift - 2.5).abs() < 1e-9);
        assert!(!report.is_consistent());

        let clean = ReconciliationReport::new(stored, stored);
        assert!(clean.is_consistent());
    }
}
