//! Milestone-weighted progress engine and approval workflow
//!
//! Field-reported milestone completion is aggregated into three
//! division percentages plus an overall value, and gated through a
//! two-stage approval chain (implementing office, then secretariat)
//! before it becomes authoritative.
//!
//! - **MilestoneLedger**: single gate for the milestone set and the
//!   weights-sum-to-100 invariant.
//! - **ProgressAggregator**: pure computation from milestone state to
//!   progress values; reusable for reconciliation and audit.
//! - **WorkflowStateMachine**: fixed transition table over the
//!   project's workflow status.
//! - **TransitionJournal**: append-only audit trail of every status
//!   change.
//! - **RecipientResolver / NotificationDispatcher**: addressed,
//!   categorized notification intents per workflow edge; delivery is
//!   external and fire-and-forget.
//! - **ProgressService**: the facade. Each mutating operation runs in a
//!   per-project critical section and commits all derived state
//!   atomically through `ProgressStore`.
//!
//! # Design Principles
//!
//! 1. Statuses move only through the state machine; no direct writes.
//! 2. Derived fields commit together or not at all.
//! 3. Notification failure never rolls back a transition.

#![deny(unsafe_code)]

pub mod aggregator;
pub mod directory;
pub mod dispatch;
pub mod journal;
pub mod ledger;
pub mod service;
pub mod state_machine;
pub mod storage;

// Re-exports
pub use aggregator::ProgressAggregator;
pub use directory::{StaticDirectory, UserDirectory};
pub use dispatch::{
    DispatchError, NotificationDispatcher, NullDispatcher, RecipientResolver, RecordingDispatcher,
};
pub use journal::{TransitionJournal, TransitionRecord};
pub use ledger::{MilestoneLedger, WEIGHT_TOLERANCE};
pub use service::{EngineConfig, OfficeReview, ProgressService};
pub use state_machine::{WorkflowEvent, WorkflowStateMachine};
pub use storage::{MemoryStore, ProgressStore, StateCommit};
