//! Domain types for the milestone-weighted progress engine
//!
//! A project's progress is reported from the field as milestone deltas,
//! aggregated into three division percentages plus an overall value, and
//! gated through a two-stage approval chain before it is authoritative.
//!
//! # Key Concepts
//!
//! - **Milestone**: a weighted portion of a project's deliverables; the
//!   weights of a project's set must sum to 100.
//! - **SubmissionRecord**: a field-reported claim, snapshotting the full
//!   milestone set, reviewed first by the implementing office and then
//!   per-division by the secretariat.
//! - **WorkflowStatus**: the project's position in the approval chain —
//!   a closed enum, mutated only by the workflow state machine.
//! - **NotificationIntent**: an addressed, categorized notice produced
//!   when a workflow edge fires; delivery is external.
//!
//! # Design Principles
//!
//! 1. Derived progress fields are engine-owned; nothing else writes them.
//! 2. Statuses are closed enums, never free-form strings.
//! 3. Resolved submissions are immutable audit artifacts.

#![deny(unsafe_code)]

mod errors;
mod ids;
mod milestone;
mod notification;
mod progress;
mod project;
mod submission;

pub use errors::*;
pub use ids::*;
pub use milestone::*;
pub use notification::*;
pub use progress::*;
pub use project::*;
pub use submission::*;
