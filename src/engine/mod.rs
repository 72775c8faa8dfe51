//! The convergence engine.
//!
//! [`plan`] classifies every entry without writing, [`execute`] applies a
//! plan (or reports it, in dry-run mode), and [`verify`] re-derives the
//! expected state read-only. All three share the classifier in
//! [`crate::resources`].
mod execute;
mod plan;
mod report;
mod verify;

pub use execute::{ExecuteOptions, execute};
pub use plan::{
    Action, EntryFilter, Granularity, InstallPlan, PlannedEntry, SkipReason, expected_entries, plan,
};
pub use report::{Check, EntryReport, ExecutionReport, Outcome, VerificationEntry, VerificationReport};
pub use verify::{GeneratedFile, verify};
