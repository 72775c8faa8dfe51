//! Execution and verification reports.
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use super::plan::{Action, SkipReason};
use crate::paths::display_relative;
use crate::resources::LinkEntry;
use crate::resources::link::LinkMethod;

/// Per-entry result of executing a plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The entry was created or updated.
    Installed {
        /// `Create` or `Update`.
        action: Action,
        /// How the entry was placed.
        method: LinkMethod,
    },
    /// Dry run: the action that would have been applied.
    Planned(Action),
    /// The entry was left alone.
    Skipped(SkipReason),
    /// The entry could not be applied.
    Failed(String),
}

impl Outcome {
    /// Machine-readable reason for skips and failures.
    #[must_use]
    pub fn reason_code(&self) -> Option<String> {
        match self {
            Self::Skipped(reason) => Some(reason.code().to_string()),
            Self::Failed(cause) => Some(format!("Failed:{cause}")),
            Self::Planned(Action::Skip(reason)) => Some(reason.code().to_string()),
            Self::Installed { .. } | Self::Planned(_) => None,
        }
    }

    /// `true` for overrides, which are reported at warning level.
    #[must_use]
    pub const fn is_override(&self) -> bool {
        matches!(
            self,
            Self::Skipped(SkipReason::Override | SkipReason::DirectoryOverride)
                | Self::Planned(Action::Skip(SkipReason::Override | SkipReason::DirectoryOverride))
        )
    }
}

/// One entry of an [`ExecutionReport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryReport {
    /// The entry that was processed.
    pub entry: LinkEntry,
    /// What happened to it.
    pub outcome: Outcome,
}

/// The result of executing an install plan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionReport {
    /// Target root the plan was executed against.
    pub target_root: PathBuf,
    /// Per-entry outcomes in plan order.
    pub entries: Vec<EntryReport>,
    /// `true` if execution stopped early on an interrupt.
    pub interrupted: bool,
    /// `true` if nothing was written.
    pub dry_run: bool,
}

impl ExecutionReport {
    /// Entries that were installed (or would be, in a dry run).
    pub fn installed(&self) -> impl Iterator<Item = &EntryReport> {
        self.entries.iter().filter(|e| {
            matches!(
                e.outcome,
                Outcome::Installed { .. } | Outcome::Planned(Action::Create | Action::Update)
            )
        })
    }

    /// Entries that were skipped.
    pub fn skipped(&self) -> impl Iterator<Item = &EntryReport> {
        self.entries.iter().filter(|e| {
            matches!(
                e.outcome,
                Outcome::Skipped(_) | Outcome::Planned(Action::Skip(_))
            )
        })
    }

    /// Entries that failed.
    pub fn failed(&self) -> impl Iterator<Item = &EntryReport> {
        self.entries
            .iter()
            .filter(|e| matches!(e.outcome, Outcome::Failed(_)))
    }

    /// `true` when no entry failed and the run was not interrupted.
    #[must_use]
    pub fn is_success(&self) -> bool {
        !self.interrupted && self.failed().next().is_none()
    }

    /// Human-readable summary partitioned into installed, skipped and failed,
    /// ending in one verdict line.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut out = String::new();
        let installed: Vec<_> = self.installed().collect();
        let skipped: Vec<_> = self.skipped().collect();
        let failed: Vec<_> = self.failed().collect();
        let heading = if self.dry_run { "would install" } else { "installed" };

        section(&mut out, heading, &installed, &self.target_root);
        section(&mut out, "skipped", &skipped, &self.target_root);
        section(&mut out, "failed", &failed, &self.target_root);
        if self.interrupted {
            out.push_str("interrupted before all entries were processed\n");
        }
        let _ = writeln!(
            out,
            "{}: {} {heading}, {} skipped, {} failed",
            if self.is_success() { "OK" } else { "FAILED" },
            installed.len(),
            skipped.len(),
            failed.len()
        );
        out
    }
}

fn section(out: &mut String, heading: &str, entries: &[&EntryReport], root: &Path) {
    if entries.is_empty() {
        return;
    }
    let _ = writeln!(out, "{heading} ({}):", entries.len());
    for report in entries {
        let rel = display_relative(&report.entry.target, root);
        match report.outcome.reason_code() {
            Some(code) => {
                let _ = writeln!(out, "  {rel} [{code}]");
            }
            None => {
                let _ = writeln!(out, "  {rel}");
            }
        }
    }
}

/// Result of checking one expected path during verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Check {
    /// The path is in an acceptable state; the label says which.
    Pass(&'static str),
    /// The path needs attention.
    Fail(String),
}

/// One entry of a [`VerificationReport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationEntry {
    /// Path that was checked.
    pub path: PathBuf,
    /// Outcome of the check.
    pub check: Check,
}

/// The result of a read-only verification pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerificationReport {
    /// Target root the entries are displayed relative to.
    pub target_root: PathBuf,
    /// Link checks, in source order.
    pub links: Vec<VerificationEntry>,
    /// Generated-file and ignore-list checks.
    pub generated: Vec<VerificationEntry>,
}

impl VerificationReport {
    /// Every failing check.
    pub fn failures(&self) -> impl Iterator<Item = &VerificationEntry> {
        self.links
            .iter()
            .chain(&self.generated)
            .filter(|e| matches!(e.check, Check::Fail(_)))
    }

    /// `true` when every check passed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failures().next().is_none()
    }

    /// One line per check followed by a verdict line.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut out = String::new();
        for entry in self.links.iter().chain(&self.generated) {
            let rel = display_relative(&entry.path, &self.target_root);
            let _ = match &entry.check {
                Check::Pass(label) => writeln!(out, "  ok    {rel} ({label})"),
                Check::Fail(reason) => writeln!(out, "  FAIL  {rel}: {reason}"),
            };
        }
        let total = self.links.len() + self.generated.len();
        let failed = self.failures().count();
        let _ = writeln!(
            out,
            "{}: {} of {total} checks passed",
            if failed == 0 { "OK" } else { "FAILED" },
            total - failed
        );
        out
    }
}
