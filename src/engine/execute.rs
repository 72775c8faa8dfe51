//! Plan executor: apply classified actions in plan order.
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use super::plan::{Action, InstallPlan, PlannedEntry};
use super::report::{EntryReport, ExecutionReport, Outcome};
use crate::error::ExecutionError;
use crate::paths::normalize;
use crate::resources::link::{self, LinkMethod};

/// Executor switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecuteOptions {
    /// Report the actions without mutating anything.
    pub dry_run: bool,
    /// Copy source content instead of creating symlinks.
    pub copy_mode: bool,
}

/// Refuse targets outside the target root or inside the source root.
fn check_confinement(target: &Path, plan: &InstallPlan) -> Result<(), ExecutionError> {
    let target = normalize(target);
    if !target.starts_with(&plan.target_root) {
        return Err(ExecutionError::OutsideTargetRoot(target));
    }
    if target.starts_with(&plan.source_root) {
        return Err(ExecutionError::InsideSourceRoot(target));
    }
    Ok(())
}

fn apply(planned: &PlannedEntry, options: ExecuteOptions) -> Result<LinkMethod, ExecutionError> {
    match planned.action {
        Action::Update => link::replace(&planned.entry, options.copy_mode),
        _ => link::place(&planned.entry, options.copy_mode),
    }
}

/// Execute `plan`, one entry at a time.
///
/// A failed entry, including one the planner could not inspect, is recorded
/// and the batch continues. `interrupted` is
/// polled between entries only; once set, execution stops and the report is
/// marked interrupted. Everything already applied stays valid input for the
/// next run.
pub fn execute(plan: &InstallPlan, options: ExecuteOptions, interrupted: &AtomicBool) -> ExecutionReport {
    let mut report = ExecutionReport {
        target_root: plan.target_root.clone(),
        entries: Vec::with_capacity(plan.entries.len()),
        interrupted: false,
        dry_run: options.dry_run,
    };

    for planned in &plan.entries {
        if interrupted.load(Ordering::SeqCst) {
            report.interrupted = true;
            break;
        }

        let outcome = match planned.action {
            Action::Skip(reason) => Outcome::Skipped(reason),
            Action::Fail(kind) => Outcome::Failed(format!("cannot inspect target: {kind}")),
            action => match check_confinement(&planned.entry.target, plan) {
                Err(e) => Outcome::Failed(e.to_string()),
                Ok(()) if options.dry_run => Outcome::Planned(action),
                Ok(()) => match apply(planned, options) {
                    Ok(method) => Outcome::Installed { action, method },
                    Err(e) => Outcome::Failed(e.to_string()),
                },
            },
        };
        // Dry-run skips mirror the plan so listings stay identical.
        let outcome = match (options.dry_run, outcome) {
            (true, Outcome::Skipped(reason)) => Outcome::Planned(Action::Skip(reason)),
            (_, outcome) => outcome,
        };

        report.entries.push(EntryReport {
            entry: planned.entry.clone(),
            outcome,
        });
    }

    report
}

#[cfg(test)]
#[allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::indexing_slicing,
    clippy::panic
)]
mod tests {
    use super::*;
    use crate::engine::plan::{EntryFilter, Granularity, SkipReason, plan};
    use crate::resources::{LinkState, classify};
    use std::path::PathBuf;

    struct Tree {
        _dir: tempfile::TempDir,
        source: PathBuf,
        target: PathBuf,
    }

    fn tree() -> Tree {
        let dir = tempfile::tempdir().unwrap();
        let base = dunce::canonicalize(dir.path()).unwrap();
        let source = base.join("shared");
        let target = base.join("work").join(".claude");
        std::fs::create_dir_all(source.join("agents")).unwrap();
        std::fs::write(source.join("agents").join("reviewer.md"), "r").unwrap();
        std::fs::create_dir_all(source.join("commands")).unwrap();
        std::fs::write(source.join("commands").join("commit.md"), "c").unwrap();
        Tree {
            _dir: dir,
            source,
            target,
        }
    }

    fn converge(t: &Tree, granularity: Granularity, options: ExecuteOptions) -> ExecutionReport {
        let plan = plan(&t.source, &t.target, granularity, &EntryFilter::default()).unwrap();
        execute(&plan, options, &AtomicBool::new(false))
    }

    #[test]
    fn creates_links_and_target_root() {
        let t = tree();
        let report = converge(&t, Granularity::Directory, ExecuteOptions::default());
        assert!(report.is_success());
        assert_eq!(report.installed().count(), 3);
        assert_eq!(
            classify(&t.source.join("agents"), &t.target.join("agents")).unwrap(),
            LinkState::CorrectLink
        );
        assert_eq!(
            std::fs::read_to_string(t.target.join("commands").join("commit.md")).unwrap(),
            "c"
        );
    }

    #[test]
    fn second_run_changes_nothing() {
        let t = tree();
        converge(&t, Granularity::File, ExecuteOptions::default());
        let report = converge(&t, Granularity::File, ExecuteOptions::default());
        assert!(report.is_success());
        assert_eq!(report.installed().count(), 0);
        assert!(
            report
                .entries
                .iter()
                .all(|e| e.outcome == Outcome::Skipped(SkipReason::Unchanged))
        );
    }

    #[test]
    fn dry_run_writes_nothing() {
        let t = tree();
        let options = ExecuteOptions {
            dry_run: true,
            copy_mode: false,
        };
        let report = converge(&t, Granularity::Directory, options);
        assert!(report.dry_run);
        assert_eq!(report.installed().count(), 3);
        assert!(!t.target.exists());
    }

    #[test]
    fn dry_run_matches_real_run() {
        let t = tree();
        let dry = converge(
            &t,
            Granularity::File,
            ExecuteOptions {
                dry_run: true,
                copy_mode: false,
            },
        );
        let real = converge(&t, Granularity::File, ExecuteOptions::default());
        let dry_actions: Vec<_> = dry
            .entries
            .iter()
            .map(|e| match e.outcome {
                Outcome::Planned(action) => action,
                _ => panic!("unexpected outcome {:?}", e.outcome),
            })
            .collect();
        let real_actions: Vec<_> = real
            .entries
            .iter()
            .map(|e| match e.outcome {
                Outcome::Installed { action, .. } => action,
                Outcome::Skipped(reason) => Action::Skip(reason),
                _ => panic!("unexpected outcome {:?}", e.outcome),
            })
            .collect();
        assert_eq!(dry_actions, real_actions);
    }

    #[test]
    fn copy_mode_copies_content() {
        let t = tree();
        let report = converge(
            &t,
            Granularity::Directory,
            ExecuteOptions {
                dry_run: false,
                copy_mode: true,
            },
        );
        assert!(report.is_success());
        let meta = std::fs::symlink_metadata(t.target.join("agents")).unwrap();
        assert!(meta.is_dir());
        assert!(!meta.file_type().is_symlink());
        assert_eq!(
            std::fs::read_to_string(t.target.join("agents").join("reviewer.md")).unwrap(),
            "r"
        );
    }

    #[test]
    fn interrupt_stops_before_next_entry() {
        let t = tree();
        let plan = plan(&t.source, &t.target, Granularity::Directory, &EntryFilter::default()).unwrap();
        let report = execute(&plan, ExecuteOptions::default(), &AtomicBool::new(true));
        assert!(report.interrupted);
        assert!(report.entries.is_empty());
        assert!(!report.is_success());
        assert!(!t.target.exists());
    }

    #[test]
    fn target_inside_source_root_fails_per_entry() {
        let t = tree();
        let nested = t.source.join(".claude");
        let plan = plan(&t.source, &nested, Granularity::Directory, &EntryFilter::default()).unwrap();
        let report = execute(&plan, ExecuteOptions::default(), &AtomicBool::new(false));
        assert!(!report.is_success());
        assert!(!nested.exists());
        assert!(
            report
                .failed()
                .all(|e| matches!(&e.outcome, Outcome::Failed(msg) if msg.contains("inside source root")))
        );
    }

    #[test]
    fn missing_target_ancestors_are_created() {
        let t = tree();
        let deep = t.target.join("nested").join("deeper").join(".claude");
        let plan = plan(&t.source, &deep, Granularity::File, &EntryFilter::default()).unwrap();
        let report = execute(&plan, ExecuteOptions::default(), &AtomicBool::new(false));
        assert!(report.is_success());
        assert_eq!(report.installed().count(), plan.entries.len());
        assert_eq!(
            classify(
                &t.source.join("commands").join("commit.md"),
                &deep.join("commands").join("commit.md")
            )
            .unwrap(),
            LinkState::CorrectLink
        );
    }

    #[test]
    fn failed_entry_does_not_stop_later_entries() {
        let t = tree();
        let mut plan = plan(&t.source, &t.target, Granularity::Directory, &EntryFilter::default()).unwrap();
        plan.entries[1].action = Action::Fail(std::io::ErrorKind::PermissionDenied);
        let report = execute(&plan, ExecuteOptions::default(), &AtomicBool::new(false));

        assert!(!report.is_success());
        assert_eq!(
            report.entries[1].outcome.reason_code().as_deref(),
            Some("Failed:cannot inspect target: permission denied")
        );
        assert!(matches!(report.entries[0].outcome, Outcome::Installed { .. }));
        assert!(matches!(report.entries[2].outcome, Outcome::Installed { .. }));
        assert!(!t.target.join("agents").exists());
        assert!(t.target.join("commands").join("commit.md").exists());
    }

    #[cfg(unix)]
    #[test]
    fn uninspectable_target_fails_in_dry_run_too() {
        let t = tree();
        let base = t.source.parent().unwrap();
        std::os::unix::fs::symlink("loop", base.join("loop")).unwrap();
        let target = base.join("loop").join(".claude");
        let plan = plan(&t.source, &target, Granularity::Directory, &EntryFilter::default()).unwrap();
        for dry_run in [true, false] {
            let options = ExecuteOptions {
                dry_run,
                copy_mode: false,
            };
            let report = execute(&plan, options, &AtomicBool::new(false));
            assert!(!report.is_success());
            assert!(matches!(
                &report.entries[0].outcome,
                Outcome::Failed(msg) if msg.starts_with("cannot inspect target")
            ));
        }
    }

    #[test]
    fn entry_outside_target_root_is_refused() {
        let t = tree();
        let mut plan = plan(&t.source, &t.target, Granularity::Directory, &EntryFilter::default()).unwrap();
        plan.entries[1].entry.target = t.target.join("..").join("escape");
        let report = execute(&plan, ExecuteOptions::default(), &AtomicBool::new(false));
        assert!(matches!(
            &report.entries[1].outcome,
            Outcome::Failed(msg) if msg.contains("outside target root")
        ));
        assert!(!t.target.parent().unwrap().join("escape").exists());
    }
}
