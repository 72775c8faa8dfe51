use anyhow::{Context as _, Result};

use super::{Context, Task, TaskResult};
use crate::engine::{self, Action, EntryReport, ExecuteOptions, Outcome, SkipReason};
use crate::paths::display_relative;
use crate::resources::link::LinkMethod;

/// Plan and apply the links from the source root into the target root.
#[derive(Debug)]
pub struct ConvergeLinks;

impl ConvergeLinks {
    fn log_entry(ctx: &Context, report: &EntryReport) {
        let root = &ctx.config.target_root;
        let rel = display_relative(&report.entry.target, root);
        let kind = report.entry.kind.label();
        match &report.outcome {
            Outcome::Installed { action, method } => {
                let verb = if *action == Action::Update { "updated" } else { "created" };
                match method {
                    LinkMethod::Symlink { text, fallback } => {
                        ctx.log
                            .info(&format!("{verb} {kind} {rel} -> {}", text.display()));
                        if let Some(e) = fallback {
                            ctx.log
                                .warn(&format!("{rel}: using absolute link ({e})"));
                        }
                    }
                    LinkMethod::Copy => ctx.log.info(&format!("{verb} {rel} (copy)")),
                    LinkMethod::Directory => ctx.log.debug(&format!("{verb} directory {rel}")),
                }
            }
            Outcome::Planned(Action::Skip(reason)) | Outcome::Skipped(reason) => match reason {
                SkipReason::Unchanged => ctx.log.debug(&format!("ok: {rel} (already linked)")),
                SkipReason::Override => {
                    ctx.log.warn(&format!("{rel}: real file present, leaving it"));
                }
                SkipReason::DirectoryOverride => ctx
                    .log
                    .warn(&format!("{rel}: real directory present, leaving whole subtree")),
            },
            Outcome::Planned(action) => {
                ctx.log
                    .dry_run(&format!("would {} {kind} {rel}", action.verb()));
            }
            Outcome::Failed(cause) => ctx.log.error(&format!("{rel}: {cause}")),
        }
    }
}

impl Task for ConvergeLinks {
    fn name(&self) -> &'static str {
        "Converge links"
    }

    fn should_run(&self, _ctx: &Context) -> bool {
        true
    }

    fn run(&self, ctx: &Context) -> Result<TaskResult> {
        let config = &ctx.config;
        ctx.log.debug(&format!(
            "{} -> {} ({} granularity)",
            config.source_root.display(),
            config.target_root.display(),
            config.granularity
        ));

        let plan = engine::plan(
            &config.source_root,
            &config.target_root,
            config.granularity,
            &config.filter,
        )
        .with_context(|| format!("planning {}", config.target_root.display()))?;

        let options = ExecuteOptions {
            dry_run: ctx.dry_run,
            copy_mode: ctx.copy_mode,
        };
        let report = engine::execute(&plan, options, &ctx.interrupted);

        for entry in &report.entries {
            Self::log_entry(ctx, entry);
        }
        for line in report.summary().lines() {
            ctx.log.info(line);
        }

        if report.interrupted {
            anyhow::bail!("interrupted; re-run install to finish converging");
        }
        let failed = report.failed().count();
        if failed > 0 {
            anyhow::bail!("{failed} entries failed");
        }
        if ctx.dry_run {
            return Ok(TaskResult::DryRun);
        }
        Ok(TaskResult::Ok)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::tasks::test_helpers::Workspace;
    use std::sync::atomic::Ordering;

    #[test]
    fn converges_empty_project() {
        let ws = Workspace::new();
        let (ctx, log) = ws.context(false);
        assert_eq!(ConvergeLinks.run(&ctx).unwrap(), TaskResult::Ok);
        let target = ws.project.join(".claude");
        assert!(target.join("agents").join("reviewer.md").exists());
        assert!(
            std::fs::symlink_metadata(target.join("commands"))
                .unwrap()
                .file_type()
                .is_symlink()
        );
        assert!(
            log.at("info")
                .iter()
                .any(|m| m == "OK: 3 installed, 0 skipped, 0 failed")
        );
    }

    #[test]
    fn override_is_warned_not_failed() {
        let ws = Workspace::new();
        std::fs::create_dir_all(ws.project.join(".claude").join("agents")).unwrap();
        let (ctx, log) = ws.context(false);
        assert_eq!(ConvergeLinks.run(&ctx).unwrap(), TaskResult::Ok);
        assert_eq!(
            log.at("warn"),
            vec!["agents: real directory present, leaving whole subtree".to_string()]
        );
    }

    #[test]
    fn dry_run_reports_without_writing() {
        let ws = Workspace::new();
        let (ctx, log) = ws.context(true);
        assert_eq!(ConvergeLinks.run(&ctx).unwrap(), TaskResult::DryRun);
        assert!(!ws.project.join(".claude").exists());
        assert_eq!(
            log.at("dry_run"),
            vec![
                "would create dir .".to_string(),
                "would create dir-link agents".to_string(),
                "would create dir-link commands".to_string(),
            ]
        );
    }

    #[test]
    fn interrupt_fails_the_task() {
        let ws = Workspace::new();
        let (ctx, _log) = ws.context(false);
        ctx.interrupted.store(true, Ordering::SeqCst);
        let err = ConvergeLinks.run(&ctx).unwrap_err();
        assert!(err.to_string().contains("interrupted"));
    }
}
