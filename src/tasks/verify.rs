use anyhow::{Context as _, Result};

use super::{Context, Task, TaskResult};
use std::path::Path;

use crate::engine::{self, Check, VerificationEntry, VerificationReport};
use crate::paths::display_relative;

fn log_report(ctx: &Context, entries: &[VerificationEntry], base: &Path) {
    for entry in entries {
        let rel = display_relative(&entry.path, base);
        match &entry.check {
            Check::Pass(label) => ctx.log.debug(&format!("ok: {rel} ({label})")),
            Check::Fail(reason) => ctx.log.error(&format!("{rel}: {reason}")),
        }
    }
}

fn conclude(report: &VerificationReport) -> Result<TaskResult> {
    let failed = report.failures().count();
    if failed > 0 {
        anyhow::bail!("{failed} check(s) failed");
    }
    Ok(TaskResult::Ok)
}

/// Check every expected top-level entry in the target.
#[derive(Debug)]
pub struct VerifyLinks;

impl Task for VerifyLinks {
    fn name(&self) -> &'static str {
        "Verify links"
    }

    fn should_run(&self, _ctx: &Context) -> bool {
        true
    }

    fn run(&self, ctx: &Context) -> Result<TaskResult> {
        let config = &ctx.config;
        let expected = engine::expected_entries(
            &config.source_root,
            &config.target_root,
            config.granularity,
            &config.filter,
        )
        .with_context(|| format!("listing {}", config.source_root.display()))?;

        let report = engine::verify(&config.target_root, &expected, &[], &config.filter);
        log_report(ctx, &report.links, &config.target_root);
        ctx.log.info(&format!(
            "{} of {} entries ok",
            report.links.len() - report.failures().count(),
            report.links.len()
        ));
        conclude(&report)
    }
}

/// Check the generated file and its ignore-list line.
#[derive(Debug)]
pub struct VerifyGeneratedFiles;

impl Task for VerifyGeneratedFiles {
    fn name(&self) -> &'static str {
        "Verify generated files"
    }

    fn should_run(&self, ctx: &Context) -> bool {
        ctx.config.template.is_some()
    }

    fn run(&self, ctx: &Context) -> Result<TaskResult> {
        let config = &ctx.config;
        let generated = config.generated_files();
        let report = engine::verify(&config.target_root, &[], &generated, &config.filter);
        let base = config
            .ignore_list
            .as_deref()
            .and_then(Path::parent)
            .unwrap_or(config.target_root.as_path());
        log_report(ctx, &report.generated, base);
        conclude(&report)
    }
}
