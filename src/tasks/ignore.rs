use anyhow::{Context as _, Result};

use super::{Context, Task, TaskResult};
use crate::resources::ignore_list::{self, IgnoreChange};

/// Make sure the generated file is named in the project's ignore list.
#[derive(Debug)]
pub struct UpdateIgnoreList;

impl Task for UpdateIgnoreList {
    fn name(&self) -> &'static str {
        "Update ignore list"
    }

    fn should_run(&self, ctx: &Context) -> bool {
        ctx.config.ignore_pattern().is_some()
    }

    fn run(&self, ctx: &Context) -> Result<TaskResult> {
        let (Some(list), Some(pattern)) = (&ctx.config.ignore_list, ctx.config.ignore_pattern())
        else {
            return Ok(TaskResult::Skipped("no ignore list".to_string()));
        };

        if ctx.dry_run {
            let change = ignore_list::planned_change(list, &pattern)
                .with_context(|| format!("reading {}", list.display()))?;
            if change == IgnoreChange::AlreadyPresent {
                ctx.log
                    .debug(&format!("{pattern} already in {}", list.display()));
            } else {
                ctx.log.dry_run(&format!(
                    "would add {pattern} to {} ({})",
                    list.display(),
                    change.describe()
                ));
            }
            return Ok(TaskResult::DryRun);
        }

        let change = ignore_list::ensure_ignored(list, &pattern)
            .with_context(|| format!("updating {}", list.display()))?;
        ctx.log.info(&format!(
            "{pattern} in {}: {}",
            list.display(),
            change.describe()
        ));
        Ok(TaskResult::Ok)
    }
}
