use anyhow::Result;

use super::{Context, Task, TaskResult};
use crate::resources::template::{self, RenderOutcome};

/// Render the connection-config template into the project.
#[derive(Debug)]
pub struct RenderTemplate;

fn report(ctx: &Context, outcome: &RenderOutcome) {
    for name in &outcome.missing {
        ctx.log
            .warn(&format!("{name} is not set; substituted an empty string"));
    }
    if let Some(e) = &outcome.json_error {
        ctx.log.warn(&format!(
            "{} is not valid JSON: {e}",
            outcome.output.display()
        ));
    }
}

impl Task for RenderTemplate {
    fn name(&self) -> &'static str {
        "Render template"
    }

    fn should_run(&self, ctx: &Context) -> bool {
        ctx.config.template.is_some()
    }

    fn run(&self, ctx: &Context) -> Result<TaskResult> {
        let Some(step) = &ctx.config.template else {
            return Ok(TaskResult::Skipped("no template configured".to_string()));
        };

        if ctx.dry_run {
            let outcome = template::preview(&step.source, &step.output, &ctx.variables)?;
            report(ctx, &outcome);
            ctx.log.dry_run(&format!(
                "would write {} ({} bytes)",
                outcome.output.display(),
                outcome.bytes
            ));
            return Ok(TaskResult::DryRun);
        }

        let outcome = template::render(&step.source, &step.output, &ctx.variables)?;
        report(ctx, &outcome);
        ctx.log.info(&format!(
            "wrote {} ({} bytes)",
            outcome.output.display(),
            outcome.bytes
        ));
        Ok(TaskResult::Ok)
    }
}
