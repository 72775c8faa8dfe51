//! Top-level subcommand orchestration.
pub mod install;
pub mod verify;
pub mod version;

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};

use crate::cli::GlobalOpts;
use crate::config::{self, Config, Inputs};
use crate::logging::Logger;
use crate::tasks::{self, Context, Task};

/// Shared state produced by the common command setup sequence.
#[derive(Debug)]
pub struct CommandSetup {
    /// Resolved configuration for the selected scope.
    pub config: Config,
}

impl CommandSetup {
    /// Resolve the roots, load the scope configuration and report validation
    /// warnings.
    ///
    /// # Errors
    ///
    /// Returns an error if the current directory, the home directory or the
    /// source root cannot be determined, or `agentlink.toml` fails to parse.
    pub fn init(global: &GlobalOpts, log: &Logger) -> Result<Self> {
        let cwd = std::env::current_dir().context("reading current directory")?;
        let exe = std::env::current_exe().ok();
        let source_root = config::resolve_source_root(
            global.source.as_deref(),
            std::env::var_os("AGENTLINK_SOURCE").map(PathBuf::from),
            exe.as_deref(),
            &cwd,
        )?;
        let home = config::home_dir()?;

        log.stage("Loading configuration");
        let inputs = inputs_from(global, &cwd, source_root, home);
        log.debug(&format!("source root: {}", inputs.source_root.display()));
        log.debug(&format!("project root: {}", inputs.project_root.display()));

        let config = Config::load(&inputs)?;
        log.info(&format!(
            "{} scope: {} -> {}",
            config.scope,
            config.source_root.display(),
            config.target_root.display()
        ));
        if let Some(step) = &config.template {
            log.debug(&format!(
                "template {} -> {}",
                step.source.display(),
                step.output.display()
            ));
        }

        let warnings = config.validate();
        if !warnings.is_empty() {
            log.warn(&format!(
                "found {} configuration warning(s):",
                warnings.len()
            ));
            for warning in &warnings {
                log.warn(&format!("  [{}]: {}", warning.item, warning.message));
            }
        }

        Ok(Self { config })
    }
}

/// Build the configuration inputs from the CLI options. Relative `--target`
/// and `--project` paths resolve against `cwd`.
#[must_use]
pub fn inputs_from(global: &GlobalOpts, cwd: &Path, source_root: PathBuf, home: PathBuf) -> Inputs {
    let project_root = global
        .project
        .as_ref()
        .map_or_else(|| config::discover_project_root(cwd), |p| cwd.join(p));
    Inputs {
        source_root,
        scope: global.scope,
        target_override: global.target.as_ref().map(|t| cwd.join(t)),
        project_root,
        home,
    }
}

/// Execute every task in order, print the summary, and bail if any task failed.
///
/// # Errors
///
/// Returns an error if one or more tasks recorded a failure.
pub fn run_tasks_to_completion<'a>(
    tasks: impl IntoIterator<Item = &'a dyn Task>,
    ctx: &Context,
    log: &Logger,
) -> Result<()> {
    for task in tasks {
        if ctx.is_interrupted() {
            log.warn(&format!("interrupted; not running {}", task.name()));
            continue;
        }
        tasks::execute(task, ctx);
    }

    log.print_summary();

    let count = log.failure_count();
    if count > 0 {
        anyhow::bail!("{count} task(s) failed");
    }
    if ctx.is_interrupted() {
        anyhow::bail!("interrupted");
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::config::Scope;

    #[test]
    fn relative_target_resolves_against_cwd() {
        let global = GlobalOpts {
            target: Some(PathBuf::from("out/agents")),
            project: Some(PathBuf::from("app")),
            scope: Scope::Global,
            ..GlobalOpts::default()
        };
        let inputs = inputs_from(
            &global,
            Path::new("/work"),
            PathBuf::from("/shared"),
            PathBuf::from("/home/u"),
        );
        assert_eq!(inputs.target_override, Some(PathBuf::from("/work/out/agents")));
        assert_eq!(inputs.project_root, PathBuf::from("/work/app"));
        assert_eq!(inputs.scope, Scope::Global);
    }

    #[test]
    fn absolute_target_is_kept() {
        let global = GlobalOpts {
            target: Some(PathBuf::from("/elsewhere")),
            project: Some(PathBuf::from("/p")),
            ..GlobalOpts::default()
        };
        let inputs = inputs_from(
            &global,
            Path::new("/work"),
            PathBuf::from("/shared"),
            PathBuf::from("/home/u"),
        );
        assert_eq!(inputs.target_override, Some(PathBuf::from("/elsewhere")));
        assert_eq!(inputs.project_root, PathBuf::from("/p"));
    }
}
