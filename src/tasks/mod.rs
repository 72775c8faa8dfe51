//! Named units of work run in order by the `install` and `verify` commands.
mod context;
pub mod converge;
pub mod ignore;
pub mod render;
pub mod verify;

pub use context::Context;

use anyhow::Result;

use crate::logging::TaskStatus;

/// Outcome of a single task execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskResult {
    /// Task completed successfully.
    Ok,
    /// Task was skipped with the given reason.
    Skipped(String),
    /// Task ran in dry-run mode.
    DryRun,
}

/// A named, executable task.
pub trait Task: Send + Sync {
    /// Human-readable task name.
    fn name(&self) -> &str;

    /// Whether this task applies to the selected scope.
    fn should_run(&self, ctx: &Context) -> bool;

    /// Execute the task.
    ///
    /// # Errors
    ///
    /// Returns an error if the task fails, such as when an entry cannot be
    /// applied, the template cannot be read, or a verification check fails.
    fn run(&self, ctx: &Context) -> Result<TaskResult>;
}

/// Tasks run by `install`, in execution order.
#[must_use]
pub fn install_tasks() -> Vec<Box<dyn Task>> {
    vec![
        Box::new(converge::ConvergeLinks),
        Box::new(render::RenderTemplate),
        Box::new(ignore::UpdateIgnoreList),
    ]
}

/// Tasks run by `verify`, in execution order.
#[must_use]
pub fn verify_tasks() -> Vec<Box<dyn Task>> {
    vec![
        Box::new(verify::VerifyLinks),
        Box::new(verify::VerifyGeneratedFiles),
    ]
}

/// Execute a task, recording the result in the logger.
pub fn execute(task: &dyn Task, ctx: &Context) {
    if !task.should_run(ctx) {
        ctx.log
            .debug(&format!("skipping task: {} (not applicable)", task.name()));
        ctx.log
            .record_task(task.name(), TaskStatus::NotApplicable, None);
        return;
    }

    ctx.log.stage(task.name());

    match task.run(ctx) {
        Ok(TaskResult::Ok) => {
            ctx.log.record_task(task.name(), TaskStatus::Ok, None);
        }
        Ok(TaskResult::Skipped(reason)) => {
            ctx.log.info(&format!("skipped: {reason}"));
            ctx.log
                .record_task(task.name(), TaskStatus::Skipped, Some(&reason));
        }
        Ok(TaskResult::DryRun) => {
            ctx.log.record_task(task.name(), TaskStatus::DryRun, None);
        }
        Err(e) => {
            ctx.log.error(&format!("{}: {e:#}", task.name()));
            ctx.log
                .record_task(task.name(), TaskStatus::Failed, Some(&format!("{e:#}")));
        }
    }
}

/// Shared helpers for task unit tests.
#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
pub mod test_helpers {
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};

    use crate::config::{Config, Inputs, Scope};
    use crate::logging::{Log, TaskStatus};

    use super::Context;

    /// A [`Log`] that keeps every message in memory.
    #[derive(Debug, Default)]
    pub struct RecordingLog {
        /// `(level, message)` pairs in emission order.
        pub messages: Mutex<Vec<(&'static str, String)>>,
        /// Recorded task results.
        pub tasks: Mutex<Vec<(String, TaskStatus, Option<String>)>>,
    }

    impl RecordingLog {
        fn push(&self, level: &'static str, msg: &str) {
            self.messages.lock().unwrap().push((level, msg.to_string()));
        }

        /// Messages logged at `level`.
        pub fn at(&self, level: &str) -> Vec<String> {
            self.messages
                .lock()
                .unwrap()
                .iter()
                .filter(|(l, _)| *l == level)
                .map(|(_, m)| m.clone())
                .collect()
        }

        /// Status recorded for the task named `name`.
        pub fn status_of(&self, name: &str) -> Option<TaskStatus> {
            self.tasks
                .lock()
                .unwrap()
                .iter()
                .find(|(n, _, _)| n == name)
                .map(|(_, s, _)| *s)
        }
    }

    impl Log for RecordingLog {
        fn stage(&self, msg: &str) {
            self.push("stage", msg);
        }
        fn info(&self, msg: &str) {
            self.push("info", msg);
        }
        fn debug(&self, msg: &str) {
            self.push("debug", msg);
        }
        fn warn(&self, msg: &str) {
            self.push("warn", msg);
        }
        fn error(&self, msg: &str) {
            self.push("error", msg);
        }
        fn dry_run(&self, msg: &str) {
            self.push("dry_run", msg);
        }
        fn record_task(&self, name: &str, status: TaskStatus, message: Option<&str>) {
            self.tasks
                .lock()
                .unwrap()
                .push((name.to_string(), status, message.map(String::from)));
        }
    }

    /// A shared source tree and an empty project in one temp directory.
    #[derive(Debug)]
    pub struct Workspace {
        /// Keeps the directory alive.
        pub dir: tempfile::TempDir,
        /// Canonical temp directory.
        pub base: PathBuf,
        /// Source root (`shared/`).
        pub source: PathBuf,
        /// Project root (`project/`).
        pub project: PathBuf,
    }

    impl Workspace {
        /// Source with `agents/` and `commands/`, plus an empty project.
        pub fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let base = dunce::canonicalize(dir.path()).unwrap();
            let source = base.join("shared");
            let project = base.join("project");
            std::fs::create_dir_all(source.join("agents")).unwrap();
            std::fs::write(source.join("agents").join("reviewer.md"), "review").unwrap();
            std::fs::create_dir_all(source.join("commands")).unwrap();
            std::fs::write(source.join("commands").join("commit.md"), "commit").unwrap();
            std::fs::create_dir_all(&project).unwrap();
            Self {
                dir,
                base,
                source,
                project,
            }
        }

        /// Add a template at the default location.
        pub fn with_template(self, body: &str) -> Self {
            std::fs::create_dir_all(self.source.join("templates")).unwrap();
            std::fs::write(self.source.join(crate::config::DEFAULT_TEMPLATE), body).unwrap();
            self
        }

        /// Project-scope configuration for this workspace.
        pub fn config(&self) -> Config {
            Config::load(&Inputs {
                source_root: self.source.clone(),
                scope: Scope::Project,
                target_override: None,
                project_root: self.project.clone(),
                home: self.base.join("home"),
            })
            .unwrap()
        }

        /// Context over [`Self::config`] with no template variables set.
        pub fn context(&self, dry_run: bool) -> (Context, Arc<RecordingLog>) {
            let log = Arc::new(RecordingLog::default());
            let ctx = Context::new(self.config(), log.clone(), dry_run, false)
                .with_variables(std::collections::BTreeMap::new());
            (ctx, log)
        }
    }
}
