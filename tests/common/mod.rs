// Shared helpers for integration tests.
//
// Builds a temporary shared source tree, a project and a home directory, and
// runs the install and verify task lists against them without touching the
// process environment.
#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use agentlink::commands::run_tasks_to_completion;
use agentlink::config::{Config, Inputs, Scope};
use agentlink::logging::Logger;
use agentlink::tasks::{self, Context};

/// Options for one install run.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    pub dry_run: bool,
    pub copy: bool,
}

/// An isolated source tree, project and home backed by a [`tempfile::TempDir`].
pub struct Fixture {
    dir: tempfile::TempDir,
    /// Canonical temp directory.
    pub base: PathBuf,
    /// Shared source root.
    pub source: PathBuf,
    /// Project root.
    pub project: PathBuf,
    /// Home directory for the global scope.
    pub home: PathBuf,
    /// Values given to the template step.
    pub variables: BTreeMap<String, String>,
}

impl Fixture {
    /// Source with `agents/reviewer.md` and `commands/commit.md`.
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let base = dunce::canonicalize(dir.path()).expect("canonicalize temp dir");
        let source = base.join("shared");
        let project = base.join("project");
        let home = base.join("home");
        for d in [&source, &project, &home] {
            std::fs::create_dir_all(d).expect("create fixture dir");
        }
        let fixture = Self {
            dir,
            base,
            source,
            project,
            home,
            variables: BTreeMap::new(),
        };
        fixture
            .with_source_file("agents/reviewer.md", "# reviewer\n")
            .with_source_file("commands/commit.md", "# commit\n")
    }

    /// Add a file under the source root, creating parents.
    pub fn with_source_file(self, rel: &str, body: &str) -> Self {
        write(&self.source.join(rel), body);
        self
    }

    /// Write `agentlink.toml` at the source root.
    pub fn with_config(self, toml: &str) -> Self {
        write(&self.source.join("agentlink.toml"), toml);
        self
    }

    /// Set a template variable value.
    pub fn with_variable(mut self, name: &str, value: &str) -> Self {
        self.variables.insert(name.to_string(), value.to_string());
        self
    }

    /// Project-scope target root.
    pub fn project_target(&self) -> PathBuf {
        self.project.join(".claude")
    }

    /// Resolved configuration for `scope`.
    pub fn config(&self, scope: Scope) -> Config {
        Config::load(&Inputs {
            source_root: self.source.clone(),
            scope,
            target_override: None,
            project_root: self.project.clone(),
            home: self.home.clone(),
        })
        .expect("load config")
    }

    fn context(&self, scope: Scope, dry_run: bool, copy: bool) -> (Context, Arc<Logger>) {
        let log = Arc::new(Logger::new(None));
        let ctx = Context::new(self.config(scope), log.clone(), dry_run, copy)
            .with_variables(self.variables.clone());
        (ctx, log)
    }

    /// Run the install tasks.
    pub fn install(&self, scope: Scope, options: RunOptions) -> anyhow::Result<()> {
        let (ctx, log) = self.context(scope, options.dry_run, options.copy);
        let tasks = tasks::install_tasks();
        run_tasks_to_completion(tasks.iter().map(Box::as_ref), &ctx, &log)
    }

    /// Run the verify tasks.
    pub fn verify(&self, scope: Scope) -> anyhow::Result<()> {
        let (ctx, log) = self.context(scope, false, false);
        let tasks = tasks::verify_tasks();
        run_tasks_to_completion(tasks.iter().map(Box::as_ref), &ctx, &log)
    }
}

/// Write `body` to `path`, creating parent directories.
pub fn write(path: &Path, body: &str) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create parent");
    }
    std::fs::write(path, body).expect("write file");
}

/// `true` if `path` is a symlink (without following it).
pub fn is_symlink(path: &Path) -> bool {
    std::fs::symlink_metadata(path).is_ok_and(|m| m.file_type().is_symlink())
}

/// Every path under `root`, relative and sorted, with symlinks marked `@`.
pub fn tree(root: &Path) -> Vec<String> {
    fn walk(root: &Path, dir: &Path, out: &mut Vec<String>) {
        let Ok(read) = std::fs::read_dir(dir) else {
            return;
        };
        for entry in read.flatten() {
            let path = entry.path();
            let rel = path
                .strip_prefix(root)
                .expect("under root")
                .to_string_lossy()
                .replace('\\', "/");
            let meta = std::fs::symlink_metadata(&path).expect("metadata");
            if meta.file_type().is_symlink() {
                out.push(format!("{rel}@"));
            } else if meta.is_dir() {
                out.push(format!("{rel}/"));
                walk(root, &path, out);
            } else {
                out.push(rel);
            }
        }
    }
    let mut out = Vec::new();
    walk(root, root, &mut out);
    out.sort();
    out
}
