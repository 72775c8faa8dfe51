use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::config::Config;
use crate::logging::Log;

/// Shared context for task execution.
pub struct Context {
    /// Resolved scope configuration.
    pub config: Arc<Config>,
    /// Logger for output and task recording.
    pub log: Arc<dyn Log>,
    /// Whether to perform a dry run (preview changes without applying).
    pub dry_run: bool,
    /// Copy source content instead of creating symlinks.
    pub copy_mode: bool,
    /// Set by the Ctrl-C handler; polled between plan entries.
    pub interrupted: Arc<AtomicBool>,
    /// Values for the template step's variables. Names without a value in
    /// the environment are absent.
    pub variables: BTreeMap<String, String>,
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("config", &self.config)
            .field("log", &"<dyn Log>")
            .field("dry_run", &self.dry_run)
            .field("copy_mode", &self.copy_mode)
            .field("interrupted", &self.interrupted)
            // Values are secrets.
            .field("variables", &self.variables.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Context {
    /// Creates a new context, reading the template step's variables from the
    /// process environment.
    #[must_use]
    pub fn new(config: Config, log: Arc<dyn Log>, dry_run: bool, copy_mode: bool) -> Self {
        let variables = config
            .template
            .as_ref()
            .map(|t| {
                t.variables
                    .iter()
                    .filter_map(|name| std::env::var(name).ok().map(|v| (name.clone(), v)))
                    .collect()
            })
            .unwrap_or_default();
        Self {
            config: Arc::new(config),
            log,
            dry_run,
            copy_mode,
            interrupted: Arc::new(AtomicBool::new(false)),
            variables,
        }
    }

    /// Replace the template variables.
    #[must_use]
    pub fn with_variables(mut self, variables: BTreeMap<String, String>) -> Self {
        self.variables = variables;
        self
    }

    /// Whether an interrupt has been requested.
    #[must_use]
    pub fn is_interrupted(&self) -> bool {
        self.interrupted.load(Ordering::SeqCst)
    }
}
