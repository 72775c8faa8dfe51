use std::sync::Arc;

use anyhow::Result;

use crate::cli::GlobalOpts;
use crate::logging::Logger;
use crate::tasks::{self, Context};

/// Run the verify command. Never writes to the target.
///
/// # Errors
///
/// Returns an error if configuration loading fails or any check fails.
pub fn run(global: &GlobalOpts, log: &Arc<Logger>) -> Result<()> {
    let setup = super::CommandSetup::init(global, log)?;
    let ctx = Context::new(setup.config, log.clone(), false, false);
    let tasks = tasks::verify_tasks();
    super::run_tasks_to_completion(tasks.iter().map(Box::as_ref), &ctx, log)
}
