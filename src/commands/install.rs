use std::sync::Arc;
use std::sync::atomic::Ordering;

use anyhow::Result;

use crate::cli::{GlobalOpts, InstallOpts};
use crate::logging::Logger;
use crate::tasks::{self, Context};

/// Run the install command.
///
/// # Errors
///
/// Returns an error if configuration loading fails, any task fails, or the
/// run is interrupted.
pub fn run(global: &GlobalOpts, opts: &InstallOpts, log: &Arc<Logger>) -> Result<()> {
    log.info(&format!("agentlink {}", super::version::VERSION));
    let setup = super::CommandSetup::init(global, log)?;
    let ctx = Context::new(setup.config, log.clone(), opts.dry_run, opts.copy);

    let flag = Arc::clone(&ctx.interrupted);
    match ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst)) {
        Ok(()) | Err(ctrlc::Error::MultipleHandlers) => {}
        Err(e) => log.debug(&format!("no interrupt handler: {e}")),
    }

    let tasks = tasks::install_tasks();
    super::run_tasks_to_completion(tasks.iter().map(Box::as_ref), &ctx, log)
}
