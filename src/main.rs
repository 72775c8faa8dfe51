use std::sync::Arc;

use agentlink::{cli, commands, logging};
use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let _ = enable_ansi_support::enable_ansi_support();
    let args = cli::Cli::parse();
    let command = args.selected();

    if command == cli::Command::Version {
        commands::version::run();
        return Ok(());
    }

    let log_file = logging::log_file_path(command.name());
    logging::init_subscriber(args.verbose, Some(log_file.as_path()));
    let log = Arc::new(logging::Logger::new(Some(log_file)));

    match command {
        cli::Command::Install(opts) => commands::install::run(&args.global, &opts, &log),
        cli::Command::Verify => commands::verify::run(&args.global, &log),
        cli::Command::Version => Ok(()),
    }
}
