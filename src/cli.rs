use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::Scope;

/// Top-level CLI entry point.
#[derive(Parser, Debug)]
#[command(
    name = "agentlink",
    about = "Link a shared agent configuration tree into global and project workspaces",
    version
)]
pub struct Cli {
    /// Defaults to `verify` when omitted.
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(flatten)]
    pub global: GlobalOpts,
}

impl Cli {
    /// The selected subcommand, `verify` if none was given.
    #[must_use]
    pub fn selected(&self) -> Command {
        self.command.clone().unwrap_or(Command::Verify)
    }
}

/// Options shared across all subcommands.
#[derive(Parser, Debug, Clone, Default)]
pub struct GlobalOpts {
    /// Override the scope's target directory
    #[arg(long, global = true)]
    pub target: Option<PathBuf>,

    /// Shared source tree (default: $AGENTLINK_SOURCE or the tree holding agentlink.toml)
    #[arg(long, global = true)]
    pub source: Option<PathBuf>,

    /// Which workspace to converge
    #[arg(long, global = true, value_enum, default_value_t = Scope::Project)]
    pub scope: Scope,

    /// Project root (default: the enclosing git work tree, else the current directory)
    #[arg(long, global = true)]
    pub project: Option<PathBuf>,
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Link the source tree into the target and render generated files
    Install(InstallOpts),
    /// Check the target without changing anything
    Verify,
    /// Print version information
    Version,
}

impl Command {
    /// Name used for the log file.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Install(_) => "install",
            Self::Verify => "verify",
            Self::Version => "version",
        }
    }
}

/// Options for the `install` subcommand.
#[derive(Parser, Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallOpts {
    /// Preview changes without applying
    #[arg(short = 'd', long)]
    pub dry_run: bool,

    /// Copy files instead of creating symlinks
    #[arg(long)]
    pub copy: bool,
}
