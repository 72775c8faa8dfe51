//! Shared agent configuration linker.
//!
//! Converges one shared source tree (agents, commands, rules, skills) into
//! the per-user configuration directory or a project's configuration
//! directory using relative symlinks, renders the project's connection
//! configuration from a template, and keeps that generated file out of
//! version control.
//!
//! The public API is organised into layers:
//!
//! - **[`config`]**: load `agentlink.toml` and resolve a scope
//! - **[`resources`]**: link entries, link-state classification, templates and ignore lists
//! - **[`engine`]**: the pure planner, the executor and the verifier
//! - **[`tasks`]**: named units of work wired to the engine
//! - **[`commands`]**: `install`, `verify` and `version`
#![deny(clippy::or_fun_call)]
#![deny(clippy::bool_to_int_with_if)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod paths;
pub mod resources;
pub mod tasks;
