//! Domain-specific error types for the convergence engine.
//!
//! Internal modules return typed errors while task and command handlers at
//! the CLI boundary convert them to [`anyhow::Error`] via the `?` operator.
//!
//! # Error hierarchy
//!
//! ```text
//! AgentlinkError
//! ├── Config(ConfigError)        config file and root resolution
//! ├── Path(PathError)            relative link path cannot be computed
//! ├── Template(TemplateError)    template unreadable or output unwritable
//! └── Execution(ExecutionError)  one plan entry failed to apply
//! ```
//!
//! Verification failures are not errors: they are negative entries in a
//! [`VerificationReport`](crate::engine::VerificationReport).

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type for the engine.
#[derive(Error, Debug)]
pub enum AgentlinkError {
    /// Configuration-related error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Relative path resolution error.
    #[error("Path error: {0}")]
    Path(#[from] PathError),

    /// Template rendering error.
    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    /// Per-entry execution error.
    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),
}

/// Errors that arise from configuration loading and root resolution.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The config file exists but could not be read.
    #[error("IO error reading config file {path}: {source}")]
    Io {
        /// Path to the file that could not be read.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The config file is not valid TOML or has unexpected fields.
    #[error("Invalid TOML in {file}: {message}")]
    InvalidSyntax {
        /// Path to the offending file.
        file: String,
        /// Parser message.
        message: String,
    },

    /// The source root does not exist or is not a directory.
    #[error("Source root is not a directory: {}", .0.display())]
    SourceRootMissing(PathBuf),

    /// Neither HOME nor USERPROFILE is set.
    #[error("cannot determine home directory: neither HOME nor USERPROFILE is set")]
    NoHome,
}

/// Errors from the path resolver.
///
/// Recoverable: callers fall back to an absolute link target.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    /// An input path was relative.
    #[error("path is not absolute: {}", .0.display())]
    NotAbsolute(PathBuf),

    /// The two paths share no root (e.g. different drive letters).
    #[error("no relative path from {} to {}", .from.display(), .to.display())]
    NoRelativePath {
        /// Directory that would contain the link.
        from: PathBuf,
        /// Path the link must resolve to.
        to: PathBuf,
    },
}

/// Errors from the template renderer.
///
/// Fatal to the render step only; a missing variable is never an error.
#[derive(Error, Debug)]
pub enum TemplateError {
    /// The template file could not be read.
    #[error("cannot read template {}: {source}", .path.display())]
    Unreadable {
        /// Template path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The rendered output could not be written.
    #[error("cannot write {}: {source}", .path.display())]
    Write {
        /// Output path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Errors that arise while applying one plan entry.
///
/// Recorded in the execution report; never aborts the remaining entries.
#[derive(Error, Debug)]
pub enum ExecutionError {
    /// A filesystem call failed.
    #[error("{op} {}: {source}", .path.display())]
    Io {
        /// Short verb naming the failed operation.
        op: &'static str,
        /// Path the operation was applied to.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The entry target lies outside the target root.
    #[error("refusing to write outside target root: {}", .0.display())]
    OutsideTargetRoot(PathBuf),

    /// The entry target lies inside the source root.
    #[error("refusing to write inside source root: {}", .0.display())]
    InsideSourceRoot(PathBuf),

    /// The entry expected to replace a symlink but found something else.
    #[error("expected a symlink at {}, found a real file or directory", .0.display())]
    NotASymlink(PathBuf),
}

impl ExecutionError {
    /// Wrap an I/O error with the operation and path it came from.
    pub fn io(op: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            op,
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn config_error_io_display() {
        let e = ConfigError::Io {
            path: "/shared/agentlink.toml".to_string(),
            source: io::Error::new(io::ErrorKind::NotFound, "no such file"),
        };
        assert!(e.to_string().contains("/shared/agentlink.toml"));
        assert!(e.to_string().contains("IO error reading config file"));
    }

    #[test]
    fn config_error_io_has_source() {
        use std::error::Error as StdError;
        let e = ConfigError::Io {
            path: "agentlink.toml".to_string(),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "permission denied"),
        };
        assert!(e.source().is_some());
    }

    #[test]
    fn path_error_display() {
        let e = PathError::NotAbsolute(PathBuf::from("relative/dir"));
        assert_eq!(e.to_string(), "path is not absolute: relative/dir");
    }

    #[test]
    fn no_relative_path_display() {
        let e = PathError::NoRelativePath {
            from: PathBuf::from("/a"),
            to: PathBuf::from("/b"),
        };
        assert_eq!(e.to_string(), "no relative path from /a to /b");
    }

    #[test]
    fn template_error_unreadable_display() {
        let e = TemplateError::Unreadable {
            path: PathBuf::from("/shared/templates/mcp.json.template"),
            source: io::Error::new(io::ErrorKind::NotFound, "no such file"),
        };
        assert!(e.to_string().starts_with("cannot read template"));
        assert!(e.to_string().contains("mcp.json.template"));
    }

    #[test]
    fn execution_error_io_display() {
        let e = ExecutionError::io(
            "create symlink",
            "/work/.claude/agents",
            io::Error::new(io::ErrorKind::PermissionDenied, "permission denied"),
        );
        assert_eq!(
            e.to_string(),
            "create symlink /work/.claude/agents: permission denied"
        );
    }

    #[test]
    fn execution_error_outside_target_display() {
        let e = ExecutionError::OutsideTargetRoot(PathBuf::from("/etc/passwd"));
        assert!(e.to_string().contains("outside target root"));
    }

    #[test]
    fn agentlink_error_from_path_error() {
        let e: AgentlinkError = PathError::NotAbsolute(PathBuf::from("x")).into();
        assert!(e.to_string().contains("Path error"));
    }

    #[test]
    fn agentlink_error_from_config_error() {
        let e: AgentlinkError = ConfigError::NoHome.into();
        assert!(e.to_string().contains("Configuration error"));
    }

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn all_error_types_are_send_sync() {
        assert_send_sync::<AgentlinkError>();
        assert_send_sync::<ConfigError>();
        assert_send_sync::<PathError>();
        assert_send_sync::<TemplateError>();
        assert_send_sync::<ExecutionError>();
    }

    #[test]
    fn execution_error_converts_to_anyhow() {
        let e = ExecutionError::InsideSourceRoot(PathBuf::from("/shared/agents"));
        let _anyhow_err: anyhow::Error = e.into();
    }
}
