//! Utility functions for path resolution, ANSI stripping, and time formatting.
use std::ffi::OsString;
use std::path::PathBuf;

/// Strip ANSI escape sequences from a string.
///
/// Handles SGR sequences (ending in `m`) and other CSI sequences (ending
/// in any letter in the `@`..`~` range), so cursor movement, erase, etc.
/// are also stripped without consuming unrelated text.
pub(super) fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '\x1b' {
            if let Some(next) = chars.next()
                && next == '['
            {
                for inner in chars.by_ref() {
                    if ('@'..='~').contains(&inner) {
                        break;
                    }
                }
            }
        } else {
            out.push(c);
        }
    }
    out
}

/// Cache directory for log files: `$XDG_CACHE_HOME/agentlink`, else
/// `<home>/.cache/agentlink`, else `./.cache/agentlink`.
fn cache_dir_from(xdg_cache: Option<OsString>, home: Option<OsString>) -> PathBuf {
    xdg_cache
        .filter(|v| !v.is_empty())
        .map_or_else(
            || {
                home.filter(|v| !v.is_empty())
                    .map_or_else(|| PathBuf::from("."), PathBuf::from)
                    .join(".cache")
            },
            PathBuf::from,
        )
        .join("agentlink")
}

/// Return the log file path for `command` under the agentlink cache
/// directory. The directory itself is created by the file layer.
#[must_use]
pub fn log_file_path(command: &str) -> PathBuf {
    let home = std::env::var_os("HOME").or_else(|| std::env::var_os("USERPROFILE"));
    cache_dir_from(std::env::var_os("XDG_CACHE_HOME"), home).join(format!("{command}.log"))
}

/// Format the current UTC time as `YYYY-MM-DD HH:MM:SS`.
pub(super) fn format_utc_datetime() -> String {
    chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Format the current UTC time as `HH:MM:SS`.
pub(super) fn format_utc_time() -> String {
    chrono::Utc::now().format("%H:%M:%S").to_string()
}
