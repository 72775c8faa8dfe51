//! Exclusion-list maintenance (`.gitignore` style line files).
use std::io::{self, Write as _};
use std::path::Path;

use super::is_absent;

/// The change [`ensure_ignored`] made, or would make.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreChange {
    /// The list file did not exist and was created holding only the pattern.
    Created,
    /// The pattern was appended on a new line.
    Appended,
    /// A line already equals the pattern; nothing was written.
    AlreadyPresent,
}

impl IgnoreChange {
    /// Past-tense description for logs.
    #[must_use]
    pub const fn describe(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Appended => "appended",
            Self::AlreadyPresent => "already present",
        }
    }
}

/// Read the list, returning `None` when the file does not exist.
fn read_list(list: &Path) -> io::Result<Option<String>> {
    match std::fs::read_to_string(list) {
        Ok(content) => Ok(Some(content)),
        Err(e) if is_absent(&e) => Ok(None),
        Err(e) => Err(e),
    }
}

fn has_line(content: &str, pattern: &str) -> bool {
    content
        .lines()
        .any(|line| line.trim_end_matches('\r') == pattern)
}

/// `true` when a line of `list` equals `pattern`. A missing file contains
/// nothing.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read.
pub fn contains(list: &Path, pattern: &str) -> io::Result<bool> {
    Ok(read_list(list)?.is_some_and(|content| has_line(&content, pattern)))
}

/// The change [`ensure_ignored`] would make, without writing.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read.
pub fn planned_change(list: &Path, pattern: &str) -> io::Result<IgnoreChange> {
    Ok(match read_list(list)? {
        None => IgnoreChange::Created,
        Some(content) if has_line(&content, pattern) => IgnoreChange::AlreadyPresent,
        Some(_) => IgnoreChange::Appended,
    })
}

/// Ensure `pattern` appears as a line of `list` exactly once.
///
/// Creates the file with just the pattern when absent, leaves it untouched
/// when a line already matches, and otherwise appends the pattern (adding a
/// newline first if the file does not end with one). Existing lines are never
/// reordered or removed.
///
/// # Errors
///
/// Returns an error if the file cannot be read or written.
pub fn ensure_ignored(list: &Path, pattern: &str) -> io::Result<IgnoreChange> {
    match read_list(list)? {
        None => {
            std::fs::write(list, format!("{pattern}\n"))?;
            Ok(IgnoreChange::Created)
        }
        Some(content) if has_line(&content, pattern) => Ok(IgnoreChange::AlreadyPresent),
        Some(content) => {
            let mut addition = String::new();
            if !content.is_empty() && !content.ends_with('\n') {
                addition.push('\n');
            }
            addition.push_str(pattern);
            addition.push('\n');
            let mut file = std::fs::OpenOptions::new().append(true).open(list)?;
            file.write_all(addition.as_bytes())?;
            Ok(IgnoreChange::Appended)
        }
    }
}
