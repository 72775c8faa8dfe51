//! Symlink, copy and directory writes for a single link entry.
use std::path::{Path, PathBuf};

use super::helpers::fs::copy_dir_recursive;
use super::{EntryKind, LinkEntry, expected_link_text};
use crate::error::{ExecutionError, PathError};

/// How a `Create`/`Update` was materialised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkMethod {
    /// A symlink storing `text`.
    Symlink {
        /// Stored link text (relative unless `fallback` is set).
        text: PathBuf,
        /// Set when no relative path existed and the absolute source was used.
        fallback: Option<PathError>,
    },
    /// A full content copy of the source.
    Copy,
    /// A real directory.
    Directory,
}

/// Place `entry` at its target, which must currently be absent.
///
/// # Errors
///
/// Returns an error if the symlink, copy, or directory cannot be created.
pub fn place(entry: &LinkEntry, copy_mode: bool) -> Result<LinkMethod, ExecutionError> {
    match entry.kind {
        // Missing ancestors of the target root are created too.
        EntryKind::Directory => {
            std::fs::create_dir_all(&entry.target)
                .map_err(|e| ExecutionError::io("create directory", &entry.target, e))?;
            Ok(LinkMethod::Directory)
        }
        EntryKind::DirectoryLink | EntryKind::FileLink if copy_mode => {
            copy_source(&entry.source, &entry.target)?;
            Ok(LinkMethod::Copy)
        }
        EntryKind::DirectoryLink | EntryKind::FileLink => {
            let (text, fallback) = expected_link_text(&entry.source, &entry.target);
            create_symlink(&text, &entry.source, &entry.target)?;
            Ok(LinkMethod::Symlink { text, fallback })
        }
    }
}

/// Replace the symlink at `entry.target` with a freshly placed entry.
///
/// Only a symlink is ever removed; a real file or directory at the target is
/// reported as [`ExecutionError::NotASymlink`] and left alone.
///
/// # Errors
///
/// Returns an error if the existing symlink cannot be removed or the new
/// entry cannot be placed.
pub fn replace(entry: &LinkEntry, copy_mode: bool) -> Result<LinkMethod, ExecutionError> {
    remove_symlink(&entry.target)?;
    place(entry, copy_mode)
}

/// Copy `source` to `target`: a single file, or a directory tree.
fn copy_source(source: &Path, target: &Path) -> Result<(), ExecutionError> {
    if source.is_dir() {
        copy_dir_recursive(source, target)
    } else {
        std::fs::copy(source, target)
            .map(|_| ())
            .map_err(|e| ExecutionError::io("copy", target, e))
    }
}

/// Create a symlink at `link` storing `text`; `source` is the absolute
/// destination, used on Windows to choose between file and directory links.
fn create_symlink(text: &Path, source: &Path, link: &Path) -> Result<(), ExecutionError> {
    #[cfg(unix)]
    {
        let _ = source;
        std::os::unix::fs::symlink(text, link)
            .map_err(|e| ExecutionError::io("create symlink", link, e))?;
    }

    #[cfg(windows)]
    {
        let result = if source.is_dir() {
            std::os::windows::fs::symlink_dir(text, link)
        } else {
            std::os::windows::fs::symlink_file(text, link)
        };
        result.map_err(|e| ExecutionError::io("create symlink (enable Developer Mode or use --copy)", link, e))?;
    }

    Ok(())
}

/// Remove the symlink at `path`, refusing to touch anything that is not a
/// symlink.
///
/// On Windows, directory symlinks must be removed with `remove_dir` (not
/// `remove_file`), so the raw `FILE_ATTRIBUTE_DIRECTORY` flag is checked.
///
/// # Errors
///
/// Returns an error if `path` is not a symlink or cannot be removed.
pub fn remove_symlink(path: &Path) -> Result<(), ExecutionError> {
    let meta = std::fs::symlink_metadata(path)
        .map_err(|e| ExecutionError::io("read metadata", path, e))?;
    if !meta.file_type().is_symlink() {
        return Err(ExecutionError::NotASymlink(path.to_path_buf()));
    }
    let result = if is_dir_like(&meta) {
        std::fs::remove_dir(path)
    } else {
        std::fs::remove_file(path)
    };
    result.map_err(|e| ExecutionError::io("remove symlink", path, e))
}

/// Check if metadata represents a directory-like entry.
/// On Windows, `symlink_metadata().is_dir()` returns `false` for directory symlinks,
/// so we check the raw `FILE_ATTRIBUTE_DIRECTORY` bit instead.
fn is_dir_like(meta: &std::fs::Metadata) -> bool {
    #[cfg(windows)]
    {
        use std::os::windows::fs::MetadataExt;
        meta.file_attributes() & 0x10 != 0 // FILE_ATTRIBUTE_DIRECTORY
    }
    #[cfg(not(windows))]
    {
        meta.is_dir()
    }
}
