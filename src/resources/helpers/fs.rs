//! File-system resource helpers.
use std::path::{Path, PathBuf};

use crate::error::ExecutionError;

/// Ensure the parent directory of `path` exists, creating it (and any
/// ancestors) if necessary.
///
/// Used for generated files that live outside the linked tree, where no plan
/// entry creates the parent.
///
/// # Errors
///
/// Returns an error if the directory cannot be created.
pub fn ensure_parent_dir(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Recursively copy a directory tree.
///
/// Symlinks within the source tree are *followed*: the function uses
/// [`Path::is_dir`] (which follows symlinks) so directory symlinks are
/// recursed into and their contents materialised rather than copying the
/// link itself. A directory symlink that leads back to a directory already
/// being copied is left out.
///
/// # Errors
///
/// Returns an error if the destination directory cannot be created, a source
/// entry cannot be read, or a file cannot be copied.
pub fn copy_dir_recursive(src: &Path, dst: &Path) -> Result<(), ExecutionError> {
    copy_tree(src, dst, &mut Vec::new())
}

fn copy_tree(src: &Path, dst: &Path, ancestors: &mut Vec<PathBuf>) -> Result<(), ExecutionError> {
    let canonical =
        dunce::canonicalize(src).map_err(|e| ExecutionError::io("read directory", src, e))?;
    if ancestors.contains(&canonical) {
        return Ok(());
    }
    std::fs::create_dir_all(dst).map_err(|e| ExecutionError::io("create directory", dst, e))?;
    let entries = std::fs::read_dir(src).map_err(|e| ExecutionError::io("read directory", src, e))?;
    ancestors.push(canonical);
    for entry in entries {
        let entry = entry.map_err(|e| ExecutionError::io("read entry in", src, e))?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());
        if src_path.is_dir() {
            copy_tree(&src_path, &dst_path, ancestors)?;
        } else {
            std::fs::copy(&src_path, &dst_path)
                .map_err(|e| ExecutionError::io("copy", &dst_path, e))?;
        }
    }
    ancestors.pop();
    Ok(())
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn copies_files_and_subdirectories() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();

        std::fs::write(src.path().join("a.txt"), b"aaa").unwrap();
        std::fs::create_dir(src.path().join("sub")).unwrap();
        std::fs::write(src.path().join("sub/b.txt"), b"bbb").unwrap();

        let target = dst.path().join("out");
        copy_dir_recursive(src.path(), &target).unwrap();

        assert_eq!(std::fs::read(target.join("a.txt")).unwrap(), b"aaa");
        assert_eq!(std::fs::read(target.join("sub/b.txt")).unwrap(), b"bbb");
    }

    #[test]
    fn copy_reports_missing_source() {
        let dst = tempfile::tempdir().unwrap();
        let err = copy_dir_recursive(&dst.path().join("nope"), &dst.path().join("out")).unwrap_err();
        assert!(err.to_string().starts_with("read directory"));
    }

    #[cfg(unix)]
    #[test]
    fn copy_skips_symlink_back_to_ancestor() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();

        std::fs::create_dir(src.path().join("sub")).unwrap();
        std::fs::write(src.path().join("sub/b.txt"), b"bbb").unwrap();
        std::os::unix::fs::symlink("..", src.path().join("sub/up")).unwrap();

        let target = dst.path().join("out");
        copy_dir_recursive(src.path(), &target).unwrap();

        assert_eq!(std::fs::read(target.join("sub/b.txt")).unwrap(), b"bbb");
        assert!(!target.join("sub/up").exists());
    }

    #[test]
    fn ensure_parent_dir_creates_missing_parents() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b").join("file.txt");
        ensure_parent_dir(&nested).unwrap();
        assert!(dir.path().join("a").join("b").exists());
    }

    #[test]
    fn ensure_parent_dir_noop_for_bare_file_name() {
        ensure_parent_dir(Path::new("file.txt")).unwrap();
    }
}
