//! Path resolution: relative symlink targets and root canonicalization.
use std::path::{Component, Path, PathBuf};

use crate::error::PathError;

/// Compute the relative path that, resolved from `from_dir`, reaches `to`.
///
/// Both inputs must be absolute. They are normalized lexically first, so
/// `.` components are dropped and `..` components fold into their parent.
/// Works whether `to` is an ancestor, a descendant, or in a sibling tree of
/// `from_dir`.
///
/// # Examples
///
/// ```
/// use std::path::{Path, PathBuf};
/// use agentlink::paths::relative_path;
///
/// let rel = relative_path(Path::new("/work/.claude"), Path::new("/shared/agents")).unwrap();
/// assert_eq!(rel, PathBuf::from("../../shared/agents"));
/// ```
///
/// # Errors
///
/// Returns [`PathError::NotAbsolute`] if either input is relative, and
/// [`PathError::NoRelativePath`] if the paths live under different roots
/// (for example different drive letters on Windows).
pub fn relative_path(from_dir: &Path, to: &Path) -> Result<PathBuf, PathError> {
    if !from_dir.is_absolute() {
        return Err(PathError::NotAbsolute(from_dir.to_path_buf()));
    }
    if !to.is_absolute() {
        return Err(PathError::NotAbsolute(to.to_path_buf()));
    }

    let from = normalize(from_dir);
    let dest = normalize(to);
    let from_parts: Vec<Component<'_>> = from.components().collect();
    let dest_parts: Vec<Component<'_>> = dest.components().collect();

    // Prefix (drive or UNC share) and root must agree before any `..` walk
    // can reach the destination.
    if root_of(&from_parts) != root_of(&dest_parts) {
        return Err(PathError::NoRelativePath {
            from: from_dir.to_path_buf(),
            to: to.to_path_buf(),
        });
    }

    let common = from_parts
        .iter()
        .zip(dest_parts.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut rel = PathBuf::new();
    for _ in common..from_parts.len() {
        rel.push(Component::ParentDir);
    }
    for part in dest_parts.iter().skip(common) {
        rel.push(part);
    }
    if rel.as_os_str().is_empty() {
        rel.push(Component::CurDir);
    }
    Ok(rel)
}

/// Leading prefix and root components of `parts`.
fn root_of<'a>(parts: &[Component<'a>]) -> Vec<Component<'a>> {
    parts
        .iter()
        .take_while(|c| matches!(c, Component::Prefix(_) | Component::RootDir))
        .copied()
        .collect()
}

/// Lexically normalize a path: drop `.` and fold `..` into the preceding
/// component. `..` never climbs above the root.
#[must_use]
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let at_root = out.components().next_back().is_none_or(|last| {
                    matches!(
                        last,
                        Component::RootDir | Component::Prefix(_) | Component::ParentDir
                    )
                });
                if at_root {
                    if !out.has_root() {
                        out.push(Component::ParentDir);
                    }
                } else {
                    out.pop();
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// Resolve a root directory to its physical location.
///
/// The longest existing ancestor is canonicalized (following symlinks) and
/// the remaining, not-yet-created components are appended unchanged. This
/// keeps lexical relative paths consistent with how the kernel resolves
/// `..` inside a symlink target, even when a root is reached through a
/// symlinked directory or does not exist yet.
#[must_use]
pub fn resolve_root(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        normalize(path)
    } else {
        std::env::current_dir().map_or_else(|_| normalize(path), |cwd| normalize(&cwd.join(path)))
    };

    let mut existing = absolute.as_path();
    let mut missing: Vec<&std::ffi::OsStr> = Vec::new();
    loop {
        if let Ok(canonical) = dunce::canonicalize(existing) {
            let mut resolved = canonical;
            for name in missing.iter().rev() {
                resolved.push(name);
            }
            return resolved;
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name);
                existing = parent;
            }
            _ => return absolute,
        }
    }
}

/// Expand a leading `~` (alone or followed by a separator) to `home`.
#[must_use]
pub fn expand_home(raw: &str, home: &Path) -> PathBuf {
    if raw == "~" {
        return home.to_path_buf();
    }
    raw.strip_prefix("~/")
        .or_else(|| raw.strip_prefix("~\\"))
        .map_or_else(|| PathBuf::from(raw), |rest| home.join(rest))
}

/// Render `path` relative to `base` for display, falling back to the full path.
#[must_use]
pub fn display_relative(path: &Path, base: &Path) -> String {
    match path.strip_prefix(base) {
        Ok(rel) if rel.as_os_str().is_empty() => ".".to_string(),
        Ok(rel) => rel.display().to_string(),
        Err(_) => path.display().to_string(),
    }
}
