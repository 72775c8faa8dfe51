//! Filesystem primitives: link entries, state classification, and the
//! idempotent write operations the executor builds on.
pub mod helpers;
pub mod ignore_list;
pub mod link;
pub mod template;

use std::io;
use std::path::{Path, PathBuf};

use crate::error::PathError;
use crate::paths;

/// What a plan entry places at its target path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    /// A symlink to a source directory.
    DirectoryLink,
    /// A symlink to a source file.
    FileLink,
    /// A real directory created in the target so that leaf files can be
    /// linked (and overridden) individually.
    Directory,
}

impl EntryKind {
    /// Short label used in summaries and logs.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::DirectoryLink => "dir-link",
            Self::FileLink => "file-link",
            Self::Directory => "dir",
        }
    }
}

/// A `(source, target, kind)` triple.
///
/// `target` always lies inside the target root and `source` inside the
/// source root.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LinkEntry {
    /// Absolute path in the source tree.
    pub source: PathBuf,
    /// Absolute path in the target layout.
    pub target: PathBuf,
    /// What the entry places at `target`.
    pub kind: EntryKind,
}

impl LinkEntry {
    /// Create a new entry.
    #[must_use]
    pub const fn new(source: PathBuf, target: PathBuf, kind: EntryKind) -> Self {
        Self {
            source,
            target,
            kind,
        }
    }

    /// Human-readable description of this entry.
    #[must_use]
    pub fn description(&self) -> String {
        match self.kind {
            EntryKind::Directory => format!("{} (directory)", self.target.display()),
            EntryKind::DirectoryLink | EntryKind::FileLink => {
                format!("{} -> {}", self.target.display(), self.source.display())
            }
        }
    }
}

/// What currently exists at a link entry's target path.
///
/// Derived on every run, never stored.
///
/// # Examples
///
/// ```
/// use agentlink::resources::LinkState;
///
/// assert!(LinkState::Override.is_terminal());
/// assert!(!LinkState::Absent.is_terminal());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkState {
    /// Nothing exists at the target path.
    Absent,
    /// A symlink whose stored text is the expected link text.
    CorrectLink,
    /// A symlink whose stored text differs from the expected link text.
    StaleLink {
        /// The text the symlink currently stores.
        current: PathBuf,
    },
    /// A real file or directory. Never removed or replaced.
    Override,
}

impl LinkState {
    /// `true` for states the engine must leave untouched.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Override)
    }
}

/// The text a symlink at `target` must store to resolve to `source`.
///
/// Prefers a path relative to the link's parent directory. When none can be
/// computed the absolute `source` is returned together with the resolver
/// error so the caller can report the fallback.
#[must_use]
pub fn expected_link_text(source: &Path, target: &Path) -> (PathBuf, Option<PathError>) {
    let parent = target.parent().unwrap_or_else(|| Path::new("/"));
    match paths::relative_path(parent, source) {
        Ok(rel) => (rel, None),
        Err(e) => (source.to_path_buf(), Some(e)),
    }
}

/// Classify what currently sits at `target` relative to `source`.
///
/// Uses `lstat` semantics: a dangling symlink is still a symlink and is
/// judged by the text it stores, never by whether its destination exists.
/// Performs no writes.
///
/// # Errors
///
/// Returns an error if the target's metadata or link text cannot be read for
/// a reason other than the path not existing (e.g. permission denied on a
/// parent directory).
pub fn classify(source: &Path, target: &Path) -> io::Result<LinkState> {
    let meta = match std::fs::symlink_metadata(target) {
        Ok(meta) => meta,
        Err(e) if is_absent(&e) => return Ok(LinkState::Absent),
        Err(e) => return Err(e),
    };

    if !meta.file_type().is_symlink() {
        return Ok(LinkState::Override);
    }

    let current = std::fs::read_link(target)?;
    let (expected, _) = expected_link_text(source, target);
    if link_text_matches(&current, &expected) {
        Ok(LinkState::CorrectLink)
    } else {
        Ok(LinkState::StaleLink { current })
    }
}

/// `true` when `e` means "nothing is there": the path, or one of its parent
/// components, does not exist as a directory.
pub(crate) fn is_absent(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::NotFound | io::ErrorKind::NotADirectory
    )
}

/// Compare stored link text with the expected text, normalising the `\\?\`
/// prefix that Windows `read_link` prepends to extended-length paths.
fn link_text_matches(current: &Path, expected: &Path) -> bool {
    strip_win_prefix(current) == strip_win_prefix(expected)
}

fn strip_win_prefix(p: &Path) -> PathBuf {
    let s = p.to_string_lossy();
    s.strip_prefix(r"\\?\")
        .map_or_else(|| p.to_path_buf(), PathBuf::from)
}
