//! Convergence planner: walk the source tree and classify every target.
use std::fmt::Write as _;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::paths::display_relative;
use crate::resources::{EntryKind, LinkEntry, LinkState, classify, is_absent};

/// How the source tree is mapped onto the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    /// One link per immediate child of the source root.
    Directory,
    /// Real directories in the target, one link per leaf file.
    File,
}

impl std::fmt::Display for Granularity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Directory => f.write_str("directory"),
            Self::File => f.write_str("file"),
        }
    }
}

/// Why an entry is left alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// A real file (or directory, for a file link) sits at the target.
    Override,
    /// A real directory sits where a directory link is expected. The whole
    /// subtree belongs to the consumer.
    DirectoryOverride,
    /// The target is already a correct link.
    Unchanged,
}

impl SkipReason {
    /// Machine-readable reason code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Override => "Override",
            Self::DirectoryOverride => "DirectoryOverride",
            Self::Unchanged => "Unchanged",
        }
    }
}

/// What the executor does with one entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Nothing exists at the target; place the entry.
    Create,
    /// A stale symlink sits at the target; replace it.
    Update,
    /// Leave the target untouched.
    Skip(SkipReason),
    /// The target could not be inspected; the entry fails and its siblings
    /// still converge.
    Fail(io::ErrorKind),
}

impl Action {
    /// Maps a link state to its action.
    ///
    /// `Override` of a directory link whose target is a real directory is a
    /// [`SkipReason::DirectoryOverride`]; callers decide that case.
    #[must_use]
    pub const fn for_state(state: &LinkState) -> Self {
        match state {
            LinkState::Absent => Self::Create,
            LinkState::CorrectLink => Self::Skip(SkipReason::Unchanged),
            LinkState::StaleLink { .. } => Self::Update,
            LinkState::Override => Self::Skip(SkipReason::Override),
        }
    }

    /// Lowercase verb used in listings.
    #[must_use]
    pub const fn verb(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Skip(SkipReason::Unchanged) => "unchanged",
            Self::Skip(SkipReason::Override) => "override",
            Self::Skip(SkipReason::DirectoryOverride) => "dir-override",
            Self::Fail(_) => "fail",
        }
    }
}

/// One classified plan entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedEntry {
    /// The link entry.
    pub entry: LinkEntry,
    /// What the executor does with it.
    pub action: Action,
}

/// Restricts which source entries are planned.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryFilter {
    /// Top-level names to include. Empty includes every top-level entry.
    pub entries: Vec<String>,
    /// Names excluded at every depth.
    pub exclude: Vec<String>,
}

impl EntryFilter {
    fn allows(&self, name: &str, top_level: bool) -> bool {
        if self.exclude.iter().any(|e| e == name) {
            return false;
        }
        !top_level || self.entries.is_empty() || self.entries.iter().any(|e| e == name)
    }
}

/// An ordered, classified list of entries. Parents precede children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallPlan {
    /// Canonical source root.
    pub source_root: PathBuf,
    /// Canonical target root.
    pub target_root: PathBuf,
    /// Granularity the plan was built with.
    pub granularity: Granularity,
    /// Entries in execution order; the first is always the target root.
    pub entries: Vec<PlannedEntry>,
}

impl InstallPlan {
    /// Number of entries that would change the target.
    #[must_use]
    pub fn pending_changes(&self) -> usize {
        self.entries
            .iter()
            .filter(|p| matches!(p.action, Action::Create | Action::Update))
            .count()
    }

    /// One line per entry, `<verb> <kind> <target relative to root>`.
    #[must_use]
    pub fn listing(&self) -> String {
        let mut out = String::new();
        for planned in &self.entries {
            let _ = writeln!(
                out,
                "{:<12} {:<9} {}",
                planned.action.verb(),
                planned.entry.kind.label(),
                display_relative(&planned.entry.target, &self.target_root)
            );
        }
        out
    }
}

/// Read a source directory's children, filtered and sorted by file name.
fn source_children(dir: &Path, filter: &EntryFilter, top_level: bool) -> io::Result<Vec<PathBuf>> {
    let mut children = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        if filter.allows(&name.to_string_lossy(), top_level) {
            children.push(entry.path());
        }
    }
    children.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(children)
}

/// What is at a path where the plan needs a real directory.
enum DirSlot {
    /// Nothing there.
    Absent,
    /// A real directory.
    Directory,
    /// A symlink (correct, stale, or dangling): replace with a real directory.
    Symlink,
    /// A real file: consumer override.
    File,
}

fn probe_dir_slot(path: &Path) -> io::Result<DirSlot> {
    match std::fs::symlink_metadata(path) {
        Ok(meta) if meta.file_type().is_symlink() => Ok(DirSlot::Symlink),
        Ok(meta) if meta.is_dir() => Ok(DirSlot::Directory),
        Ok(_) => Ok(DirSlot::File),
        Err(e) if is_absent(&e) => Ok(DirSlot::Absent),
        Err(e) => Err(e),
    }
}

struct Planner<'a> {
    granularity: Granularity,
    filter: &'a EntryFilter,
    entries: Vec<PlannedEntry>,
}

impl Planner<'_> {
    fn push(&mut self, entry: LinkEntry, action: Action) {
        self.entries.push(PlannedEntry { entry, action });
    }

    /// Plan a real directory at `target`. Returns `Some(fresh)` when its
    /// children should be planned, `fresh` meaning the plan creates it.
    fn plan_directory(&mut self, source: &Path, target: &Path, parent_fresh: bool) -> Option<bool> {
        let entry = LinkEntry::new(source.to_path_buf(), target.to_path_buf(), EntryKind::Directory);
        if parent_fresh {
            self.push(entry, Action::Create);
            return Some(true);
        }
        match probe_dir_slot(target) {
            Ok(DirSlot::Absent) => {
                self.push(entry, Action::Create);
                Some(true)
            }
            Ok(DirSlot::Directory) => {
                self.push(entry, Action::Skip(SkipReason::Unchanged));
                Some(false)
            }
            Ok(DirSlot::Symlink) => {
                self.push(entry, Action::Update);
                Some(true)
            }
            Ok(DirSlot::File) => {
                self.push(entry, Action::Skip(SkipReason::Override));
                None
            }
            Err(e) => {
                self.push(entry, Action::Fail(e.kind()));
                None
            }
        }
    }

    fn plan_link(&mut self, source: PathBuf, target: PathBuf, kind: EntryKind, parent_fresh: bool) {
        if parent_fresh {
            self.push(LinkEntry::new(source, target, kind), Action::Create);
            return;
        }
        let action = match classify(&source, &target) {
            Ok(LinkState::Override)
                if kind == EntryKind::DirectoryLink
                    && std::fs::symlink_metadata(&target).is_ok_and(|m| m.is_dir()) =>
            {
                Action::Skip(SkipReason::DirectoryOverride)
            }
            Ok(state) => Action::for_state(&state),
            Err(e) => Action::Fail(e.kind()),
        };
        self.push(LinkEntry::new(source, target, kind), action);
    }

    /// Plan `children` of a source directory into `target_dir`.
    ///
    /// `ancestors` holds the canonical source directories above `children`;
    /// a subdirectory resolving to one of them is a symlink cycle and is not
    /// descended into.
    fn plan_children(&mut self, children: Vec<PathBuf>, target_dir: &Path, fresh: bool, ancestors: &mut Vec<PathBuf>) {
        for source in children {
            let Some(name) = source.file_name() else {
                continue;
            };
            let target = target_dir.join(name);
            match (self.granularity, source.is_dir()) {
                (Granularity::Directory, true) => {
                    self.plan_link(source, target, EntryKind::DirectoryLink, fresh);
                }
                (_, false) => self.plan_link(source, target, EntryKind::FileLink, fresh),
                (Granularity::File, true) => self.plan_nested(source, target, fresh, ancestors),
            }
        }
    }

    /// A source subdirectory in file granularity: a real target directory
    /// whose leaves are planned in turn.
    fn plan_nested(&mut self, source: PathBuf, target: PathBuf, fresh: bool, ancestors: &mut Vec<PathBuf>) {
        let listed = dunce::canonicalize(&source).and_then(|canonical| {
            source_children(&source, self.filter, false).map(|children| (canonical, children))
        });
        let (canonical, children) = match listed {
            Ok(listed) => listed,
            Err(e) => {
                self.push(LinkEntry::new(source, target, EntryKind::Directory), Action::Fail(e.kind()));
                return;
            }
        };
        if ancestors.contains(&canonical) {
            return;
        }
        if let Some(child_fresh) = self.plan_directory(&source, &target, fresh) {
            ancestors.push(canonical);
            self.plan_children(children, &target, child_fresh, ancestors);
            ancestors.pop();
        }
    }
}

/// Build the install plan for `source_root` into `target_root`.
///
/// Pure with respect to the filesystem: it only reads. Entries are ordered
/// parent first, siblings by file name. The first entry is always the target
/// root itself as a [`EntryKind::Directory`].
///
/// # Errors
///
/// Returns an error only if the source root cannot be listed. A target path
/// that cannot be inspected becomes an [`Action::Fail`] entry instead.
pub fn plan(
    source_root: &Path,
    target_root: &Path,
    granularity: Granularity,
    filter: &EntryFilter,
) -> io::Result<InstallPlan> {
    let mut planner = Planner {
        granularity,
        filter,
        entries: Vec::new(),
    };
    let children = source_children(source_root, filter, true)?;
    if let Some(fresh) = planner.plan_directory(source_root, target_root, false) {
        let root = dunce::canonicalize(source_root).unwrap_or_else(|_| source_root.to_path_buf());
        planner.plan_children(children, target_root, fresh, &mut vec![root]);
    }
    Ok(InstallPlan {
        source_root: source_root.to_path_buf(),
        target_root: target_root.to_path_buf(),
        granularity,
        entries: planner.entries,
    })
}

/// The top-level entries a converged target must hold.
///
/// In directory granularity these are links; in file granularity a source
/// directory maps to a real [`EntryKind::Directory`] checked leaf by leaf.
///
/// # Errors
///
/// Returns an error if the source root cannot be listed.
pub fn expected_entries(
    source_root: &Path,
    target_root: &Path,
    granularity: Granularity,
    filter: &EntryFilter,
) -> io::Result<Vec<LinkEntry>> {
    let mut entries = Vec::new();
    for source in source_children(source_root, filter, true)? {
        let Some(name) = source.file_name() else {
            continue;
        };
        let target = target_root.join(name);
        let kind = match (granularity, source.is_dir()) {
            (_, false) => EntryKind::FileLink,
            (Granularity::Directory, true) => EntryKind::DirectoryLink,
            (Granularity::File, true) => EntryKind::Directory,
        };
        entries.push(LinkEntry::new(source, target, kind));
    }
    Ok(entries)
}

/// Leaf files and subdirectories under `source_dir`, filtered and sorted.
pub(crate) fn nested_children(source_dir: &Path, filter: &EntryFilter) -> io::Result<Vec<PathBuf>> {
    source_children(source_dir, filter, false)
}
