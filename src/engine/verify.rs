//! Read-only verification of a converged target.
use std::io;
use std::path::{Path, PathBuf};

use super::plan::{EntryFilter, nested_children};
use super::report::{Check, VerificationEntry, VerificationReport};
use crate::resources::{EntryKind, LinkEntry, LinkState, classify, ignore_list, is_absent};

/// A generated file a converged target must hold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    /// Where the rendered output lives.
    pub output: PathBuf,
    /// Exclusion list that must name the output, if any.
    pub ignore_list: Option<PathBuf>,
    /// Line the exclusion list must contain.
    pub pattern: String,
}

fn check_state(state: &LinkState) -> Check {
    match state {
        LinkState::CorrectLink => Check::Pass("link"),
        LinkState::Override => Check::Pass("override"),
        LinkState::Absent => Check::Fail("missing".to_string()),
        LinkState::StaleLink { current } => {
            Check::Fail(format!("stale link to {}", current.display()))
        }
    }
}

fn check_or_fail(result: io::Result<Check>) -> Check {
    result.unwrap_or_else(|e| Check::Fail(format!("cannot inspect: {e}")))
}

/// Check a real directory leaf by leaf, appending one check per leaf.
///
/// Source subdirectories that resolve to a directory already being walked
/// are never installed, so they are not expected either.
fn verify_tree(
    source: &Path,
    target: &Path,
    filter: &EntryFilter,
    ancestors: &mut Vec<PathBuf>,
    out: &mut Vec<VerificationEntry>,
) {
    let children = match nested_children(source, filter) {
        Ok(children) => children,
        Err(e) => {
            out.push(VerificationEntry {
                path: target.to_path_buf(),
                check: Check::Fail(format!("cannot list {}: {e}", source.display())),
            });
            return;
        }
    };
    ancestors.push(dunce::canonicalize(source).unwrap_or_else(|_| source.to_path_buf()));
    for child in children {
        let Some(name) = child.file_name() else {
            continue;
        };
        let child_target = target.join(name);
        if child.is_dir() {
            if dunce::canonicalize(&child).is_ok_and(|c| ancestors.contains(&c)) {
                continue;
            }
            verify_directory(&child, &child_target, filter, ancestors, out);
        } else {
            let check = check_or_fail(classify(&child, &child_target).map(|s| check_state(&s)));
            out.push(VerificationEntry {
                path: child_target,
                check,
            });
        }
    }
    ancestors.pop();
}

/// A directory entry in file granularity: real directories are checked
/// leaf by leaf, anything else is judged like a link.
fn verify_directory(
    source: &Path,
    target: &Path,
    filter: &EntryFilter,
    ancestors: &mut Vec<PathBuf>,
    out: &mut Vec<VerificationEntry>,
) {
    match std::fs::symlink_metadata(target) {
        Ok(meta) if meta.is_dir() && !meta.file_type().is_symlink() => {
            verify_tree(source, target, filter, ancestors, out);
        }
        Ok(_) => {
            let check = check_or_fail(classify(source, target).map(|s| check_state(&s)));
            out.push(VerificationEntry {
                path: target.to_path_buf(),
                check,
            });
        }
        Err(e) => {
            let check = if is_absent(&e) {
                Check::Fail("missing".to_string())
            } else {
                Check::Fail(format!("cannot inspect: {e}"))
            };
            out.push(VerificationEntry {
                path: target.to_path_buf(),
                check,
            });
        }
    }
}

fn verify_generated(file: &GeneratedFile) -> Vec<VerificationEntry> {
    let mut out = Vec::new();
    let check = match std::fs::metadata(&file.output) {
        Ok(meta) if meta.len() > 0 => Check::Pass("generated"),
        Ok(_) => Check::Fail("empty".to_string()),
        Err(e) if is_absent(&e) => Check::Fail("missing".to_string()),
        Err(e) => Check::Fail(format!("cannot inspect: {e}")),
    };
    out.push(VerificationEntry {
        path: file.output.clone(),
        check,
    });

    if let Some(list) = &file.ignore_list {
        let check = match ignore_list::contains(list, &file.pattern) {
            Ok(true) => Check::Pass("ignored"),
            Ok(false) => Check::Fail(format!("{} not listed", file.pattern)),
            Err(e) => Check::Fail(format!("cannot read: {e}")),
        };
        out.push(VerificationEntry {
            path: list.clone(),
            check,
        });
    }
    out
}

/// Re-derive link state for every expected entry and generated file.
///
/// Links pass as `CorrectLink` or `Override` and fail as `Absent` or
/// `StaleLink`. Generated files pass when present and non-empty; their
/// exclusion list must name them. Performs no writes.
#[must_use]
pub fn verify(
    target_root: &Path,
    expected: &[LinkEntry],
    generated: &[GeneratedFile],
    filter: &EntryFilter,
) -> VerificationReport {
    let mut links = Vec::new();
    for entry in expected {
        match entry.kind {
            EntryKind::Directory => {
                let mut ancestors: Vec<PathBuf> = entry
                    .source
                    .parent()
                    .and_then(|root| dunce::canonicalize(root).ok())
                    .into_iter()
                    .collect();
                verify_directory(&entry.source, &entry.target, filter, &mut ancestors, &mut links);
            }
            EntryKind::DirectoryLink | EntryKind::FileLink => {
                let check =
                    check_or_fail(classify(&entry.source, &entry.target).map(|s| check_state(&s)));
                links.push(VerificationEntry {
                    path: entry.target.clone(),
                    check,
                });
            }
        }
    }

    VerificationReport {
        target_root: target_root.to_path_buf(),
        links,
        generated: generated.iter().flat_map(verify_generated).collect(),
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::engine::plan::{Granularity, expected_entries};

    struct Tree {
        _dir: tempfile::TempDir,
        base: PathBuf,
        source: PathBuf,
        target: PathBuf,
    }

    fn tree() -> Tree {
        let dir = tempfile::tempdir().unwrap();
        let base = dunce::canonicalize(dir.path()).unwrap();
        let source = base.join("shared");
        let target = base.join("work").join(".claude");
        std::fs::create_dir_all(source.join("agents")).unwrap();
        std::fs::write(source.join("agents").join("reviewer.md"), "r").unwrap();
        std::fs::create_dir_all(&target).unwrap();
        Tree {
            _dir: dir,
            base,
            source,
            target,
        }
    }

    fn snapshot(path: &Path) -> Vec<(PathBuf, Vec<u8>)> {
        let mut out = Vec::new();
        for entry in std::fs::read_dir(path).unwrap() {
            let p = entry.unwrap().path();
            let meta = std::fs::symlink_metadata(&p).unwrap();
            if meta.is_dir() {
                out.extend(snapshot(&p));
            } else if meta.is_file() {
                out.push((p.clone(), std::fs::read(&p).unwrap()));
            } else {
                out.push((p.clone(), Vec::new()));
            }
        }
        out.sort();
        out
    }

    #[test]
    fn missing_entry_fails() {
        let t = tree();
        let expected =
            expected_entries(&t.source, &t.target, Granularity::Directory, &EntryFilter::default())
                .unwrap();
        let report = verify(&t.target, &expected, &[], &EntryFilter::default());
        assert!(!report.is_success());
        assert_eq!(report.links[0].check, Check::Fail("missing".to_string()));
    }

    #[test]
    fn override_passes() {
        let t = tree();
        std::fs::create_dir(t.target.join("agents")).unwrap();
        let expected =
            expected_entries(&t.source, &t.target, Granularity::Directory, &EntryFilter::default())
                .unwrap();
        let report = verify(&t.target, &expected, &[], &EntryFilter::default());
        assert!(report.is_success());
        assert_eq!(report.links[0].check, Check::Pass("override"));
    }

    #[cfg(unix)]
    #[test]
    fn stale_link_fails_and_correct_link_passes() {
        let t = tree();
        std::os::unix::fs::symlink("/nonexistent", t.target.join("agents")).unwrap();
        let expected =
            expected_entries(&t.source, &t.target, Granularity::Directory, &EntryFilter::default())
                .unwrap();
        let report = verify(&t.target, &expected, &[], &EntryFilter::default());
        assert!(matches!(&report.links[0].check, Check::Fail(msg) if msg.starts_with("stale link")));

        std::fs::remove_file(t.target.join("agents")).unwrap();
        std::os::unix::fs::symlink("../../shared/agents", t.target.join("agents")).unwrap();
        let report = verify(&t.target, &expected, &[], &EntryFilter::default());
        assert!(report.is_success());
    }

    #[cfg(unix)]
    #[test]
    fn file_granularity_checks_leaves() {
        let t = tree();
        std::fs::write(t.source.join("agents").join("writer.md"), "w").unwrap();
        std::fs::create_dir(t.target.join("agents")).unwrap();
        std::os::unix::fs::symlink(
            "../../../shared/agents/reviewer.md",
            t.target.join("agents").join("reviewer.md"),
        )
        .unwrap();
        let expected =
            expected_entries(&t.source, &t.target, Granularity::File, &EntryFilter::default())
                .unwrap();
        let report = verify(&t.target, &expected, &[], &EntryFilter::default());
        let checks: Vec<_> = report.links.iter().map(|e| e.check.clone()).collect();
        assert_eq!(
            checks,
            vec![Check::Pass("link"), Check::Fail("missing".to_string())]
        );
    }

    #[cfg(unix)]
    #[test]
    fn source_cycle_is_not_expected_in_target() {
        let t = tree();
        std::os::unix::fs::symlink("..", t.source.join("agents").join("up")).unwrap();
        std::fs::create_dir(t.target.join("agents")).unwrap();
        std::os::unix::fs::symlink(
            "../../../shared/agents/reviewer.md",
            t.target.join("agents").join("reviewer.md"),
        )
        .unwrap();
        let expected =
            expected_entries(&t.source, &t.target, Granularity::File, &EntryFilter::default())
                .unwrap();
        let report = verify(&t.target, &expected, &[], &EntryFilter::default());
        assert!(report.is_success());
        assert_eq!(report.links.len(), 1);
    }

    #[test]
    fn generated_file_requires_content_and_ignore_line() {
        let t = tree();
        let project = t.base.join("work");
        let file = GeneratedFile {
            output: project.join(".mcp.json"),
            ignore_list: Some(project.join(".gitignore")),
            pattern: ".mcp.json".to_string(),
        };
        let report = verify(&t.target, &[], std::slice::from_ref(&file), &EntryFilter::default());
        assert_eq!(report.failures().count(), 2);

        std::fs::write(&file.output, "{}").unwrap();
        std::fs::write(project.join(".gitignore"), "target/\n.mcp.json\n").unwrap();
        let report = verify(&t.target, &[], std::slice::from_ref(&file), &EntryFilter::default());
        assert!(report.is_success());

        std::fs::write(&file.output, "").unwrap();
        let report = verify(&t.target, &[], std::slice::from_ref(&file), &EntryFilter::default());
        assert_eq!(report.generated[0].check, Check::Fail("empty".to_string()));
    }

    #[cfg(unix)]
    #[test]
    fn verification_never_writes() {
        let t = tree();
        std::os::unix::fs::symlink("/nonexistent", t.target.join("agents")).unwrap();
        let project = t.base.join("work");
        let file = GeneratedFile {
            output: project.join(".mcp.json"),
            ignore_list: Some(project.join(".gitignore")),
            pattern: ".mcp.json".to_string(),
        };
        let before = snapshot(&t.base);
        let expected =
            expected_entries(&t.source, &t.target, Granularity::File, &EntryFilter::default())
                .unwrap();
        let _ = verify(&t.target, &expected, &[file], &EntryFilter::default());
        assert_eq!(before, snapshot(&t.base));
    }
}
