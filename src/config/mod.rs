//! Scope configuration: `agentlink.toml` plus command-line overrides.
pub mod toml_loader;

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::engine::{EntryFilter, GeneratedFile, Granularity};
use crate::error::ConfigError;
use crate::paths::{expand_home, resolve_root};

/// Name of the optional config file at the source root.
pub const CONFIG_FILE: &str = "agentlink.toml";

/// Template rendered in project scope when the config names none.
pub const DEFAULT_TEMPLATE: &str = "templates/mcp.json.template";

/// Source names never linked unless `exclude` is overridden.
pub const DEFAULT_EXCLUDE: &[&str] = &[
    ".git",
    ".github",
    ".gitignore",
    ".gitmodules",
    ".DS_Store",
    CONFIG_FILE,
    "templates",
    "README.md",
    "LICENSE",
];

/// Which consumer the run targets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum Scope {
    /// The per-user configuration directory.
    Global,
    /// The configuration directory of one project.
    #[default]
    Project,
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Global => f.write_str("global"),
            Self::Project => f.write_str("project"),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    global: ScopeSection,
    #[serde(default)]
    project: ScopeSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ScopeSection {
    target: Option<String>,
    granularity: Option<Granularity>,
    entries: Option<Vec<String>>,
    exclude: Option<Vec<String>>,
    ignore_list: Option<String>,
    template: Option<TemplateSection>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TemplateSection {
    source: String,
    output: String,
    #[serde(default)]
    variables: Vec<String>,
}

/// The template render step of a scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateStep {
    /// Template file in the source tree.
    pub source: PathBuf,
    /// Generated output file.
    pub output: PathBuf,
    /// Environment variables exposed to the template.
    pub variables: Vec<String>,
}

/// Everything resolved before the config file is read.
#[derive(Debug, Clone)]
pub struct Inputs {
    /// Source root (not yet canonicalized).
    pub source_root: PathBuf,
    /// Selected scope.
    pub scope: Scope,
    /// `--target`, already absolute.
    pub target_override: Option<PathBuf>,
    /// Project root used by the project scope.
    pub project_root: PathBuf,
    /// Home directory used by the global scope and `~` expansion.
    pub home: PathBuf,
}

/// Fully resolved configuration for one run.
#[derive(Debug, Clone)]
pub struct Config {
    /// Selected scope.
    pub scope: Scope,
    /// Canonical source root.
    pub source_root: PathBuf,
    /// Canonical target root.
    pub target_root: PathBuf,
    /// How the source maps onto the target.
    pub granularity: Granularity,
    /// Which source entries are linked.
    pub filter: EntryFilter,
    /// Template step, if the scope renders one.
    pub template: Option<TemplateStep>,
    /// Exclusion list that must name the template output.
    pub ignore_list: Option<PathBuf>,
}

/// A non-fatal problem found in a resolved configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationWarning {
    /// The setting or path that triggered the warning.
    pub item: String,
    /// Human-readable warning message.
    pub message: String,
}

impl ValidationWarning {
    #[must_use]
    fn new(item: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            item: item.into(),
            message: message.into(),
        }
    }
}

impl Config {
    /// Read `agentlink.toml` from the source root and resolve `inputs`
    /// against it.
    ///
    /// # Errors
    ///
    /// Returns an error if the source root is not a directory or the config
    /// file cannot be read or parsed.
    pub fn load(inputs: &Inputs) -> Result<Self, ConfigError> {
        let source_root = resolve_root(&inputs.source_root);
        if !source_root.is_dir() {
            return Err(ConfigError::SourceRootMissing(source_root));
        }
        let file: ConfigFile = toml_loader::load_config(&source_root.join(CONFIG_FILE))?;
        let (section, base) = match inputs.scope {
            Scope::Global => (file.global, inputs.home.as_path()),
            Scope::Project => (file.project, inputs.project_root.as_path()),
        };

        let under_base = |raw: &str| {
            let p = expand_home(raw, &inputs.home);
            if p.is_absolute() { p } else { base.join(p) }
        };

        let target = match (&inputs.target_override, &section.target) {
            (Some(path), _) => path.clone(),
            (None, Some(raw)) => under_base(raw),
            (None, None) => base.join(".claude"),
        };
        let granularity = section.granularity.unwrap_or(match inputs.scope {
            Scope::Global => Granularity::File,
            Scope::Project => Granularity::Directory,
        });
        let filter = EntryFilter {
            entries: section.entries.unwrap_or_default(),
            exclude: section
                .exclude
                .unwrap_or_else(|| DEFAULT_EXCLUDE.iter().map(ToString::to_string).collect()),
        };

        let template = match (section.template, inputs.scope) {
            (Some(t), _) => Some(TemplateStep {
                source: source_root.join(t.source),
                output: resolve_root(&under_base(&t.output)),
                variables: t.variables,
            }),
            (None, Scope::Project) if source_root.join(DEFAULT_TEMPLATE).is_file() => Some(TemplateStep {
                source: source_root.join(DEFAULT_TEMPLATE),
                output: resolve_root(&base.join(".mcp.json")),
                variables: vec!["GITHUB_TOKEN".to_string()],
            }),
            (None, _) => None,
        };
        let ignore_list = match (section.ignore_list, inputs.scope) {
            (Some(raw), _) => Some(resolve_root(&under_base(&raw))),
            (None, Scope::Project) => Some(resolve_root(&base.join(".gitignore"))),
            (None, Scope::Global) => None,
        };

        Ok(Self {
            scope: inputs.scope,
            target_root: resolve_root(&target),
            source_root,
            granularity,
            filter,
            template,
            ignore_list,
        })
    }

    /// The line the ignore list must contain for the template output: its
    /// path relative to the list's directory, `/`-separated.
    #[must_use]
    pub fn ignore_pattern(&self) -> Option<String> {
        let output = &self.template.as_ref()?.output;
        let list_dir = self.ignore_list.as_ref()?.parent()?;
        let rel = output.strip_prefix(list_dir).ok()?;
        let parts: Vec<_> = rel.iter().map(|p| p.to_string_lossy()).collect();
        Some(parts.join("/"))
    }

    /// Generated files a converged target must hold.
    #[must_use]
    pub fn generated_files(&self) -> Vec<GeneratedFile> {
        let Some(template) = &self.template else {
            return Vec::new();
        };
        let pattern = self.ignore_pattern();
        vec![GeneratedFile {
            output: template.output.clone(),
            ignore_list: pattern.as_ref().and(self.ignore_list.clone()),
            pattern: pattern.unwrap_or_default(),
        }]
    }

    /// Check the resolved configuration for likely mistakes.
    #[must_use]
    pub fn validate(&self) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();

        for name in &self.filter.entries {
            if std::fs::symlink_metadata(self.source_root.join(name)).is_err() {
                warnings.push(ValidationWarning::new(
                    format!("entries: {name}"),
                    "configured entry does not exist in the source root",
                ));
            }
        }

        if let Some(template) = &self.template
            && !template.source.is_file()
        {
            warnings.push(ValidationWarning::new(
                template.source.display().to_string(),
                "template file not found; render step will fail",
            ));
        }

        if let Some(template) = &self.template
            && self.ignore_list.is_some()
            && self.ignore_pattern().is_none()
        {
            warnings.push(ValidationWarning::new(
                template.output.display().to_string(),
                "generated file is outside the ignore list's directory and cannot be excluded",
            ));
        }

        if self.target_root.starts_with(&self.source_root) {
            warnings.push(ValidationWarning::new(
                self.target_root.display().to_string(),
                "target root is inside the source root; every entry will be refused",
            ));
        } else if self.source_root.starts_with(&self.target_root) {
            warnings.push(ValidationWarning::new(
                self.source_root.display().to_string(),
                "source root is inside the target root",
            ));
        }

        warnings
    }
}

/// Home directory from `HOME`, falling back to `USERPROFILE`.
///
/// # Errors
///
/// Returns [`ConfigError::NoHome`] if neither variable is set.
pub fn home_dir() -> Result<PathBuf, ConfigError> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .ok_or(ConfigError::NoHome)
}

/// Pick the source root: explicit flag, then `AGENTLINK_SOURCE`, then a
/// directory near the executable holding [`CONFIG_FILE`], then the current
/// directory if it holds one.
///
/// # Errors
///
/// Returns [`ConfigError::SourceRootMissing`] when no candidate applies.
pub fn resolve_source_root(
    flag: Option<&Path>,
    env: Option<PathBuf>,
    exe: Option<&Path>,
    cwd: &Path,
) -> Result<PathBuf, ConfigError> {
    if let Some(path) = flag {
        return Ok(cwd.join(path));
    }
    if let Some(path) = env.filter(|p| !p.as_os_str().is_empty()) {
        return Ok(cwd.join(path));
    }
    // <root>/target/<profile>/agentlink, or a binary installed beside the tree.
    if let Some(exe) = exe
        && let Some(found) = exe
            .ancestors()
            .skip(1)
            .take(4)
            .find(|dir| dir.join(CONFIG_FILE).is_file())
    {
        return Ok(found.to_path_buf());
    }
    if cwd.join(CONFIG_FILE).is_file() {
        return Ok(cwd.to_path_buf());
    }
    Err(ConfigError::SourceRootMissing(cwd.to_path_buf()))
}

/// The git work tree containing `cwd`, or `cwd` itself.
#[must_use]
pub fn discover_project_root(cwd: &Path) -> PathBuf {
    git2::Repository::discover(cwd)
        .ok()
        .and_then(|repo| repo.workdir().map(Path::to_path_buf))
        .map_or_else(|| cwd.to_path_buf(), |p| resolve_root(&p))
}
