//! `${VAR}` template rendering for the generated connection config.
use std::collections::BTreeMap;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use super::helpers::fs::ensure_parent_dir;
use crate::error::TemplateError;

/// Text produced by substituting variables into a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    /// Rendered text.
    pub text: String,
    /// Placeholder names that had no value, in first-seen order, deduplicated.
    pub missing: Vec<String>,
}

/// Result of a render (or a dry-run preview) of one template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOutcome {
    /// Output path that was (or would be) written.
    pub output: PathBuf,
    /// Variables substituted with an empty string.
    pub missing: Vec<String>,
    /// Parse error when a `.json` output is not valid JSON.
    pub json_error: Option<String>,
    /// Size of the rendered text in bytes.
    pub bytes: usize,
    /// `false` for a dry-run preview.
    pub written: bool,
}

/// Replace `${NAME}` placeholders using `lookup`.
///
/// A name is `[A-Za-z_][A-Za-z0-9_]*`. A placeholder with no value becomes
/// the empty string and its name is recorded in [`Rendered::missing`].
/// Anything else after `${` (an empty `${}`, a missing `}`, or a name with
/// other characters) is emitted literally.
///
/// # Examples
///
/// ```
/// use agentlink::resources::template::render_str;
///
/// let out = render_str("token=${TOKEN};", |_| None);
/// assert_eq!(out.text, "token=;");
/// assert_eq!(out.missing, vec!["TOKEN".to_string()]);
/// ```
pub fn render_str(input: &str, lookup: impl Fn(&str) -> Option<String>) -> Rendered {
    let mut text = String::with_capacity(input.len());
    let mut missing: Vec<String> = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '$' || chars.peek() != Some(&'{') {
            text.push(ch);
            continue;
        }
        chars.next(); // consume '{'
        let mut name = String::new();
        while let Some(&c) = chars.peek() {
            if !(c.is_ascii_alphanumeric() || c == '_') {
                break;
            }
            name.push(c);
            chars.next();
        }
        let valid = name
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
        if valid && chars.peek() == Some(&'}') {
            chars.next();
            match lookup(&name) {
                Some(value) => text.push_str(&value),
                None => {
                    if !missing.contains(&name) {
                        missing.push(name);
                    }
                }
            }
        } else {
            // Not a placeholder; the next char is scanned normally.
            text.push_str("${");
            text.push_str(&name);
        }
    }

    Rendered { text, missing }
}

/// Render `template` into `output`, overwriting it unconditionally.
///
/// The output is not subject to override precedence: it is always
/// regenerated. On Unix it is written owner-read/write only.
///
/// # Errors
///
/// Returns [`TemplateError::Unreadable`] if the template cannot be read and
/// [`TemplateError::Write`] if the output cannot be written.
pub fn render(
    template: &Path,
    output: &Path,
    variables: &BTreeMap<String, String>,
) -> Result<RenderOutcome, TemplateError> {
    let rendered = load_and_render(template, variables)?;
    write_private(output, &rendered.text).map_err(|source| TemplateError::Write {
        path: output.to_path_buf(),
        source,
    })?;
    Ok(outcome(output, rendered, true))
}

/// Compute what [`render`] would write, without touching `output`.
///
/// # Errors
///
/// Returns [`TemplateError::Unreadable`] if the template cannot be read.
pub fn preview(
    template: &Path,
    output: &Path,
    variables: &BTreeMap<String, String>,
) -> Result<RenderOutcome, TemplateError> {
    let rendered = load_and_render(template, variables)?;
    Ok(outcome(output, rendered, false))
}

fn load_and_render(
    template: &Path,
    variables: &BTreeMap<String, String>,
) -> Result<Rendered, TemplateError> {
    let input = std::fs::read_to_string(template).map_err(|source| TemplateError::Unreadable {
        path: template.to_path_buf(),
        source,
    })?;
    Ok(render_str(&input, |name| variables.get(name).cloned()))
}

fn outcome(output: &Path, rendered: Rendered, written: bool) -> RenderOutcome {
    let is_json = output
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));
    let json_error = if is_json {
        serde_json::from_str::<serde_json::Value>(&rendered.text)
            .err()
            .map(|e| e.to_string())
    } else {
        None
    };
    RenderOutcome {
        output: output.to_path_buf(),
        missing: rendered.missing,
        json_error,
        bytes: rendered.text.len(),
        written,
    }
}

/// Write `contents` to `path`, truncating, with mode 0600 on Unix.
fn write_private(path: &Path, contents: &str) -> std::io::Result<()> {
    ensure_parent_dir(path)?;
    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    file.write_all(contents.as_bytes())?;

    // `mode` only applies on creation; tighten a pre-existing file too.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn substitutes_known_variable() {
        let out = render_str("key=${TOKEN}", |n| (n == "TOKEN").then(|| "abc".to_string()));
        assert_eq!(out.text, "key=abc");
        assert!(out.missing.is_empty());
    }

    #[test]
    fn missing_variable_is_empty_and_reported_once() {
        let out = render_str("${A}-${B}-${A}", |n| (n == "B").then(|| "b".to_string()));
        assert_eq!(out.text, "-b-");
        assert_eq!(out.missing, vec!["A".to_string()]);
    }

    #[test]
    fn malformed_placeholders_are_literal() {
        let out = render_str("cost $5 ${} ${OPEN", |_| Some("x".to_string()));
        assert_eq!(out.text, "cost $5 ${} ${OPEN");
        assert!(out.missing.is_empty());
    }

    #[test]
    fn only_identifier_names_are_placeholders() {
        let input = r#"{"cmd": "echo ${", "x": {}, "n": "${1A}", "y": "${A B}", "ok": "${_T1}"}"#;
        let out = render_str(input, |n| (n == "_T1").then(|| "v".to_string()));
        assert_eq!(
            out.text,
            r#"{"cmd": "echo ${", "x": {}, "n": "${1A}", "y": "${A B}", "ok": "v"}"#
        );
        assert!(out.missing.is_empty());
    }

    #[test]
    fn placeholder_does_not_span_lines() {
        let out = render_str("${A\n}", |_| Some("x".to_string()));
        assert_eq!(out.text, "${A\n}");
        assert!(out.missing.is_empty());
    }

    #[test]
    fn render_writes_output_and_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("mcp.json.template");
        std::fs::write(&template, r#"{"token": "${TOKEN}"}"#).unwrap();
        let output = dir.path().join("project").join(".mcp.json");

        let first = render(&template, &output, &vars(&[("TOKEN", "one")])).unwrap();
        assert!(first.written);
        assert!(first.json_error.is_none());
        assert_eq!(
            std::fs::read_to_string(&output).unwrap(),
            r#"{"token": "one"}"#
        );

        render(&template, &output, &vars(&[("TOKEN", "two")])).unwrap();
        assert_eq!(
            std::fs::read_to_string(&output).unwrap(),
            r#"{"token": "two"}"#
        );
    }

    #[test]
    fn render_with_unset_token_still_writes() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("t");
        std::fs::write(&template, r#"{"token": "${TOKEN}"}"#).unwrap();
        let output = dir.path().join(".mcp.json");

        let outcome = render(&template, &output, &BTreeMap::new()).unwrap();
        assert_eq!(outcome.missing, vec!["TOKEN".to_string()]);
        assert_eq!(
            std::fs::read_to_string(&output).unwrap(),
            r#"{"token": ""}"#
        );
    }

    #[cfg(unix)]
    #[test]
    fn render_output_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("t");
        std::fs::write(&template, "secret").unwrap();
        let output = dir.path().join("out.txt");
        std::fs::write(&output, "old").unwrap();
        std::fs::set_permissions(&output, std::fs::Permissions::from_mode(0o644)).unwrap();

        render(&template, &output, &BTreeMap::new()).unwrap();
        let mode = std::fs::metadata(&output).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn invalid_json_output_is_flagged() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("t");
        std::fs::write(&template, r#"{"token": ${TOKEN}}"#).unwrap();
        let outcome = preview(&template, &dir.path().join(".mcp.json"), &BTreeMap::new()).unwrap();
        assert!(outcome.json_error.is_some());
    }

    #[test]
    fn preview_does_not_write() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("t");
        std::fs::write(&template, "${X}").unwrap();
        let output = dir.path().join("out");
        let outcome = preview(&template, &output, &BTreeMap::new()).unwrap();
        assert!(!outcome.written);
        assert_eq!(outcome.missing, vec!["X".to_string()]);
        assert!(!output.exists());
    }

    #[test]
    fn unreadable_template_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = render(
            &dir.path().join("missing"),
            &dir.path().join("out"),
            &BTreeMap::new(),
        )
        .unwrap_err();
        assert!(matches!(err, TemplateError::Unreadable { .. }));
        assert!(!dir.path().join("out").exists());
    }
}
