//! Whitespace checks over source files.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use super::tool::ToolError;

/// Expected leading whitespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Indentation {
    Tabs,
    Spaces(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhitespaceRules {
    pub indentation: Indentation,

    /// Reject whitespace at the end of a line
    pub trailing_spaces: bool,

    /// Require a newline at the end of non-empty files
    pub final_newline: bool,
}

/// Files selected for a check, relative to the project root.
///
/// A path of `*` selects the files directly in the root; any other path
/// selects that file, or every file below that directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSet {
    pub paths: Vec<String>,

    /// Restrict to these extensions (without the dot); empty means all
    #[serde(default)]
    pub extensions: Vec<String>,

    /// File name suffixes to skip
    #[serde(default)]
    pub exclude: Vec<String>,
}

const SKIPPED_DIRS: &[&str] = &["node_modules", "build", "coverage"];

impl FileSet {
    /// Resolve to a sorted, de-duplicated list of files under `root`.
    pub fn files(&self, root: &Path) -> Result<Vec<PathBuf>, LintError> {
        let mut files = Vec::new();
        for pattern in &self.paths {
            if pattern == "*" {
                let entries = std::fs::read_dir(root).map_err(|source| LintError::Io {
                    path: root.to_path_buf(),
                    source,
                })?;
                for entry in entries.flatten() {
                    let path = entry.path();
                    if path.is_file() && !is_hidden(&path) {
                        files.push(path);
                    }
                }
                continue;
            }

            let base = root.join(pattern);
            if base.is_file() {
                files.push(base);
            } else if base.is_dir() {
                let walker = WalkDir::new(&base)
                    .into_iter()
                    .filter_entry(|e| e.depth() == 0 || !(is_hidden(e.path()) || is_skipped_dir(e.path())));
                for entry in walker {
                    let entry = entry.map_err(|e| LintError::Io {
                        path: base.clone(),
                        source: e.into(),
                    })?;
                    if entry.file_type().is_file() {
                        files.push(entry.into_path());
                    }
                }
            }
        }

        files.retain(|path| self.selects(path));
        files.sort();
        files.dedup();
        Ok(files)
    }

    fn selects(&self, path: &Path) -> bool {
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        if self.exclude.iter().any(|suffix| name.ends_with(suffix.as_str())) {
            return false;
        }
        if self.extensions.is_empty() {
            return true;
        }
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|wanted| wanted == ext))
    }
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('.'))
}

fn is_skipped_dir(path: &Path) -> bool {
    path.is_dir()
        && path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| SKIPPED_DIRS.contains(&n))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WhitespaceRule {
    Indentation,
    TrailingSpaces,
    FinalNewline,
}

impl fmt::Display for WhitespaceRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            WhitespaceRule::Indentation => "unexpected indentation",
            WhitespaceRule::TrailingSpaces => "trailing whitespace",
            WhitespaceRule::FinalNewline => "missing final newline",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub path: PathBuf,
    pub line: usize,
    pub rule: WhitespaceRule,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.path.display(), self.line, self.rule)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LintError {
    #[error("{} whitespace violation(s):\n{}", .0.len(), format_violations(.0))]
    Violations(Vec<Violation>),

    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Tool(#[from] ToolError),
}

fn format_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|v| format!("  {v}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Check one file's text. Returns `(line, rule)` pairs, 1-based.
pub fn check_whitespace(text: &str, rules: &WhitespaceRules) -> Vec<(usize, WhitespaceRule)> {
    let mut found = Vec::new();

    for (i, line) in text.lines().enumerate() {
        let line_no = i + 1;
        let line = line.strip_suffix('\r').unwrap_or(line);

        if rules.trailing_spaces && line.ends_with([' ', '\t']) {
            found.push((line_no, WhitespaceRule::TrailingSpaces));
        }
        if line.trim().is_empty() {
            continue;
        }
        if !indentation_ok(line, rules.indentation) {
            found.push((line_no, WhitespaceRule::Indentation));
        }
    }

    if rules.final_newline && !text.is_empty() && !text.ends_with('\n') {
        found.push((text.lines().count().max(1), WhitespaceRule::FinalNewline));
    }

    found
}

fn indentation_ok(line: &str, indentation: Indentation) -> bool {
    let body = line.trim_start_matches([' ', '\t']);
    let leading = &line[..line.len() - body.len()];

    match indentation {
        Indentation::Tabs => {
            let after_tabs = leading.trim_start_matches('\t');
            // Block comment continuation: tabs, one space, then `*`.
            after_tabs.is_empty() || (after_tabs == " " && body.starts_with('*'))
        }
        Indentation::Spaces(width) => {
            !leading.contains('\t') && (width == 0 || leading.len() % width == 0)
        }
    }
}

/// Check every file in `files` under `root`.
///
/// Files that are not UTF-8 are skipped.
pub fn lint_whitespace(root: &Path, files: &FileSet, rules: &WhitespaceRules) -> Result<(), LintError> {
    let mut violations = Vec::new();

    for path in files.files(root)? {
        let bytes = std::fs::read(&path).map_err(|source| LintError::Io {
            path: path.clone(),
            source,
        })?;
        let Ok(text) = String::from_utf8(bytes) else {
            tracing::debug!("Skipping non-UTF-8 file {}", path.display());
            continue;
        };

        let display = path.strip_prefix(root).unwrap_or(&path).to_path_buf();
        violations.extend(check_whitespace(&text, rules).into_iter().map(|(line, rule)| Violation {
            path: display.clone(),
            line,
            rule,
        }));
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(LintError::Violations(violations))
    }
}
