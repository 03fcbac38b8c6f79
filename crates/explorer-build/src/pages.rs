//! Page discovery.

use std::path::{Path, PathBuf};

use crate::error::DiscoveryError;

/// One page of the site: an entry component and its output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub name: String,

    /// `<pages>/<name>/<StrongCase(name)>.jsx`
    pub entry: PathBuf,

    /// `<build>/<name>`
    pub output_dir: PathBuf,
}

impl Page {
    pub fn bundle_path(&self) -> PathBuf {
        self.output_dir.join("main.js")
    }

    pub fn document_path(&self) -> PathBuf {
        self.output_dir.join("index.html")
    }
}

/// Enumerate pages: one per immediate, non-hidden subdirectory of `pages_dir`,
/// sorted by name.
pub fn discover_pages(pages_dir: &Path, build_dir: &Path) -> Result<Vec<Page>, DiscoveryError> {
    if !pages_dir.is_dir() {
        return Err(DiscoveryError::Missing(pages_dir.to_path_buf()));
    }

    let io_err = |source| DiscoveryError::Io {
        path: pages_dir.to_path_buf(),
        source,
    };

    let mut pages = Vec::new();
    for entry in std::fs::read_dir(pages_dir).map_err(io_err)? {
        let entry = entry.map_err(io_err)?;
        if !entry.file_type().map_err(io_err)?.is_dir() {
            continue;
        }
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            tracing::warn!("Skipping page directory with non-UTF-8 name: {:?}", entry.file_name());
            continue;
        };
        if name.starts_with('.') {
            continue;
        }

        let dir = entry.path();
        pages.push(Page {
            entry: entry_file(&dir, &name),
            output_dir: build_dir.join(&name),
            name,
        });
    }

    pages.sort_by(|a, b| a.name.cmp(&b.name));
    tracing::debug!(
        "Discovered {} page(s): {}",
        pages.len(),
        pages.iter().map(|p| p.name.as_str()).collect::<Vec<_>>().join(", ")
    );
    Ok(pages)
}

/// The page's entry file, accepting a case-insensitive match of the
/// expected name when the exact file is absent.
fn entry_file(dir: &Path, name: &str) -> PathBuf {
    let expected = format!("{}.jsx", strong_case(name));
    let exact = dir.join(&expected);
    if exact.is_file() {
        return exact;
    }

    std::fs::read_dir(dir)
        .into_iter()
        .flatten()
        .flatten()
        .map(|entry| entry.path())
        .find(|path| {
            path.is_file()
                && path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.eq_ignore_ascii_case(&expected))
        })
        .unwrap_or(exact)
}

/// Camel-case `name` with its first letter capitalized
/// (`project-list` -> `ProjectList`).
pub fn strong_case(name: &str) -> String {
    words(name)
        .into_iter()
        .map(|word| {
            let lower = word.to_lowercase();
            let mut chars = lower.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect()
}

/// Split on non-alphanumerics, lower-to-upper transitions, the end of an
/// acronym (`XMLHttp` -> `XML`, `Http`) and letter/digit boundaries.
fn words(name: &str) -> Vec<String> {
    let mut words = Vec::new();

    for segment in name.split(|c: char| !c.is_alphanumeric()) {
        let chars: Vec<char> = segment.chars().collect();
        let mut current = String::new();
        for (i, &c) in chars.iter().enumerate() {
            if let Some(&prev) = i.checked_sub(1).and_then(|p| chars.get(p)) {
                let next = chars.get(i + 1).copied();
                let boundary = (prev.is_lowercase() && c.is_uppercase())
                    || (prev.is_uppercase() && c.is_uppercase() && next.is_some_and(char::is_lowercase))
                    || (prev.is_numeric() != c.is_numeric());
                if boundary && !current.is_empty() {
                    words.push(std::mem::take(&mut current));
                }
            }
            current.push(c);
        }
        if !current.is_empty() {
            words.push(current);
        }
    }

    words
}
