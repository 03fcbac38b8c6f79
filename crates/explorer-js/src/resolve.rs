//! Module request resolution.
//!
//! Relative requests resolve against the requesting file; bare requests walk
//! up through `node_modules` directories the way Node does.

use std::path::{Path, PathBuf};

/// Extensions tried when a request omits one, in order.
const EXTENSIONS: &[&str] = &["jsx", "js", "json"];

/// Result of resolving a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    /// A project file reached through a relative or absolute request.
    Local(PathBuf),

    /// A file inside an installed package.
    Package { name: String, path: PathBuf },
}

impl Resolved {
    /// Resolved file path.
    pub fn path(&self) -> &Path {
        match self {
            Resolved::Local(path) => path,
            Resolved::Package { path, .. } => path,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("Cannot resolve '{request}' from {}", from.display())]
    NotFound { request: String, from: PathBuf },
}

/// Resolves module requests for one project root.
#[derive(Debug, Clone)]
pub struct Resolver {
    root: PathBuf,
}

impl Resolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `request` as seen from the file `from`.
    pub fn resolve(&self, request: &str, from: &Path) -> Result<Resolved, ResolveError> {
        let not_found = || ResolveError::NotFound {
            request: request.to_string(),
            from: from.to_path_buf(),
        };

        if is_relative(request) || Path::new(request).is_absolute() {
            let base = from.parent().unwrap_or(&self.root);
            let candidate = base.join(request);
            return resolve_file(&candidate)
                .or_else(|| resolve_directory(&candidate))
                .map(Resolved::Local)
                .ok_or_else(not_found);
        }

        let name = package_name(request).ok_or_else(not_found)?;
        let subpath = request[name.len()..].trim_start_matches('/');

        let start = from.parent().unwrap_or(&self.root);
        for dir in start.ancestors() {
            let package_dir = dir.join("node_modules").join(name);
            if !package_dir.is_dir() {
                continue;
            }
            let found = if subpath.is_empty() {
                resolve_directory(&package_dir)
            } else {
                let candidate = package_dir.join(subpath);
                resolve_file(&candidate).or_else(|| resolve_directory(&candidate))
            };
            if let Some(path) = found {
                return Ok(Resolved::Package {
                    name: name.to_string(),
                    path,
                });
            }
        }

        Err(not_found())
    }
}

/// Package name of a bare request (`react/lib/x` -> `react`, `@scope/pkg/x` -> `@scope/pkg`).
pub fn package_name(request: &str) -> Option<&str> {
    if request.is_empty() || is_relative(request) {
        return None;
    }
    let mut slashes = request.match_indices('/');
    let end = if request.starts_with('@') {
        slashes.nth(1)
    } else {
        slashes.next()
    };
    let name = match end {
        Some((index, _)) => &request[..index],
        None => request,
    };
    if request.starts_with('@') && !name.contains('/') {
        return None;
    }
    Some(name)
}

fn is_relative(request: &str) -> bool {
    request == "." || request == ".." || request.starts_with("./") || request.starts_with("../")
}

fn resolve_file(candidate: &Path) -> Option<PathBuf> {
    if candidate.is_file() {
        return Some(candidate.to_path_buf());
    }
    let file_name = candidate.file_name()?.to_string_lossy().into_owned();
    EXTENSIONS
        .iter()
        .map(|ext| candidate.with_file_name(format!("{file_name}.{ext}")))
        .find(|path| path.is_file())
}

fn resolve_directory(dir: &Path) -> Option<PathBuf> {
    if !dir.is_dir() {
        return None;
    }

    let manifest = dir.join("package.json");
    if let Ok(content) = std::fs::read_to_string(&manifest) {
        if let Ok(json) = serde_json::from_str::<serde_json::Value>(&content) {
            let entry = json
                .get("browser")
                .and_then(|v| v.as_str())
                .or_else(|| json.get("main").and_then(|v| v.as_str()));
            if let Some(entry) = entry {
                let candidate = dir.join(entry);
                if let Some(found) = resolve_file(&candidate).or_else(|| index_file(&candidate)) {
                    return Some(found);
                }
            }
        }
    }

    index_file(dir)
}

fn index_file(dir: &Path) -> Option<PathBuf> {
    EXTENSIONS
        .iter()
        .map(|ext| dir.join(format!("index.{ext}")))
        .find(|path| path.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    fn write(root: &Path, relative: &str, content: &str) -> PathBuf {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn resolves_relative_requests_with_extension_fallback() {
        let temp = TempDir::new().unwrap();
        let page = write(temp.path(), "pages/about/About.jsx", "");
        let nav = write(temp.path(), "components/navigation/Navigation.jsx", "");
        let resolver = Resolver::new(temp.path());

        let resolved = resolver
            .resolve("../../components/navigation/Navigation", &page)
            .unwrap();

        assert_eq!(resolved.path().canonicalize().unwrap(), nav.canonicalize().unwrap());
        assert!(matches!(resolved, Resolved::Local(_)));
    }

    #[test]
    fn resolves_directory_index() {
        let temp = TempDir::new().unwrap();
        let from = write(temp.path(), "src/main.js", "");
        let index = write(temp.path(), "src/util/index.js", "");
        let resolver = Resolver::new(temp.path());

        let resolved = resolver.resolve("./util", &from).unwrap();

        assert_eq!(resolved, Resolved::Local(index));
    }

    #[test]
    fn resolves_packages_through_manifest_main() {
        let temp = TempDir::new().unwrap();
        let from = write(temp.path(), "pages/index/Index.jsx", "");
        write(temp.path(), "node_modules/react/package.json", r#"{"main": "lib/React"}"#);
        let entry = write(temp.path(), "node_modules/react/lib/React.js", "");
        let resolver = Resolver::new(temp.path());

        let resolved = resolver.resolve("react", &from).unwrap();

        assert_eq!(
            resolved,
            Resolved::Package {
                name: "react".to_string(),
                path: entry,
            }
        );
    }

    #[test]
    fn prefers_browser_field_and_supports_subpaths() {
        let temp = TempDir::new().unwrap();
        let from = write(temp.path(), "a.js", "");
        write(
            temp.path(),
            "node_modules/react-dom/package.json",
            r#"{"main": "node.js", "browser": "browser.js"}"#,
        );
        let browser = write(temp.path(), "node_modules/react-dom/browser.js", "");
        let server = write(temp.path(), "node_modules/react-dom/server.js", "");
        let resolver = Resolver::new(temp.path());

        assert_eq!(resolver.resolve("react-dom", &from).unwrap().path(), browser.as_path());
        assert_eq!(
            resolver.resolve("react-dom/server", &from).unwrap().path(),
            server.as_path()
        );
    }

    #[test]
    fn missing_requests_report_the_requester() {
        let temp = TempDir::new().unwrap();
        let from = write(temp.path(), "a.js", "");
        let resolver = Resolver::new(temp.path());

        let err = resolver.resolve("left-pad", &from).unwrap_err();

        assert!(err.to_string().contains("left-pad"));
        assert!(err.to_string().contains("a.js"));
    }

    #[test]
    fn package_names() {
        assert_eq!(package_name("react"), Some("react"));
        assert_eq!(package_name("react-dom/server"), Some("react-dom"));
        assert_eq!(package_name("@scope/pkg/lib/x"), Some("@scope/pkg"));
        assert_eq!(package_name("@scope"), None);
        assert_eq!(package_name("./local"), None);
    }
}
