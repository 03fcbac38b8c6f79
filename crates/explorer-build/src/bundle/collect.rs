//! Module graph collection.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::path::{Component as PathComponent, Path, PathBuf};

use explorer_js::{collect_requires, lower_module, LowerOptions, Resolved, Resolver};

use crate::config::SharedLibrarySet;
use crate::error::BuildError;

/// A module ready to be wrapped into a bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CollectedModule {
    pub id: String,
    pub code: String,

    /// Request -> module id, or the library name for externals
    pub deps: BTreeMap<String, String>,
}

/// How a file's source is turned into module code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SourceKind {
    /// Project source: ES modules and JSX are lowered
    Local,

    /// Installed package: CommonJS, included as is
    Package,

    Json,
}

/// Walks `require` graphs from entry files, visiting each file once.
pub(crate) struct Collector<'a> {
    root: PathBuf,
    resolver: &'a Resolver,
    jsx: &'a LowerOptions,
    externals: Option<&'a SharedLibrarySet>,
    ids: HashMap<PathBuf, String>,
    queue: VecDeque<(PathBuf, String)>,
    modules: Vec<CollectedModule>,
    used_externals: Vec<String>,
}

impl<'a> Collector<'a> {
    /// `externals` names requests left for an earlier bundle to satisfy.
    pub fn new(resolver: &'a Resolver, jsx: &'a LowerOptions, externals: Option<&'a SharedLibrarySet>) -> Self {
        Self {
            root: normalize(resolver.root()),
            resolver,
            jsx,
            externals,
            ids: HashMap::new(),
            queue: VecDeque::new(),
            modules: Vec::new(),
            used_externals: Vec::new(),
        }
    }

    /// Add `path` and everything it requires. Returns the module id.
    pub fn add(&mut self, path: &Path) -> Result<String, BuildError> {
        let id = self.enqueue(path);
        while let Some((path, id)) = self.queue.pop_front() {
            let module = self.collect(&path, id)?;
            self.modules.push(module);
        }
        Ok(id)
    }

    /// Collected modules in discovery order, and the externals they reference.
    pub fn finish(self) -> (Vec<CollectedModule>, Vec<String>) {
        (self.modules, self.used_externals)
    }

    fn enqueue(&mut self, path: &Path) -> String {
        let path = normalize(path);
        if let Some(id) = self.ids.get(&path) {
            return id.clone();
        }
        let id = module_id(&self.root, &path);
        self.ids.insert(path.clone(), id.clone());
        self.queue.push_back((path, id.clone()));
        id
    }

    fn collect(&mut self, path: &Path, id: String) -> Result<CollectedModule, BuildError> {
        let source = std::fs::read_to_string(path).map_err(BuildError::io(path))?;

        let (code, requests) = match source_kind(path) {
            SourceKind::Json => {
                serde_json::from_str::<serde_json::Value>(&source).map_err(|source| BuildError::Json {
                    path: path.to_path_buf(),
                    source,
                })?;
                (format!("module.exports = {};", source.trim()), Vec::new())
            }
            SourceKind::Package => {
                let requests = collect_requires(&source).map_err(|e| BuildError::module(path, e.into()))?;
                (source, requests)
            }
            SourceKind::Local => {
                let lowered = lower_module(&source, self.jsx).map_err(|e| BuildError::module(path, e))?;
                (lowered.code, lowered.requests)
            }
        };
        tracing::debug!("Collected {} ({} request(s))", id, requests.len());

        let mut deps = BTreeMap::new();
        for request in requests {
            if self.externals.is_some_and(|set| set.is_external(&request)) {
                if !self.used_externals.contains(&request) {
                    self.used_externals.push(request.clone());
                }
                deps.insert(request.clone(), request);
                continue;
            }

            let resolved = self.resolver.resolve(&request, path)?;
            let target = match &resolved {
                Resolved::Local(path) | Resolved::Package { path, .. } => self.enqueue(path),
            };
            deps.insert(request, target);
        }

        Ok(CollectedModule { id, code, deps })
    }
}

fn source_kind(path: &Path) -> SourceKind {
    if path.extension().is_some_and(|ext| ext == "json") {
        SourceKind::Json
    } else if path.components().any(|c| c.as_os_str() == "node_modules") {
        SourceKind::Package
    } else {
        SourceKind::Local
    }
}

/// Root-relative path with `/` separators; absolute path outside the root.
fn module_id(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Fold `.` and `..` without touching the filesystem.
pub(crate) fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            PathComponent::CurDir => {}
            PathComponent::ParentDir => {
                let popped = matches!(out.components().next_back(), Some(PathComponent::Normal(_))) && out.pop();
                if !popped {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
