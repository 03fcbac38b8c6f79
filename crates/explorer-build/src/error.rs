//! Error types for the build stages.

use std::path::PathBuf;

use explorer_js::{ModuleError, ResolveError};
use explorer_render::RenderError;

use crate::minify::MinifierError;

/// Errors while enumerating pages.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("Pages directory not found: {}", .0.display())]
    Missing(PathBuf),

    #[error("Failed to read pages directory {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors while producing a bundle.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Cannot resolve '{request}' from {}", from.display())]
    Unresolved { request: String, from: PathBuf },

    #[error("Shared library '{name}' is not installed: {source}")]
    SharedLibrary {
        name: String,
        #[source]
        source: ResolveError,
    },

    #[error("Syntax error in {}: {message}", path.display())]
    Syntax { path: PathBuf, message: String },

    #[error("Failed to transform {}: {source}", path.display())]
    Module {
        path: PathBuf,
        #[source]
        source: ModuleError,
    },

    #[error("Invalid JSON module {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl BuildError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| BuildError::Io { path, source }
    }

    /// Attach the module path to a lowering failure.
    pub(crate) fn module(path: impl Into<PathBuf>, err: ModuleError) -> Self {
        let path = path.into();
        match err {
            ModuleError::Syntax(err) => BuildError::Syntax {
                path,
                message: err.to_string(),
            },
            other => BuildError::Module { path, source: other },
        }
    }
}

impl From<ResolveError> for BuildError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::NotFound { request, from } => BuildError::Unresolved { request, from },
        }
    }
}

/// Errors while rendering a page document.
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("Template not found: {}", .0.display())]
    Missing(PathBuf),

    #[error("Malformed template {}: {source}", path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: minijinja::Error,
    },

    #[error("Template {} has no '{slot}' interpolation point", path.display())]
    MissingSlot { path: PathBuf, slot: &'static str },

    #[error("Failed to render page '{page}': {source}")]
    Render {
        page: String,
        #[source]
        source: RenderError,
    },

    #[error("Failed to fill template for page '{page}': {source}")]
    Fill {
        page: String,
        #[source]
        source: minijinja::Error,
    },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors while minifying build output.
#[derive(Debug, thiserror::Error)]
pub enum MinifyError {
    #[error("Cannot minify {}: {source}", path.display())]
    Minify {
        path: PathBuf,
        #[source]
        source: MinifierError,
    },

    #[error("Failed to walk {}: {source}", path.display())]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("Failed to encode source map for {}: {source}", path.display())]
    SourceMap {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
