//! Build configuration.

use std::path::PathBuf;
use std::sync::Arc;

use explorer_js::LowerOptions;
use explorer_tasks::FailurePolicy;

use crate::quality::{CoverageThresholds, ExternalTool, FileSet, Indentation, WhitespaceRules};

/// Libraries bundled once into `shared.js` and treated as external by every page.
pub const DEFAULT_SHARED_LIBS: &[&str] = &["react", "redux", "react-redux", "react-dom"];

/// Ordered, de-duplicated set of shared library names.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SharedLibrarySet {
    names: Vec<String>,
}

impl SharedLibrarySet {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set = Self::default();
        for name in names {
            let name = name.into();
            if !set.names.contains(&name) {
                set.names.push(name);
            }
        }
        set
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Whether a `require` request names a shared library exactly.
    pub fn is_external(&self, request: &str) -> bool {
        self.names.iter().any(|name| name == request)
    }
}

/// Settings for the lint and coverage tasks.
#[derive(Debug, Clone, PartialEq)]
pub struct QualityConfig {
    pub thresholds: CoverageThresholds,

    /// istanbul `json-summary` report, relative to the project root
    pub coverage_summary: PathBuf,

    /// Command that runs the test suite and writes the coverage summary
    pub test_command: Option<ExternalTool>,

    /// Source files checked by `lint:whitespace`
    pub whitespace: FileSet,
    pub whitespace_rules: WhitespaceRules,

    /// Files checked by `lint:package`
    pub package_files: FileSet,
    pub package_rules: WhitespaceRules,

    /// External linters, each registered as `lint:<name>`
    pub linters: Vec<ExternalTool>,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            thresholds: CoverageThresholds::default(),
            coverage_summary: PathBuf::from("coverage/coverage-summary.json"),
            test_command: None,
            whitespace: FileSet {
                paths: ["*", "config", "components", "pages", "lib"]
                    .into_iter()
                    .map(String::from)
                    .collect(),
                extensions: Vec::new(),
                exclude: vec![".yaml".to_string(), "package.json".to_string()],
            },
            whitespace_rules: WhitespaceRules {
                indentation: Indentation::Tabs,
                trailing_spaces: true,
                final_newline: true,
            },
            package_files: FileSet {
                paths: vec!["package.json".to_string()],
                extensions: Vec::new(),
                exclude: Vec::new(),
            },
            package_rules: WhitespaceRules {
                indentation: Indentation::Spaces(2),
                trailing_spaces: true,
                final_newline: true,
            },
            linters: Vec::new(),
        }
    }
}

/// Configuration for a build.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Project root (holds `node_modules` and `package.json`)
    pub root: PathBuf,

    /// One subdirectory per page
    pub pages_dir: PathBuf,

    /// Output directory, removed by `clean`
    pub build_dir: PathBuf,

    /// HTML template with `title` and `body` slots
    pub template: PathBuf,

    /// Title prefix for every page
    pub base_title: String,

    pub shared_libs: Arc<SharedLibrarySet>,

    /// Value of `process.env.NODE_ENV` inside bundles
    pub node_env: String,

    pub jsx: LowerOptions,

    /// Whether `build` writes `.min.js` files
    pub minify: bool,

    pub policy: FailurePolicy,

    pub quality: QualityConfig,
}

impl BuildConfig {
    /// Default layout rooted at `root`.
    pub fn for_root(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            pages_dir: root.join("pages"),
            build_dir: root.join("build"),
            template: root.join("template.html"),
            root,
            base_title: "Project Explorer".to_string(),
            shared_libs: Arc::new(SharedLibrarySet::new(DEFAULT_SHARED_LIBS.iter().copied())),
            node_env: "production".to_string(),
            jsx: LowerOptions::default(),
            minify: true,
            policy: FailurePolicy::default(),
            quality: QualityConfig::default(),
        }
    }
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self::for_root(".")
    }
}
