//! explorer.toml loading.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use explorer_build::quality::{CoverageThresholds, ExternalTool, FileSet};
use explorer_build::{BuildConfig, SharedLibrarySet, DEFAULT_SHARED_LIBS};
use explorer_js::LowerOptions;
use serde::Deserialize;

/// Configuration file structure (explorer.toml).
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    #[serde(default)]
    site: SiteConfig,
    #[serde(default)]
    bundle: BundleSettings,
    #[serde(default)]
    quality: QualitySettings,
}

#[derive(Debug, Deserialize)]
struct SiteConfig {
    #[serde(default = "default_pages")]
    pages: String,
    #[serde(default = "default_build")]
    build: String,
    #[serde(default = "default_template")]
    template: String,
    #[serde(default = "default_base_title")]
    base_title: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            pages: default_pages(),
            build: default_build(),
            template: default_template(),
            base_title: default_base_title(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct BundleSettings {
    /// Libraries bundled once into shared.js
    #[serde(default = "default_shared")]
    shared: Vec<String>,
    #[serde(default = "default_node_env")]
    node_env: String,
    #[serde(default = "default_minify")]
    minify: bool,
    /// JSX element factory
    jsx_factory: Option<String>,
    jsx_fragment: Option<String>,
}

impl Default for BundleSettings {
    fn default() -> Self {
        Self {
            shared: default_shared(),
            node_env: default_node_env(),
            minify: default_minify(),
            jsx_factory: None,
            jsx_fragment: None,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
struct QualitySettings {
    #[serde(default)]
    thresholds: CoverageThresholds,
    coverage_summary: Option<String>,
    /// Command that runs the tests and writes the coverage summary
    test_command: Option<Vec<String>>,
    /// Replaces the default whitespace file set
    whitespace: Option<FileSet>,
    #[serde(default)]
    linters: Vec<ExternalTool>,
}

fn default_pages() -> String {
    "pages".to_string()
}
fn default_build() -> String {
    "build".to_string()
}
fn default_template() -> String {
    "template.html".to_string()
}
fn default_base_title() -> String {
    "Project Explorer".to_string()
}
fn default_shared() -> Vec<String> {
    DEFAULT_SHARED_LIBS.iter().map(|s| s.to_string()).collect()
}
fn default_node_env() -> String {
    "production".to_string()
}
fn default_minify() -> bool {
    true
}

/// Load configuration from `path` if it exists.
/// Returns an error if the config file exists but is malformed.
pub fn load_config(path: &Path) -> Result<ConfigFile> {
    if !path.exists() {
        tracing::debug!("No {} found, using defaults", path.display());
        return Ok(ConfigFile::default());
    }
    let content = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let config: ConfigFile =
        toml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))?;
    tracing::info!("Loaded config from {}", path.display());
    Ok(config)
}

/// Project root for a config file: the directory containing it.
pub fn project_root(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

impl ConfigFile {
    /// Resolve paths against `root` and fill a [`BuildConfig`].
    pub fn into_build_config(self, root: PathBuf) -> BuildConfig {
        let mut config = BuildConfig::for_root(&root);
        config.pages_dir = root.join(&self.site.pages);
        config.build_dir = root.join(&self.site.build);
        config.template = root.join(&self.site.template);
        config.base_title = self.site.base_title;

        config.shared_libs = Arc::new(SharedLibrarySet::new(self.bundle.shared));
        config.node_env = self.bundle.node_env;
        config.minify = self.bundle.minify;
        let jsx = LowerOptions::default();
        config.jsx = LowerOptions {
            factory: self.bundle.jsx_factory.unwrap_or(jsx.factory),
            fragment: self.bundle.jsx_fragment.unwrap_or(jsx.fragment),
        };

        let quality = &mut config.quality;
        quality.thresholds = self.quality.thresholds;
        if let Some(summary) = self.quality.coverage_summary {
            quality.coverage_summary = PathBuf::from(summary);
        }
        quality.test_command = self
            .quality
            .test_command
            .map(|command| ExternalTool { name: "test".to_string(), command });
        if let Some(whitespace) = self.quality.whitespace {
            quality.whitespace = whitespace;
        }
        quality.linters = self.quality.linters;

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn missing_file_means_defaults() {
        let tmp = TempDir::new().unwrap();

        let config = load_config(&tmp.path().join("explorer.toml"))
            .unwrap()
            .into_build_config(tmp.path().to_path_buf());

        assert_eq!(config.pages_dir, tmp.path().join("pages"));
        assert_eq!(config.base_title, "Project Explorer");
        assert_eq!(config.shared_libs.iter().collect::<Vec<_>>(), DEFAULT_SHARED_LIBS.to_vec());
        assert!(config.minify);
        assert_eq!(config.quality.thresholds, CoverageThresholds::default());
    }

    #[test]
    fn reads_every_section() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("explorer.toml");
        fs::write(
            &path,
            r#"
[site]
build = "out"
base_title = "Demo"

[bundle]
shared = ["react"]
minify = false
jsx_factory = "h"

[quality]
test_command = ["npm", "test"]

[quality.thresholds]
branches = 60

[[quality.linters]]
name = "js"
command = ["npx", "eslint", "."]
"#,
        )
        .unwrap();

        let config = load_config(&path).unwrap().into_build_config(tmp.path().to_path_buf());

        assert_eq!(config.build_dir, tmp.path().join("out"));
        assert_eq!(config.base_title, "Demo");
        assert_eq!(config.shared_libs.iter().collect::<Vec<_>>(), vec!["react"]);
        assert!(!config.minify);
        assert_eq!(config.jsx.factory, "h");
        assert_eq!(config.jsx.fragment, "React.Fragment");
        assert_eq!(config.quality.thresholds.branches, 60.0);
        assert_eq!(config.quality.thresholds.lines, 80.0);
        assert_eq!(
            config.quality.test_command,
            Some(ExternalTool::new("test", ["npm", "test"]))
        );
        assert_eq!(config.quality.linters, vec![ExternalTool::new("js", ["npx", "eslint", "."])]);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("explorer.toml");
        fs::write(&path, "[site\npages = ").unwrap();

        let err = load_config(&path).unwrap_err();

        assert!(err.to_string().contains("Failed to parse"));
    }

    #[test]
    fn root_is_the_config_directory() {
        assert_eq!(project_root(Path::new("explorer.toml")), PathBuf::from("."));
        assert_eq!(project_root(Path::new("site/explorer.toml")), PathBuf::from("site"));
    }
}
