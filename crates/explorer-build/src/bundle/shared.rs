use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use explorer_js::{LowerOptions, Resolver};

use super::collect::Collector;
use super::emit::{emit, EmitOptions};
use super::{Bundle, BundleOwner};
use crate::config::{BuildConfig, SharedLibrarySet};
use crate::error::BuildError;
use crate::output::write_output;

/// Builds `shared.js`: every shared library and its dependencies, exposed by
/// library name for page bundles to `require`.
#[derive(Debug)]
pub struct SharedBundler {
    root: PathBuf,
    output: PathBuf,
    resolver: Resolver,
    jsx: LowerOptions,
    node_env: String,
    builds: AtomicUsize,
}

impl SharedBundler {
    pub fn new(config: &BuildConfig) -> Self {
        Self {
            root: config.root.clone(),
            output: config.build_dir.join("shared.js"),
            resolver: Resolver::new(&config.root),
            jsx: config.jsx.clone(),
            node_env: config.node_env.clone(),
            builds: AtomicUsize::new(0),
        }
    }

    pub fn output_path(&self) -> &Path {
        &self.output
    }

    /// Number of times [`SharedBundler::build`] has run.
    pub fn build_count(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }

    pub fn build(&self, libraries: &SharedLibrarySet) -> Result<Bundle, BuildError> {
        self.builds.fetch_add(1, Ordering::SeqCst);

        // Bare requests resolve from the project root.
        let from = self.root.join("package.json");
        let mut collector = Collector::new(&self.resolver, &self.jsx, None);
        let mut exposed = Vec::with_capacity(libraries.len());
        for name in libraries.iter() {
            let resolved = self
                .resolver
                .resolve(name, &from)
                .map_err(|source| BuildError::SharedLibrary {
                    name: name.to_string(),
                    source,
                })?;
            let id = collector.add(resolved.path())?;
            exposed.push((name.to_string(), id));
        }

        let (modules, _) = collector.finish();
        let code = emit(
            &modules,
            &EmitOptions {
                exposed: &exposed,
                run: None,
                node_env: &self.node_env,
            },
        );
        write_output(&self.output, code.as_bytes()).map_err(BuildError::io(&self.output))?;

        tracing::info!(
            "Bundled {} shared librar{} ({} modules) into {}",
            libraries.len(),
            if libraries.len() == 1 { "y" } else { "ies" },
            modules.len(),
            self.output.display()
        );

        Ok(Bundle {
            owner: BundleOwner::Shared,
            path: self.output.clone(),
            modules: modules.into_iter().map(|m| m.id).collect(),
            externals: Vec::new(),
            code,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    fn install(root: &Path, name: &str, main: &str, files: &[(&str, &str)]) {
        let dir = root.join("node_modules").join(name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("package.json"), format!("{{\"name\": \"{name}\", \"main\": \"{main}\"}}")).unwrap();
        for (file, content) in files {
            let path = dir.join(file);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }
    }

    #[test]
    fn bundles_libraries_once_each() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        install(root, "react", "index.js", &[("index.js", "module.exports = { createElement: function () {} };\n")]);
        install(
            root,
            "react-dom",
            "lib/dom.js",
            &[("lib/dom.js", "var React = require('react');\nmodule.exports = { render: function () {} };\n")],
        );

        let bundler = SharedBundler::new(&BuildConfig::for_root(root));
        let bundle = bundler
            .build(&SharedLibrarySet::new(["react", "react-dom"]))
            .unwrap();

        assert_eq!(bundle.owner, BundleOwner::Shared);
        assert_eq!(
            bundle.modules,
            vec![
                "node_modules/react/index.js".to_string(),
                "node_modules/react-dom/lib/dom.js".to_string()
            ]
        );
        assert!(bundle.code.contains("\"react\":\"node_modules/react/index.js\""));
        assert!(bundle.code.contains("\"react-dom\":\"node_modules/react-dom/lib/dom.js\""));
        assert_eq!(fs::read_to_string(root.join("build/shared.js")).unwrap(), bundle.code);
        assert_eq!(bundler.build_count(), 1);
    }

    #[test]
    fn missing_library_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let bundler = SharedBundler::new(&BuildConfig::for_root(tmp.path()));

        let err = bundler.build(&SharedLibrarySet::new(["redux"])).unwrap_err();

        assert!(matches!(err, BuildError::SharedLibrary { ref name, .. } if name == "redux"));
        assert!(!tmp.path().join("build/shared.js").exists());
    }
}
