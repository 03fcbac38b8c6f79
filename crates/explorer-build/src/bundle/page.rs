use std::sync::Arc;

use explorer_js::{LowerOptions, Resolver};

use super::collect::Collector;
use super::emit::{emit, EmitOptions};
use super::{Bundle, BundleOwner};
use crate::config::{BuildConfig, SharedLibrarySet};
use crate::error::BuildError;
use crate::output::write_output;
use crate::pages::Page;

/// Name under which a page bundle exposes its entry module.
pub const PAGE_EXPORT: &str = "__jsx_page";

/// Builds one `main.js` per page. Shared libraries stay external.
#[derive(Debug, Clone)]
pub struct PageBundler {
    resolver: Resolver,
    shared: Arc<SharedLibrarySet>,
    jsx: LowerOptions,
    node_env: String,
}

impl PageBundler {
    pub fn new(config: &BuildConfig) -> Self {
        Self {
            resolver: Resolver::new(&config.root),
            shared: Arc::clone(&config.shared_libs),
            jsx: config.jsx.clone(),
            node_env: config.node_env.clone(),
        }
    }

    pub fn build(&self, page: &Page) -> Result<Bundle, BuildError> {
        let mut collector = Collector::new(&self.resolver, &self.jsx, Some(self.shared.as_ref()));
        let entry = collector.add(&page.entry)?;
        let (modules, externals) = collector.finish();

        let exposed = vec![(PAGE_EXPORT.to_string(), entry.clone())];
        let code = emit(
            &modules,
            &EmitOptions {
                exposed: &exposed,
                run: Some(&entry),
                node_env: &self.node_env,
            },
        );

        let path = page.bundle_path();
        write_output(&path, code.as_bytes()).map_err(BuildError::io(&path))?;
        tracing::debug!(
            "Page '{}': {} module(s), external: [{}]",
            page.name,
            modules.len(),
            externals.join(", ")
        );

        Ok(Bundle {
            owner: BundleOwner::Page(page.name.clone()),
            path,
            modules: modules.into_iter().map(|m| m.id).collect(),
            externals,
            code,
        })
    }
}
