//! Build pipeline for Project Explorer.
//!
//! Discovers pages, bundles the shared vendor libraries once, bundles and
//! renders each page, minifies the output and runs the lint and coverage
//! gates. Everything is wired into a task graph by [`Pipeline`].
//!
//! # Example
//!
//! ```no_run
//! use explorer_build::{BuildConfig, Pipeline};
//!
//! let pipeline = Pipeline::new(BuildConfig::for_root("site"))?;
//! pipeline.run_checked("build")?;
//! # Ok::<(), explorer_build::PipelineError>(())
//! ```

pub mod bundle;
pub mod config;
pub mod error;
pub mod minify;
pub mod output;
pub mod pages;
pub mod pipeline;
pub mod quality;
pub mod render;
pub mod scaffold;

pub use bundle::{Bundle, BundleOwner, PageBundler, SharedBundler};
pub use config::{BuildConfig, QualityConfig, SharedLibrarySet, DEFAULT_SHARED_LIBS};
pub use error::{BuildError, DiscoveryError, MinifyError, TemplateError};
pub use minify::{minify_directory, Minified, Minifier, MinifierError, OxcMinifier, SourceMap};
pub use pages::{discover_pages, strong_case, Page};
pub use pipeline::{Pipeline, PipelineError, TaskAction};
pub use render::{page_title, PageRenderer, PageTemplate, RenderedDocument};
pub use scaffold::scaffold;
