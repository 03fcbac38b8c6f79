//! Shared and per-page bundles.

mod collect;
mod emit;
mod page;
mod shared;

use std::path::PathBuf;

pub use emit::GLOBAL_REQUIRE;
pub use page::{PageBundler, PAGE_EXPORT};
pub use shared::SharedBundler;

/// Which bundle an artifact is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BundleOwner {
    Shared,
    Page(String),
}

/// A written bundle.
#[derive(Debug, Clone)]
pub struct Bundle {
    pub owner: BundleOwner,
    pub path: PathBuf,

    /// Ids of the modules included, in load-table order
    pub modules: Vec<String>,

    /// Requests left to an earlier bundle
    pub externals: Vec<String>,

    pub code: String,
}
