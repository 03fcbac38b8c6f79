//! Scaffold a starter site.

use std::path::Path;

use anyhow::{Context, Result};

use super::config::project_root;

/// Run the init command.
pub async fn run(config_path: &Path, yes: bool) -> Result<()> {
    let root = project_root(config_path);
    tracing::info!("Initializing Project Explorer in {}...", root.display());

    let written = explorer_build::scaffold(&root, yes).context("Failed to write starter files")?;
    for path in &written {
        tracing::info!("Created {}", path.strip_prefix(&root).unwrap_or(path).display());
    }
    if written.is_empty() {
        tracing::warn!("All starter files already exist. Use --yes to overwrite.");
        return Ok(());
    }

    tracing::info!("Initialization complete!");
    tracing::info!("Run 'npm install' to fetch the shared libraries, then 'explorer build'.");

    Ok(())
}
