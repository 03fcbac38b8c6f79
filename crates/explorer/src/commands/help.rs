//! Task listing.

use std::path::Path;

use anyhow::Result;
use explorer_build::Pipeline;

use super::run::{build_config, Overrides};

/// Print registered tasks, main tasks first.
pub async fn run(config_path: &Path) -> Result<()> {
    let pipeline = Pipeline::new(build_config(config_path, Overrides::default())?)?;
    let listing = pipeline.graph().listing();

    println!("Main Tasks");
    println!("------------------------------");
    for name in &listing.main_tasks {
        println!("    {name}");
    }
    println!();
    println!("Sub Tasks");
    println!("------------------------------");
    for name in &listing.sub_tasks {
        println!("    {name}");
    }

    Ok(())
}
