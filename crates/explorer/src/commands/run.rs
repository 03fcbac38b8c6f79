//! Run a task and its predecessors.

use std::path::Path;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use explorer_build::{BuildConfig, Pipeline};
use explorer_tasks::FailurePolicy;

use super::config::{load_config, project_root};

/// Command-line settings that take precedence over explorer.toml.
#[derive(Debug, Clone, Copy, Default)]
pub struct Overrides {
    pub keep_going: bool,
    pub minify: Option<bool>,
}

/// Build the effective configuration for `config_path`.
pub fn build_config(config_path: &Path, overrides: Overrides) -> Result<BuildConfig> {
    let mut config = load_config(config_path)?.into_build_config(project_root(config_path));
    if overrides.keep_going {
        config.policy = FailurePolicy::KeepGoing;
    }
    if let Some(minify) = overrides.minify {
        config.minify = minify;
    }
    Ok(config)
}

/// Run the task command.
pub async fn run(config_path: &Path, task: String, overrides: Overrides) -> Result<()> {
    let config = build_config(config_path, overrides)?;
    let started = Instant::now();

    let report = tokio::task::spawn_blocking(move || -> Result<_> {
        let pipeline = Pipeline::new(config)?;
        if !pipeline.graph().contains(&task) {
            bail!("Task '{}' is not registered. Run 'explorer help' to list tasks.", task);
        }
        Ok(pipeline.run_checked(&task)?)
    })
    .await
    .context("Task runner panicked")??;

    tracing::info!(
        "Completed {} task(s) in {:.2?}",
        report.completed.len(),
        started.elapsed()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn flags_override_the_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("explorer.toml");
        fs::write(&path, "[bundle]\nminify = true\n").unwrap();

        let config = build_config(
            &path,
            Overrides {
                keep_going: true,
                minify: Some(false),
            },
        )
        .unwrap();

        assert!(!config.minify);
        assert_eq!(config.policy, FailurePolicy::KeepGoing);
    }

    #[tokio::test]
    async fn unknown_task_is_reported() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("pages/index")).unwrap();

        let err = run(&tmp.path().join("explorer.toml"), "deploy".to_string(), Overrides::default())
            .await
            .unwrap_err();

        assert!(err.to_string().contains("'deploy' is not registered"));
    }

    #[tokio::test]
    async fn clean_runs_from_the_config_directory() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("pages/index")).unwrap();
        fs::create_dir_all(tmp.path().join("build/index")).unwrap();

        run(&tmp.path().join("explorer.toml"), "clean".to_string(), Overrides::default())
            .await
            .unwrap();

        assert!(!tmp.path().join("build").exists());
    }
}
