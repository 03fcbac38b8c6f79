//! External analysis tools (linters, test runners).

use std::path::Path;
use std::process::Command;

use serde::{Deserialize, Serialize};

/// A configured external command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalTool {
    /// Short name, used in task names (`lint:<name>`)
    pub name: String,

    /// Program followed by its arguments
    pub command: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Tool '{0}' has an empty command")]
    EmptyCommand(String),

    #[error("Failed to start '{name}': {source}")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{name}' exited with {}", status.map(|c| format!("status {c}")).unwrap_or_else(|| "a signal".to_string()))]
    Failed { name: String, status: Option<i32> },
}

impl ExternalTool {
    pub fn new<S: Into<String>>(name: impl Into<String>, command: impl IntoIterator<Item = S>) -> Self {
        Self {
            name: name.into(),
            command: command.into_iter().map(Into::into).collect(),
        }
    }

    /// Run in `cwd` with inherited stdio; a non-zero exit is an error.
    pub fn run(&self, cwd: &Path) -> Result<(), ToolError> {
        let (program, args) = self
            .command
            .split_first()
            .ok_or_else(|| ToolError::EmptyCommand(self.name.clone()))?;

        tracing::debug!("Running {}: {}", self.name, self.command.join(" "));
        let status = Command::new(program)
            .args(args)
            .current_dir(cwd)
            .status()
            .map_err(|source| ToolError::Spawn {
                name: self.name.clone(),
                source,
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(ToolError::Failed {
                name: self.name.clone(),
                status: status.code(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_command_is_rejected() {
        let tool = ExternalTool::new("eslint", Vec::<String>::new());

        assert!(matches!(tool.run(Path::new(".")), Err(ToolError::EmptyCommand(_))));
    }

    #[test]
    fn missing_program_fails_to_spawn() {
        let tool = ExternalTool::new("ghost", ["definitely-not-a-real-program-explorer"]);

        assert!(matches!(tool.run(Path::new(".")), Err(ToolError::Spawn { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn exit_status_decides_success() {
        let ok = ExternalTool::new("ok", ["sh", "-c", "exit 0"]);
        let failing = ExternalTool::new("failing", ["sh", "-c", "exit 3"]);

        assert!(ok.run(Path::new(".")).is_ok());
        assert!(matches!(
            failing.run(Path::new(".")),
            Err(ToolError::Failed { status: Some(3), .. })
        ));
    }
}
