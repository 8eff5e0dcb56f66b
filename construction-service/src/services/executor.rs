use std::path::Path;
use std::process::Output;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command timed out after {0} seconds")]
    Timeout(u64),

    #[error("Command failed: {0}")]
    Failed(String),
}

/// Runs an external program with a hard timeout. The child is killed if the
/// timeout fires.
#[derive(Clone)]
pub struct CommandExecutor {
    timeout: Duration,
}

impl CommandExecutor {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub async fn execute(
        &self,
        program: &str,
        args: &[&str],
        working_dir: Option<&Path>,
    ) -> Result<Output, ExecutorError> {
        let mut cmd = Command::new(program);
        cmd.args(args).kill_on_drop(true);

        if let Some(dir) = working_dir {
            cmd.current_dir(dir);
        }

        cmd.stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped());

        tracing::debug!(
            program = %program,
            args = ?args,
            timeout_secs = %self.timeout.as_secs(),
            "Executing command"
        );

        let output = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| ExecutorError::Timeout(self.timeout.as_secs()))?
            .map_err(|source| ExecutorError::Spawn {
                program: program.to_string(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            tracing::error!(
                program = %program,
                stderr = %stderr,
                "Command failed"
            );
            return Err(ExecutorError::Failed(stderr));
        }

        tracing::debug!(
            program = %program,
            output_size = output.stdout.len(),
            "Command succeeded"
        );

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let executor = CommandExecutor::new(Duration::from_secs(5));
        let result = executor
            .execute("definitely-not-a-real-binary-xyz", &[], None)
            .await;
        assert!(matches!(result, Err(ExecutorError::Spawn { .. })));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_non_zero_exit_is_failure() {
        let executor = CommandExecutor::new(Duration::from_secs(5));
        let result = executor.execute("sh", &["-c", "echo boom >&2; exit 3"], None).await;
        match result {
            Err(ExecutorError::Failed(stderr)) => assert!(stderr.contains("boom")),
            other => panic!("expected failure, got {:?}", other.map(|o| o.status)),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout() {
        let executor = CommandExecutor::new(Duration::from_millis(100));
        let result = executor.execute("sleep", &["5"], None).await;
        assert!(matches!(result, Err(ExecutorError::Timeout(_))));
    }
}
