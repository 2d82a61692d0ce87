//! Command execution lifecycle on top of a `WorkspaceStore`.

use super::errors::StoreError;
use super::models::{CommandExecutionUpdate, ExecutionStatus};
use super::WorkspaceStore;
use crate::tools::simulate::{simulate_command_execution, CommandOutput};

/// Run `command` against the execution row `execution_id`.
///
/// Marks the row `running`, produces the simulated output, then records it as
/// `completed` (exit 0) or `failed`. If a store call fails, a best-effort
/// update marks the row `failed` with the error in `stderr` and exit code 1,
/// and the first error is returned.
pub async fn execute_command(
    store: &dyn WorkspaceStore,
    execution_id: &str,
    command: &str,
) -> Result<CommandOutput, StoreError> {
    match run_lifecycle(store, execution_id, command).await {
        Ok(output) => Ok(output),
        Err(e) => {
            tracing::warn!(execution_id, error = %e, "command execution failed");
            let failure = CommandExecutionUpdate {
                status: Some(ExecutionStatus::Failed),
                stderr: Some(e.to_string()),
                exit_code: Some(1),
                ..CommandExecutionUpdate::default()
            };
            if let Err(mark_err) = store.update_command_execution(execution_id, &failure).await {
                tracing::error!(execution_id, error = %mark_err, "failed to mark execution as failed");
            }
            Err(e)
        }
    }
}

async fn run_lifecycle(
    store: &dyn WorkspaceStore,
    execution_id: &str,
    command: &str,
) -> Result<CommandOutput, StoreError> {
    store
        .update_command_execution(
            execution_id,
            &CommandExecutionUpdate::status(ExecutionStatus::Running),
        )
        .await?;

    let output = simulate_command_execution(command);

    let status = if output.succeeded() {
        ExecutionStatus::Completed
    } else {
        ExecutionStatus::Failed
    };
    store
        .update_command_execution(
            execution_id,
            &CommandExecutionUpdate {
                status: Some(status),
                stdout: Some(output.stdout.clone()),
                stderr: Some(output.stderr.clone()),
                exit_code: Some(output.exit_code),
            },
        )
        .await?;

    tracing::info!(execution_id, command, exit_code = output.exit_code, "command executed");
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{NewProject, SqliteStore};

    async fn store_with_project() -> (SqliteStore, String) {
        let store = SqliteStore::open(":memory:").unwrap();
        let project = store
            .create_project(&NewProject {
                name: "p".into(),
                description: String::new(),
                workspace_path: "/workspace".into(),
            })
            .await
            .unwrap();
        (store, project.id)
    }

    #[tokio::test]
    async fn test_execute_command_completes_row() {
        let (store, project_id) = store_with_project().await;
        let exec = store
            .create_command_execution(&project_id, "s1", "git init")
            .await
            .unwrap();
        assert_eq!(exec.status, ExecutionStatus::Pending);

        let output = execute_command(&store, &exec.id, "git init").await.unwrap();
        assert_eq!(output.stdout, "Initialized empty Git repository in /project/.git/");

        let row = store.get_command_execution(&exec.id).await.unwrap().unwrap();
        assert_eq!(row.status, ExecutionStatus::Completed);
        assert_eq!(row.stdout, output.stdout);
        assert_eq!(row.stderr, "");
        assert_eq!(row.exit_code, Some(0));
    }

    #[tokio::test]
    async fn test_execute_missing_row_returns_error() {
        let (store, _) = store_with_project().await;
        let err = execute_command(&store, "no-such-id", "ls").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }
}
