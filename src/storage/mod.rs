//! Persistence client for projects, chat messages, project files and
//! command executions.
//!
//! Two backends implement [`WorkspaceStore`]:
//! - `sqlite`: local rusqlite database (default)
//! - `rest`: hosted PostgREST table API (Supabase-compatible)
//!
//! No operation is transactional. `append_file` is a read-modify-write built
//! from two calls, so two concurrent appends to the same file can lose one
//! write. Sequential appends are always preserved.

pub mod errors;
pub mod execution;
pub mod models;
pub mod rest;
pub mod sqlite;

use async_trait::async_trait;

pub use errors::StoreError;
pub use execution::execute_command;
pub use models::{
    ChatMessageRecord, CommandExecution, CommandExecutionUpdate, ExecutionStatus, NewChatMessage,
    NewProject, Project, ProjectFile,
};
pub use rest::RestStore;
pub use sqlite::SqliteStore;

/// Row-level CRUD over the four workspace tables.
#[async_trait]
pub trait WorkspaceStore: Send + Sync {
    // ─── Projects ───────────────────────────────────────────────────────

    async fn get_project(&self, id: &str) -> Result<Option<Project>, StoreError>;

    async fn create_project(&self, project: &NewProject) -> Result<Project, StoreError>;

    // ─── Messages ───────────────────────────────────────────────────────

    async fn insert_message(&self, msg: &NewChatMessage) -> Result<ChatMessageRecord, StoreError>;

    /// All messages of a session, oldest first.
    async fn list_messages(&self, session_id: &str) -> Result<Vec<ChatMessageRecord>, StoreError>;

    // ─── Files ──────────────────────────────────────────────────────────

    /// All files of a project, ordered by `file_path` ascending.
    async fn list_project_files(&self, project_id: &str) -> Result<Vec<ProjectFile>, StoreError>;

    async fn create_file(
        &self,
        project_id: &str,
        path: &str,
        content: &str,
    ) -> Result<ProjectFile, StoreError>;

    /// First file at `path`, if any.
    async fn find_file(&self, project_id: &str, path: &str) -> Result<Option<ProjectFile>, StoreError>;

    /// Overwrite the content of the file row `file_id` and bump `updated_at`.
    async fn update_file_content(&self, file_id: &str, content: &str) -> Result<ProjectFile, StoreError>;

    /// Content of the file at `path`; `FileNotFound` if there is none.
    async fn read_file(&self, project_id: &str, path: &str) -> Result<String, StoreError> {
        match self.find_file(project_id, path).await? {
            Some(file) => Ok(file.content),
            None => Err(StoreError::FileNotFound {
                path: path.to_string(),
            }),
        }
    }

    /// Append `content` to the first file at `path`.
    ///
    /// Only the row that was read is written; other rows sharing the path
    /// keep their content.
    async fn append_file(
        &self,
        project_id: &str,
        path: &str,
        content: &str,
    ) -> Result<ProjectFile, StoreError> {
        let existing = self
            .find_file(project_id, path)
            .await?
            .ok_or_else(|| StoreError::FileNotFound {
                path: path.to_string(),
            })?;
        let combined = format!("{}{content}", existing.content);
        self.update_file_content(&existing.id, &combined).await
    }

    // ─── Command Executions ─────────────────────────────────────────────

    /// Record a new execution with status `pending`.
    async fn create_command_execution(
        &self,
        project_id: &str,
        session_id: &str,
        command: &str,
    ) -> Result<CommandExecution, StoreError>;

    async fn update_command_execution(
        &self,
        id: &str,
        update: &CommandExecutionUpdate,
    ) -> Result<CommandExecution, StoreError>;

    async fn get_command_execution(&self, id: &str) -> Result<Option<CommandExecution>, StoreError>;
}
