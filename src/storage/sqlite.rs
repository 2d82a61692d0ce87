//! SQLite backend for the workspace store.
//!
//! Uses `rusqlite` in synchronous mode behind a mutex; each call holds the
//! lock for one short statement sequence and never across an `.await`.
//! WAL mode is enabled so the file poller can read while the relay writes.

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::errors::StoreError;
use super::models::{
    now_timestamp, ChatMessageRecord, CommandExecution, CommandExecutionUpdate, ExecutionStatus,
    NewChatMessage, NewProject, Project, ProjectFile,
};
use super::WorkspaceStore;
use crate::inference::types::Role;

// ─── Store ──────────────────────────────────────────────────────────────────

/// SQLite database handle for the workspace tables.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database at the given path.
    ///
    /// Pass `":memory:"` for an in-memory database (tests).
    pub fn open(path: &str) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;

        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;

        let store = Self {
            conn: Mutex::new(conn),
        };
        store.create_tables()?;
        Ok(store)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|e| StoreError::Database {
            reason: format!("connection lock poisoned: {e}"),
        })
    }

    /// Create all required tables if they don't exist.
    fn create_tables(&self) -> Result<(), StoreError> {
        self.conn()?.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS projects (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                workspace_path TEXT NOT NULL DEFAULT '',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS chat_messages (
                id TEXT PRIMARY KEY,
                session_id TEXT NOT NULL,
                role TEXT NOT NULL,
                content TEXT NOT NULL DEFAULT '',
                tool_calls TEXT,
                tool_call_id TEXT,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_chat_messages_session
                ON chat_messages(session_id, created_at);

            CREATE TABLE IF NOT EXISTS project_files (
                id TEXT PRIMARY KEY,
                project_id TEXT NOT NULL,
                file_path TEXT NOT NULL,
                content TEXT NOT NULL DEFAULT '',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                FOREIGN KEY (project_id) REFERENCES projects(id)
            );

            CREATE INDEX IF NOT EXISTS idx_project_files_path
                ON project_files(project_id, file_path);

            CREATE TABLE IF NOT EXISTS command_executions (
                id TEXT PRIMARY KEY,
                project_id TEXT NOT NULL,
                session_id TEXT NOT NULL,
                command TEXT NOT NULL,
                stdout TEXT NOT NULL DEFAULT '',
                stderr TEXT NOT NULL DEFAULT '',
                exit_code INTEGER,
                status TEXT NOT NULL DEFAULT 'pending',
                created_at TEXT NOT NULL,
                FOREIGN KEY (project_id) REFERENCES projects(id)
            );
            ",
        )?;
        Ok(())
    }

    fn select_file(
        conn: &Connection,
        project_id: &str,
        path: &str,
    ) -> Result<Option<ProjectFile>, StoreError> {
        let file = conn
            .query_row(
                "SELECT id, project_id, file_path, content, created_at, updated_at
                 FROM project_files
                 WHERE project_id = ?1 AND file_path = ?2
                 ORDER BY created_at ASC, rowid ASC
                 LIMIT 1",
                params![project_id, path],
                row_to_file,
            )
            .optional()?;
        Ok(file)
    }

    fn select_execution(conn: &Connection, id: &str) -> Result<Option<CommandExecution>, StoreError> {
        let exec = conn
            .query_row(
                "SELECT id, project_id, session_id, command, stdout, stderr, exit_code, status, created_at
                 FROM command_executions WHERE id = ?1",
                params![id],
                row_to_execution,
            )
            .optional()?;
        Ok(exec)
    }

    #[cfg(test)]
    pub(crate) fn executions_for_session(&self, session_id: &str) -> Result<Vec<CommandExecution>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, project_id, session_id, command, stdout, stderr, exit_code, status, created_at
             FROM command_executions WHERE session_id = ?1
             ORDER BY created_at ASC, rowid ASC",
        )?;
        let rows = stmt.query_map(params![session_id], row_to_execution)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

#[async_trait]
impl WorkspaceStore for SqliteStore {
    // ─── Projects ───────────────────────────────────────────────────────

    async fn get_project(&self, id: &str) -> Result<Option<Project>, StoreError> {
        let conn = self.conn()?;
        let project = conn
            .query_row(
                "SELECT id, name, description, workspace_path, created_at, updated_at
                 FROM projects WHERE id = ?1",
                params![id],
                |row| {
                    Ok(Project {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        description: row.get(2)?,
                        workspace_path: row.get(3)?,
                        created_at: row.get(4)?,
                        updated_at: row.get(5)?,
                    })
                },
            )
            .optional()?;
        Ok(project)
    }

    async fn create_project(&self, project: &NewProject) -> Result<Project, StoreError> {
        let now = now_timestamp();
        let row = Project {
            id: Uuid::new_v4().to_string(),
            name: project.name.clone(),
            description: project.description.clone(),
            workspace_path: project.workspace_path.clone(),
            created_at: now.clone(),
            updated_at: now,
        };
        self.conn()?.execute(
            "INSERT INTO projects (id, name, description, workspace_path, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                row.id,
                row.name,
                row.description,
                row.workspace_path,
                row.created_at,
                row.updated_at
            ],
        )?;
        Ok(row)
    }

    // ─── Messages ───────────────────────────────────────────────────────

    async fn insert_message(&self, msg: &NewChatMessage) -> Result<ChatMessageRecord, StoreError> {
        let record = ChatMessageRecord {
            id: Uuid::new_v4().to_string(),
            session_id: msg.session_id.clone(),
            role: msg.role,
            content: msg.content.clone(),
            tool_calls: msg.tool_calls.clone(),
            tool_call_id: msg.tool_call_id.clone(),
            created_at: now_timestamp(),
        };
        self.conn()?.execute(
            "INSERT INTO chat_messages
             (id, session_id, role, content, tool_calls, tool_call_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                record.id,
                record.session_id,
                record.role.as_str(),
                record.content,
                record.tool_calls,
                record.tool_call_id,
                record.created_at,
            ],
        )?;
        Ok(record)
    }

    async fn list_messages(&self, session_id: &str) -> Result<Vec<ChatMessageRecord>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, session_id, role, content, tool_calls, tool_call_id, created_at
             FROM chat_messages
             WHERE session_id = ?1
             ORDER BY created_at ASC, rowid ASC",
        )?;

        let rows = stmt.query_map(params![session_id], |row| {
            Ok(ChatMessageRecord {
                id: row.get(0)?,
                session_id: row.get(1)?,
                role: str_to_role(&row.get::<_, String>(2)?),
                content: row.get(3)?,
                tool_calls: row.get(4)?,
                tool_call_id: row.get(5)?,
                created_at: row.get(6)?,
            })
        })?;

        let mut messages = Vec::new();
        for row in rows {
            messages.push(row?);
        }
        Ok(messages)
    }

    // ─── Files ──────────────────────────────────────────────────────────

    async fn list_project_files(&self, project_id: &str) -> Result<Vec<ProjectFile>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, project_id, file_path, content, created_at, updated_at
             FROM project_files
             WHERE project_id = ?1
             ORDER BY file_path ASC, rowid ASC",
        )?;

        let rows = stmt.query_map(params![project_id], row_to_file)?;

        let mut files = Vec::new();
        for row in rows {
            files.push(row?);
        }
        Ok(files)
    }

    async fn create_file(
        &self,
        project_id: &str,
        path: &str,
        content: &str,
    ) -> Result<ProjectFile, StoreError> {
        let now = now_timestamp();
        let file = ProjectFile {
            id: Uuid::new_v4().to_string(),
            project_id: project_id.to_string(),
            file_path: path.to_string(),
            content: content.to_string(),
            created_at: now.clone(),
            updated_at: now,
        };
        self.conn()?.execute(
            "INSERT INTO project_files (id, project_id, file_path, content, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                file.id,
                file.project_id,
                file.file_path,
                file.content,
                file.created_at,
                file.updated_at
            ],
        )?;
        Ok(file)
    }

    async fn find_file(&self, project_id: &str, path: &str) -> Result<Option<ProjectFile>, StoreError> {
        let conn = self.conn()?;
        Self::select_file(&conn, project_id, path)
    }

    async fn update_file_content(&self, file_id: &str, content: &str) -> Result<ProjectFile, StoreError> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE project_files SET content = ?2, updated_at = ?3 WHERE id = ?1",
            params![file_id, content, now_timestamp()],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound {
                entity: "file",
                id: file_id.to_string(),
            });
        }
        let file = conn.query_row(
            "SELECT id, project_id, file_path, content, created_at, updated_at
             FROM project_files WHERE id = ?1",
            params![file_id],
            row_to_file,
        )?;
        Ok(file)
    }

    // ─── Command Executions ─────────────────────────────────────────────

    async fn create_command_execution(
        &self,
        project_id: &str,
        session_id: &str,
        command: &str,
    ) -> Result<CommandExecution, StoreError> {
        let exec = CommandExecution {
            id: Uuid::new_v4().to_string(),
            project_id: project_id.to_string(),
            session_id: session_id.to_string(),
            command: command.to_string(),
            stdout: String::new(),
            stderr: String::new(),
            exit_code: None,
            status: ExecutionStatus::Pending,
            created_at: now_timestamp(),
        };
        self.conn()?.execute(
            "INSERT INTO command_executions
             (id, project_id, session_id, command, status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                exec.id,
                exec.project_id,
                exec.session_id,
                exec.command,
                exec.status.as_str(),
                exec.created_at
            ],
        )?;
        Ok(exec)
    }

    async fn update_command_execution(
        &self,
        id: &str,
        update: &CommandExecutionUpdate,
    ) -> Result<CommandExecution, StoreError> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE command_executions SET
                status = COALESCE(?2, status),
                stdout = COALESCE(?3, stdout),
                stderr = COALESCE(?4, stderr),
                exit_code = COALESCE(?5, exit_code)
             WHERE id = ?1",
            params![
                id,
                update.status.map(|s| s.as_str()),
                update.stdout,
                update.stderr,
                update.exit_code
            ],
        )?;
        let not_found = || StoreError::NotFound {
            entity: "command execution",
            id: id.to_string(),
        };
        if changed == 0 {
            return Err(not_found());
        }
        Self::select_execution(&conn, id)?.ok_or_else(not_found)
    }

    async fn get_command_execution(&self, id: &str) -> Result<Option<CommandExecution>, StoreError> {
        let conn = self.conn()?;
        Self::select_execution(&conn, id)
    }
}

// ─── Helpers ────────────────────────────────────────────────────────────────

fn row_to_file(row: &rusqlite::Row<'_>) -> rusqlite::Result<ProjectFile> {
    Ok(ProjectFile {
        id: row.get(0)?,
        project_id: row.get(1)?,
        file_path: row.get(2)?,
        content: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

fn row_to_execution(row: &rusqlite::Row<'_>) -> rusqlite::Result<CommandExecution> {
    Ok(CommandExecution {
        id: row.get(0)?,
        project_id: row.get(1)?,
        session_id: row.get(2)?,
        command: row.get(3)?,
        stdout: row.get(4)?,
        stderr: row.get(5)?,
        exit_code: row.get(6)?,
        status: ExecutionStatus::parse(&row.get::<_, String>(7)?),
        created_at: row.get(8)?,
    })
}

/// Parse a stored role, defaulting to `User` for unknown values.
fn str_to_role(s: &str) -> Role {
    match s {
        "system" => Role::System,
        "assistant" => Role::Assistant,
        "tool" => Role::Tool,
        _ => Role::User,
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
