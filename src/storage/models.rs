//! Row types for the four persisted tables.
//!
//! Field names match the column names so the same structs decode SQLite rows
//! and table-API JSON alike.

use serde::{Deserialize, Deserializer, Serialize};

use crate::inference::types::Role;

// ─── Projects ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub workspace_path: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Input for creating a project (no DB fields).
#[derive(Debug, Clone, Serialize)]
pub struct NewProject {
    pub name: String,
    pub description: String,
    pub workspace_path: String,
}

// ─── Chat Messages ──────────────────────────────────────────────────────────

/// A stored chat message. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessageRecord {
    pub id: String,
    pub session_id: String,
    /// One of user, assistant or tool.
    pub role: Role,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub content: String,
    /// Assistant tool calls, serialized as a JSON string in wire format.
    #[serde(default)]
    pub tool_calls: Option<String>,
    /// For `tool` role: the tool call this result answers.
    #[serde(default)]
    pub tool_call_id: Option<String>,
    pub created_at: String,
}

/// Builder for chat messages without DB fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewChatMessage {
    pub session_id: String,
    pub role: Role,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl NewChatMessage {
    pub fn user(session_id: &str, content: impl Into<String>) -> Self {
        Self {
            session_id: session_id.to_string(),
            role: Role::User,
            content: content.into(),
            tool_calls: None,
            tool_call_id: None,
        }
    }

    pub fn assistant(session_id: &str, content: impl Into<String>, tool_calls: Option<String>) -> Self {
        Self {
            session_id: session_id.to_string(),
            role: Role::Assistant,
            content: content.into(),
            tool_calls,
            tool_call_id: None,
        }
    }

    pub fn tool(session_id: &str, tool_call_id: &str, content: impl Into<String>) -> Self {
        Self {
            session_id: session_id.to_string(),
            role: Role::Tool,
            content: content.into(),
            tool_calls: None,
            tool_call_id: Some(tool_call_id.to_string()),
        }
    }
}

// ─── Project Files ──────────────────────────────────────────────────────────

/// A file in the project workspace. `(project_id, file_path)` is not unique.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectFile {
    pub id: String,
    pub project_id: String,
    pub file_path: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub content: String,
    pub created_at: String,
    pub updated_at: String,
}

// ─── Command Executions ─────────────────────────────────────────────────────

/// Lifecycle of a command execution: pending → running → completed | failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::Pending => "pending",
            ExecutionStatus::Running => "running",
            ExecutionStatus::Completed => "completed",
            ExecutionStatus::Failed => "failed",
            ExecutionStatus::Cancelled => "cancelled",
        }
    }

    /// Parse from a string, defaulting to `Pending` for unknown values.
    pub fn parse(s: &str) -> Self {
        match s {
            "running" => ExecutionStatus::Running,
            "completed" => ExecutionStatus::Completed,
            "failed" => ExecutionStatus::Failed,
            "cancelled" => ExecutionStatus::Cancelled,
            _ => ExecutionStatus::Pending,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandExecution {
    pub id: String,
    pub project_id: String,
    pub session_id: String,
    pub command: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub stdout: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub stderr: String,
    #[serde(default)]
    pub exit_code: Option<i32>,
    pub status: ExecutionStatus,
    pub created_at: String,
}

/// Partial update of a command execution. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CommandExecutionUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ExecutionStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stdout: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stderr: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
}

impl CommandExecutionUpdate {
    pub fn status(status: ExecutionStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }
}

// ─── Helpers ────────────────────────────────────────────────────────────────

/// Current time as an RFC 3339 UTC timestamp with microsecond precision.
///
/// Fixed-width so lexical order equals chronological order.
pub fn now_timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Micros, true)
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
