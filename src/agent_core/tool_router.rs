//! Tool routing: turns model tool calls into results or pending actions.
//!
//! Read-only tools (`list_project_files`, `read_file`, `analyze_error`) run
//! immediately. Mutating tools (`create_file`, `append_file`, `run_command`)
//! are staged as a [`PendingAction`] and only run through [`execute_action`]
//! once the user approves. Unknown tool names produce a plain text result.

use serde_json::Value;

use super::errors::RelayError;
use super::types::{ActionKind, PendingAction, RelayContext};
use crate::inference::types::{ToolCall, ToolCallResponse};
use crate::storage::{execute_command, WorkspaceStore};
use crate::tools::{analyze_error, ToolName};

// ─── Constants ──────────────────────────────────────────────────────────────

/// Lines of file content shown in an action preview.
const PREVIEW_MAX_LINES: usize = 12;

// ─── Routing ────────────────────────────────────────────────────────────────

/// What happened to a single tool call.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolDisposition {
    /// Executed immediately; the string is the tool result.
    Inline(String),
    /// Staged for user approval.
    Staged(PendingAction),
}

/// Decode the JSON-string arguments of a wire tool call.
///
/// Empty arguments are treated as `{}`.
pub fn decode_tool_call(call: &ToolCallResponse) -> Result<ToolCall, RelayError> {
    let raw = call.function.arguments.trim();
    let arguments = if raw.is_empty() {
        Value::Object(serde_json::Map::new())
    } else {
        serde_json::from_str(raw).map_err(|e| RelayError::InvalidArguments {
            tool: call.function.name.clone(),
            reason: e.to_string(),
        })?
    };
    Ok(ToolCall {
        id: call.id.clone(),
        name: call.function.name.clone(),
        arguments,
    })
}

/// Run a read-only tool or stage a mutating one.
pub async fn route_tool_call(
    store: &dyn WorkspaceStore,
    project_id: &str,
    call: &ToolCall,
) -> Result<ToolDisposition, RelayError> {
    let Some(tool) = ToolName::parse(&call.name) else {
        tracing::warn!(tool = %call.name, "model called an unknown tool");
        return Ok(ToolDisposition::Inline(format!("Unknown tool: {}", call.name)));
    };

    let disposition = if tool.is_read_only() {
        ToolDisposition::Inline(run_read_only(store, project_id, tool, call).await?)
    } else {
        ToolDisposition::Staged(stage_action(tool, call)?)
    };

    tracing::debug!(tool = %tool, call_id = %call.id, staged = matches!(disposition, ToolDisposition::Staged(_)), "tool call routed");
    Ok(disposition)
}

async fn run_read_only(
    store: &dyn WorkspaceStore,
    project_id: &str,
    tool: ToolName,
    call: &ToolCall,
) -> Result<String, RelayError> {
    match tool {
        ToolName::ListProjectFiles => {
            let files = store.list_project_files(project_id).await?;
            let paths: Vec<&str> = files.iter().map(|f| f.file_path.as_str()).collect();
            Ok(serde_json::to_string(&paths)?)
        }
        ToolName::ReadFile => {
            let path = required_str(call, "path")?;
            Ok(store.read_file(project_id, path).await?)
        }
        ToolName::AnalyzeError => {
            let error = required_str(call, "error")?;
            Ok(analyze_error(error).to_string())
        }
        ToolName::CreateFile | ToolName::AppendFile | ToolName::RunCommand => {
            Err(RelayError::InvalidArguments {
                tool: tool.to_string(),
                reason: "tool needs approval".into(),
            })
        }
    }
}

/// Build the pending action for a mutating tool.
pub fn stage_action(tool: ToolName, call: &ToolCall) -> Result<PendingAction, RelayError> {
    let (kind, description) = match tool {
        ToolName::CreateFile => {
            required_str(call, "content")?;
            (
                ActionKind::FileCreate,
                format!("Create file: {}", required_str(call, "path")?),
            )
        }
        ToolName::AppendFile => {
            required_str(call, "content")?;
            (
                ActionKind::FileAppend,
                format!("Append to file: {}", required_str(call, "path")?),
            )
        }
        ToolName::RunCommand => (
            ActionKind::Command,
            format!("Run command: {}", required_str(call, "command")?),
        ),
        ToolName::ReadFile => (
            ActionKind::FileRead,
            format!("Read file: {}", required_str(call, "path")?),
        ),
        ToolName::ListProjectFiles | ToolName::AnalyzeError => {
            return Err(RelayError::InvalidArguments {
                tool: tool.to_string(),
                reason: "tool does not need approval".into(),
            });
        }
    };

    Ok(PendingAction {
        id: call.id.clone(),
        kind,
        description,
        data: call.arguments.clone(),
    })
}

// ─── Execution ──────────────────────────────────────────────────────────────

/// Carry out an approved action and return the tool-result text.
pub async fn execute_action(
    store: &dyn WorkspaceStore,
    context: &RelayContext,
    action: &PendingAction,
) -> Result<String, RelayError> {
    let result = match action.kind {
        ActionKind::FileCreate => {
            let created = store
                .create_file(
                    &context.project_id,
                    action_str(action, "path")?,
                    action_str(action, "content")?,
                )
                .await?;
            format!("File created: {}", created.file_path)
        }
        ActionKind::FileAppend => {
            let appended = store
                .append_file(
                    &context.project_id,
                    action_str(action, "path")?,
                    action_str(action, "content")?,
                )
                .await?;
            format!("Content appended to: {}", appended.file_path)
        }
        ActionKind::Command => {
            let command = action_str(action, "command")?;
            let execution = store
                .create_command_execution(&context.project_id, &context.session_id, command)
                .await?;
            let output = execute_command(store, &execution.id, command).await?;
            format!(
                "Command executed:\nstdout: {}\nstderr: {}\nexit code: {}",
                output.stdout, output.stderr, output.exit_code
            )
        }
        ActionKind::FileRead => {
            store
                .read_file(&context.project_id, action_str(action, "path")?)
                .await?
        }
    };

    tracing::info!(action_id = %action.id, kind = ?action.kind, "action executed");
    Ok(result)
}

// ─── Preview ────────────────────────────────────────────────────────────────

/// Human-readable body shown under a pending action's description.
pub fn generate_preview(action: &PendingAction) -> String {
    match action.kind {
        ActionKind::Command => format!("$ {}", action.arg("command").unwrap_or("<unknown>")),
        ActionKind::FileCreate | ActionKind::FileAppend => {
            truncate_lines(action.arg("content").unwrap_or(""), PREVIEW_MAX_LINES)
        }
        ActionKind::FileRead => action.arg("path").unwrap_or("<unknown>").to_string(),
    }
}

fn truncate_lines(text: &str, max_lines: usize) -> String {
    let total = text.lines().count();
    if total <= max_lines {
        return text.to_string();
    }
    let head: Vec<&str> = text.lines().take(max_lines).collect();
    format!("{}\n… ({} more lines)", head.join("\n"), total - max_lines)
}

// ─── Helpers ────────────────────────────────────────────────────────────────

fn required_str<'a>(call: &'a ToolCall, key: &str) -> Result<&'a str, RelayError> {
    call.arguments
        .get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| RelayError::InvalidArguments {
            tool: call.name.clone(),
            reason: format!("missing string argument '{key}'"),
        })
}

fn action_str<'a>(action: &'a PendingAction, key: &str) -> Result<&'a str, RelayError> {
    action.arg(key).ok_or_else(|| RelayError::InvalidArguments {
        tool: format!("{:?}", action.kind),
        reason: format!("missing string argument '{key}'"),
    })
}

// ─── Tests ──────────────────────────────────────────────────────────────────
