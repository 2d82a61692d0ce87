//! Shared types for the agent core.
//!
//! Pending actions, relay state and events, turn outcomes and the
//! continuation policy used by the `ToolCallRelay`.

use serde::{Deserialize, Serialize};

use crate::storage::ChatMessageRecord;

// ─── Pending Actions ────────────────────────────────────────────────────────

/// What a staged action will do once approved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Command,
    FileCreate,
    FileAppend,
    FileRead,
}

/// A mutating tool call waiting for the user. In-memory only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingAction {
    /// The tool call id; tool-result messages are keyed by it.
    pub id: String,
    pub kind: ActionKind,
    /// "Create file: <path>", "Append to file: <path>" or "Run command: <command>".
    pub description: String,
    /// Decoded tool-call arguments.
    pub data: serde_json::Value,
}

impl PendingAction {
    /// String argument `key`, if present.
    pub fn arg(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(|v| v.as_str())
    }
}

// ─── Relay State & Events ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RelayState {
    Idle,
    AwaitingCompletion,
    AwaitingApproval,
}

/// Notifications emitted by the relay as a turn progresses.
#[derive(Debug, Clone, PartialEq)]
pub enum RelayEvent {
    CompletionStarted,
    CompletionFinished,
    MessageStored(ChatMessageRecord),
    ActionStaged(PendingAction),
    ActionResolved { id: String, approved: bool },
}

/// How a `submit`, `approve`, `decline` or `continue_conversation` call ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// Input was empty; nothing was stored or sent.
    Ignored,
    /// The model answered without further tool calls.
    Completed,
    /// At least one mutating action is waiting for approval.
    AwaitingApproval { pending: usize },
    /// The action was resolved and policy says not to ask the model again.
    Halted,
    /// An error was recorded in the conversation as `Error: <message>`.
    Failed { message: String },
    /// Read-only tool rounds hit `max_tool_rounds` without a final answer.
    RoundLimitReached,
}

// ─── Continuation Policy ────────────────────────────────────────────────────

/// Whether to request a new completion after an outcome.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Continuation {
    #[default]
    Halt,
    Continue,
}

/// When the relay asks the model again. An approved action always continues.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ContinuationPolicy {
    pub on_decline: Continuation,
    pub on_error: Continuation,
    /// Upper bound on consecutive completions driven by read-only tool results.
    pub max_tool_rounds: usize,
}

impl Default for ContinuationPolicy {
    fn default() -> Self {
        Self {
            on_decline: Continuation::Halt,
            on_error: Continuation::Halt,
            max_tool_rounds: 10,
        }
    }
}

/// Identifiers the relay works under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayContext {
    pub project_id: String,
    pub session_id: String,
}

impl RelayContext {
    /// Context with a fresh client-generated session id.
    pub fn new_session(project_id: &str) -> Self {
        Self {
            project_id: project_id.to_string(),
            session_id: uuid::Uuid::new_v4().to_string(),
        }
    }
}
