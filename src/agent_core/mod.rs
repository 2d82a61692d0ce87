//! Agent Core, the conversation layer of WindCode.
//!
//! Submodules:
//! - `relay`: Tool-call relay and approval loop (`ToolCallRelay`)
//! - `tool_router`: Runs read-only tools, stages mutating ones, executes approved actions
//! - `conversation`: System prompt and history-to-request assembly
//! - `echo`: Canned-reply chatbot
//! - `project`: Project bootstrap and the client-local state file
//! - `types`: Shared types across the agent core
//! - `errors`: Agent-level error types

pub mod conversation;
pub mod echo;
pub mod errors;
pub mod project;
pub mod relay;
pub mod tool_router;
pub mod types;

// Re-exports for convenience
pub use echo::{EchoChat, EchoResponder};
pub use errors::RelayError;
pub use project::{resolve_project, ClientState};
pub use relay::ToolCallRelay;
pub use types::{
    ActionKind, Continuation, ContinuationPolicy, PendingAction, RelayContext, RelayEvent,
    RelayState, TurnOutcome,
};
