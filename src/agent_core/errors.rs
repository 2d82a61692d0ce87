//! Agent Core error types.

use thiserror::Error;

use crate::inference::InferenceError;
use crate::storage::StoreError;

/// Errors that can occur while relaying tool calls.
///
/// `Store` and `Inference` display the inner message unchanged, since that
/// text ends up in the conversation as `Error: <message>`.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Inference(#[from] InferenceError),

    /// The model sent arguments that are not valid JSON or lack a field.
    #[error("invalid arguments for {tool}: {reason}")]
    InvalidArguments { tool: String, reason: String },

    /// Approve/decline named an action that is not pending.
    #[error("no pending action with id '{action_id}'")]
    ActionNotPending { action_id: String },

    #[error("serialization error: {reason}")]
    Serialization { reason: String },
}

impl From<serde_json::Error> for RelayError {
    fn from(e: serde_json::Error) -> Self {
        RelayError::Serialization {
            reason: e.to_string(),
        }
    }
}
