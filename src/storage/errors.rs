//! Storage error types.

use thiserror::Error;

/// Errors that can occur in a `WorkspaceStore`.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Local SQLite operation failed.
    #[error("database error: {reason}")]
    Database { reason: String },

    /// No project file at this path.
    #[error("File not found: {path}")]
    FileNotFound { path: String },

    /// A row expected to exist was missing.
    #[error("{entity} not found: '{id}'")]
    NotFound { entity: &'static str, id: String },

    /// The hosted table API answered with a non-2xx status.
    #[error("table API error {status}: {body}")]
    Remote { status: u16, body: String },

    /// The hosted table API could not be reached.
    #[error("request to {endpoint} failed: {reason}")]
    Transport { endpoint: String, reason: String },

    /// A row could not be encoded or decoded.
    #[error("serialization error: {reason}")]
    Serialization { reason: String },

    /// The backend is misconfigured.
    #[error("storage config error: {reason}")]
    Config { reason: String },
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Database {
            reason: e.to_string(),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization {
            reason: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_not_found_message() {
        let err = StoreError::FileNotFound {
            path: "src/app.js".to_string(),
        };
        assert_eq!(err.to_string(), "File not found: src/app.js");
    }
}
