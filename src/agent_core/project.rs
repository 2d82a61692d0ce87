//! Project bootstrap and the client-local state file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::storage::{NewProject, Project, StoreError, WorkspaceStore};

/// Key under which the current project id is cached.
pub const PROJECT_ID_KEY: &str = "windcode_project_id";

const DEFAULT_PROJECT_NAME: &str = "My Project";
const DEFAULT_PROJECT_DESCRIPTION: &str = "Created with WindCode AI";
const DEFAULT_WORKSPACE_PATH: &str = "/workspace";

/// Use `preferred` if it names an existing project, otherwise create the default one.
///
/// The second value is `true` when a project was created.
pub async fn resolve_project(
    store: &dyn WorkspaceStore,
    preferred: Option<&str>,
) -> Result<(Project, bool), StoreError> {
    if let Some(id) = preferred {
        match store.get_project(id).await? {
            Some(project) => {
                tracing::info!(project_id = %project.id, name = %project.name, "using existing project");
                return Ok((project, false));
            }
            None => tracing::warn!(project_id = %id, "cached project not found, creating a new one"),
        }
    }

    let project = store
        .create_project(&NewProject {
            name: DEFAULT_PROJECT_NAME.to_string(),
            description: DEFAULT_PROJECT_DESCRIPTION.to_string(),
            workspace_path: DEFAULT_WORKSPACE_PATH.to_string(),
        })
        .await?;
    tracing::info!(project_id = %project.id, "created project");
    Ok((project, true))
}

// ─── Client State ───────────────────────────────────────────────────────────

/// Contents of `state.json` in the data directory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientState {
    #[serde(rename = "windcode_project_id", default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
}

impl ClientState {
    /// Load from disk or return defaults.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match std::fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str::<Self>(&content) {
                Ok(state) => state,
                Err(e) => {
                    tracing::warn!(error = %e, path = %path.display(), "failed to parse client state, using defaults");
                    Self::default()
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, path = %path.display(), "failed to read client state, using defaults");
                Self::default()
            }
        }
    }

    /// Save to disk (atomic write).
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp_path = path.with_extension("json.tmp");
        std::fs::write(&tmp_path, content)?;
        std::fs::rename(&tmp_path, path)?;
        tracing::debug!(path = %path.display(), "saved client state");
        Ok(())
    }

    pub fn default_path() -> PathBuf {
        crate::data_dir().join("state.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SqliteStore;

    #[tokio::test]
    async fn test_creates_default_project() {
        let store = SqliteStore::open(":memory:").unwrap();
        let (project, created) = resolve_project(&store, None).await.unwrap();
        assert!(created);
        assert_eq!(project.name, "My Project");
        assert_eq!(project.description, "Created with WindCode AI");
        assert_eq!(project.workspace_path, "/workspace");
    }

    #[tokio::test]
    async fn test_reuses_existing_project() {
        let store = SqliteStore::open(":memory:").unwrap();
        let (first, _) = resolve_project(&store, None).await.unwrap();
        let (again, created) = resolve_project(&store, Some(&first.id)).await.unwrap();
        assert!(!created);
        assert_eq!(again.id, first.id);
    }

    #[tokio::test]
    async fn test_stale_id_creates_new_project() {
        let store = SqliteStore::open(":memory:").unwrap();
        let (project, created) = resolve_project(&store, Some("gone")).await.unwrap();
        assert!(created);
        assert_ne!(project.id, "gone");
    }

    #[test]
    fn test_state_file_round_trip_uses_cache_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("state.json");
        assert_eq!(ClientState::load_or_default(&path), ClientState::default());

        let state = ClientState {
            project_id: Some("p-1".into()),
        };
        state.save(&path).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains(PROJECT_ID_KEY));
        assert_eq!(ClientState::load_or_default(&path), state);
    }

    #[test]
    fn test_corrupt_state_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{not json").unwrap();
        assert_eq!(ClientState::load_or_default(&path), ClientState::default());
    }
}
