//! Hosted table API backend (PostgREST, as served by Supabase).
//!
//! Every call is one HTTP request against `{url}/rest/v1/<table>` with the
//! anon key in both the `apikey` and `Authorization` headers. Filters use the
//! PostgREST `column=eq.value` syntax; writes ask for the written rows back
//! with `Prefer: return=representation`. Ids and timestamps are assigned by
//! the server.

use async_trait::async_trait;
use reqwest::{Client as HttpClient, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::errors::StoreError;
use super::models::{
    now_timestamp, ChatMessageRecord, CommandExecution, CommandExecutionUpdate, ExecutionStatus,
    NewChatMessage, NewProject, Project, ProjectFile,
};
use super::WorkspaceStore;

const PROJECTS: &str = "projects";
const CHAT_MESSAGES: &str = "chat_messages";
const PROJECT_FILES: &str = "project_files";
const COMMAND_EXECUTIONS: &str = "command_executions";

/// PostgREST client for the workspace tables.
pub struct RestStore {
    http: HttpClient,
    rest_base: String,
    api_key: String,
}

impl RestStore {
    /// `url` is the project root (e.g. `https://xyz.supabase.co`).
    pub fn new(url: &str, api_key: &str) -> Result<Self, StoreError> {
        if url.is_empty() {
            return Err(StoreError::Config {
                reason: "rest_url is empty".into(),
            });
        }
        let http = HttpClient::builder().build().map_err(|e| StoreError::Config {
            reason: format!("failed to build HTTP client: {e}"),
        })?;
        Ok(Self {
            http,
            rest_base: format!("{}/rest/v1", url.trim_end_matches('/')),
            api_key: api_key.to_string(),
        })
    }

    fn request(&self, method: Method, table: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}/{table}", self.rest_base))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    async fn fetch<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<Vec<T>, StoreError> {
        let response = req.send().await.map_err(|e| StoreError::Transport {
            endpoint: e
                .url()
                .map(|u| u.to_string())
                .unwrap_or_else(|| self.rest_base.clone()),
            reason: e.to_string(),
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| StoreError::Transport {
            endpoint: self.rest_base.clone(),
            reason: format!("failed to read response body: {e}"),
        })?;
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "table API request rejected");
            return Err(StoreError::Remote {
                status: status.as_u16(),
                body,
            });
        }
        Ok(serde_json::from_str(&body)?)
    }

    async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>, StoreError> {
        let mut params: Vec<(&str, String)> = vec![("select", "*".to_string())];
        params.extend_from_slice(query);
        self.fetch(self.request(Method::GET, table).query(&params)).await
    }

    async fn insert<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        table: &'static str,
        body: &B,
    ) -> Result<T, StoreError> {
        let req = self
            .request(Method::POST, table)
            .header("Prefer", "return=representation")
            .json(body);
        let rows: Vec<T> = self.fetch(req).await?;
        single(rows, table, "<insert>")
    }

    async fn update<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        table: &str,
        filters: &[(&str, String)],
        body: &B,
    ) -> Result<Vec<T>, StoreError> {
        let req = self
            .request(Method::PATCH, table)
            .query(filters)
            .header("Prefer", "return=representation")
            .json(body);
        self.fetch(req).await
    }
}

fn eq(value: &str) -> String {
    format!("eq.{value}")
}

fn single<T>(rows: Vec<T>, entity: &'static str, id: &str) -> Result<T, StoreError> {
    rows.into_iter().next().ok_or_else(|| StoreError::NotFound {
        entity,
        id: id.to_string(),
    })
}

#[async_trait]
impl WorkspaceStore for RestStore {
    async fn get_project(&self, id: &str) -> Result<Option<Project>, StoreError> {
        let rows: Vec<Project> = self.select(PROJECTS, &[("id", eq(id))]).await?;
        Ok(rows.into_iter().next())
    }

    async fn create_project(&self, project: &NewProject) -> Result<Project, StoreError> {
        self.insert(PROJECTS, project).await
    }

    async fn insert_message(&self, msg: &NewChatMessage) -> Result<ChatMessageRecord, StoreError> {
        self.insert(CHAT_MESSAGES, msg).await
    }

    async fn list_messages(&self, session_id: &str) -> Result<Vec<ChatMessageRecord>, StoreError> {
        self.select(
            CHAT_MESSAGES,
            &[
                ("session_id", eq(session_id)),
                ("order", "created_at.asc".to_string()),
            ],
        )
        .await
    }

    async fn list_project_files(&self, project_id: &str) -> Result<Vec<ProjectFile>, StoreError> {
        self.select(
            PROJECT_FILES,
            &[
                ("project_id", eq(project_id)),
                ("order", "file_path.asc".to_string()),
            ],
        )
        .await
    }

    async fn create_file(
        &self,
        project_id: &str,
        path: &str,
        content: &str,
    ) -> Result<ProjectFile, StoreError> {
        let body = serde_json::json!({
            "project_id": project_id,
            "file_path": path,
            "content": content,
        });
        self.insert(PROJECT_FILES, &body).await
    }

    async fn find_file(&self, project_id: &str, path: &str) -> Result<Option<ProjectFile>, StoreError> {
        let rows: Vec<ProjectFile> = self
            .select(
                PROJECT_FILES,
                &[
                    ("project_id", eq(project_id)),
                    ("file_path", eq(path)),
                    ("order", "created_at.asc".to_string()),
                    ("limit", "1".to_string()),
                ],
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn update_file_content(&self, file_id: &str, content: &str) -> Result<ProjectFile, StoreError> {
        let body = serde_json::json!({
            "content": content,
            "updated_at": now_timestamp(),
        });
        let rows: Vec<ProjectFile> = self
            .update(PROJECT_FILES, &[("id", eq(file_id))], &body)
            .await?;
        single(rows, "file", file_id)
    }

    async fn create_command_execution(
        &self,
        project_id: &str,
        session_id: &str,
        command: &str,
    ) -> Result<CommandExecution, StoreError> {
        let body = serde_json::json!({
            "project_id": project_id,
            "session_id": session_id,
            "command": command,
            "status": ExecutionStatus::Pending,
        });
        self.insert(COMMAND_EXECUTIONS, &body).await
    }

    async fn update_command_execution(
        &self,
        id: &str,
        update: &CommandExecutionUpdate,
    ) -> Result<CommandExecution, StoreError> {
        let rows: Vec<CommandExecution> = self
            .update(COMMAND_EXECUTIONS, &[("id", eq(id))], update)
            .await?;
        single(rows, "command execution", id)
    }

    async fn get_command_execution(&self, id: &str) -> Result<Option<CommandExecution>, StoreError> {
        let rows: Vec<CommandExecution> = self.select(COMMAND_EXECUTIONS, &[("id", eq(id))]).await?;
        Ok(rows.into_iter().next())
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
