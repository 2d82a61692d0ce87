//! ToolCallRelay: the assistant's completion / tool-call / approval loop.
//!
//! One user turn:
//! 1. Store the user message, request a completion with the full history.
//! 2. Store the assistant reply (tool calls serialized as a JSON string).
//! 3. Route each tool call: read-only and unknown tools produce tool-role
//!    messages right away, mutating tools are staged as pending actions.
//! 4. If nothing was staged, ask the model again (bounded by
//!    `max_tool_rounds`). Otherwise stop and wait for the user.
//!
//! `approve` executes one pending action, stores its result and always asks
//! the model again. `decline` stores `Action declined by user` and only asks
//! again if the policy says so. Errors never escape a turn: they are stored
//! as `Error: <message>` and reported through [`TurnOutcome::Failed`].

use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;

use super::conversation::build_conversation;
use super::errors::RelayError;
use super::tool_router::{decode_tool_call, execute_action, route_tool_call, ToolDisposition};
use super::types::{
    Continuation, ContinuationPolicy, PendingAction, RelayContext, RelayEvent, RelayState,
    TurnOutcome,
};
use crate::inference::types::{ToolCallResponse, ToolDefinition};
use crate::inference::CompletionBackend;
use crate::storage::{ChatMessageRecord, NewChatMessage, WorkspaceStore};
use crate::tools::tool_definitions;

/// Tool message stored when the user declines an action.
pub const DECLINED_MESSAGE: &str = "Action declined by user";

pub struct ToolCallRelay {
    store: Arc<dyn WorkspaceStore>,
    backend: Arc<dyn CompletionBackend>,
    context: RelayContext,
    policy: ContinuationPolicy,
    tools: Vec<ToolDefinition>,
    messages: Vec<ChatMessageRecord>,
    pending: Vec<PendingAction>,
    in_flight: bool,
    events: Option<UnboundedSender<RelayEvent>>,
}

impl ToolCallRelay {
    pub fn new(
        store: Arc<dyn WorkspaceStore>,
        backend: Arc<dyn CompletionBackend>,
        context: RelayContext,
        policy: ContinuationPolicy,
    ) -> Self {
        Self {
            store,
            backend,
            context,
            policy,
            tools: tool_definitions(),
            messages: Vec::new(),
            pending: Vec::new(),
            in_flight: false,
            events: None,
        }
    }

    /// Send [`RelayEvent`]s to `tx`. A closed receiver is ignored.
    pub fn with_events(mut self, tx: UnboundedSender<RelayEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    // ─── Accessors ───────────────────────────────────────────────────────

    pub fn context(&self) -> &RelayContext {
        &self.context
    }

    /// Pending actions in the order they were staged.
    pub fn pending_actions(&self) -> &[PendingAction] {
        &self.pending
    }

    /// Local copy of the session history, oldest first.
    pub fn messages(&self) -> &[ChatMessageRecord] {
        &self.messages
    }

    pub fn state(&self) -> RelayState {
        if self.in_flight {
            RelayState::AwaitingCompletion
        } else if !self.pending.is_empty() {
            RelayState::AwaitingApproval
        } else {
            RelayState::Idle
        }
    }

    // ─── Operations ──────────────────────────────────────────────────────

    /// Replace the local history with the session's stored messages.
    pub async fn load_history(&mut self) -> Result<(), RelayError> {
        self.messages = self.store.list_messages(&self.context.session_id).await?;
        tracing::debug!(
            session_id = %self.context.session_id,
            count = self.messages.len(),
            "history loaded"
        );
        Ok(())
    }

    /// Handle one line of user input.
    ///
    /// Returns `Err` only when the error itself could not be stored.
    pub async fn submit(&mut self, input: &str) -> Result<TurnOutcome, RelayError> {
        let input = input.trim();
        if input.is_empty() {
            return Ok(TurnOutcome::Ignored);
        }

        let message = NewChatMessage::user(&self.context.session_id, input);
        self.store_message(message).await?;
        self.respond().await
    }

    /// Execute a pending action and continue the conversation.
    pub async fn approve(&mut self, action_id: &str) -> Result<TurnOutcome, RelayError> {
        let action = self.take_pending(action_id, true)?;

        let executed = execute_action(self.store.as_ref(), &self.context, &action).await;
        match executed {
            Ok(result) => {
                self.store_tool_result(&action.id, result).await?;
                self.respond().await
            }
            Err(e) => {
                let message = e.to_string();
                tracing::warn!(action_id = %action.id, error = %message, "approved action failed");
                self.store_tool_result(&action.id, format!("Error: {message}"))
                    .await?;
                match self.policy.on_error {
                    Continuation::Continue => self.respond().await,
                    Continuation::Halt => Ok(TurnOutcome::Failed { message }),
                }
            }
        }
    }

    /// Reject a pending action.
    pub async fn decline(&mut self, action_id: &str) -> Result<TurnOutcome, RelayError> {
        let action = self.take_pending(action_id, false)?;
        self.store_tool_result(&action.id, DECLINED_MESSAGE.to_string())
            .await?;
        match self.policy.on_decline {
            Continuation::Continue => self.respond().await,
            Continuation::Halt => Ok(TurnOutcome::Halted),
        }
    }

    /// Request a completion over the current history, e.g. after a halted decline.
    pub async fn continue_conversation(&mut self) -> Result<TurnOutcome, RelayError> {
        self.respond().await
    }

    // ─── Internals ───────────────────────────────────────────────────────

    async fn respond(&mut self) -> Result<TurnOutcome, RelayError> {
        match self.run_completion_rounds().await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                let message = e.to_string();
                tracing::error!(session_id = %self.context.session_id, error = %message, "turn failed");
                let record = NewChatMessage::assistant(
                    &self.context.session_id,
                    format!("Error: {message}"),
                    None,
                );
                self.store_message(record).await?;
                Ok(TurnOutcome::Failed { message })
            }
        }
    }

    async fn run_completion_rounds(&mut self) -> Result<TurnOutcome, RelayError> {
        let rounds = self.policy.max_tool_rounds.max(1);

        for round in 1..=rounds {
            let request = build_conversation(&self.messages);

            self.in_flight = true;
            self.emit(RelayEvent::CompletionStarted);
            let reply = self.backend.complete(request, self.tools.clone()).await;
            self.in_flight = false;
            self.emit(RelayEvent::CompletionFinished);

            let Some(reply) = reply? else {
                tracing::warn!(round, "completion returned no choices");
                return Ok(TurnOutcome::Completed);
            };

            let tool_calls = if reply.has_tool_calls() {
                Some(serde_json::to_string(&reply.tool_calls)?)
            } else {
                None
            };
            let record = NewChatMessage::assistant(
                &self.context.session_id,
                reply.content.clone().unwrap_or_default(),
                tool_calls,
            );
            self.store_message(record).await?;

            if !reply.has_tool_calls() {
                return Ok(TurnOutcome::Completed);
            }

            let staged = self.process_tool_calls(&reply.tool_calls).await?;
            if staged > 0 {
                return Ok(TurnOutcome::AwaitingApproval {
                    pending: self.pending.len(),
                });
            }
        }

        tracing::warn!(
            max_tool_rounds = rounds,
            "read-only tool rounds exhausted without a final answer"
        );
        Ok(TurnOutcome::RoundLimitReached)
    }

    /// Route a batch of tool calls in order. Returns how many were staged.
    async fn process_tool_calls(&mut self, calls: &[ToolCallResponse]) -> Result<usize, RelayError> {
        let mut staged = 0;
        for wire in calls {
            let call = decode_tool_call(wire)?;
            let disposition =
                route_tool_call(self.store.as_ref(), &self.context.project_id, &call).await?;
            match disposition {
                ToolDisposition::Inline(result) => {
                    self.store_tool_result(&call.id, result).await?;
                }
                ToolDisposition::Staged(action) => {
                    tracing::info!(action_id = %action.id, description = %action.description, "action staged");
                    self.emit(RelayEvent::ActionStaged(action.clone()));
                    self.pending.push(action);
                    staged += 1;
                }
            }
        }
        Ok(staged)
    }

    fn take_pending(&mut self, action_id: &str, approved: bool) -> Result<PendingAction, RelayError> {
        let index = self
            .pending
            .iter()
            .position(|a| a.id == action_id)
            .ok_or_else(|| RelayError::ActionNotPending {
                action_id: action_id.to_string(),
            })?;
        let action = self.pending.remove(index);
        tracing::info!(action_id = %action.id, approved, "action resolved");
        self.emit(RelayEvent::ActionResolved {
            id: action.id.clone(),
            approved,
        });
        Ok(action)
    }

    async fn store_tool_result(&mut self, call_id: &str, content: String) -> Result<(), RelayError> {
        let message = NewChatMessage::tool(&self.context.session_id, call_id, content);
        self.store_message(message).await
    }

    async fn store_message(&mut self, message: NewChatMessage) -> Result<(), RelayError> {
        let record = self.store.insert_message(&message).await?;
        self.emit(RelayEvent::MessageStored(record.clone()));
        self.messages.push(record);
        Ok(())
    }

    fn emit(&self, event: RelayEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::inference::types::{AssistantReply, ChatMessage, FunctionCallResponse, Role};
    use crate::inference::InferenceError;
    use crate::storage::{ExecutionStatus, NewProject, SqliteStore};

    type Scripted = Result<Option<AssistantReply>, InferenceError>;

    /// Replays canned replies and records every request.
    struct ScriptedBackend {
        replies: Mutex<VecDeque<Scripted>>,
        requests: Mutex<Vec<Vec<ChatMessage>>>,
    }

    impl ScriptedBackend {
        fn new(replies: Vec<Scripted>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn request_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }

        fn last_request(&self) -> Vec<ChatMessage> {
            self.requests.lock().unwrap().last().cloned().unwrap()
        }
    }

    #[async_trait]
    impl CompletionBackend for ScriptedBackend {
        async fn complete(
            &self,
            messages: Vec<ChatMessage>,
            tools: Vec<ToolDefinition>,
        ) -> Result<Option<AssistantReply>, InferenceError> {
            assert_eq!(tools.len(), 6);
            self.requests.lock().unwrap().push(messages);
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(Some(text("done"))))
        }
    }

    fn text(content: &str) -> AssistantReply {
        AssistantReply {
            content: Some(content.to_string()),
            tool_calls: vec![],
            finish_reason: Some("stop".into()),
        }
    }

    fn calls(calls: &[(&str, &str, &str)]) -> AssistantReply {
        AssistantReply {
            content: None,
            tool_calls: calls
                .iter()
                .map(|(id, name, args)| ToolCallResponse {
                    id: id.to_string(),
                    r#type: "function".into(),
                    function: FunctionCallResponse {
                        name: name.to_string(),
                        arguments: args.to_string(),
                    },
                })
                .collect(),
            finish_reason: Some("tool_calls".into()),
        }
    }

    async fn relay_with(
        replies: Vec<Scripted>,
        policy: ContinuationPolicy,
    ) -> (ToolCallRelay, Arc<SqliteStore>, Arc<ScriptedBackend>) {
        let store = Arc::new(SqliteStore::open(":memory:").unwrap());
        let project = store
            .create_project(&NewProject {
                name: "My Project".into(),
                description: "Created with WindCode AI".into(),
                workspace_path: "/workspace".into(),
            })
            .await
            .unwrap();
        let backend = ScriptedBackend::new(replies);
        let relay = ToolCallRelay::new(
            store.clone(),
            backend.clone(),
            RelayContext::new_session(&project.id),
            policy,
        );
        (relay, store, backend)
    }

    const CREATE_INDEX: (&str, &str, &str) = (
        "call_create",
        "create_file",
        r#"{"path":"index.html","content":"<h1>Hi</h1>"}"#,
    );

    #[tokio::test]
    async fn test_blank_input_ignored() {
        let (mut relay, _, backend) = relay_with(vec![], ContinuationPolicy::default()).await;
        assert_eq!(relay.submit("   \n").await.unwrap(), TurnOutcome::Ignored);
        assert_eq!(backend.request_count(), 0);
        assert!(relay.messages().is_empty());
    }

    #[tokio::test]
    async fn test_plain_reply() {
        let (mut relay, store, backend) =
            relay_with(vec![Ok(Some(text("Hello!")))], ContinuationPolicy::default()).await;

        assert_eq!(relay.submit("hi").await.unwrap(), TurnOutcome::Completed);

        let request = backend.last_request();
        assert_eq!(request[0].role, Role::System);
        assert_eq!(request.last().unwrap().content.as_deref(), Some("hi"));

        let stored = store.list_messages(&relay.context().session_id).await.unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[1].role, Role::Assistant);
        assert_eq!(stored[1].content, "Hello!");
        assert_eq!(relay.state(), RelayState::Idle);
    }

    #[tokio::test]
    async fn test_empty_choices_completes_without_message() {
        let (mut relay, _, _) = relay_with(vec![Ok(None)], ContinuationPolicy::default()).await;
        assert_eq!(relay.submit("hi").await.unwrap(), TurnOutcome::Completed);
        assert_eq!(relay.messages().len(), 1);
    }

    #[tokio::test]
    async fn test_create_file_waits_for_approval_then_continues() {
        let (mut relay, store, backend) = relay_with(
            vec![Ok(Some(calls(&[CREATE_INDEX]))), Ok(Some(text("Created it.")))],
            ContinuationPolicy::default(),
        )
        .await;
        let project_id = relay.context().project_id.clone();

        let outcome = relay.submit("make a page").await.unwrap();
        assert_eq!(outcome, TurnOutcome::AwaitingApproval { pending: 1 });
        assert_eq!(relay.state(), RelayState::AwaitingApproval);
        assert_eq!(relay.pending_actions()[0].description, "Create file: index.html");
        assert!(store.list_project_files(&project_id).await.unwrap().is_empty());

        let outcome = relay.approve("call_create").await.unwrap();
        assert_eq!(outcome, TurnOutcome::Completed);
        assert!(relay.pending_actions().is_empty());

        let files = store.list_project_files(&project_id).await.unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].file_path, "index.html");

        // The continuation request carries the tool result after its call.
        assert_eq!(backend.request_count(), 2);
        let request = backend.last_request();
        let tool_msg = request.iter().find(|m| m.role == Role::Tool).unwrap();
        assert_eq!(tool_msg.tool_call_id.as_deref(), Some("call_create"));
        assert_eq!(tool_msg.content.as_deref(), Some("File created: index.html"));
        assert_eq!(relay.messages().last().unwrap().content, "Created it.");
    }

    #[tokio::test]
    async fn test_decline_stores_one_message_and_halts() {
        let (mut relay, store, backend) = relay_with(
            vec![Ok(Some(calls(&[("call_cmd", "run_command", r#"{"command":"npm install"}"#)])))],
            ContinuationPolicy::default(),
        )
        .await;

        relay.submit("install deps").await.unwrap();
        let before = relay.messages().len();

        let outcome = relay.decline("call_cmd").await.unwrap();
        assert_eq!(outcome, TurnOutcome::Halted);
        assert_eq!(relay.messages().len(), before + 1);
        let last = relay.messages().last().unwrap();
        assert_eq!(last.role, Role::Tool);
        assert_eq!(last.content, DECLINED_MESSAGE);
        assert_eq!(backend.request_count(), 1);
        assert!(relay.pending_actions().is_empty());

        let project_id = relay.context().project_id.clone();
        assert!(store.list_project_files(&project_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_decline_can_continue_by_policy() {
        let policy = ContinuationPolicy {
            on_decline: Continuation::Continue,
            ..ContinuationPolicy::default()
        };
        let (mut relay, _, backend) = relay_with(
            vec![Ok(Some(calls(&[CREATE_INDEX]))), Ok(Some(text("Okay.")))],
            policy,
        )
        .await;

        relay.submit("make a page").await.unwrap();
        assert_eq!(relay.decline("call_create").await.unwrap(), TurnOutcome::Completed);
        assert_eq!(backend.request_count(), 2);
    }

    #[tokio::test]
    async fn test_unknown_tool_result_then_auto_continue() {
        let (mut relay, _, backend) = relay_with(
            vec![Ok(Some(calls(&[("call_x", "foo", "{}")]))), Ok(Some(text("Sorry.")))],
            ContinuationPolicy::default(),
        )
        .await;

        assert_eq!(relay.submit("do foo").await.unwrap(), TurnOutcome::Completed);
        let tool_msg = relay.messages().iter().find(|m| m.role == Role::Tool).unwrap();
        assert_eq!(tool_msg.content, "Unknown tool: foo");
        assert_eq!(tool_msg.tool_call_id.as_deref(), Some("call_x"));
        assert_eq!(backend.request_count(), 2);
    }

    #[tokio::test]
    async fn test_read_only_rounds_are_bounded() {
        let policy = ContinuationPolicy {
            max_tool_rounds: 2,
            ..ContinuationPolicy::default()
        };
        let (mut relay, _, backend) = relay_with(
            vec![
                Ok(Some(calls(&[("call_1", "list_project_files", "{}")]))),
                Ok(Some(calls(&[("call_2", "list_project_files", "{}")]))),
                Ok(Some(calls(&[("call_3", "list_project_files", "{}")]))),
            ],
            policy,
        )
        .await;

        assert_eq!(relay.submit("look around").await.unwrap(), TurnOutcome::RoundLimitReached);
        assert_eq!(backend.request_count(), 2);
    }

    #[tokio::test]
    async fn test_backend_error_becomes_error_message() {
        let (mut relay, _, _) = relay_with(
            vec![Err(InferenceError::HttpError {
                status: 500,
                body: "boom".into(),
            })],
            ContinuationPolicy::default(),
        )
        .await;

        let outcome = relay.submit("hi").await.unwrap();
        assert_eq!(
            outcome,
            TurnOutcome::Failed {
                message: "HTTP 500: boom".into()
            }
        );
        let last = relay.messages().last().unwrap();
        assert_eq!(last.role, Role::Assistant);
        assert_eq!(last.content, "Error: HTTP 500: boom");
        assert_eq!(relay.state(), RelayState::Idle);
    }

    #[tokio::test]
    async fn test_failed_action_stores_error_and_halts() {
        let (mut relay, _, backend) = relay_with(
            vec![Ok(Some(calls(&[(
                "call_append",
                "append_file",
                r#"{"path":"missing.txt","content":"x"}"#,
            )])))],
            ContinuationPolicy::default(),
        )
        .await;

        relay.submit("append").await.unwrap();
        let outcome = relay.approve("call_append").await.unwrap();
        assert_eq!(
            outcome,
            TurnOutcome::Failed {
                message: "File not found: missing.txt".into()
            }
        );
        let last = relay.messages().last().unwrap();
        assert_eq!(last.role, Role::Tool);
        assert_eq!(last.content, "Error: File not found: missing.txt");
        assert_eq!(backend.request_count(), 1);
    }

    #[tokio::test]
    async fn test_failed_action_can_continue_by_policy() {
        let policy = ContinuationPolicy {
            on_error: Continuation::Continue,
            ..ContinuationPolicy::default()
        };
        let (mut relay, _, backend) = relay_with(
            vec![
                Ok(Some(calls(&[(
                    "call_append",
                    "append_file",
                    r#"{"path":"missing.txt","content":"x"}"#,
                )]))),
                Ok(Some(text("That file does not exist."))),
            ],
            policy,
        )
        .await;

        relay.submit("append").await.unwrap();
        assert_eq!(relay.approve("call_append").await.unwrap(), TurnOutcome::Completed);
        assert_eq!(backend.request_count(), 2);

        let request = backend.last_request();
        let tool_msg = request.last().unwrap();
        assert_eq!(tool_msg.role, Role::Tool);
        assert_eq!(tool_msg.content.as_deref(), Some("Error: File not found: missing.txt"));
        assert_eq!(relay.messages().last().unwrap().content, "That file does not exist.");
    }

    #[tokio::test]
    async fn test_two_pending_actions_approved_in_sequence() {
        let (mut relay, store, backend) = relay_with(
            vec![
                Ok(Some(calls(&[
                    ("call_a", "create_file", r#"{"path":"a.txt","content":"a"}"#),
                    ("call_b", "create_file", r#"{"path":"b.txt","content":"b"}"#),
                ]))),
                Ok(Some(text("Created a.txt."))),
                Ok(Some(text("Created b.txt."))),
            ],
            ContinuationPolicy::default(),
        )
        .await;

        assert_eq!(
            relay.submit("two files").await.unwrap(),
            TurnOutcome::AwaitingApproval { pending: 2 }
        );

        relay.approve("call_a").await.unwrap();
        let request = backend.last_request();
        let roles: Vec<Role> = request.iter().map(|m| m.role).collect();
        assert_eq!(roles, [Role::System, Role::User, Role::Assistant, Role::Tool]);
        assert_eq!(request[2].tool_calls.as_ref().unwrap().len(), 1);
        assert_eq!(relay.pending_actions().len(), 1);

        assert_eq!(relay.approve("call_b").await.unwrap(), TurnOutcome::Completed);
        let request = backend.last_request();
        let roles: Vec<Role> = request.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            [Role::System, Role::User, Role::Assistant, Role::Tool, Role::Tool, Role::Assistant]
        );
        let issued: Vec<&str> = request[2]
            .tool_calls
            .as_ref()
            .unwrap()
            .iter()
            .map(|c| c.id.as_str())
            .collect();
        assert_eq!(issued, ["call_a", "call_b"]);
        assert_eq!(request[3].tool_call_id.as_deref(), Some("call_a"));
        assert_eq!(request[4].tool_call_id.as_deref(), Some("call_b"));
        assert_eq!(request[5].content.as_deref(), Some("Created a.txt."));

        let project_id = relay.context().project_id.clone();
        assert_eq!(store.list_project_files(&project_id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_mixed_batch_runs_read_only_and_stages_the_rest() {
        let (mut relay, _, backend) = relay_with(
            vec![
                Ok(Some(calls(&[
                    ("call_list", "list_project_files", "{}"),
                    CREATE_INDEX,
                ]))),
                Ok(Some(text("Done."))),
            ],
            ContinuationPolicy::default(),
        )
        .await;

        assert_eq!(
            relay.submit("look, then create").await.unwrap(),
            TurnOutcome::AwaitingApproval { pending: 1 }
        );
        assert_eq!(backend.request_count(), 1);
        let listed = relay.messages().last().unwrap();
        assert_eq!(listed.role, Role::Tool);
        assert_eq!(listed.tool_call_id.as_deref(), Some("call_list"));
        assert_eq!(listed.content, "[]");

        assert_eq!(relay.approve("call_create").await.unwrap(), TurnOutcome::Completed);
        let request = backend.last_request();
        let roles: Vec<Role> = request.iter().map(|m| m.role).collect();
        assert_eq!(roles, [Role::System, Role::User, Role::Assistant, Role::Tool, Role::Tool]);
        assert_eq!(request[2].tool_calls.as_ref().unwrap().len(), 2);
        assert_eq!(request[3].tool_call_id.as_deref(), Some("call_list"));
        assert_eq!(request[4].tool_call_id.as_deref(), Some("call_create"));
    }

    #[tokio::test]
    async fn test_approved_command_records_execution_and_continues() {
        let (mut relay, store, backend) = relay_with(
            vec![
                Ok(Some(calls(&[("call_git", "run_command", r#"{"command":"git init"}"#)]))),
                Ok(Some(text("Repository ready."))),
            ],
            ContinuationPolicy::default(),
        )
        .await;

        relay.submit("init a repo").await.unwrap();
        assert_eq!(relay.pending_actions()[0].description, "Run command: git init");
        assert!(store
            .executions_for_session(&relay.context().session_id)
            .unwrap()
            .is_empty());

        assert_eq!(relay.approve("call_git").await.unwrap(), TurnOutcome::Completed);

        let executions = store
            .executions_for_session(&relay.context().session_id)
            .unwrap();
        assert_eq!(executions.len(), 1);
        assert_eq!(executions[0].command, "git init");
        assert_eq!(executions[0].status, ExecutionStatus::Completed);
        assert_eq!(executions[0].exit_code, Some(0));

        let request = backend.last_request();
        let tool_msg = request.last().unwrap();
        assert_eq!(tool_msg.tool_call_id.as_deref(), Some("call_git"));
        assert!(tool_msg
            .content
            .as_deref()
            .unwrap()
            .starts_with("Command executed:\nstdout: Initialized empty Git repository"));
        assert_eq!(relay.messages().last().unwrap().content, "Repository ready.");
    }

    #[tokio::test]
    async fn test_continue_after_halted_decline() {
        let (mut relay, _, backend) = relay_with(
            vec![Ok(Some(calls(&[CREATE_INDEX]))), Ok(Some(text("Skipping it.")))],
            ContinuationPolicy::default(),
        )
        .await;

        relay.submit("make a page").await.unwrap();
        assert_eq!(relay.decline("call_create").await.unwrap(), TurnOutcome::Halted);
        assert_eq!(backend.request_count(), 1);

        assert_eq!(relay.continue_conversation().await.unwrap(), TurnOutcome::Completed);
        assert_eq!(backend.request_count(), 2);
        let request = backend.last_request();
        assert_eq!(request.last().unwrap().content.as_deref(), Some(DECLINED_MESSAGE));
        assert_eq!(relay.messages().last().unwrap().content, "Skipping it.");
    }

    #[tokio::test]
    async fn test_resolving_unknown_action_fails() {
        let (mut relay, _, _) = relay_with(vec![], ContinuationPolicy::default()).await;
        let err = relay.approve("nope").await.unwrap_err();
        assert!(matches!(err, RelayError::ActionNotPending { .. }));
        let err = relay.decline("nope").await.unwrap_err();
        assert!(matches!(err, RelayError::ActionNotPending { .. }));
    }

    #[tokio::test]
    async fn test_events_are_emitted() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let (relay, _, _) = relay_with(
            vec![Ok(Some(calls(&[CREATE_INDEX])))],
            ContinuationPolicy::default(),
        )
        .await;
        let mut relay = relay.with_events(tx);

        relay.submit("make a page").await.unwrap();

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        assert!(matches!(events[0], RelayEvent::MessageStored(_)));
        assert_eq!(events[1], RelayEvent::CompletionStarted);
        assert_eq!(events[2], RelayEvent::CompletionFinished);
        assert!(matches!(events[3], RelayEvent::MessageStored(_)));
        assert!(matches!(&events[4], RelayEvent::ActionStaged(a) if a.id == "call_create"));
    }

    #[tokio::test]
    async fn test_history_survives_reload() {
        let (mut relay, store, _) =
            relay_with(vec![Ok(Some(text("Hello!")))], ContinuationPolicy::default()).await;
        relay.submit("hi").await.unwrap();

        let backend = ScriptedBackend::new(vec![]);
        let mut reloaded = ToolCallRelay::new(
            store,
            backend,
            relay.context().clone(),
            ContinuationPolicy::default(),
        );
        reloaded.load_history().await.unwrap();
        assert_eq!(reloaded.messages(), relay.messages());
    }
}
