//! Conversation assembly: stored history to inference messages.
//!
//! The system prompt is never stored; it is prepended on every request.

use std::collections::HashSet;

use crate::inference::types::{ChatMessage, Role, ToolCallResponse};
use crate::storage::ChatMessageRecord;

/// Prepended to every completion request.
pub const SYSTEM_PROMPT: &str = "You are WindCode AI, an intelligent coding assistant that helps \
developers create projects. You have access to file system tools (create_file, read_file, \
append_file, list_project_files) and command execution (run_command). When a user requests a \
project, analyze it, create the necessary files, and propose commands to execute. Always use \
tools to accomplish tasks. Be concise and helpful.";

/// Build the request messages: system prompt followed by the session history.
///
/// Tool results are placed directly after the assistant message that issued
/// them, in call order, even when they were stored later (an action approved
/// after the model already answered an earlier one). Calls with no result yet
/// are left out of their assistant message, and results with no issuing call
/// are skipped.
pub fn build_conversation(history: &[ChatMessageRecord]) -> Vec<ChatMessage> {
    let mut placed = HashSet::new();
    let mut messages = Vec::with_capacity(history.len() + 1);
    messages.push(ChatMessage::system(SYSTEM_PROMPT));

    for (index, record) in history.iter().enumerate() {
        match record.role {
            Role::Assistant => {
                let mut answered = Vec::new();
                let mut results = Vec::new();
                for call in decode_tool_calls(record).unwrap_or_default() {
                    if let Some(at) = find_result(history, index, &call.id, &placed) {
                        placed.insert(at);
                        results.push(&history[at]);
                        answered.push(call);
                    }
                }
                let tool_calls = Some(answered).filter(|calls| !calls.is_empty());
                messages.push(ChatMessage::assistant(record.content.clone(), tool_calls));
                for result in results {
                    let id = result.tool_call_id.as_deref().unwrap_or_default();
                    messages.push(ChatMessage::tool(id, result.content.clone()));
                }
            }
            Role::Tool => {
                if !placed.contains(&index) {
                    tracing::warn!(message_id = %record.id, "tool message without a matching call, skipping");
                }
            }
            Role::User => messages.push(ChatMessage::user(record.content.clone())),
            Role::System => messages.push(ChatMessage::system(record.content.clone())),
        }
    }

    messages
}

/// First unplaced tool result for `call_id` stored after the assistant message at `issued_at`.
fn find_result(
    history: &[ChatMessageRecord],
    issued_at: usize,
    call_id: &str,
    placed: &HashSet<usize>,
) -> Option<usize> {
    history
        .iter()
        .enumerate()
        .skip(issued_at + 1)
        .find(|(i, m)| {
            m.role == Role::Tool
                && m.tool_call_id.as_deref() == Some(call_id)
                && !placed.contains(i)
        })
        .map(|(i, _)| i)
}

fn decode_tool_calls(record: &ChatMessageRecord) -> Option<Vec<ToolCallResponse>> {
    let raw = record.tool_calls.as_deref()?;
    match serde_json::from_str(raw) {
        Ok(calls) => Some(calls),
        Err(e) => {
            tracing::warn!(message_id = %record.id, error = %e, "stored tool_calls are not valid JSON");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(role: Role, content: &str, tool_calls: Option<&str>, tool_call_id: Option<&str>) -> ChatMessageRecord {
        ChatMessageRecord {
            id: uuid::Uuid::new_v4().to_string(),
            session_id: "s1".into(),
            role,
            content: content.into(),
            tool_calls: tool_calls.map(str::to_string),
            tool_call_id: tool_call_id.map(str::to_string),
            created_at: "2026-01-01T00:00:00.000000Z".into(),
        }
    }

    const TWO_CALLS: &str = r#"[
        {"id":"call_a","type":"function","function":{"name":"list_project_files","arguments":"{}"}},
        {"id":"call_b","type":"function","function":{"name":"create_file","arguments":"{\"path\":\"a\",\"content\":\"x\"}"}}
    ]"#;

    #[test]
    fn test_system_prompt_first() {
        let messages = build_conversation(&[record(Role::User, "hi", None, None)]);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[0].content.as_deref(), Some(SYSTEM_PROMPT));
        assert_eq!(messages[1].role, Role::User);
    }

    #[test]
    fn test_unanswered_calls_are_dropped() {
        let history = vec![
            record(Role::User, "build it", None, None),
            record(Role::Assistant, "", Some(TWO_CALLS), None),
            record(Role::Tool, "[]", None, Some("call_a")),
        ];
        let messages = build_conversation(&history);
        let calls = messages[2].tool_calls.as_ref().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].id, "call_a");
        assert_eq!(messages[3].tool_call_id.as_deref(), Some("call_a"));
    }

    #[test]
    fn test_no_answered_calls_means_plain_assistant() {
        let history = vec![
            record(Role::User, "build it", None, None),
            record(Role::Assistant, "on it", Some(TWO_CALLS), None),
        ];
        let messages = build_conversation(&history);
        assert!(messages[2].tool_calls.is_none());
        assert_eq!(messages[2].content.as_deref(), Some("on it"));
    }

    #[test]
    fn test_late_result_moves_next_to_its_call() {
        let creates = r#"[
            {"id":"call_a","type":"function","function":{"name":"create_file","arguments":"{}"}},
            {"id":"call_b","type":"function","function":{"name":"create_file","arguments":"{}"}}
        ]"#;
        let history = vec![
            record(Role::User, "build it", None, None),
            record(Role::Assistant, "", Some(creates), None),
            record(Role::Tool, "File created: a", None, Some("call_a")),
            record(Role::Assistant, "created a", None, None),
            record(Role::Tool, "File created: b", None, Some("call_b")),
        ];
        let messages = build_conversation(&history);

        let roles: Vec<Role> = messages.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            [Role::System, Role::User, Role::Assistant, Role::Tool, Role::Tool, Role::Assistant]
        );
        let ids: Vec<&str> = messages[2]
            .tool_calls
            .as_ref()
            .unwrap()
            .iter()
            .map(|c| c.id.as_str())
            .collect();
        assert_eq!(ids, ["call_a", "call_b"]);
        assert_eq!(messages[3].tool_call_id.as_deref(), Some("call_a"));
        assert_eq!(messages[4].tool_call_id.as_deref(), Some("call_b"));
        assert_eq!(messages[5].content.as_deref(), Some("created a"));
    }

    #[test]
    fn test_reused_call_id_matches_its_own_turn() {
        let first = r#"[{"id":"call_0","type":"function","function":{"name":"list_project_files","arguments":"{}"}}]"#;
        let history = vec![
            record(Role::Assistant, "", Some(first), None),
            record(Role::Tool, "[]", None, Some("call_0")),
            record(Role::Assistant, "", Some(first), None),
            record(Role::Tool, "[\"a\"]", None, Some("call_0")),
        ];
        let messages = build_conversation(&history);
        assert_eq!(messages.len(), 5);
        assert_eq!(messages[2].content.as_deref(), Some("[]"));
        assert_eq!(messages[4].content.as_deref(), Some("[\"a\"]"));
    }

    #[test]
    fn test_orphan_tool_result_skipped() {
        let history = vec![
            record(Role::User, "hi", None, None),
            record(Role::Tool, "stray", None, Some("call_x")),
        ];
        let messages = build_conversation(&history);
        assert_eq!(messages.len(), 2);
    }

    #[test]
    fn test_invalid_stored_tool_calls_ignored() {
        let history = vec![record(Role::Assistant, "hello", Some("not json"), None)];
        let messages = build_conversation(&history);
        assert!(messages[1].tool_calls.is_none());
    }
}
