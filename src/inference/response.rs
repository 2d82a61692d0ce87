//! Decoding of non-streaming chat completion responses.

use serde::Deserialize;
use uuid::Uuid;

use super::errors::InferenceError;
use super::types::{AssistantReply, FunctionCallResponse, ToolCallResponse};

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CompletionMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<CompletionToolCall>>,
}

#[derive(Deserialize)]
struct CompletionToolCall {
    #[serde(default)]
    id: Option<String>,
    function: CompletionFunction,
}

#[derive(Deserialize)]
struct CompletionFunction {
    name: String,
    /// Usually a JSON-encoded string; some servers send the object itself.
    #[serde(default)]
    arguments: serde_json::Value,
}

/// Parse a `/chat/completions` body into the reply of its first choice.
///
/// Returns `Ok(None)` when the server answered with an empty `choices` array.
/// Tool calls without an `id` get a generated `call_<uuid>` so tool results
/// can still be correlated.
pub fn parse_completion_response(body: &str) -> Result<Option<AssistantReply>, InferenceError> {
    let resp: CompletionResponse =
        serde_json::from_str(body).map_err(|e| InferenceError::ResponseError {
            reason: format!("failed to parse completion response: {e}"),
        })?;

    let Some(choice) = resp.choices.into_iter().next() else {
        return Ok(None);
    };

    let tool_calls = choice
        .message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(|tc| ToolCallResponse {
            id: tc.id.unwrap_or_else(|| format!("call_{}", Uuid::new_v4())),
            r#type: "function".to_string(),
            function: FunctionCallResponse {
                name: tc.function.name,
                arguments: arguments_to_string(tc.function.arguments),
            },
        })
        .collect();

    Ok(Some(AssistantReply {
        content: choice.message.content,
        tool_calls,
        finish_reason: choice.finish_reason,
    }))
}

fn arguments_to_string(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => "{}".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_text_reply() {
        let body = r#"{
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": "Hello!"},
                "finish_reason": "stop"
            }]
        }"#;
        let reply = parse_completion_response(body).unwrap().unwrap();
        assert_eq!(reply.content.as_deref(), Some("Hello!"));
        assert!(!reply.has_tool_calls());
        assert_eq!(reply.finish_reason.as_deref(), Some("stop"));
    }

    #[test]
    fn test_parse_tool_calls_keep_order_and_raw_arguments() {
        let body = r#"{
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [
                        {"id": "call_a", "type": "function",
                         "function": {"name": "create_file", "arguments": "{\"path\":\"a.txt\",\"content\":\"x\"}"}},
                        {"id": "call_b", "type": "function",
                         "function": {"name": "list_project_files", "arguments": "{}"}}
                    ]
                },
                "finish_reason": "tool_calls"
            }]
        }"#;
        let reply = parse_completion_response(body).unwrap().unwrap();
        assert!(reply.content.is_none());
        assert_eq!(reply.tool_calls.len(), 2);
        assert_eq!(reply.tool_calls[0].id, "call_a");
        assert_eq!(reply.tool_calls[0].function.name, "create_file");
        assert_eq!(
            reply.tool_calls[0].function.arguments,
            r#"{"path":"a.txt","content":"x"}"#
        );
        assert_eq!(reply.tool_calls[1].function.name, "list_project_files");
    }

    #[test]
    fn test_object_arguments_are_reencoded() {
        let body = r#"{"choices": [{"message": {"tool_calls": [
            {"function": {"name": "read_file", "arguments": {"path": "src/main.rs"}}}
        ]}}]}"#;
        let reply = parse_completion_response(body).unwrap().unwrap();
        let call = &reply.tool_calls[0];
        assert!(call.id.starts_with("call_"));
        let args: serde_json::Value = serde_json::from_str(&call.function.arguments).unwrap();
        assert_eq!(args["path"], "src/main.rs");
    }

    #[test]
    fn test_empty_choices_is_no_reply() {
        assert!(parse_completion_response(r#"{"choices": []}"#).unwrap().is_none());
    }

    #[test]
    fn test_invalid_json_is_response_error() {
        let err = parse_completion_response("not json").unwrap_err();
        assert!(matches!(err, InferenceError::ResponseError { .. }));
    }
}
