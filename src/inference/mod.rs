//! Inference Client: OpenAI-compatible API client for local LLM inference.
//!
//! This module handles all communication with the model endpoint:
//! - Non-streaming chat completions with the tool schema attached
//! - Response decoding into an `AssistantReply`
//! - Model listing and health checks
//!
//! The client speaks the OpenAI Chat Completions API, so LM Studio, llama.cpp
//! and Ollama are interchangeable via config.

pub mod client;
pub mod errors;
pub mod response;
pub mod types;

pub use client::{CompletionBackend, InferenceClient};
pub use errors::InferenceError;
pub use types::{AssistantReply, ChatMessage, Role, ToolCall, ToolCallResponse, ToolDefinition};
