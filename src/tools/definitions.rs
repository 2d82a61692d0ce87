//! The fixed tool schema sent with every completion request.

use serde_json::json;

use crate::inference::types::{FunctionDefinition, ToolDefinition};

/// The six tools the assistant can call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolName {
    ListProjectFiles,
    CreateFile,
    ReadFile,
    AppendFile,
    RunCommand,
    AnalyzeError,
}

impl ToolName {
    pub const ALL: [ToolName; 6] = [
        ToolName::ListProjectFiles,
        ToolName::CreateFile,
        ToolName::ReadFile,
        ToolName::AppendFile,
        ToolName::RunCommand,
        ToolName::AnalyzeError,
    ];

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == name)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolName::ListProjectFiles => "list_project_files",
            ToolName::CreateFile => "create_file",
            ToolName::ReadFile => "read_file",
            ToolName::AppendFile => "append_file",
            ToolName::RunCommand => "run_command",
            ToolName::AnalyzeError => "analyze_error",
        }
    }

    /// Read-only tools run immediately; the rest need user approval.
    pub fn is_read_only(&self) -> bool {
        matches!(
            self,
            ToolName::ListProjectFiles | ToolName::ReadFile | ToolName::AnalyzeError
        )
    }

    fn description(&self) -> &'static str {
        match self {
            ToolName::ListProjectFiles => "List all files in the current project workspace",
            ToolName::CreateFile => "Create a new file with the specified content",
            ToolName::ReadFile => "Read the content of a file",
            ToolName::AppendFile => "Append content to an existing file",
            ToolName::RunCommand => "Execute a shell command and return stdout/stderr",
            ToolName::AnalyzeError => "Analyze an error message and suggest fixes",
        }
    }

    fn parameters(&self) -> serde_json::Value {
        match self {
            ToolName::ListProjectFiles => json!({
                "type": "object",
                "properties": {},
                "required": [],
            }),
            ToolName::CreateFile => json!({
                "type": "object",
                "properties": {
                    "path": {"type": "string", "description": "Relative path to the file to create"},
                    "content": {"type": "string", "description": "Content to write to the file"},
                },
                "required": ["path", "content"],
            }),
            ToolName::ReadFile => json!({
                "type": "object",
                "properties": {
                    "path": {"type": "string", "description": "Relative path to the file to read"},
                },
                "required": ["path"],
            }),
            ToolName::AppendFile => json!({
                "type": "object",
                "properties": {
                    "path": {"type": "string", "description": "Relative path to the file to append to"},
                    "content": {"type": "string", "description": "Content to append to the file"},
                },
                "required": ["path", "content"],
            }),
            ToolName::RunCommand => json!({
                "type": "object",
                "properties": {
                    "command": {"type": "string", "description": "Shell command to execute"},
                },
                "required": ["command"],
            }),
            ToolName::AnalyzeError => json!({
                "type": "object",
                "properties": {
                    "error": {"type": "string", "description": "Error message to analyze"},
                },
                "required": ["error"],
            }),
        }
    }

    pub fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            r#type: "function".to_string(),
            function: FunctionDefinition {
                name: self.as_str().to_string(),
                description: self.description().to_string(),
                parameters: self.parameters(),
            },
        }
    }
}

impl std::fmt::Display for ToolName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// All tool definitions, in schema order.
pub fn tool_definitions() -> Vec<ToolDefinition> {
    ToolName::ALL.iter().map(ToolName::definition).collect()
}
