//! Mock command execution and error analysis.
//!
//! Nothing here spawns a process. Outputs are canned strings picked by
//! case-insensitive substring matching; the first matching rule wins.

use serde::{Deserialize, Serialize};

/// Result of a (simulated) command run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl CommandOutput {
    fn ok(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            exit_code: 0,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.exit_code == 0
    }
}

/// Produce canned output for a shell command.
pub fn simulate_command_execution(command: &str) -> CommandOutput {
    let lower = command.to_lowercase();

    if lower.contains("npm install") {
        return CommandOutput::ok(
            "added 245 packages, and audited 246 packages in 3s\n\nfound 0 vulnerabilities",
        );
    }

    if lower.contains("npm run build") {
        return CommandOutput::ok(
            "vite v5.0.0 building for production...\n\u{2713} 42 modules transformed.\n\
             dist/index.html  0.45 kB\ndist/assets/index.js  142.23 kB\n\u{2713} built in 1.23s",
        );
    }

    if lower.contains("npm start") || lower.contains("npm run dev") {
        return CommandOutput::ok(
            "VITE v5.0.0  ready in 432 ms\n\u{279c}  Local:   http://localhost:5173/\n\
             \u{279c}  Network: use --host to expose",
        );
    }

    if lower.contains("git init") {
        return CommandOutput::ok("Initialized empty Git repository in /project/.git/");
    }

    if lower.contains("python") || lower.contains("node") {
        return CommandOutput::ok("Server running on port 3000");
    }

    CommandOutput::ok(format!("Command executed: {command}"))
}

/// Suggest a fix for an error message.
pub fn analyze_error(error: &str) -> &'static str {
    let lower = error.to_lowercase();

    if lower.contains("module not found") || lower.contains("cannot find module") {
        return "Missing dependency detected. Run: npm install";
    }

    if lower.contains("enoent") || lower.contains("no such file") {
        return "File or directory not found. Verify the path exists.";
    }

    if lower.contains("permission denied") || lower.contains("eacces") {
        return "Permission denied. Try running with appropriate permissions.";
    }

    if lower.contains("port") && lower.contains("already in use") {
        return "Port already in use. Kill the existing process or use a different port.";
    }

    if lower.contains("syntax error") {
        return "Syntax error detected. Check your code for typos or missing brackets.";
    }

    "Error detected. Review the error message for details."
}
