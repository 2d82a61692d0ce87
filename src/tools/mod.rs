//! Tool schema and mock executors.
//!
//! - `definitions`: the six tools advertised to the model
//! - `simulate`: canned command output and error-fix suggestions

pub mod definitions;
pub mod simulate;

pub use definitions::{tool_definitions, ToolName};
pub use simulate::{analyze_error, simulate_command_execution, CommandOutput};
