use serde::{Deserialize, Serialize};

/// Maximum number of characters of a tool result kept in the call log.
pub const RESULT_PREVIEW_CHARS: usize = 200;

/// A tool the model may call, in the shape the Messages API expects.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON schema of the tool's input object.
    pub input_schema: serde_json::Value,
}

/// One executed tool call, as shown in "Behind the Scenes".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCallRecord {
    pub tool: String,
    pub args: serde_json::Value,
    /// Result text, cut to [`RESULT_PREVIEW_CHARS`] characters plus `...`.
    pub result_preview: String,
}

impl ToolCallRecord {
    pub fn new(tool: impl Into<String>, args: serde_json::Value, result: &str) -> Self {
        Self {
            tool: tool.into(),
            args,
            result_preview: preview(result),
        }
    }
}

fn preview(result: &str) -> String {
    match result.char_indices().nth(RESULT_PREVIEW_CHARS) {
        Some((cut, _)) => format!("{}...", &result[..cut]),
        None => result.to_string(),
    }
}
