use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use rivalry_models::ToolDefinition;
use serde_json::{json, Value};
use tracing::warn;

/// A function the model can call.
///
/// `call` never fails: problems come back as a JSON object with an `error`
/// field so the model can see them and carry on.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;

    fn definition(&self) -> ToolDefinition;

    async fn call(&self, input: &Value) -> Value;
}

/// Tools available to one sub-agent, looked up by name.
#[derive(Clone, Default)]
pub struct ToolSet {
    tools: Vec<Arc<dyn Tool>>,
    by_name: HashMap<&'static str, usize>,
}

impl ToolSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, tool: impl Tool + 'static) -> Self {
        self.add(Arc::new(tool));
        self
    }

    /// Adds a tool; a later tool with the same name replaces the earlier one.
    pub fn add(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name();
        match self.by_name.get(name) {
            Some(&index) => self.tools[index] = tool,
            None => {
                self.by_name.insert(name, self.tools.len());
                self.tools.push(tool);
            }
        }
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.definition()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub async fn call(&self, name: &str, input: &Value) -> Value {
        match self.by_name.get(name) {
            Some(&index) => self.tools[index].call(input).await,
            None => {
                warn!(tool = name, "Model requested unknown tool");
                json!({ "error": format!("Unknown tool: {name}") })
            }
        }
    }
}

/// String argument from a tool input, empty when absent or not a string.
pub(crate) fn str_arg<'a>(input: &'a Value, key: &str) -> &'a str {
    input.get(key).and_then(Value::as_str).unwrap_or("")
}

/// List-of-strings argument; a single string is accepted as a one-item list.
pub(crate) fn list_arg(input: &Value, key: &str) -> Vec<String> {
    match input.get(key) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s.clone()],
        _ => Vec::new(),
    }
}
