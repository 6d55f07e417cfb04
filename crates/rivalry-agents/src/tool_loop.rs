use std::collections::HashMap;
use std::sync::Arc;

use rivalry_models::ToolCallRecord;
use rivalry_tools::ToolSet;
use serde_json::Value;
use tracing::{debug, info};

use crate::error::AgentError;
use crate::llm::{CompletionRequest, ContentBlock, LlmClient, Message, Role};

/// What a finished tool loop produced.
#[derive(Debug, Clone)]
pub struct LoopOutcome {
    /// Text of the model's final reply.
    pub text: String,
    /// Full conversation, starting with the user message.
    pub messages: Vec<Message>,
    pub tool_calls: Vec<ToolCallRecord>,
}

/// Drives one model through repeated tool calls until it answers in plain text.
pub struct ToolLoop {
    llm: Arc<dyn LlmClient>,
    tools: ToolSet,
    max_iterations: usize,
}

impl ToolLoop {
    pub fn new(llm: Arc<dyn LlmClient>, tools: ToolSet, max_iterations: usize) -> Self {
        Self {
            llm,
            tools,
            max_iterations: max_iterations.max(1),
        }
    }

    pub fn tools(&self) -> &ToolSet {
        &self.tools
    }

    pub async fn run(&self, system: &str, user_text: &str) -> Result<LoopOutcome, AgentError> {
        let definitions = self.tools.definitions();
        let mut messages = vec![Message::user(user_text)];

        for iteration in 1..=self.max_iterations {
            let request = CompletionRequest::new(messages.clone())
                .with_system(system)
                .with_tools(definitions.clone());
            let response = self.llm.complete(&request).await?;
            let tool_uses = response.message.tool_uses();
            messages.push(response.message);

            if tool_uses.is_empty() {
                let text = messages.last().map(Message::text).unwrap_or_default();
                debug!(iterations = iteration, "Tool loop finished");
                let tool_calls = extract_tool_calls(&messages);
                return Ok(LoopOutcome {
                    text,
                    messages,
                    tool_calls,
                });
            }

            let mut results = Vec::with_capacity(tool_uses.len());
            for (id, name, input) in tool_uses {
                info!(tool = %name, iteration, "Calling tool");
                let output = self.tools.call(&name, &input).await;
                results.push(ContentBlock::ToolResult {
                    tool_use_id: id,
                    is_error: output.get("error").is_some(),
                    content: output.to_string(),
                });
            }
            messages.push(Message {
                role: Role::User,
                content: results,
            });
        }

        Err(AgentError::MaxIterations(self.max_iterations))
    }
}

/// Pairs each tool request with its result by id. Requests without a result are skipped.
pub fn extract_tool_calls(messages: &[Message]) -> Vec<ToolCallRecord> {
    let mut pending: HashMap<&str, (&str, &Value)> = HashMap::new();
    let mut calls = Vec::new();

    for message in messages {
        for block in &message.content {
            match block {
                ContentBlock::ToolUse { id, name, input } => {
                    pending.insert(id.as_str(), (name.as_str(), input));
                }
                ContentBlock::ToolResult {
                    tool_use_id,
                    content,
                    ..
                } => {
                    if let Some((name, input)) = pending.remove(tool_use_id.as_str()) {
                        calls.push(ToolCallRecord::new(name, input.clone(), content));
                    }
                }
                _ => {}
            }
        }
    }
    calls
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{tool_use_reply, ScriptedLlm};
    use async_trait::async_trait;
    use rivalry_models::ToolDefinition;
    use rivalry_tools::Tool;
    use serde_json::json;

    struct Lookup;

    #[async_trait]
    impl Tool for Lookup {
        fn name(&self) -> &'static str {
            "lookup"
        }

        fn definition(&self) -> ToolDefinition {
            ToolDefinition {
                name: "lookup".to_string(),
                description: "Look something up".to_string(),
                input_schema: json!({"type": "object"}),
            }
        }

        async fn call(&self, input: &Value) -> Value {
            json!({ "found": input["key"] })
        }
    }

    fn tools() -> ToolSet {
        ToolSet::new().with(Lookup)
    }

    #[tokio::test]
    async fn plain_answer_ends_immediately() {
        let llm = Arc::new(ScriptedLlm::new().then_text("All done"));
        let outcome = ToolLoop::new(llm.clone(), tools(), 5)
            .run("system", "question")
            .await
            .unwrap();

        assert_eq!(outcome.text, "All done");
        assert_eq!(outcome.messages.len(), 2);
        assert!(outcome.tool_calls.is_empty());

        let requests = llm.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].system.as_deref(), Some("system"));
        assert_eq!(requests[0].tools[0].name, "lookup");
    }

    #[tokio::test]
    async fn tool_results_are_fed_back() {
        let llm = Arc::new(
            ScriptedLlm::new()
                .then_reply(tool_use_reply(&[
                    ("t1", "lookup", json!({"key": "a"})),
                    ("t2", "missing_tool", json!({})),
                ]))
                .then_text("Answer with a"),
        );
        let outcome = ToolLoop::new(llm.clone(), tools(), 5)
            .run("system", "question")
            .await
            .unwrap();

        assert_eq!(outcome.text, "Answer with a");
        // user, assistant(tool_use), user(tool_result), assistant
        assert_eq!(outcome.messages.len(), 4);
        assert_eq!(outcome.tool_calls.len(), 2);
        assert_eq!(outcome.tool_calls[0].tool, "lookup");
        assert_eq!(outcome.tool_calls[0].result_preview, r#"{"found":"a"}"#);
        assert!(outcome.tool_calls[1].result_preview.contains("Unknown tool"));

        let second = &llm.requests()[1];
        match &second.messages[2].content[1] {
            ContentBlock::ToolResult { tool_use_id, is_error, .. } => {
                assert_eq!(tool_use_id, "t2");
                assert!(*is_error);
            }
            other => panic!("expected tool result, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn stops_at_iteration_limit() {
        let call = || tool_use_reply(&[("t", "lookup", json!({"key": "x"}))]);
        let llm = Arc::new(ScriptedLlm::new().then_reply(call()).then_reply(call()).then_reply(call()));
        let result = ToolLoop::new(llm, tools(), 2).run("s", "q").await;
        assert!(matches!(result, Err(AgentError::MaxIterations(2))));
    }

    #[tokio::test]
    async fn llm_error_propagates() {
        let llm = Arc::new(ScriptedLlm::new().then_error("overloaded"));
        let result = ToolLoop::new(llm, tools(), 3).run("s", "q").await;
        assert!(matches!(result, Err(AgentError::Llm(_))));
    }

    #[test]
    fn unmatched_tool_use_is_skipped() {
        let messages = vec![
            Message {
                role: Role::Assistant,
                content: vec![
                    ContentBlock::ToolUse {
                        id: "a".to_string(),
                        name: "lookup".to_string(),
                        input: json!({}),
                    },
                    ContentBlock::ToolUse {
                        id: "b".to_string(),
                        name: "lookup".to_string(),
                        input: json!({}),
                    },
                ],
            },
            Message {
                role: Role::User,
                content: vec![ContentBlock::ToolResult {
                    tool_use_id: "b".to_string(),
                    content: "ok".to_string(),
                    is_error: false,
                }],
            },
        ];
        let calls = extract_tool_calls(&messages);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].result_preview, "ok");
    }
}
