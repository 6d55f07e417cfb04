pub mod decision_tree;
pub mod error;
pub mod llm;
pub mod orchestrator;
pub mod parser;
pub mod prompts;
pub mod query_parser;
pub mod report;
pub mod sub_agent;
pub mod tool_loop;

pub mod test_support;

pub use decision_tree::{build_decision_tree_dot, build_decision_tree_markdown, friendly_tool_name};
pub use error::AgentError;
pub use llm::{AnthropicClient, CompletionRequest, CompletionResponse, LlmClient, Message};
pub use orchestrator::{Orchestrator, ProgressSender};
pub use query_parser::QueryParser;
pub use report::{basic_report, ReportGenerator, ReportInput, REPORT_SECTIONS};
pub use sub_agent::{SubAgent, ToolAgent};
pub use tool_loop::{LoopOutcome, ToolLoop};
