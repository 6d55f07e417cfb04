pub mod agent_message;
pub mod chat;
pub mod config;
pub mod market;
pub mod progress;
pub mod query;
pub mod research;
pub mod tool;

pub use agent_message::{SubAgentKind, SubAgentOutcome, SubAgentOutput, SubAgentTask};
pub use chat::{ChatMessage, ChatRole};
pub use config::{
    LlmConfig, PipelineConfig, RetryConfig, RivalryConfig, ServerConfig, ToolsConfig,
};
pub use market::{FinancialSnapshot, RevenuePoint, SearchHit};
pub use progress::{ProgressEvent, Stage, StageStatus};
pub use query::ParsedQuery;
pub use research::{ResearchResult, RunMetadata, ToolCallSummary};
pub use tool::{ToolCallRecord, ToolDefinition, RESULT_PREVIEW_CHARS};
