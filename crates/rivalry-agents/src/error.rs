use thiserror::Error;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("LLM error: {0}")]
    Llm(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("LLM API returned status {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Agent response parse error: {0}")]
    Parse(String),

    #[error("Timed out after {0} seconds")]
    Timeout(u64),

    #[error("Tool loop did not finish within {0} model calls")]
    MaxIterations(usize),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Tool setup error: {0}")]
    Tool(#[from] rivalry_tools::ToolError),
}
