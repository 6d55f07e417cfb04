use thiserror::Error;

#[derive(Error, Debug)]
pub enum ToolError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{service} returned status {status}: {body}")]
    Status {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Unexpected response: {0}")]
    Parse(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error("{0} not set")]
    MissingCredential(&'static str),
}

impl ToolError {
    /// Connection failures, timeouts, 429 and 5xx are worth another attempt.
    pub fn is_transient(&self) -> bool {
        match self {
            ToolError::Http(e) => e.is_connect() || e.is_timeout() || e.is_request(),
            ToolError::Status { status, .. } => *status == 429 || *status >= 500,
            ToolError::Timeout(_) => true,
            ToolError::Parse(_) | ToolError::InvalidInput(_) | ToolError::MissingCredential(_) => {
                false
            }
        }
    }
}
