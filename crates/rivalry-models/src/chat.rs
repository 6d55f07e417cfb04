use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::research::RunMetadata;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// One entry in a session's chat history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: ChatRole,
    /// Markdown content.
    pub content: String,
    /// Run metadata for assistant answers, used for "Behind the Scenes".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<RunMetadata>,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
            metadata: None,
            created_at: Utc::now(),
        }
    }

    pub fn assistant(content: impl Into<String>, metadata: Option<RunMetadata>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
            metadata,
            created_at: Utc::now(),
        }
    }
}
