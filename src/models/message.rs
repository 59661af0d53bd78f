use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A retrieved passage the backend used to ground an answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextChunk {
    pub text: String,
    #[serde(default)]
    pub score: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub context_chunks: Vec<ContextChunk>,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content.into(), Vec::new())
    }

    pub fn assistant(content: impl Into<String>, context_chunks: Vec<ContextChunk>) -> Self {
        Self::new(Role::Assistant, content.into(), context_chunks)
    }

    fn new(role: Role, content: String, context_chunks: Vec<ContextChunk>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content,
            context_chunks,
            created_at: Utc::now(),
        }
    }
}
