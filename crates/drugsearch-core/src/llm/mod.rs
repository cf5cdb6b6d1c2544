//! LLM client (component B)
//!
//! A single, stable "conversation" call shape: messages in, structured text
//! plus usage/latency metrics out. Model identity always comes from
//! [`crate::config::LlmConfig`], never a literal in this module.

mod http;
mod mock;

pub use http::HttpLlmClient;
pub use mock::{MockBehavior, MockLlmClient};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LlmMetrics {
    pub model_latency_ms: u64,
    pub total_latency_ms: u64,
}

/// Per-call options. All optional; `None` lets the provider use its default.
#[derive(Debug, Clone, Default)]
pub struct ConverseOptions<'a> {
    pub system: Option<&'a str>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

#[derive(Debug, Clone, thiserror::Error)]
#[non_exhaustive]
pub enum LlmError {
    #[error("throttled by provider: {0}")]
    Throttled(String),
    #[error("invalid LLM input: {0}")]
    InvalidInput(String),
    #[error("LLM provider unavailable: {0}")]
    UpstreamUnavailable(String),
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn converse(
        &self,
        messages: &[Message],
        options: ConverseOptions<'_>,
    ) -> Result<(String, Usage, LlmMetrics), LlmError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_message_has_user_role() {
        let m = Message::user("hello");
        assert_eq!(m.role, Role::User);
    }
}
