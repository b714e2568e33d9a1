//! LLM completion gateway.
//!
//! The pipeline only depends on the `LlmGateway` trait: a prompt (optionally
//! with conversation history) and a cancellation signal in, raw text out.
//! Transient provider failures surface as `GatewayError` and are classified
//! by the orchestrator into the stage that made the call.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cancel::CancelFlag;

pub mod ollama;

pub use ollama::OllamaGateway;

/// Errors from the completion gateway.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Cannot reach model server at {0}")]
    Connection(String),

    #[error("Model request timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("Model server returned HTTP {status}: {body}")]
    Provider { status: u16, body: String },

    #[error("Failed to decode model server response: {0}")]
    ResponseParsing(String),

    /// The cancellation flag was raised before the request went out.
    #[error("Completion cancelled by caller")]
    Cancelled,
}

/// Role of a conversation turn.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One prior turn of the conversation, used by the bounded repair re-prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// A blocking completion gateway.
pub trait LlmGateway: Send + Sync {
    /// Completes `prompt`, optionally preceded by `history`, honoring
    /// `cancel` at its suspension points.
    fn complete(
        &self,
        prompt: &str,
        history: &[ChatMessage],
        cancel: &CancelFlag,
    ) -> Result<String, GatewayError>;
}
