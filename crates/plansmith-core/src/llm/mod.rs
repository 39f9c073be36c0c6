//! Language-model boundary.
//!
//! Plan generation only ever needs one capability from a model: answer a
//! conversation by calling a single, forced function tool. [`ToolCaller`]
//! captures exactly that so the generator can be driven by the OpenAI
//! client in production and by canned responses in tests.

pub mod openai;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use openai::OpenAiClient;

/// Who authored a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// A function tool offered to the model, with a JSON Schema for its
/// arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// A conversation plus the one tool the model is forced to call.
#[derive(Debug, Clone)]
pub struct ToolCallRequest {
    pub messages: Vec<ChatMessage>,
    pub tool: ToolDefinition,
}

/// A tool invocation returned by the model. `arguments` is the raw JSON
/// text exactly as the model produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCall {
    pub name: String,
    pub arguments: String,
}

/// Transport-level failures talking to a model provider.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("model provider returned {status}: {message}")]
    Upstream { status: u16, message: String },

    #[error("model request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected model response: {0}")]
    Decode(String),
}

/// A model that can be forced to answer with a tool call.
#[async_trait]
pub trait ToolCaller: Send + Sync {
    /// Send the conversation and return every tool call in the first
    /// choice of the response. An empty vector means the model answered
    /// with free text.
    async fn call_tool(&self, request: &ToolCallRequest) -> Result<Vec<ToolCall>, LlmError>;
}

const _: () = {
    fn _assert_object_safe(_: &dyn ToolCaller) {}
};
