//! Provider-agnostic types for the generative-language oracle

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A user turn sent to the oracle. Prior turns travel inside the prompt and
/// the system instruction is passed separately to [`LlmProvider::chat`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }
}

/// Per-request generation settings
#[derive(Debug, Clone, Default)]
pub struct GenerationOptions {
    /// Constrain the reply to JSON matching this provider-native schema
    pub response_schema: Option<Value>,
    /// Overrides the provider's default temperature
    pub temperature: Option<f32>,
}

impl GenerationOptions {
    pub fn json(schema: Value) -> Self {
        Self {
            response_schema: Some(schema),
            temperature: None,
        }
    }

    /// Free-text reply sampled at `temperature`
    pub fn text(temperature: f32) -> Self {
        Self {
            response_schema: None,
            temperature: Some(temperature),
        }
    }
}

/// Provider-agnostic response from an LLM
#[derive(Debug, Clone)]
pub struct ChatResponse {
    pub text: String,
    pub stop_reason: StopReason,
    pub usage: ChatUsage,
}

/// Why the model stopped generating
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    EndTurn,
    MaxTokens,
    Safety,
    Unknown,
}

/// Token usage from a single API call
#[derive(Debug, Clone, Copy, Default)]
pub struct ChatUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// Trait that all LLM providers implement
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Human-readable provider name (e.g. "google")
    fn provider_name(&self) -> &str;

    /// Model identifier (e.g. "gemini-2.0-flash")
    fn model(&self) -> &str;

    /// Send a chat request under a system instruction
    async fn chat(
        &self,
        messages: &[ChatMessage],
        system: &str,
        options: &GenerationOptions,
    ) -> Result<ChatResponse>;
}
