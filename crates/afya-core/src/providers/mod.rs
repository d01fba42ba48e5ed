//! LLM provider abstraction
//!
//! The orchestrator and agents talk to the generative-language oracle only
//! through [`LlmProvider`]; [`google::GoogleProvider`] is the production
//! implementation.

pub mod google;
pub mod types;

pub use google::GoogleProvider;
pub use types::{
    ChatMessage, ChatResponse, ChatUsage, GenerationOptions, LlmProvider, StopReason,
};
