//! afya-core - The agent pipeline behind AfyaMkononi
//!
//! This crate provides:
//! - A Gemini provider behind the `LlmProvider` trait
//! - Schema-constrained generation with strict reply validation
//! - Intent classification and the triage, care, escalation and memory agents
//! - The orchestrator that routes a message to one response
//! - Vitals insights, doctor-note simplification, daily insights and article tips

pub mod agents;
pub mod error;
pub mod insights;
pub mod intent;
pub mod orchestrator;
pub mod providers;
pub mod structured;
pub mod types;
pub mod whatsapp;

/// Scripted oracle and record-store doubles for unit tests
#[cfg(any(test, feature = "test-util"))]
pub mod testing;

// Re-export main types for convenience
pub use agents::{AgentResult, CareResult, EscalationResult, MemoryResult, TriageResult};
pub use error::AgentError;
pub use insights::{article_tip, daily_health_insight, simplify_doctor_notes, vitals_insight};
pub use orchestrator::{Dispatch, Orchestrator, OrchestratorConfig};
pub use providers::{GoogleProvider, LlmProvider};
pub use types::{BackendResponse, HistoryTurn, Intent, TurnRole};
pub use whatsapp::WhatsAppLink;
