//! Escalation agent: picks the human channel

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::providers::LlmProvider;
use crate::structured::{FieldSpec, OutputSchema, generate_typed};
use crate::types::EscalationChannel;

/// Rationale used when the user asks for a human outright
pub const DIRECT_REQUEST_CONTEXT: &str = "User requested human help directly.";

const SYSTEM_INSTRUCTION: &str = r#"
You are the AfyaMkononi Escalation Agent.
Your job is to decide the best path for human intervention based on symptom severity or user request.

CHANNELS:
1. WHATSAPP: For non-emergency consultations.
2. DOCTOR: For specialist referral requirements.
3. EMERGENCY: For immediate life-saving interventions (Call 112).

You must output valid JSON only.
"#;

const SCHEMA: OutputSchema = OutputSchema::new(&[
    FieldSpec::one_of("channel", "Where to send the user.", EscalationChannel::VARIANTS),
    FieldSpec::text("message", "Brief explanation of why we are escalating."),
]);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalationResult {
    pub channel: EscalationChannel,
    pub message: String,
}

pub async fn run_escalation_agent(
    provider: &dyn LlmProvider,
    input: &str,
    context: &str,
) -> Result<EscalationResult> {
    let prompt = format!("Context: {}. User message: \"{}\"", context, input);
    generate_typed(provider, SYSTEM_INSTRUCTION, &prompt, &SCHEMA).await
}
