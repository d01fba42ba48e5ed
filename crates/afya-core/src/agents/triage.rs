//! Triage agent: symptom urgency and next step

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::providers::LlmProvider;
use crate::structured::{FieldSpec, OutputSchema, generate_typed};
use crate::types::{HistoryTurn, TriageAction, UrgencyLevel, recent_history_json};

const SYSTEM_INSTRUCTION: &str = r#"
You are the AfyaMkononi Triage Agent for the Kenyan health context.
Your goal is to understand user symptoms, classify urgency, and decide on the next step.

CRITICAL RULES:
1. NEVER diagnose a condition (e.g., "You have malaria").
2. NEVER prescribe or recommend medication.
3. If the user presents red flags (chest pain, severe bleeding, difficulty breathing, unconsciousness), set urgency to EMERGENCY immediately, whatever action you choose.
4. Use polite, culturally appropriate language (e.g., "Jambo", "Pole").
5. Ask specific follow-up questions if symptoms are vague.
6. Urgency levels: LOW, MEDIUM, HIGH, EMERGENCY.
7. Actions: CONTINUE_CHAT, ASK_FOLLOWUP, ESCALATE_WHATSAPP, REFER_DOCTOR.

You must output valid JSON only.
"#;

const SCHEMA: OutputSchema = OutputSchema::new(&[
    FieldSpec::one_of("urgency", "How urgent the symptoms are.", UrgencyLevel::VARIANTS),
    FieldSpec::one_of("action", "The next step to take.", TriageAction::VARIANTS),
    FieldSpec::text("message", "Your response to the user."),
]);

/// Validated triage output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriageResult {
    pub urgency: UrgencyLevel,
    pub action: TriageAction,
    pub message: String,
}

impl TriageResult {
    /// Rationale handed to the escalation agent
    pub fn escalation_context(&self) -> String {
        format!("Triage result: {} urgency, {}", self.urgency, self.message)
    }
}

pub async fn run_triage_agent(
    provider: &dyn LlmProvider,
    input: &str,
    history: &[HistoryTurn],
    history_window: usize,
) -> Result<TriageResult> {
    let prompt = format!(
        "User symptoms/query: \"{}\"\n\nRecent History: {}",
        input,
        recent_history_json(history, history_window)
    );
    generate_typed(provider, SYSTEM_INSTRUCTION, &prompt, &SCHEMA).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AgentError;
    use crate::testing::ScriptedProvider;

    #[tokio::test]
    async fn test_triage_parses_reply() {
        let provider = ScriptedProvider::new([
            r#"{"urgency": "MEDIUM", "action": "ASK_FOLLOWUP", "message": "Pole. How long have you had the fever?"}"#,
        ]);
        let result = run_triage_agent(&provider, "I have a fever", &[], 6)
            .await
            .unwrap();
        assert_eq!(result.urgency, UrgencyLevel::Medium);
        assert_eq!(result.action, TriageAction::AskFollowup);
        assert!(result.message.contains("fever"));
        assert!(provider.system_instructions()[0].contains("Triage Agent"));
    }

    #[tokio::test]
    async fn test_triage_requires_urgency() {
        let provider = ScriptedProvider::new([
            r#"{"action": "CONTINUE_CHAT", "message": "ok"}"#,
        ]);
        let err = run_triage_agent(&provider, "x", &[], 6).await.unwrap_err();
        assert!(matches!(err, AgentError::MissingField(f) if f == "urgency"));
    }

    #[tokio::test]
    async fn test_triage_rejects_unknown_action() {
        let provider = ScriptedProvider::new([
            r#"{"urgency": "LOW", "action": "PRESCRIBE", "message": "ok"}"#,
        ]);
        let err = run_triage_agent(&provider, "x", &[], 6).await.unwrap_err();
        assert!(matches!(err, AgentError::InvalidEnum { field, .. } if field == "action"));
    }

    #[test]
    fn test_escalation_context() {
        let result = TriageResult {
            urgency: UrgencyLevel::High,
            action: TriageAction::ReferDoctor,
            message: "Please see a doctor today.".to_string(),
        };
        assert_eq!(
            result.escalation_context(),
            "Triage result: HIGH urgency, Please see a doctor today."
        );
    }
}
