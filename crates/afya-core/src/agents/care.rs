//! Care guidance agent: wellness advice with a disclaimer

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::providers::LlmProvider;
use crate::structured::{FieldSpec, OutputSchema, generate_typed};

const SYSTEM_INSTRUCTION: &str = r#"
You are the AfyaMkononi Care Guidance Agent.
You provide general health guidance, lifestyle advice, and wellness education for users in Kenya.

CRITICAL RULES:
1. NO DIAGNOSIS.
2. NO MEDICATION ADVICE.
3. Focus on nutrition, hydration, hygiene, and general wellness.
4. Provide a standard medical disclaimer.
5. Be encouraging and supportive.

You must output valid JSON only.
"#;

const SCHEMA: OutputSchema = OutputSchema::new(&[
    FieldSpec::text("message", "Your guidance text."),
    FieldSpec::text("disclaimer", "Medical disclaimer text."),
]);

/// Validated care output; both fields are guaranteed non-empty
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CareResult {
    pub message: String,
    pub disclaimer: String,
}

pub async fn run_care_agent(provider: &dyn LlmProvider, input: &str) -> Result<CareResult> {
    let prompt = format!("User wellness question: \"{}\"", input);
    generate_typed(provider, SYSTEM_INSTRUCTION, &prompt, &SCHEMA).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AgentError;
    use crate::testing::ScriptedProvider;

    #[tokio::test]
    async fn test_care_parses_reply() {
        let provider = ScriptedProvider::new([r#"{
            "message": "Eat plenty of sukuma wiki and drink clean water.",
            "disclaimer": "This is general guidance, not a medical diagnosis."
        }"#]);
        let result = run_care_agent(&provider, "What should I eat?").await.unwrap();
        assert!(result.message.contains("water"));
        assert!(!result.disclaimer.is_empty());
        assert!(provider.prompts()[0].contains("What should I eat?"));
    }

    #[tokio::test]
    async fn test_care_rejects_blank_disclaimer() {
        let provider = ScriptedProvider::new([r#"{"message": "Stay hydrated.", "disclaimer": ""}"#]);
        let err = run_care_agent(&provider, "x").await.unwrap_err();
        assert!(matches!(err, AgentError::EmptyField(f) if f == "disclaimer"));
    }
}
