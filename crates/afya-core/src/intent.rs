//! Intent classification
//!
//! Decides which specialist handles a turn. The oracle picks from the closed
//! [`Intent`] set; anything else is a schema violation and surfaces as an
//! error for the orchestrator's catch-all.

use tracing::debug;

use crate::error::{AgentError, Result};
use crate::providers::LlmProvider;
use crate::structured::{FieldSpec, OutputSchema, generate_structured};
use crate::types::{HistoryTurn, Intent, recent_history_json};

const SYSTEM_INSTRUCTION: &str = r#"
You are the AfyaMkononi intent router for a Kenyan health assistant.
Classify the user's latest message into exactly one intent:

- TRIAGE: the user describes symptoms, pain, illness, injury or feeling unwell.
- CARE: the user asks about nutrition, hydration, hygiene, exercise, sleep or general wellness.
- ESCALATION: the user asks to speak with a human, a doctor, a nurse or support staff.

Use the recent history to resolve short follow-ups (e.g. "yes, since yesterday" after a symptom question is TRIAGE).
You must output valid JSON only.
"#;

const SCHEMA: OutputSchema = OutputSchema::new(&[
    FieldSpec::one_of("intent", "The single best intent label.", Intent::VARIANTS),
    FieldSpec::text("reason", "One short sentence explaining the choice.").optional(),
]);

/// Classify a user message given recent turns
pub async fn classify_intent(
    provider: &dyn LlmProvider,
    input: &str,
    history: &[HistoryTurn],
    history_window: usize,
) -> Result<Intent> {
    let prompt = format!(
        "User message: \"{}\"\n\nRecent History: {}",
        input,
        recent_history_json(history, history_window)
    );

    let object = generate_structured(provider, SYSTEM_INSTRUCTION, &prompt, &SCHEMA).await?;

    let intent: Intent = serde_json::from_value(object["intent"].clone())
        .map_err(|e| AgentError::InvalidJson(e.to_string()))?;

    debug!(
        "Classified intent {} ({})",
        intent,
        object
            .get("reason")
            .and_then(|v| v.as_str())
            .unwrap_or("no reason given")
    );

    Ok(intent)
}
