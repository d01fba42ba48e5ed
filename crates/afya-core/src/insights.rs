//! Free-text helpers for the dashboard, vitals, consultations and education screens

use afya_store::VitalsRecord;
use tracing::warn;

use crate::providers::{ChatMessage, GenerationOptions, LlmProvider};

pub const NO_VITALS_INSIGHT: &str = "Keep monitoring your vitals. Afya ni mali!";
pub const VITALS_INSIGHT_FALLBACK: &str = "Your vitals show important trends. Maintain your routine!";
pub const NO_SUMMARY: &str = "Could not generate summary.";
pub const NOTES_FALLBACK: &str = "Unable to simplify notes at this time.";
pub const NO_DAILY_INSIGHT: &str = "Stay hydrated today!";
pub const DAILY_INSIGHT_FALLBACK: &str = "Drink water and stay safe. Afya kwanza!";
pub const NO_ARTICLE_TIP: &str = "Health is wealth.";
pub const ARTICLE_TIP_FALLBACK: &str = "Prioritize health.";

/// Article content beyond this many characters is not sent
pub const ARTICLE_EXCERPT_CHARS: usize = 300;

/// Sampling temperature for every free-text helper
const TEXT_TEMPERATURE: f32 = 0.5;

const INSIGHT_SYSTEM: &str = "You are AfyaMkononi AI, a supportive health companion for users in Kenya. Never diagnose and never recommend medication.";

const NOTES_SYSTEM: &str = "You are AfyaMkononi AI assistant. Simplify medical notes for a Kenyan patient. Max 100 words. Format with Findings and Next Steps.";

/// Outcome of one free-text call
#[derive(Debug, Clone, PartialEq, Eq)]
enum Reply {
    Text(String),
    Empty,
    Failed,
}

impl Reply {
    /// Pick the reply text, or the fixed text for an empty reply or a failure
    fn or_fixed(self, on_empty: &str, on_failure: &str) -> String {
        match self {
            Self::Text(text) => text,
            Self::Empty => on_empty.to_string(),
            Self::Failed => on_failure.to_string(),
        }
    }
}

/// Short encouraging note about a user's vitals. Never fails.
pub async fn vitals_insight(provider: &dyn LlmProvider, vitals: &[VitalsRecord]) -> String {
    if vitals.is_empty() {
        return NO_VITALS_INSIGHT.to_string();
    }

    let data = vitals
        .iter()
        .map(|v| {
            format!(
                "{}: {}{} ({})",
                v.kind,
                v.value,
                v.unit,
                v.recorded_at.format("%Y-%m-%d")
            )
        })
        .collect::<Vec<_>>()
        .join(", ");
    let prompt = format!(
        "User Vitals Data: {}. Provide a short, 20-word encouraging insight about these health trends for a Kenyan user.",
        data
    );

    generate_text(provider, INSIGHT_SYSTEM, &prompt)
        .await
        .or_fixed(NO_VITALS_INSIGHT, VITALS_INSIGHT_FALLBACK)
}

/// Rewrite doctor's notes in plain language. Never fails.
pub async fn simplify_doctor_notes(provider: &dyn LlmProvider, notes: &str) -> String {
    let prompt = format!("Doctor's Notes: \"{}\"", notes);
    generate_text(provider, NOTES_SYSTEM, &prompt)
        .await
        .or_fixed(NO_SUMMARY, NOTES_FALLBACK)
}

/// Dashboard greeting: a 25-word tip with one Swahili word. Never fails.
pub async fn daily_health_insight(provider: &dyn LlmProvider, user_name: &str) -> String {
    let prompt = format!(
        "Generate a 25-word daily health insight for {} in Kenya. Include one local Swahili word.",
        user_name
    );
    generate_text(provider, INSIGHT_SYSTEM, &prompt)
        .await
        .or_fixed(NO_DAILY_INSIGHT, DAILY_INSIGHT_FALLBACK)
}

/// One-line pro-tip for a health education article. Never fails.
pub async fn article_tip(provider: &dyn LlmProvider, title: &str, content: &str) -> String {
    let excerpt: String = content.chars().take(ARTICLE_EXCERPT_CHARS).collect();
    let prompt = format!(
        "Title: {}. Content: {}. Catchy pro-tip with emoji.",
        title, excerpt
    );
    generate_text(provider, INSIGHT_SYSTEM, &prompt)
        .await
        .or_fixed(NO_ARTICLE_TIP, ARTICLE_TIP_FALLBACK)
}

async fn generate_text(provider: &dyn LlmProvider, system: &str, prompt: &str) -> Reply {
    match provider
        .chat(
            &[ChatMessage::user(prompt)],
            system,
            &GenerationOptions::text(TEXT_TEMPERATURE),
        )
        .await
    {
        Ok(response) if !response.text.trim().is_empty() => Reply::Text(response.text.trim().to_string()),
        Ok(response) => {
            warn!(
                "{} returned an empty reply ({:?})",
                provider.provider_name(),
                response.stop_reason
            );
            Reply::Empty
        }
        Err(e) => {
            warn!("{} text generation failed: {:#}", provider.provider_name(), e);
            Reply::Failed
        }
    }
}
