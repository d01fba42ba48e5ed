//! Shared types for afya-core

use serde::{Deserialize, Serialize};

/// Fixed safety text for every emergency path
pub const EMERGENCY_MESSAGE: &str = "🚨 THIS IS AN EMERGENCY. Please call 112 immediately or go to the nearest hospital (like KNH or Avenue Hospital).";

/// Catch-all reply when the pipeline fails
pub const FALLBACK_MESSAGE: &str = "Pole sana, I am having trouble processing that right now. Please try again or visit your nearest clinic if you feel unwell.";

/// What the user wants from this turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Intent {
    Triage,
    Care,
    Escalation,
}

impl Intent {
    pub const VARIANTS: &'static [&'static str] = &["TRIAGE", "CARE", "ESCALATION"];
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Triage => write!(f, "TRIAGE"),
            Self::Care => write!(f, "CARE"),
            Self::Escalation => write!(f, "ESCALATION"),
        }
    }
}

/// Ordinal urgency set by the triage agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UrgencyLevel {
    Low,
    Medium,
    High,
    Emergency,
}

impl UrgencyLevel {
    pub const VARIANTS: &'static [&'static str] = &["LOW", "MEDIUM", "HIGH", "EMERGENCY"];
}

impl std::fmt::Display for UrgencyLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "LOW"),
            Self::Medium => write!(f, "MEDIUM"),
            Self::High => write!(f, "HIGH"),
            Self::Emergency => write!(f, "EMERGENCY"),
        }
    }
}

/// Next step chosen by the triage agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TriageAction {
    ContinueChat,
    AskFollowup,
    EscalateWhatsapp,
    ReferDoctor,
}

impl TriageAction {
    pub const VARIANTS: &'static [&'static str] = &[
        "CONTINUE_CHAT",
        "ASK_FOLLOWUP",
        "ESCALATE_WHATSAPP",
        "REFER_DOCTOR",
    ];

    /// Whether this action hands the user to a human
    pub fn is_escalation(&self) -> bool {
        matches!(self, Self::EscalateWhatsapp | Self::ReferDoctor)
    }
}

/// Human channel chosen by the escalation agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EscalationChannel {
    Whatsapp,
    Doctor,
    Emergency,
}

impl EscalationChannel {
    pub const VARIANTS: &'static [&'static str] = &["WHATSAPP", "DOCTOR", "EMERGENCY"];
}

/// Who spoke a turn in the chat history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Model,
}

/// A prior chat turn supplied by the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryTurn {
    pub role: TurnRole,
    pub text: String,
}

impl HistoryTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Model,
            text: text.into(),
        }
    }
}

/// Render the last `window` turns as JSON for inclusion in a prompt
pub fn recent_history_json(history: &[HistoryTurn], window: usize) -> String {
    let start = history.len().saturating_sub(window);
    serde_json::to_string(&history[start..]).unwrap_or_else(|_| "[]".to_string())
}

/// Where a redirect sends the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RedirectTarget {
    Whatsapp,
}

/// The single response a caller observes for one request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BackendResponse {
    Chat {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        disclaimer: Option<String>,
    },
    Redirect {
        target: RedirectTarget,
        url: String,
    },
    Emergency {
        message: String,
    },
}

impl BackendResponse {
    pub fn chat(message: impl Into<String>) -> Self {
        Self::Chat {
            message: message.into(),
            disclaimer: None,
        }
    }

    pub fn emergency() -> Self {
        Self::Emergency {
            message: EMERGENCY_MESSAGE.to_string(),
        }
    }

    pub fn fallback() -> Self {
        Self::chat(FALLBACK_MESSAGE)
    }

    pub fn whatsapp(url: impl Into<String>) -> Self {
        Self::Redirect {
            target: RedirectTarget::Whatsapp,
            url: url.into(),
        }
    }

    /// Variant name as it appears on the wire
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Chat { .. } => "chat",
            Self::Redirect { .. } => "redirect",
            Self::Emergency { .. } => "emergency",
        }
    }
}
