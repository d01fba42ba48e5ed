//! Specialist agents
//!
//! Each agent pairs a system instruction with an output contract and is
//! driven through [`crate::structured`]. The memory agent is the exception:
//! it talks to the record store, not the oracle.

pub mod care;
pub mod escalation;
pub mod memory;
pub mod triage;

use serde::{Deserialize, Serialize};

pub use care::{CareResult, run_care_agent};
pub use escalation::{DIRECT_REQUEST_CONTEXT, EscalationResult, run_escalation_agent};
pub use memory::{Interaction, MemoryResult, run_memory_agent};
pub use triage::{TriageResult, run_triage_agent};

/// Output of any oracle-backed agent, tagged by agent name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "agent")]
pub enum AgentResult {
    #[serde(rename = "triage")]
    Triage(TriageResult),
    #[serde(rename = "care_guidance")]
    Care(CareResult),
    #[serde(rename = "escalation")]
    Escalation(EscalationResult),
}

impl AgentResult {
    pub fn agent(&self) -> &'static str {
        match self {
            Self::Triage(_) => "triage",
            Self::Care(_) => "care_guidance",
            Self::Escalation(_) => "escalation",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::Triage(r) => &r.message,
            Self::Care(r) => &r.message,
            Self::Escalation(r) => &r.message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EscalationChannel, TriageAction, UrgencyLevel};

    #[test]
    fn test_agent_result_tagging() {
        let result = AgentResult::Triage(TriageResult {
            urgency: UrgencyLevel::Low,
            action: TriageAction::ContinueChat,
            message: "Jambo!".to_string(),
        });
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["agent"], "triage");
        assert_eq!(json["urgency"], "LOW");
        assert_eq!(result.agent(), "triage");
        assert_eq!(result.message(), "Jambo!");
    }

    #[test]
    fn test_agent_result_names() {
        let care = AgentResult::Care(CareResult {
            message: "m".to_string(),
            disclaimer: "d".to_string(),
        });
        assert_eq!(serde_json::to_value(&care).unwrap()["agent"], "care_guidance");

        let escalation = AgentResult::Escalation(EscalationResult {
            channel: EscalationChannel::Whatsapp,
            message: "e".to_string(),
        });
        assert_eq!(escalation.agent(), "escalation");
        assert_eq!(escalation.message(), "e");
    }
}
