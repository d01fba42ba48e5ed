//! Record types and the store contract

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// One user interaction as handed to the store by the memory agent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionRecord {
    pub input: String,
    /// The response exactly as the caller observed it
    pub response: JsonValue,
    /// ISO-8601 timestamp of the interaction
    pub timestamp: String,
}

/// Result of a store write
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveOutcome {
    pub success: bool,
    pub id: String,
}

/// A persisted consultation (interaction log row)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsultationRecord {
    pub id: String,
    pub user_id: String,
    pub input: String,
    pub response: JsonValue,
    pub timestamp: String,
    pub created_at: DateTime<Utc>,
}

/// Kind of vital sign in the vitals log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VitalKind {
    #[serde(rename = "BP")]
    BloodPressure,
    Weight,
    Temp,
    Glucose,
}

impl VitalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BloodPressure => "BP",
            Self::Weight => "Weight",
            Self::Temp => "Temp",
            Self::Glucose => "Glucose",
        }
    }
}

impl std::fmt::Display for VitalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for VitalKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "BP" => Ok(Self::BloodPressure),
            "Weight" => Ok(Self::Weight),
            "Temp" => Ok(Self::Temp),
            "Glucose" => Ok(Self::Glucose),
            other => Err(anyhow!("Unknown vital kind: {}", other)),
        }
    }
}

/// Clinical flag attached to a vitals reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VitalStatus {
    #[default]
    Normal,
    Warning,
    Critical,
}

impl VitalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Warning => "warning",
            Self::Critical => "critical",
        }
    }
}

impl std::str::FromStr for VitalStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "normal" => Ok(Self::Normal),
            "warning" => Ok(Self::Warning),
            "critical" => Ok(Self::Critical),
            other => Err(anyhow!("Unknown vital status: {}", other)),
        }
    }
}

/// A single vitals reading
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VitalsRecord {
    pub id: String,
    pub user_id: String,
    #[serde(rename = "type")]
    pub kind: VitalKind,
    pub value: String,
    pub unit: String,
    pub status: VitalStatus,
    pub recorded_at: DateTime<Utc>,
}

/// Sink for interaction records.
///
/// Implementations report failures through `Err`; callers on the response
/// path decide whether that matters.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Persist one interaction for `user_id`
    async fn save(&self, user_id: &str, record: &InteractionRecord) -> Result<SaveOutcome>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vital_kind_wire_names() {
        assert_eq!(
            serde_json::to_string(&VitalKind::BloodPressure).unwrap(),
            "\"BP\""
        );
        let kind: VitalKind = serde_json::from_str("\"Glucose\"").unwrap();
        assert_eq!(kind, VitalKind::Glucose);
    }

    #[test]
    fn test_vital_kind_from_str() {
        assert_eq!("BP".parse::<VitalKind>().unwrap(), VitalKind::BloodPressure);
        assert!("Pulse".parse::<VitalKind>().is_err());
    }

    #[test]
    fn test_vital_status_lowercase() {
        assert_eq!(
            serde_json::to_string(&VitalStatus::Critical).unwrap(),
            "\"critical\""
        );
        assert_eq!("warning".parse::<VitalStatus>().unwrap(), VitalStatus::Warning);
        assert_eq!(VitalStatus::default(), VitalStatus::Normal);
    }

    #[test]
    fn test_vitals_record_uses_type_key() {
        let record = VitalsRecord {
            id: "v1".to_string(),
            user_id: "u1".to_string(),
            kind: VitalKind::Temp,
            value: "37.2".to_string(),
            unit: "C".to_string(),
            status: VitalStatus::Normal,
            recorded_at: Utc::now(),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["type"], "Temp");
        assert_eq!(json["status"], "normal");
    }
}
