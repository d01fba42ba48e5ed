//! Memory agent: best-effort interaction logging

use afya_store::{InteractionRecord, RecordStore};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::types::BackendResponse;

/// One finished request, ready to be logged
#[derive(Debug, Clone)]
pub struct Interaction {
    pub input: String,
    pub response: BackendResponse,
    pub timestamp: DateTime<Utc>,
}

impl Interaction {
    pub fn now(input: impl Into<String>, response: BackendResponse) -> Self {
        Self {
            input: input.into(),
            response,
            timestamp: Utc::now(),
        }
    }

    fn to_record(&self) -> serde_json::Result<InteractionRecord> {
        Ok(InteractionRecord {
            input: self.input.clone(),
            response: serde_json::to_value(&self.response)?,
            timestamp: self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
        })
    }
}

/// Outcome of a memory write
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryResult {
    pub stored: bool,
    pub consultation_id: String,
}

impl MemoryResult {
    fn not_stored() -> Self {
        Self {
            stored: false,
            consultation_id: String::new(),
        }
    }
}

/// Persist an interaction. Never fails: store errors become `stored: false`.
pub async fn run_memory_agent(
    store: &dyn RecordStore,
    user_id: &str,
    interaction: &Interaction,
) -> MemoryResult {
    let record = match interaction.to_record() {
        Ok(record) => record,
        Err(e) => {
            warn!("Could not serialize interaction for {}: {}", user_id, e);
            return MemoryResult::not_stored();
        }
    };

    match store.save(user_id, &record).await {
        Ok(outcome) => {
            debug!(
                "Stored interaction for {} as {} (success={})",
                user_id, outcome.id, outcome.success
            );
            MemoryResult {
                stored: outcome.success,
                consultation_id: outcome.id,
            }
        }
        Err(e) => {
            warn!("Memory write failed for {}: {:#}", user_id, e);
            MemoryResult::not_stored()
        }
    }
}
