//! Errors raised while querying the oracle and validating its output

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Oracle request failed: {0:#}")]
    Provider(anyhow::Error),

    #[error("Oracle output is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("Oracle output is missing required field '{0}'")]
    MissingField(String),

    #[error("Field '{field}' has value '{value}' outside its enumeration")]
    InvalidEnum { field: String, value: String },

    #[error("Field '{field}' must be a {expected}")]
    InvalidType { field: String, expected: &'static str },

    #[error("Field '{0}' must not be empty")]
    EmptyField(String),
}

impl AgentError {
    /// True when the oracle answered but the answer broke the output contract
    pub fn is_schema_violation(&self) -> bool {
        !matches!(self, Self::Provider(_))
    }
}

pub type Result<T> = std::result::Result<T, AgentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_violation_classification() {
        assert!(!AgentError::Provider(anyhow::anyhow!("timeout")).is_schema_violation());
        assert!(AgentError::MissingField("urgency".into()).is_schema_violation());
        assert!(
            AgentError::InvalidEnum {
                field: "channel".into(),
                value: "SMS".into()
            }
            .is_schema_violation()
        );
    }

    #[test]
    fn test_provider_error_keeps_context_chain() {
        let inner = anyhow::anyhow!("connection refused").context("Failed to send request");
        let msg = AgentError::Provider(inner).to_string();
        assert!(msg.contains("Failed to send request"));
        assert!(msg.contains("connection refused"));
    }
}
