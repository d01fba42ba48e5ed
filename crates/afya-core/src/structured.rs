//! Schema-constrained generation
//!
//! Every agent talks to the oracle through [`generate_structured`]: the
//! schema is sent to the provider as a native response schema and the reply
//! is validated against the same schema before anything downstream sees it.
//! A reply that breaks the contract is rejected, never coerced.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{AgentError, Result};
use crate::providers::{ChatMessage, GenerationOptions, LlmProvider};

/// Value shape of a single output field
#[derive(Debug, Clone, Copy)]
pub enum FieldKind {
    /// Free text
    Text,
    /// One of a closed set of strings
    Enum(&'static [&'static str]),
}

/// One field of an agent's output contract
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub kind: FieldKind,
    pub required: bool,
}

impl FieldSpec {
    /// Required, non-empty text field
    pub const fn text(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            description,
            kind: FieldKind::Text,
            required: true,
        }
    }

    /// Required field restricted to `values`
    pub const fn one_of(
        name: &'static str,
        description: &'static str,
        values: &'static [&'static str],
    ) -> Self {
        Self {
            name,
            description,
            kind: FieldKind::Enum(values),
            required: true,
        }
    }

    pub const fn optional(mut self) -> Self {
        self.required = false;
        self
    }
}

/// A flat JSON object contract
#[derive(Debug, Clone, Copy)]
pub struct OutputSchema {
    pub fields: &'static [FieldSpec],
}

impl OutputSchema {
    pub const fn new(fields: &'static [FieldSpec]) -> Self {
        Self { fields }
    }

    /// Render as a Gemini `responseSchema` (OpenAPI subset)
    pub fn to_gemini_schema(&self) -> Value {
        let mut properties = Map::new();
        for field in self.fields {
            let mut prop = serde_json::json!({
                "type": "STRING",
                "description": field.description,
            });
            if let FieldKind::Enum(values) = field.kind {
                prop["enum"] = serde_json::json!(values);
            }
            properties.insert(field.name.to_string(), prop);
        }

        let required: Vec<&str> = self
            .fields
            .iter()
            .filter(|f| f.required)
            .map(|f| f.name)
            .collect();

        serde_json::json!({
            "type": "OBJECT",
            "properties": properties,
            "required": required,
        })
    }

    /// Check a parsed reply against the contract.
    ///
    /// Required fields must be present and non-empty; enum fields must hold
    /// one of their listed values. Optional fields are checked only when
    /// present and non-null.
    pub fn validate(&self, value: Value) -> Result<Map<String, Value>> {
        let Value::Object(object) = value else {
            return Err(AgentError::InvalidJson(
                "expected a JSON object at the top level".to_string(),
            ));
        };

        for field in self.fields {
            let raw = match object.get(field.name) {
                None | Some(Value::Null) if field.required => {
                    return Err(AgentError::MissingField(field.name.to_string()));
                }
                None | Some(Value::Null) => continue,
                Some(raw) => raw,
            };

            let Some(text) = raw.as_str() else {
                return Err(AgentError::InvalidType {
                    field: field.name.to_string(),
                    expected: "string",
                });
            };

            match field.kind {
                FieldKind::Text => {
                    if field.required && text.trim().is_empty() {
                        return Err(AgentError::EmptyField(field.name.to_string()));
                    }
                }
                FieldKind::Enum(values) => {
                    if !values.contains(&text) {
                        return Err(AgentError::InvalidEnum {
                            field: field.name.to_string(),
                            value: text.to_string(),
                        });
                    }
                }
            }
        }

        Ok(object)
    }
}

/// Pull the JSON object out of a model reply.
///
/// Tolerates markdown fences or a preamble around the object.
pub fn extract_json_object(text: &str) -> Result<Value> {
    let start = text
        .find('{')
        .ok_or_else(|| AgentError::InvalidJson("no JSON object found in reply".to_string()))?;
    let end = text
        .rfind('}')
        .ok_or_else(|| AgentError::InvalidJson("no closing brace found in reply".to_string()))?;
    if end < start {
        return Err(AgentError::InvalidJson("unbalanced braces in reply".to_string()));
    }

    serde_json::from_str(&text[start..=end]).map_err(|e| AgentError::InvalidJson(e.to_string()))
}

/// Query the oracle for a JSON object that satisfies `schema`
pub async fn generate_structured(
    provider: &dyn LlmProvider,
    system_instruction: &str,
    prompt: &str,
    schema: &OutputSchema,
) -> Result<Map<String, Value>> {
    let options = GenerationOptions::json(schema.to_gemini_schema());
    let response = provider
        .chat(&[ChatMessage::user(prompt)], system_instruction, &options)
        .await
        .map_err(AgentError::Provider)?;

    debug!(
        "Structured reply from {} ({} chars, {:?}, {} in / {} out tokens)",
        provider.model(),
        response.text.len(),
        response.stop_reason,
        response.usage.input_tokens,
        response.usage.output_tokens
    );

    let value = extract_json_object(&response.text)?;
    schema.validate(value)
}

/// [`generate_structured`] followed by deserialization into `T`
pub async fn generate_typed<T: DeserializeOwned>(
    provider: &dyn LlmProvider,
    system_instruction: &str,
    prompt: &str,
    schema: &OutputSchema,
) -> Result<T> {
    let object = generate_structured(provider, system_instruction, prompt, schema).await?;
    serde_json::from_value(Value::Object(object)).map_err(|e| AgentError::InvalidJson(e.to_string()))
}
