//! Google Gemini provider

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::types::{
    ChatMessage, ChatResponse, ChatUsage, GenerationOptions, LlmProvider, StopReason,
};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Google Gemini provider
pub struct GoogleProvider {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    max_tokens: u32,
    temperature: f32,
}

impl std::fmt::Debug for GoogleProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleProvider")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .finish()
    }
}

impl GoogleProvider {
    pub fn new(api_key: String, model: String, max_tokens: u32) -> Result<Self> {
        Self::with_timeout(api_key, model, max_tokens, Duration::from_secs(60))
    }

    pub fn with_timeout(
        api_key: String,
        model: String,
        max_tokens: u32,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            api_key,
            model,
            base_url: DEFAULT_BASE_URL.to_string(),
            max_tokens,
            temperature: 0.3,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }

    /// Convert provider-agnostic messages to Gemini wire format
    fn to_gemini_contents(messages: &[ChatMessage]) -> Vec<GeminiContent> {
        messages
            .iter()
            .map(|m| GeminiContent {
                role: "user".to_string(),
                parts: vec![GeminiPart {
                    text: m.content.clone(),
                }],
            })
            .collect()
    }

    fn build_body(&self, messages: &[ChatMessage], system: &str, options: &GenerationOptions) -> serde_json::Value {
        let mut generation_config = serde_json::json!({
            "maxOutputTokens": self.max_tokens,
            "temperature": options.temperature.unwrap_or(self.temperature),
        });
        if let Some(schema) = &options.response_schema {
            generation_config["responseMimeType"] = "application/json".into();
            generation_config["responseSchema"] = schema.clone();
        }

        serde_json::json!({
            "contents": Self::to_gemini_contents(messages),
            "systemInstruction": {
                "parts": [{"text": system}]
            },
            "generationConfig": generation_config,
        })
    }

    /// Convert Gemini response to provider-agnostic format
    fn from_gemini_response(resp: GeminiApiResponse) -> Result<ChatResponse> {
        let candidate = resp
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("Gemini response had no candidates"))?;

        let stop_reason = match candidate.finish_reason.as_deref() {
            Some("STOP") | None => StopReason::EndTurn,
            Some("MAX_TOKENS") => StopReason::MaxTokens,
            Some("SAFETY") | Some("PROHIBITED_CONTENT") => StopReason::Safety,
            Some(_) => StopReason::Unknown,
        };

        let content = candidate.content.ok_or_else(|| {
            anyhow!(
                "Gemini candidate had no content (finish reason: {:?})",
                stop_reason
            )
        })?;

        let text: String = content.parts.into_iter().map(|p| p.text).collect();

        let usage = resp
            .usage_metadata
            .map_or(ChatUsage::default(), |u| ChatUsage {
                input_tokens: u.prompt_token_count.unwrap_or(0),
                output_tokens: u.candidates_token_count.unwrap_or(0),
            });

        Ok(ChatResponse {
            text,
            stop_reason,
            usage,
        })
    }
}

#[async_trait]
impl LlmProvider for GoogleProvider {
    fn provider_name(&self) -> &str {
        "google"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn chat(
        &self,
        messages: &[ChatMessage],
        system: &str,
        options: &GenerationOptions,
    ) -> Result<ChatResponse> {
        let body = self.build_body(messages, system, options);

        debug!(
            "Gemini request: model={}, contents={}, structured={}",
            self.model,
            messages.len(),
            options.response_schema.is_some()
        );

        let response = self
            .client
            .post(self.endpoint())
            .header("Content-Type", "application/json")
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .context("Failed to send request to Gemini API")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(anyhow!(
                "Gemini API request failed with status {}: {}",
                status,
                error_text
            ));
        }

        let api_response: GeminiApiResponse = response
            .json()
            .await
            .context("Failed to parse Gemini API response")?;

        debug!(
            "Gemini response: candidates={}",
            api_response.candidates.len()
        );

        Self::from_gemini_response(api_response)
    }
}

// ── Gemini wire types ──

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    role: String,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Clone, Deserialize)]
struct GeminiApiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(rename = "usageMetadata")]
    usage_metadata: Option<GeminiUsageMetadata>,
}

#[derive(Debug, Clone, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct GeminiUsageMetadata {
    #[serde(rename = "promptTokenCount")]
    prompt_token_count: Option<u32>,
    #[serde(rename = "candidatesTokenCount")]
    candidates_token_count: Option<u32>,
}
