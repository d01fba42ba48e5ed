//! HTTP API bodies: JSON shapes exchanged with the web client

use afya_core::HistoryTurn;
use afya_store::{VitalKind, VitalStatus};
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use tracing::error;

/// User id recorded when the client does not send one
pub const ANONYMOUS_USER: &str = "anonymous";

/// Fixed checkout id returned by the mock STK push
pub const MOCK_CHECKOUT_ID: &str = "ws_CO_0000000000000000000";

pub const DEFAULT_CONSULTATION_LIMIT: usize = 20;
pub const MAX_CONSULTATION_LIMIT: usize = 100;

/// `POST /api/agent/chat`
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub history: Vec<HistoryTurn>,
}

/// `POST /api/vitals`
#[derive(Debug, Clone, Deserialize)]
pub struct VitalRequest {
    pub user_id: String,
    #[serde(rename = "type")]
    pub kind: VitalKind,
    pub value: String,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub status: VitalStatus,
}

/// `POST /api/consultations/summary`
#[derive(Debug, Clone, Deserialize)]
pub struct SummaryRequest {
    #[serde(default)]
    pub notes: String,
}

/// Query string for `GET /api/insights/daily`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DailyInsightParams {
    pub name: Option<String>,
}

/// `POST /api/education/tip`
#[derive(Debug, Clone, Deserialize)]
pub struct ArticleTipRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
}

/// `POST /api/payments/stkpush`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StkPushRequest {
    pub phone_number: String,
    pub amount: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct StkPushResponse {
    #[serde(rename = "checkoutID")]
    pub checkout_id: String,
    pub message: String,
}

/// Query string for `GET /api/consultations/{user_id}`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListParams {
    pub limit: Option<usize>,
}

impl ListParams {
    pub fn limit(&self) -> usize {
        self.limit
            .unwrap_or(DEFAULT_CONSULTATION_LIMIT)
            .clamp(1, MAX_CONSULTATION_LIMIT)
    }
}

/// Error body returned as `{"error": "..."}`
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        error!("Request failed: {:#}", e);
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(serde_json::json!({ "error": self.message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_request_defaults() {
        let req: ChatRequest = serde_json::from_str(r#"{"prompt": "Jambo"}"#).unwrap();
        assert_eq!(req.prompt.as_deref(), Some("Jambo"));
        assert!(req.user_id.is_none());
        assert!(req.history.is_empty());

        let req: ChatRequest = serde_json::from_str(
            r#"{"prompt": "x", "history": [{"role": "user", "text": "hi"}, {"role": "model", "text": "Jambo"}]}"#,
        )
        .unwrap();
        assert_eq!(req.history.len(), 2);
    }

    #[test]
    fn test_vital_request_wire_names() {
        let req: VitalRequest = serde_json::from_str(
            r#"{"user_id": "u1", "type": "BP", "value": "120/80", "unit": "mmHg"}"#,
        )
        .unwrap();
        assert_eq!(req.kind, VitalKind::BloodPressure);
        assert_eq!(req.status, VitalStatus::Normal);
    }

    #[test]
    fn test_stk_push_wire_names() {
        let req: StkPushRequest =
            serde_json::from_str(r#"{"phoneNumber": "254712345678", "amount": 500}"#).unwrap();
        assert_eq!(req.phone_number, "254712345678");

        let resp = serde_json::to_value(StkPushResponse {
            checkout_id: MOCK_CHECKOUT_ID.to_string(),
            message: "Success".to_string(),
        })
        .unwrap();
        assert_eq!(resp["checkoutID"], MOCK_CHECKOUT_ID);
    }

    #[test]
    fn test_list_limit_is_clamped() {
        assert_eq!(ListParams::default().limit(), DEFAULT_CONSULTATION_LIMIT);
        assert_eq!(ListParams { limit: Some(0) }.limit(), 1);
        assert_eq!(ListParams { limit: Some(10_000) }.limit(), MAX_CONSULTATION_LIMIT);
    }
}
