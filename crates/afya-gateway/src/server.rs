//! Gateway HTTP server: Axum router over the orchestrator and record store

use std::net::SocketAddr;
use std::sync::Arc;

use afya_core::{
    Orchestrator, article_tip, daily_health_insight, simplify_doctor_notes, vitals_insight,
};
use afya_store::ConsultationDb;
use axum::Router;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Json;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tracing::{debug, info};

use crate::protocol::{
    ANONYMOUS_USER, ApiError, ArticleTipRequest, ChatRequest, DailyInsightParams, ListParams,
    MOCK_CHECKOUT_ID, StkPushRequest, StkPushResponse, SummaryRequest, VitalRequest,
};

pub const SERVICE_NAME: &str = "AfyaMkononi API";

/// Shared state for all requests
#[derive(Clone)]
pub struct GatewayState {
    pub orchestrator: Arc<Orchestrator>,
    pub db: ConsultationDb,
    pub start_time: std::time::Instant,
}

/// The gateway server
pub struct GatewayServer {
    state: GatewayState,
    bind: SocketAddr,
}

impl GatewayServer {
    pub fn new(bind: SocketAddr, orchestrator: Arc<Orchestrator>, db: ConsultationDb) -> Self {
        let state = GatewayState {
            orchestrator,
            db,
            start_time: std::time::Instant::now(),
        };
        Self { state, bind }
    }

    /// Build the Axum router
    pub fn router(&self) -> Router {
        Router::new()
            .route("/health", get(health_handler))
            .route("/api/agent/chat", post(chat_handler))
            .route("/api/consultations/summary", post(summary_handler))
            .route("/api/consultations/{user_id}", get(consultations_handler))
            .route("/api/vitals", post(record_vital_handler))
            .route("/api/vitals/{user_id}", get(list_vitals_handler))
            .route("/api/vitals/{user_id}/insight", get(insight_handler))
            .route("/api/insights/daily", get(daily_insight_handler))
            .route("/api/education/tip", post(article_tip_handler))
            .route("/api/payments/stkpush", post(stk_push_handler))
            .route("/api/payments/callback", post(payment_callback_handler))
            .layer(CorsLayer::permissive())
            .with_state(self.state.clone())
    }

    /// Serve until `cancel` fires
    pub async fn run(self, cancel: CancellationToken) -> anyhow::Result<()> {
        let router = self.router();
        let listener = tokio::net::TcpListener::bind(self.bind).await?;
        info!("AfyaMkononi backend listening on {}", self.bind);

        axum::serve(listener, router)
            .with_graceful_shutdown(async move { cancel.cancelled().await })
            .await?;

        info!("Gateway stopped");
        Ok(())
    }
}

// ── Handlers ──

async fn health_handler(State(state): State<GatewayState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": SERVICE_NAME,
        "timestamp": chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        "uptime_secs": state.start_time.elapsed().as_secs(),
    }))
}

async fn chat_handler(
    State(state): State<GatewayState>,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = body.map_err(|e| ApiError::bad_request(e.body_text()))?;

    let prompt = match req.prompt.as_deref().map(str::trim) {
        Some(p) if !p.is_empty() => p.to_string(),
        _ => return Err(ApiError::bad_request("Prompt is required")),
    };
    let user_id = req
        .user_id
        .filter(|u| !u.trim().is_empty())
        .unwrap_or_else(|| ANONYMOUS_USER.to_string());

    debug!("Chat request from {} ({} history turns)", user_id, req.history.len());
    let response = state
        .orchestrator
        .handle(&prompt, &user_id, &req.history)
        .await;
    Ok(Json(response))
}

async fn consultations_handler(
    State(state): State<GatewayState>,
    Path(user_id): Path<String>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(params) = params.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let consultations = state.db.list_consultations(&user_id, params.limit()).await?;
    Ok(Json(serde_json::json!({ "consultations": consultations })))
}

async fn summary_handler(
    State(state): State<GatewayState>,
    body: Result<Json<SummaryRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = body.map_err(|e| ApiError::bad_request(e.body_text()))?;
    if req.notes.trim().is_empty() {
        return Err(ApiError::bad_request("Notes are required"));
    }

    let summary = simplify_doctor_notes(state.orchestrator.provider().as_ref(), &req.notes).await;
    Ok(Json(serde_json::json!({ "summary": summary })))
}

async fn record_vital_handler(
    State(state): State<GatewayState>,
    body: Result<Json<VitalRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = body.map_err(|e| ApiError::bad_request(e.body_text()))?;
    if req.user_id.trim().is_empty() {
        return Err(ApiError::bad_request("user_id is required"));
    }
    if req.value.trim().is_empty() {
        return Err(ApiError::bad_request("value is required"));
    }

    let record = state
        .db
        .record_vital(&req.user_id, req.kind, req.value.trim(), req.unit.trim(), req.status)
        .await?;
    Ok((StatusCode::CREATED, Json(record)))
}

async fn list_vitals_handler(
    State(state): State<GatewayState>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let vitals = state.db.list_vitals(&user_id).await?;
    Ok(Json(serde_json::json!({ "vitals": vitals })))
}

async fn insight_handler(
    State(state): State<GatewayState>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let vitals = state.db.list_vitals(&user_id).await?;
    let insight = vitals_insight(state.orchestrator.provider().as_ref(), &vitals).await;
    Ok(Json(serde_json::json!({ "insight": insight })))
}

async fn daily_insight_handler(
    State(state): State<GatewayState>,
    params: Result<Query<DailyInsightParams>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(params) = params.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let name = match params.name.as_deref().map(str::trim) {
        Some(n) if !n.is_empty() => n.to_string(),
        _ => return Err(ApiError::bad_request("name is required")),
    };

    let insight = daily_health_insight(state.orchestrator.provider().as_ref(), &name).await;
    Ok(Json(serde_json::json!({ "insight": insight })))
}

async fn article_tip_handler(
    State(state): State<GatewayState>,
    body: Result<Json<ArticleTipRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = body.map_err(|e| ApiError::bad_request(e.body_text()))?;
    if req.title.trim().is_empty() {
        return Err(ApiError::bad_request("title is required"));
    }

    let tip = article_tip(state.orchestrator.provider().as_ref(), req.title.trim(), &req.content).await;
    Ok(Json(serde_json::json!({ "tip": tip })))
}

async fn stk_push_handler(
    body: Result<Json<StkPushRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = body.map_err(|e| ApiError::bad_request(e.body_text()))?;
    if !(req.amount > 0.0) {
        return Err(ApiError::bad_request("amount must be positive"));
    }

    info!(
        "Initiating M-Pesa payment of {} for {}",
        req.amount, req.phone_number
    );
    Ok(Json(StkPushResponse {
        checkout_id: MOCK_CHECKOUT_ID.to_string(),
        message: "Success".to_string(),
    }))
}

async fn payment_callback_handler(Json(payload): Json<serde_json::Value>) -> impl IntoResponse {
    info!("M-Pesa callback received: {}", payload);
    (StatusCode::OK, "OK")
}
