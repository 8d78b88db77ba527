//! HTTP surface: routing, CORS, and error-to-response shaping.
//!
//! All pipeline errors are caught once here and shaped into
//! `{"detail": message}`; no partial schedule is ever returned.

use crate::auth::{self, TokenKind};
use crate::config::Settings;
use crate::error::AppError;
use crate::models::ScheduleRequest;
use crate::schedule::ScheduleService;
use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderValue, Method};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub schedule: Arc<ScheduleService>,
}

pub fn build_router(settings: Arc<Settings>) -> Router {
    let state = AppState {
        schedule: Arc::new(ScheduleService::new(settings.clone())),
        settings,
    };
    let cors = cors_layer(&state.settings);

    Router::new()
        .route("/health", get(health))
        .route("/auth-status", get(auth_status))
        .route("/parse-payment-schedule", post(parse_payment_schedule))
        .layer(cors)
        .with_state(state)
}

fn cors_layer(settings: &Settings) -> CorsLayer {
    let origins: Vec<HeaderValue> = settings
        .allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "AI Payment Schedule Parser"
    }))
}

/// Reports whether the cookie token decodes, without requiring auth and
/// without ever failing the request.
async fn auth_status(State(state): State<AppState>, headers: HeaderMap) -> Json<Value> {
    let Some(token) = auth::token_from_cookie(&headers, "access_token") else {
        return Json(json!({
            "authenticated": false,
            "message": "No access token found"
        }));
    };

    match auth::verify_token(&state.settings, &token, TokenKind::Access) {
        Ok(claims) => Json(json!({ "authenticated": true, "user": claims })),
        Err(e) => Json(json!({ "authenticated": false, "error": e.to_string() })),
    }
}

async fn parse_payment_schedule(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<ScheduleRequest>,
) -> Result<Json<Value>, AppError> {
    let claims = auth::authenticate(&state.settings, &headers)?;
    info!(user = ?claims.get("sub"), "parse-payment-schedule request");

    let schedule = state
        .schedule
        .generate(&body.prompt, body.unit_total_amount.as_deref())
        .await?;

    Ok(Json(json!({ "schedule": schedule })))
}
