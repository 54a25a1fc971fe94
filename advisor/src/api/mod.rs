//! HTTP API routes for the advisor service.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;

pub mod chat;

use crate::app_state::AppState;

/// Configure all API routes
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/chat", post(chat::chat_turn))
}

/// Health check endpoint
pub async fn health_check(State(_state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "advisor",
            "version": "0.1.0"
        })),
    )
}
