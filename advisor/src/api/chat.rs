//! Chat endpoint: one conversational turn.
//!
//! The latest user message drives the knowledge flow — gate check (with a
//! possible synchronous refresh), then the retrieval query — before the
//! whole history plus context goes to the completion provider. Knowledge
//! failures degrade the turn (no refresh, empty context); only a completion
//! failure is surfaced to the caller.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;

use shared_types::{ChatMessage, RefreshOutcome, Role};

use crate::actors::KnowledgeMsg;
use crate::app_state::AppState;
use crate::completion::build_turn_messages;

/// Request: the conversation so far, latest message last.
#[derive(Debug, Deserialize)]
pub struct ChatTurnRequest {
    pub messages: Vec<ChatMessage>,
}

/// Response for one completed turn.
#[derive(Debug, Serialize)]
pub struct ChatTurnResponse {
    pub success: bool,
    pub turn_id: String,
    pub reply: String,
    pub refresh: RefreshOutcome,
}

pub async fn chat_turn(
    State(state): State<AppState>,
    Json(req): Json<ChatTurnRequest>,
) -> Response {
    let Some(utterance) = req
        .messages
        .iter()
        .rev()
        .find(|m| m.role == Role::User)
        .map(|m| m.content.clone())
    else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "success": false,
                "error": "request contains no user message"
            })),
        )
            .into_response();
    };

    // Gate check first; a triggered refresh completes inside this call, so
    // the retrieval below sees the refreshed index.
    let refresh = match ractor::call!(state.knowledge(), |reply| KnowledgeMsg::MaybeRefresh {
        utterance: utterance.clone(),
        reply,
    }) {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::warn!(error = %e, "knowledge actor unavailable for gate check");
            RefreshOutcome::skipped()
        }
    };

    let context = match ractor::call!(state.knowledge(), |reply| KnowledgeMsg::RetrieveContext {
        utterance: utterance.clone(),
        reply,
    }) {
        Ok(context) => context,
        Err(e) => {
            tracing::warn!(error = %e, "knowledge actor unavailable for retrieval");
            String::new()
        }
    };

    let messages = build_turn_messages(&context, &req.messages);
    match state.completion().complete(&messages).await {
        Ok(reply) => (
            StatusCode::OK,
            Json(ChatTurnResponse {
                success: true,
                turn_id: ulid::Ulid::new().to_string(),
                reply,
                refresh,
            }),
        )
            .into_response(),
        Err(e) => (
            StatusCode::BAD_GATEWAY,
            Json(json!({
                "success": false,
                "error": e.to_string()
            })),
        )
            .into_response(),
    }
}
