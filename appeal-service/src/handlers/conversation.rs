use crate::error::ApiError;
use crate::models::RagRequest;
use crate::services::{metrics, DEFAULT_SESSION};
use crate::startup::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::HeaderMap,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use validator::Validate;

pub const SESSION_HEADER: &str = "x-session-id";
pub const QUESTION_ANSWERED_MESSAGE: &str = "Question answered successfully";

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AskRequest {
    #[validate(length(min = 1, message = "question must not be empty"))]
    pub question: String,
    #[serde(default)]
    pub file_ids: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct AskResponse {
    pub message: &'static str,
    pub data: AskData,
    pub result: Value,
}

#[derive(Debug, Serialize)]
pub struct AskData {
    pub question: String,
    pub file_ids: Vec<String>,
    pub session_id: String,
}

fn session_id(headers: &HeaderMap) -> String {
    headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(DEFAULT_SESSION)
        .to_string()
}

/// `POST /ask`
#[tracing::instrument(name = "ask", skip_all)]
pub async fn ask(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<AskRequest>, JsonRejection>,
) -> Result<Json<AskResponse>, ApiError> {
    let Json(ask) = body.map_err(|e| ApiError::BadInput(e.body_text()))?;
    ask.validate()?;
    if ask.question.trim().is_empty() {
        return Err(ApiError::BadInput("question must not be empty".to_string()));
    }
    let session_id = session_id(&headers);

    // Held until the exchange is recorded so asks on one session serialize
    let mut conversation = state.history.session(&session_id).await;
    let request = RagRequest::new(conversation.outbound_with(&ask.question), ask.file_ids.clone());
    tracing::info!(
        session_id = %session_id,
        history_len = conversation.len(),
        file_count = ask.file_ids.len(),
        "Asking conversational RAG"
    );

    let response = match state.provider.conversational_rag(&request).await {
        Ok(response) => response,
        Err(e) => {
            metrics::record_ask("error");
            return Err(e.into());
        }
    };
    let Some(reply) = response.reply() else {
        metrics::record_ask("error");
        return Err(ApiError::UpstreamUnavailable(
            "conversational RAG returned no answer".to_string(),
        ));
    };
    conversation.record_exchange(ask.question.clone(), reply);
    drop(conversation);

    metrics::record_ask("answered");
    let result = serde_json::to_value(&response)
        .map_err(|e| ApiError::UpstreamUnavailable(format!("unserializable RAG response: {}", e)))?;

    Ok(Json(AskResponse {
        message: QUESTION_ANSWERED_MESSAGE,
        data: AskData {
            question: ask.question,
            file_ids: ask.file_ids,
            session_id,
        },
        result,
    }))
}

/// `DELETE /clear_history`
pub async fn clear_history(State(state): State<AppState>, headers: HeaderMap) -> Json<Value> {
    let session_id = session_id(&headers);
    state.history.clear(&session_id).await;
    tracing::info!(session_id = %session_id, "History cleared");
    Json(json!({ "message": "History cleared" }))
}
