//! Request-level errors and their HTTP mapping.
//!
//! Every handler failure becomes `{ "error": "..." }` with a status chosen
//! from the error kind alone.

use crate::services::providers::ProviderError;
use crate::services::schema::SchemaError;
use crate::services::PollError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

pub const RUN_NOT_FOUND_MESSAGE: &str = "run_results_id not found";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadInput(String),

    #[error("{0}")]
    ValidationFailure(#[from] SchemaError),

    #[error("{}", RUN_NOT_FOUND_MESSAGE)]
    RunNotFound,

    #[error("file {0} not found")]
    FileNotFound(String),

    #[error("{0}")]
    RunFailed(String),

    #[error("upstream service unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("{0}")]
    UpstreamTimeout(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadInput(_) | ApiError::RunNotFound => StatusCode::BAD_REQUEST,
            ApiError::FileNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::ValidationFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::RunFailed(_) | ApiError::UpstreamUnavailable(_) => StatusCode::BAD_GATEWAY,
            ApiError::UpstreamTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    /// Short label for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::BadInput(_) => "bad_input",
            ApiError::ValidationFailure(_) => "validation_failure",
            ApiError::RunNotFound | ApiError::FileNotFound(_) => "upstream_not_found",
            ApiError::RunFailed(_) => "run_failed",
            ApiError::UpstreamUnavailable(_) => "upstream_unavailable",
            ApiError::UpstreamTimeout(_) => "upstream_timeout",
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut messages: Vec<String> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| match &e.message {
                    Some(message) => message.to_string(),
                    None => format!("{} is invalid", field),
                })
            })
            .collect();
        messages.sort();
        ApiError::BadInput(messages.join("; "))
    }
}

impl From<ProviderError> for ApiError {
    fn from(err: ProviderError) -> Self {
        ApiError::UpstreamUnavailable(err.to_string())
    }
}

impl From<PollError> for ApiError {
    fn from(err: PollError) -> Self {
        match err {
            PollError::Upstream(e) => e.into(),
            e @ PollError::RunFailed { .. } => ApiError::RunFailed(e.to_string()),
            e @ PollError::Timeout(_) => ApiError::UpstreamTimeout(e.to_string()),
            e @ PollError::Cancelled => ApiError::UpstreamUnavailable(e.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = self.to_string();

        if status.is_server_error() {
            tracing::error!(kind = self.kind(), status = %status, error = %message, "Request failed");
        } else {
            tracing::warn!(kind = self.kind(), status = %status, error = %message, "Request rejected");
        }

        (status, Json(json!({ "error": message }))).into_response()
    }
}
