//! Appeal submission and execution-graph lookup.

use crate::error::ApiError;
use crate::models::{AppealResult, RunRequest, SubmittedAppeal};
use crate::services::metrics;
use crate::services::prompt::build_appeal_task;
use crate::services::providers::ProviderError;
use crate::services::schema::parse_appeal_result;
use crate::startup::AppState;
use axum::{
    extract::{
        rejection::{FormRejection, QueryRejection},
        Query, State,
    },
    Form, Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

pub const APPEAL_SUBMITTED_MESSAGE: &str = "Appeal submitted successfully";

#[derive(Debug, Serialize)]
pub struct AppealResponse {
    pub message: &'static str,
    pub data: AppealData,
    pub result: AppealResult,
}

/// Submitted fields echoed back with the id of the run that produced the result.
#[derive(Debug, Serialize)]
pub struct AppealData {
    #[serde(flatten)]
    pub appeal: SubmittedAppeal,
    pub run_id: String,
}

#[derive(Debug, Deserialize)]
pub struct StepsQuery {
    pub run_results_id: Option<String>,
}

/// `POST /submit-appeal`
#[tracing::instrument(name = "submit_appeal", skip_all)]
pub async fn submit_appeal(
    State(state): State<AppState>,
    form: Result<Form<SubmittedAppeal>, FormRejection>,
) -> Result<Json<AppealResponse>, ApiError> {
    let Form(appeal) = form.map_err(|e| ApiError::BadInput(e.body_text()))?;
    appeal.validate()?;
    for (field, value) in [("name", &appeal.name), ("denial_letter", &appeal.denial_letter)] {
        if value.trim().is_empty() {
            return Err(ApiError::BadInput(format!("{} must not be empty", field)));
        }
    }

    tracing::info!(
        denial_letter = %appeal.denial_letter,
        has_policy_doc = SubmittedAppeal::provided(&appeal.policy_doc_file_id).is_some(),
        "Submitting appeal"
    );

    let request = RunRequest::with_file_search(build_appeal_task(&appeal));
    let run = state.poller.create_and_poll(&request).await?;

    let result = parse_appeal_result(run.result.as_ref())
        .map_err(|e| {
            tracing::error!(run_id = %run.id, error = %e, "Run result failed validation");
            e
        })?
        .normalized();

    metrics::record_appeal_decision(result.decision.as_str());
    tracing::info!(run_id = %run.id, decision = result.decision.as_str(), "Appeal processed");

    Ok(Json(AppealResponse {
        message: APPEAL_SUBMITTED_MESSAGE,
        data: AppealData {
            appeal,
            run_id: run.id,
        },
        result,
    }))
}

/// `GET /get_steps?run_results_id=<id>`
///
/// Relays the execution graph verbatim. Any non-200 upstream answer is
/// reported as an unknown run id.
pub async fn get_steps(
    State(state): State<AppState>,
    query: Result<Query<StepsQuery>, QueryRejection>,
) -> Result<Json<Value>, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::BadInput(e.body_text()))?;
    let run_id = query
        .run_results_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::BadInput("run_results_id is required".to_string()))?;

    match state.provider.execution_graph(&run_id).await {
        Ok(graph) => Ok(Json(graph)),
        Err(
            e @ (ProviderError::NetworkError(_)
            | ProviderError::NotConfigured(_)
            | ProviderError::InvalidResponse(_)),
        ) => Err(e.into()),
        Err(e) => {
            tracing::debug!(run_id = %run_id, error = %e, "Execution graph unavailable");
            Err(ApiError::RunNotFound)
        }
    }
}
