use crate::error::ApiError;
use crate::models::FileMetadata;
use crate::services::providers::ProviderError;
use crate::startup::AppState;
use axum::{
    extract::{Path, State},
    Json,
};

/// `GET /files/:file_id`: library metadata, including processing status.
pub async fn get_file(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
) -> Result<Json<FileMetadata>, ApiError> {
    match state.provider.get_file(&file_id).await {
        Ok(metadata) => Ok(Json(metadata)),
        Err(ProviderError::NotFound(_)) => Err(ApiError::FileNotFound(file_id)),
        Err(e) => Err(e.into()),
    }
}
