//! Orchestration provider abstraction.
//!
//! The HTTP handlers only see [`OrchestrationProvider`], so the AI21 client
//! can be swapped for the scripted mock in tests.

pub mod ai21;
pub mod mock;

use crate::models::{FileMetadata, RagRequest, RagResponse, Run, RunRequest};
use async_trait::async_trait;
use thiserror::Error;

pub use ai21::Ai21Provider;
pub use mock::MockProvider;

/// Error type for provider operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Upstream returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Invalid upstream response: {0}")]
    InvalidResponse(String),
}

impl ProviderError {
    /// Errors worth retrying: the same request may succeed later.
    pub fn is_transient(&self) -> bool {
        match self {
            ProviderError::NetworkError(_) | ProviderError::RateLimited => true,
            ProviderError::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Short label for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ProviderError::NotConfigured(_) => "not_configured",
            ProviderError::Api { .. } => "api",
            ProviderError::NotFound(_) => "not_found",
            ProviderError::RateLimited => "rate_limited",
            ProviderError::NetworkError(_) => "network",
            ProviderError::InvalidResponse(_) => "invalid_response",
        }
    }
}

/// Remote AI orchestration service: runs, conversational RAG, execution
/// graphs and library files.
#[async_trait]
pub trait OrchestrationProvider: Send + Sync {
    /// Start an asynchronous run.
    async fn create_run(&self, request: &RunRequest) -> Result<Run, ProviderError>;

    /// Fetch the current state of a run.
    async fn get_run(&self, run_id: &str) -> Result<Run, ProviderError>;

    /// Ask a question against the given library files.
    async fn conversational_rag(&self, request: &RagRequest)
        -> Result<RagResponse, ProviderError>;

    /// Step-by-step execution graph of a run, trivial steps excluded.
    async fn execution_graph(&self, run_id: &str) -> Result<serde_json::Value, ProviderError>;

    /// Library file metadata.
    async fn get_file(&self, file_id: &str) -> Result<FileMetadata, ProviderError>;

    /// Health check.
    async fn health_check(&self) -> Result<(), ProviderError>;
}
