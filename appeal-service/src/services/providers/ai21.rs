//! AI21 Studio provider implementation.
//!
//! Talks to the Maestro runs API, conversational RAG, the run execution
//! graph and the file library over HTTPS with a bearer credential.

use super::{OrchestrationProvider, ProviderError};
use crate::config::Ai21Config;
use crate::models::{FileMetadata, RagRequest, RagResponse, Run, RunRequest};
use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use service_core::observability::TracedClientExt;

const RUNS_PATH: &[&str] = &["maestro", "runs"];
const RAG_PATH: &[&str] = &["conversational-rag"];
const FILES_PATH: &[&str] = &["library", "files"];
const EXECUTION_GRAPH_SEGMENT: &str = "execution-graph";

/// AI21 Studio client.
pub struct Ai21Provider {
    config: Ai21Config,
    base_url: Url,
    client: Client,
}

impl Ai21Provider {
    pub fn new(config: Ai21Config) -> Result<Self, ProviderError> {
        let base_url = Url::parse(&config.base_url).map_err(|e| {
            ProviderError::NotConfigured(format!("Invalid AI21 base URL {}: {}", config.base_url, e))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(ProviderError::NotConfigured(format!(
                "AI21 base URL {} cannot carry a path",
                config.base_url
            )));
        }

        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ProviderError::NotConfigured(format!("HTTP client: {}", e)))?;

        Ok(Self {
            config,
            base_url,
            client,
        })
    }

    /// Base URL joined with percent-encoded path segments.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn api_key(&self) -> &str {
        self.config.api_key.expose_secret()
    }

    async fn decode<T: DeserializeOwned>(
        response: reqwest::Response,
        operation: &str,
    ) -> Result<T, ProviderError> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::NetworkError(e.to_string()))?;

        tracing::debug!(operation, status = %status, body_len = body.len(), "AI21 response");

        if !status.is_success() {
            return Err(classify_status(status, body));
        }

        serde_json::from_str(&body)
            .map_err(|e| ProviderError::InvalidResponse(format!("{}: {}", operation, e)))
    }
}

fn classify_status(status: StatusCode, body: String) -> ProviderError {
    match status {
        StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimited,
        StatusCode::NOT_FOUND => ProviderError::NotFound(body),
        _ => ProviderError::Api {
            status: status.as_u16(),
            body,
        },
    }
}

fn network_error(e: reqwest::Error) -> ProviderError {
    ProviderError::NetworkError(e.to_string())
}

#[async_trait]
impl OrchestrationProvider for Ai21Provider {
    async fn create_run(&self, request: &RunRequest) -> Result<Run, ProviderError> {
        let url = self.endpoint(RUNS_PATH);

        tracing::debug!(
            input_len = request.input.len(),
            tool_count = request.tools.len(),
            "Creating Maestro run"
        );

        let response = self
            .client
            .traced_post(url.as_str())
            .bearer_auth(self.api_key())
            .json(request)
            .send()
            .await
            .map_err(network_error)?;

        Self::decode(response, "create_run").await
    }

    async fn get_run(&self, run_id: &str) -> Result<Run, ProviderError> {
        let mut segments = RUNS_PATH.to_vec();
        segments.push(run_id);
        let url = self.endpoint(&segments);

        let response = self
            .client
            .traced_get(url.as_str())
            .bearer_auth(self.api_key())
            .send()
            .await
            .map_err(network_error)?;

        Self::decode(response, "get_run").await
    }

    async fn conversational_rag(
        &self,
        request: &RagRequest,
    ) -> Result<RagResponse, ProviderError> {
        let url = self.endpoint(RAG_PATH);

        tracing::debug!(
            message_count = request.messages.len(),
            file_count = request.file_ids.len(),
            "Sending conversational RAG request"
        );

        let response = self
            .client
            .traced_post(url.as_str())
            .bearer_auth(self.api_key())
            .json(request)
            .send()
            .await
            .map_err(network_error)?;

        Self::decode(response, "conversational_rag").await
    }

    async fn execution_graph(&self, run_id: &str) -> Result<serde_json::Value, ProviderError> {
        let mut segments = RUNS_PATH.to_vec();
        segments.push(run_id);
        segments.push(EXECUTION_GRAPH_SEGMENT);
        let url = self.endpoint(&segments);

        let response = self
            .client
            .traced_get(url.as_str())
            .bearer_auth(self.api_key())
            .query(&[("only_non_trivial", "true")])
            .send()
            .await
            .map_err(network_error)?;

        // Anything but 200 means the graph is unavailable for this id
        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(run_id, status = %status, "Execution graph lookup rejected");
            return Err(classify_status(status, body));
        }

        response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("execution_graph: {}", e)))
    }

    async fn get_file(&self, file_id: &str) -> Result<FileMetadata, ProviderError> {
        let mut segments = FILES_PATH.to_vec();
        segments.push(file_id);
        let url = self.endpoint(&segments);

        let response = self
            .client
            .traced_get(url.as_str())
            .bearer_auth(self.api_key())
            .send()
            .await
            .map_err(network_error)?;

        Self::decode(response, "get_file").await
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        if self.api_key().is_empty() {
            return Err(ProviderError::NotConfigured(
                "AI21 API key not configured".to_string(),
            ));
        }

        let url = self.endpoint(FILES_PATH);
        let response = self
            .client
            .traced_get(url.as_str())
            .bearer_auth(self.api_key())
            .query(&[("limit", "1")])
            .send()
            .await
            .map_err(network_error)?;

        if response.status().is_success() {
            Ok(())
        } else {
            let status = response.status();
            Err(classify_status(status, String::new()))
        }
    }
}
