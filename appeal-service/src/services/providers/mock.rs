//! Scripted provider for tests.

use super::{OrchestrationProvider, ProviderError};
use crate::models::{FileMetadata, RagRequest, RagResponse, Run, RunRequest};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

pub const MOCK_RUN_ID: &str = "run-mock-1";

/// Mock orchestration provider.
///
/// `get_run` pops scripted responses in order and then keeps returning the
/// final run, or an in-progress run when none is set. Every outbound run
/// and RAG request is recorded for assertions.
#[derive(Default)]
pub struct MockProvider {
    state: Mutex<MockState>,
}

#[derive(Default)]
struct MockState {
    create_errors: VecDeque<ProviderError>,
    run_updates: VecDeque<Result<Run, ProviderError>>,
    final_run: Option<Run>,
    rag_replies: VecDeque<Result<String, ProviderError>>,
    graphs: HashMap<String, Value>,
    files: HashMap<String, FileMetadata>,
    run_requests: Vec<RunRequest>,
    rag_requests: Vec<RagRequest>,
    get_run_calls: usize,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MockState> {
        // A panicking test thread must not hide the recorded requests
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn run(status: &str, result: Option<Value>) -> Run {
        Run {
            id: MOCK_RUN_ID.to_string(),
            status: status.to_string(),
            result,
            error: None,
        }
    }

    /// Runs complete with `result` (the raw Maestro result payload).
    pub fn completing_with(self, result: Value) -> Self {
        self.state().final_run = Some(Self::run("completed", Some(result)));
        self
    }

    /// Runs end with the given terminal status and error message.
    pub fn ending_with(self, status: &str, message: &str) -> Self {
        let mut run = Self::run(status, None);
        run.error = Some(Value::String(message.to_string()));
        self.state().final_run = Some(run);
        self
    }

    /// Responses returned by `get_run` before the final run.
    pub fn with_run_updates(self, updates: Vec<Result<Run, ProviderError>>) -> Self {
        self.state().run_updates.extend(updates);
        self
    }

    pub fn failing_create(self, error: ProviderError) -> Self {
        self.state().create_errors.push_back(error);
        self
    }

    pub fn with_rag_reply(self, reply: &str) -> Self {
        self.state().rag_replies.push_back(Ok(reply.to_string()));
        self
    }

    pub fn failing_rag(self, error: ProviderError) -> Self {
        self.state().rag_replies.push_back(Err(error));
        self
    }

    pub fn with_graph(self, run_id: &str, graph: Value) -> Self {
        self.state().graphs.insert(run_id.to_string(), graph);
        self
    }

    pub fn with_file(self, file_id: &str, status: &str) -> Self {
        self.state().files.insert(
            file_id.to_string(),
            FileMetadata {
                file_id: file_id.to_string(),
                status: Some(status.to_string()),
                extra: Map::new(),
            },
        );
        self
    }

    pub fn run_requests(&self) -> Vec<RunRequest> {
        self.state().run_requests.clone()
    }

    pub fn rag_requests(&self) -> Vec<RagRequest> {
        self.state().rag_requests.clone()
    }

    pub fn get_run_calls(&self) -> usize {
        self.state().get_run_calls
    }
}

#[async_trait]
impl OrchestrationProvider for MockProvider {
    async fn create_run(&self, request: &RunRequest) -> Result<Run, ProviderError> {
        let mut state = self.state();
        state.run_requests.push(request.clone());
        if let Some(error) = state.create_errors.pop_front() {
            return Err(error);
        }
        Ok(Self::run("in_progress", None))
    }

    async fn get_run(&self, _run_id: &str) -> Result<Run, ProviderError> {
        let mut state = self.state();
        state.get_run_calls += 1;
        if let Some(update) = state.run_updates.pop_front() {
            return update;
        }
        Ok(state
            .final_run
            .clone()
            .unwrap_or_else(|| Self::run("in_progress", None)))
    }

    async fn conversational_rag(
        &self,
        request: &RagRequest,
    ) -> Result<RagResponse, ProviderError> {
        let mut state = self.state();
        state.rag_requests.push(request.clone());
        let reply = state
            .rag_replies
            .pop_front()
            .unwrap_or_else(|| Ok(format!("Mock answer {}", state.rag_requests.len())))?;

        let mut extra = Map::new();
        extra.insert("context_retrieved".to_string(), Value::Bool(true));
        Ok(RagResponse {
            id: format!("rag-mock-{}", state.rag_requests.len()),
            choices: vec![crate::models::ConversationTurn::assistant(reply)],
            extra,
        })
    }

    async fn execution_graph(&self, run_id: &str) -> Result<Value, ProviderError> {
        self.state()
            .graphs
            .get(run_id)
            .cloned()
            .ok_or_else(|| ProviderError::Api {
                status: 422,
                body: format!("unknown run {}", run_id),
            })
    }

    async fn get_file(&self, file_id: &str) -> Result<FileMetadata, ProviderError> {
        self.state()
            .files
            .get(file_id)
            .cloned()
            .ok_or_else(|| ProviderError::NotFound(file_id.to_string()))
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        Ok(())
    }
}
