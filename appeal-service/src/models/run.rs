//! Wire types for the AI21 Studio endpoints this service calls.

use super::conversation::ConversationTurn;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Body of `POST /maestro/runs`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunRequest {
    pub input: String,
    pub tools: Vec<Tool>,
}

impl RunRequest {
    /// A run allowed to search the caller's library documents.
    pub fn with_file_search(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            tools: vec![Tool::file_search()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tool {
    #[serde(rename = "type")]
    pub kind: String,
}

impl Tool {
    pub fn file_search() -> Self {
        Self {
            kind: "file_search".to_string(),
        }
    }
}

/// A Maestro run as returned by create and status lookups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    pub id: String,
    pub status: String,
    /// Raw generation output; normally a JSON document encoded as a string.
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

impl Run {
    pub fn status(&self) -> RunStatus {
        RunStatus::parse(&self.status)
    }

    /// Human readable failure reason reported by Maestro, if any.
    pub fn failure_reason(&self) -> String {
        match &self.error {
            Some(Value::String(message)) => message.clone(),
            Some(Value::Object(map)) => map
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| Value::Object(map.clone()).to_string()),
            Some(other) => other.to_string(),
            None => format!("run ended with status {}", self.status),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    InProgress,
    Completed,
    Failed,
    Expired,
    Cancelled,
}

impl RunStatus {
    /// Unknown statuses are treated as still running.
    pub fn parse(status: &str) -> Self {
        match status.to_ascii_lowercase().as_str() {
            "completed" => RunStatus::Completed,
            "failed" => RunStatus::Failed,
            "expired" => RunStatus::Expired,
            "cancelled" | "canceled" => RunStatus::Cancelled,
            _ => RunStatus::InProgress,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, RunStatus::InProgress)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunStatus::InProgress => "in_progress",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
            RunStatus::Expired => "expired",
            RunStatus::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// Retrieval parameters are fixed for every conversational question.
pub const RAG_MAX_SEGMENTS: u32 = 15;
pub const RAG_SIMILARITY_THRESHOLD: f32 = 0.0;
pub const RAG_MAX_NEIGHBORS: u32 = 1;
pub const RAG_RESPONSE_LANGUAGE: &str = "english";
pub const RAG_RETRIEVAL_STRATEGY: &str = "segments";

/// Body of `POST /conversational-rag`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RagRequest {
    pub messages: Vec<ConversationTurn>,
    pub file_ids: Vec<String>,
    pub max_segments: u32,
    pub retrieval_strategy: String,
    pub retrieval_similarity_threshold: f32,
    pub max_neighbors: u32,
    pub response_language: String,
}

impl RagRequest {
    pub fn new(messages: Vec<ConversationTurn>, file_ids: Vec<String>) -> Self {
        Self {
            messages,
            file_ids,
            max_segments: RAG_MAX_SEGMENTS,
            retrieval_strategy: RAG_RETRIEVAL_STRATEGY.to_string(),
            retrieval_similarity_threshold: RAG_SIMILARITY_THRESHOLD,
            max_neighbors: RAG_MAX_NEIGHBORS,
            response_language: RAG_RESPONSE_LANGUAGE.to_string(),
        }
    }
}

/// Conversational RAG response. Fields not modelled here are kept in
/// `extra` so the response can be relayed without loss.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RagResponse {
    pub id: String,
    #[serde(default)]
    pub choices: Vec<ConversationTurn>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RagResponse {
    /// Content of the first choice, the assistant's answer.
    pub fn reply(&self) -> Option<&str> {
        self.choices.first().map(|c| c.content.as_str())
    }
}

/// Library file metadata, relayed as returned by AI21.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileMetadata {
    #[serde(alias = "fileId")]
    pub file_id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
