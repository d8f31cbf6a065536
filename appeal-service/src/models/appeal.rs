//! Appeal submission input and the structured decision produced for it.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Course of action recommended for a denied claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Appeal,
    CodeForChange,
    Settlement,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Appeal => "appeal",
            Decision::CodeForChange => "code_for_change",
            Decision::Settlement => "settlement",
        }
    }
}

/// Form fields of `POST /submit-appeal`, echoed back verbatim in the response.
///
/// `denial_letter` and `policy_doc_file_id` are AI21 library file ids.
/// `dob` is forwarded as given; no date format is enforced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct SubmittedAppeal {
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub name: String,
    #[serde(default)]
    pub dob: Option<String>,
    #[validate(length(min = 1, message = "denial_letter must not be empty"))]
    pub denial_letter: String,
    #[serde(default)]
    pub policy_doc_file_id: Option<String>,
    #[serde(default)]
    pub additional_info: Option<String>,
}

impl SubmittedAppeal {
    /// Optional fields with blank values count as not provided.
    pub fn provided(value: &Option<String>) -> Option<&str> {
        value.as_deref().map(str::trim).filter(|v| !v.is_empty())
    }
}

/// Structured output of a completed appeal run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppealResult {
    pub decision: Decision,
    pub action_steps: Vec<String>,
    #[serde(default)]
    pub appeal_letter: Option<String>,
}

impl AppealResult {
    /// Drops a stray letter on non-appeal decisions.
    pub fn normalized(mut self) -> Self {
        if self.decision != Decision::Appeal && self.appeal_letter.is_some() {
            tracing::warn!(
                decision = self.decision.as_str(),
                "Discarding appeal letter returned for a non-appeal decision"
            );
            self.appeal_letter = None;
        }
        self
    }
}
