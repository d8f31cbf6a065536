//! Validation of Maestro run results against the appeal result shape.

use crate::models::AppealResult;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("run completed without a result")]
    MissingResult,

    #[error("run result is not valid JSON: {0}")]
    Malformed(#[source] serde_json::Error),

    #[error("run result does not match the appeal schema: {0}")]
    Shape(#[source] serde_json::Error),

    #[error("run result must be a JSON object or string, got {0}")]
    UnexpectedType(&'static str),
}

/// Validate the raw `result` of a completed run.
///
/// Maestro usually returns the generated JSON document as a string; an
/// already-structured object is accepted too.
pub fn parse_appeal_result(raw: Option<&Value>) -> Result<AppealResult, SchemaError> {
    match raw {
        None | Some(Value::Null) => Err(SchemaError::MissingResult),
        Some(Value::String(text)) => parse_appeal_result_str(text),
        Some(value @ Value::Object(_)) => {
            serde_json::from_value(value.clone()).map_err(SchemaError::Shape)
        }
        Some(Value::Array(_)) => Err(SchemaError::UnexpectedType("array")),
        Some(Value::Bool(_)) => Err(SchemaError::UnexpectedType("boolean")),
        Some(Value::Number(_)) => Err(SchemaError::UnexpectedType("number")),
    }
}

/// Validate a result string, tolerating a surrounding Markdown code fence.
pub fn parse_appeal_result_str(text: &str) -> Result<AppealResult, SchemaError> {
    let body = strip_code_fence(text);
    if body.is_empty() {
        return Err(SchemaError::MissingResult);
    }

    let value: Value = serde_json::from_str(body).map_err(SchemaError::Malformed)?;
    match value {
        Value::Object(_) => serde_json::from_value(value).map_err(SchemaError::Shape),
        Value::Null => Err(SchemaError::MissingResult),
        Value::Array(_) => Err(SchemaError::UnexpectedType("array")),
        Value::String(_) => Err(SchemaError::UnexpectedType("string")),
        Value::Bool(_) => Err(SchemaError::UnexpectedType("boolean")),
        Value::Number(_) => Err(SchemaError::UnexpectedType("number")),
    }
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (e.g. "json") on the opening fence line
    let rest = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest.trim_start_matches(|c: char| c.is_ascii_alphabetic()),
    };
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Decision;
    use serde_json::json;

    #[test]
    fn parses_string_encoded_result() {
        let raw = json!(
            r#"{"decision": "appeal", "action_steps": ["Send letter"], "appeal_letter": "Dear..."}"#
        );
        let result = parse_appeal_result(Some(&raw)).unwrap();

        assert_eq!(result.decision, Decision::Appeal);
        assert_eq!(result.action_steps, vec!["Send letter"]);
        assert_eq!(result.appeal_letter.as_deref(), Some("Dear..."));
    }

    #[test]
    fn accepts_structured_object_and_missing_letter() {
        let raw = json!({ "decision": "settlement", "action_steps": [] });
        let result = parse_appeal_result(Some(&raw)).unwrap();

        assert_eq!(result.decision, Decision::Settlement);
        assert_eq!(result.appeal_letter, None);
    }

    #[test]
    fn strips_markdown_fence() {
        let text = "```json\n{\"decision\": \"code_for_change\", \"action_steps\": [\"Ask for CPT 99213\"]}\n```";
        let result = parse_appeal_result_str(text).unwrap();
        assert_eq!(result.decision, Decision::CodeForChange);
    }

    #[test]
    fn strips_single_line_fence_with_info_string() {
        let text = "```json {\"decision\": \"settlement\", \"action_steps\": []}```";
        let result = parse_appeal_result_str(text).unwrap();
        assert_eq!(result.decision, Decision::Settlement);

        let bare = "```{\"decision\": \"appeal\", \"action_steps\": []}```";
        assert_eq!(parse_appeal_result_str(bare).unwrap().decision, Decision::Appeal);
    }

    #[test]
    fn rejects_decision_outside_enumeration() {
        let text = r#"{"decision": "lawsuit", "action_steps": []}"#;
        assert!(matches!(
            parse_appeal_result_str(text),
            Err(SchemaError::Shape(_))
        ));
    }

    #[test]
    fn rejects_missing_required_field() {
        let text = r#"{"decision": "appeal"}"#;
        assert!(matches!(
            parse_appeal_result_str(text),
            Err(SchemaError::Shape(_))
        ));
    }

    #[test]
    fn rejects_wrong_field_type() {
        let text = r#"{"decision": "appeal", "action_steps": "call them"}"#;
        assert!(matches!(
            parse_appeal_result_str(text),
            Err(SchemaError::Shape(_))
        ));
    }

    #[test]
    fn rejects_non_json_text() {
        assert!(matches!(
            parse_appeal_result_str("I recommend an appeal."),
            Err(SchemaError::Malformed(_))
        ));
    }

    #[test]
    fn missing_or_null_result_fails() {
        assert!(matches!(
            parse_appeal_result(None),
            Err(SchemaError::MissingResult)
        ));
        assert!(matches!(
            parse_appeal_result(Some(&Value::Null)),
            Err(SchemaError::MissingResult)
        ));
        assert!(matches!(
            parse_appeal_result_str("   "),
            Err(SchemaError::MissingResult)
        ));
    }

    #[test]
    fn rejects_non_object_payloads() {
        assert!(matches!(
            parse_appeal_result(Some(&json!(["appeal"]))),
            Err(SchemaError::UnexpectedType("array"))
        ));
        assert!(matches!(
            parse_appeal_result_str("42"),
            Err(SchemaError::UnexpectedType("number"))
        ));
    }
}
