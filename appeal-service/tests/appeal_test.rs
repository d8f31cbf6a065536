mod common;

use appeal_service::config::MaestroConfig;
use appeal_service::services::providers::{MockProvider, ProviderError};
use common::{appeal_result_payload, fast_polling, TestApp};
use serde_json::{json, Value};

const VALID_FORM: &[(&str, &str)] = &[
    ("name", "Jane Doe"),
    ("dob", "1990-04-01"),
    ("denial_letter", "file-denial"),
    ("policy_doc_file_id", "file-policy"),
    ("additional_info", "Specialist ordered the MRI"),
];

#[tokio::test]
async fn submit_appeal_returns_validated_result() {
    let app = TestApp::spawn(MockProvider::new().completing_with(appeal_result_payload())).await;

    let response = app.submit_appeal(VALID_FORM).await;
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Appeal submitted successfully");
    assert_eq!(body["data"]["name"], "Jane Doe");
    assert_eq!(body["data"]["dob"], "1990-04-01");
    assert_eq!(body["data"]["denial_letter"], "file-denial");
    assert_eq!(body["data"]["policy_doc_file_id"], "file-policy");
    assert_eq!(body["data"]["additional_info"], "Specialist ordered the MRI");
    assert_eq!(body["data"]["run_id"], "run-mock-1");
    assert_eq!(body["result"]["decision"], "appeal");
    assert_eq!(body["result"]["action_steps"][1], "Send the appeal letter");
    assert!(body["result"]["appeal_letter"].is_string());
}

#[tokio::test]
async fn run_input_embeds_fields_and_enables_file_search() {
    let app = TestApp::spawn(MockProvider::new().completing_with(appeal_result_payload())).await;

    app.submit_appeal(VALID_FORM).await;

    let requests = app.provider.run_requests();
    assert_eq!(requests.len(), 1);
    let input = &requests[0].input;
    assert!(input.contains("Jane Doe"));
    assert!(input.contains("file-denial"));
    assert!(input.contains("file-policy"));
    assert!(input.contains("code_for_change"));
    assert_eq!(requests[0].tools[0].kind, "file_search");
}

#[tokio::test]
async fn optional_fields_may_be_omitted() {
    let payload = Value::String(
        json!({ "decision": "settlement", "action_steps": ["Negotiate"] }).to_string(),
    );
    let app = TestApp::spawn(MockProvider::new().completing_with(payload)).await;

    let response = app
        .submit_appeal(&[("name", "Jane Doe"), ("denial_letter", "file-denial")])
        .await;
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await.unwrap();
    assert!(body["data"]["dob"].is_null());
    assert_eq!(body["result"]["decision"], "settlement");
    assert!(body["result"]["appeal_letter"].is_null());
}

#[tokio::test]
async fn missing_required_field_is_bad_input() {
    let app = TestApp::spawn(MockProvider::new()).await;

    let response = app.submit_appeal(&[("name", "Jane Doe")]).await;

    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].is_string());
    assert!(app.provider.run_requests().is_empty());
}

#[tokio::test]
async fn blank_required_field_is_bad_input() {
    let app = TestApp::spawn(MockProvider::new()).await;

    let response = app
        .submit_appeal(&[("name", "   "), ("denial_letter", "file-denial")])
        .await;

    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "name must not be empty");
}

#[tokio::test]
async fn decision_outside_enumeration_is_validation_failure() {
    let payload = Value::String(json!({ "decision": "lawsuit", "action_steps": [] }).to_string());
    let app = TestApp::spawn(MockProvider::new().completing_with(payload)).await;

    let response = app.submit_appeal(VALID_FORM).await;

    assert_eq!(response.status(), 500);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("schema"));
    assert!(body.get("result").is_none());
}

#[tokio::test]
async fn non_json_result_is_validation_failure() {
    let payload = Value::String("I think you should appeal.".to_string());
    let app = TestApp::spawn(MockProvider::new().completing_with(payload)).await;

    let response = app.submit_appeal(VALID_FORM).await;

    assert_eq!(response.status(), 500);
}

#[tokio::test]
async fn failed_run_is_bad_gateway() {
    let app = TestApp::spawn(MockProvider::new().ending_with("failed", "tool error")).await;

    let response = app.submit_appeal(VALID_FORM).await;

    assert_eq!(response.status(), 502);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("tool error"));
}

#[tokio::test]
async fn transient_poll_error_is_retried() {
    let provider = MockProvider::new()
        .with_run_updates(vec![Err(ProviderError::Api {
            status: 503,
            body: "unavailable".into(),
        })])
        .completing_with(appeal_result_payload());
    let app = TestApp::spawn(provider).await;

    let response = app.submit_appeal(VALID_FORM).await;

    assert_eq!(response.status(), 200);
    assert_eq!(app.provider.get_run_calls(), 2);
}

#[tokio::test]
async fn never_finishing_run_times_out() {
    let app = TestApp::spawn_with(
        MockProvider::new(),
        MaestroConfig {
            run_timeout_secs: 1,
            ..fast_polling()
        },
    )
    .await;

    let response = app.submit_appeal(VALID_FORM).await;

    assert_eq!(response.status(), 504);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn create_rejection_is_upstream_unavailable() {
    let app = TestApp::spawn(MockProvider::new().failing_create(ProviderError::Api {
        status: 401,
        body: "invalid api key".into(),
    }))
    .await;

    let response = app.submit_appeal(VALID_FORM).await;

    assert_eq!(response.status(), 502);
}

#[tokio::test]
async fn get_steps_relays_graph() {
    let graph = json!({ "nodes": [{ "id": "step-1", "name": "file_search" }], "edges": [] });
    let app = TestApp::spawn(MockProvider::new().with_graph("run-42", graph.clone())).await;

    let response = app
        .client
        .get(format!("{}/get_steps?run_results_id=run-42", app.address))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, graph);
}

#[tokio::test]
async fn get_steps_forwards_run_id_verbatim() {
    let graph = json!({ "nodes": [], "edges": [] });
    let app = TestApp::spawn(MockProvider::new().with_graph(" run-42 ", graph.clone())).await;

    let padded = app
        .client
        .get(format!("{}/get_steps?run_results_id=%20run-42%20", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(padded.status(), 200);
    assert_eq!(padded.json::<Value>().await.unwrap(), graph);

    // The trimmed id is a different run upstream
    let trimmed = app
        .client
        .get(format!("{}/get_steps?run_results_id=run-42", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(trimmed.status(), 400);
}

#[tokio::test]
async fn get_steps_unknown_run_is_bad_request() {
    let app = TestApp::spawn(MockProvider::new()).await;

    let response = app
        .client
        .get(format!("{}/get_steps?run_results_id=nope", app.address))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({ "error": "run_results_id not found" }));
}

#[tokio::test]
async fn get_steps_requires_run_id() {
    let app = TestApp::spawn(MockProvider::new()).await;

    let response = app
        .client
        .get(format!("{}/get_steps", app.address))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "run_results_id is required");
}

#[tokio::test]
async fn file_metadata_is_relayed() {
    let app = TestApp::spawn(MockProvider::new().with_file("file-denial", "PROCESSED")).await;

    let ok = app
        .client
        .get(format!("{}/files/file-denial", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(ok.status(), 200);
    let body: Value = ok.json().await.unwrap();
    assert_eq!(body["status"], "PROCESSED");

    let missing = app
        .client
        .get(format!("{}/files/unknown", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), 404);
}
