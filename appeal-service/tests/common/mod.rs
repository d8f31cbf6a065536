#![allow(dead_code)]

use appeal_service::config::{Ai21Config, AppealConfig, MaestroConfig, DEFAULT_AI21_BASE_URL};
use appeal_service::services::providers::MockProvider;
use appeal_service::startup::Application;
use secrecy::Secret;
use serde_json::{json, Value};
use service_core::config::Config;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub provider: Arc<MockProvider>,
    pub client: reqwest::Client,
    pub shutdown: CancellationToken,
}

pub fn test_config(maestro: MaestroConfig) -> AppealConfig {
    AppealConfig {
        common: Config {
            host: "127.0.0.1".parse().expect("valid loopback address"),
            port: 0, // Random port
        },
        ai21: Ai21Config {
            api_key: Secret::new("test-key".to_string()),
            base_url: DEFAULT_AI21_BASE_URL.to_string(),
            request_timeout_secs: 5,
        },
        maestro,
        otlp_endpoint: None,
    }
}

pub fn fast_polling() -> MaestroConfig {
    MaestroConfig {
        poll_interval_ms: 5,
        run_timeout_secs: 5,
        retry_max_elapsed_secs: 2,
    }
}

/// A raw Maestro result for a valid appeal decision.
pub fn appeal_result_payload() -> Value {
    Value::String(
        json!({
            "decision": "appeal",
            "action_steps": ["Request the claim file", "Send the appeal letter"],
            "appeal_letter": "Dear Claims Review Team, ..."
        })
        .to_string(),
    )
}

impl TestApp {
    pub async fn spawn(provider: MockProvider) -> Self {
        Self::spawn_with(provider, fast_polling()).await
    }

    pub async fn spawn_with(provider: MockProvider, maestro: MaestroConfig) -> Self {
        let provider = Arc::new(provider);
        let app = Application::build_with_provider(test_config(maestro), provider.clone())
            .await
            .expect("Failed to build test application");

        let port = app.port();
        let address = format!("http://127.0.0.1:{}", port);
        let shutdown = app.shutdown_token();

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Wait for the server to be ready by polling the health endpoint
        let client = reqwest::Client::new();
        let health_url = format!("{}/health", address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        }

        TestApp {
            address,
            port,
            provider,
            client,
            shutdown,
        }
    }

    pub async fn submit_appeal(&self, form: &[(&str, &str)]) -> reqwest::Response {
        self.client
            .post(format!("{}/submit-appeal", self.address))
            .header("content-type", "application/x-www-form-urlencoded")
            .body(serde_urlencoded::to_string(form).expect("form encodes"))
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn ask(&self, session: Option<&str>, body: Value) -> reqwest::Response {
        let mut request = self.client.post(format!("{}/ask", self.address)).json(&body);
        if let Some(session) = session {
            request = request.header("x-session-id", session);
        }
        request.send().await.expect("Failed to execute request")
    }

    pub async fn clear_history(&self, session: Option<&str>) -> reqwest::Response {
        let mut request = self.client.delete(format!("{}/clear_history", self.address));
        if let Some(session) = session {
            request = request.header("x-session-id", session);
        }
        request.send().await.expect("Failed to execute request")
    }

    pub fn stop(&self) {
        self.shutdown.cancel();
    }
}
