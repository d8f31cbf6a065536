//! Application startup and lifecycle management.

use crate::config::AppealConfig;
use crate::handlers::{self, appeals, conversation, files};
use crate::services::providers::{Ai21Provider, OrchestrationProvider};
use crate::services::{init_metrics, HistoryStore, PollSettings, RunPoller};
use axum::{
    extract::Request,
    middleware::from_fn,
    routing::{delete, get, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::{
    metrics_middleware, request_id_middleware, security_headers_middleware, RequestId,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: AppealConfig,
    pub provider: Arc<dyn OrchestrationProvider>,
    pub poller: RunPoller,
    pub history: HistoryStore,
    pub shutdown: CancellationToken,
}

/// Build the HTTP router for the given state.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics_endpoint))
        .route("/submit-appeal", post(appeals::submit_appeal))
        .route("/get_steps", get(appeals::get_steps))
        .route("/ask", post(conversation::ask))
        .route("/clear_history", delete(conversation::clear_history))
        .route("/files/:file_id", get(files::get_file))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request| {
                let request_id = request
                    .extensions()
                    .get::<RequestId>()
                    .map(|id| id.0.as_str())
                    .unwrap_or("");
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id,
                )
            }),
        )
        .layer(from_fn(metrics_middleware))
        .layer(from_fn(security_headers_middleware))
        // Outermost so the span above sees the id
        .layer(from_fn(request_id_middleware))
        .with_state(state)
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Build the application against the AI21 Studio API.
    pub async fn build(config: AppealConfig) -> Result<Self, AppError> {
        let provider = Ai21Provider::new(config.ai21.clone()).map_err(|e| {
            tracing::error!("Failed to initialize AI21 client: {}", e);
            AppError::ConfigError(anyhow::Error::new(e))
        })?;

        tracing::info!(base_url = %config.ai21.base_url, "Initialized AI21 provider");

        Self::build_with_provider(config, Arc::new(provider)).await
    }

    /// Build the application with an explicit provider (used by tests).
    pub async fn build_with_provider(
        config: AppealConfig,
        provider: Arc<dyn OrchestrationProvider>,
    ) -> Result<Self, AppError> {
        init_metrics();

        let shutdown = CancellationToken::new();
        let poller = RunPoller::new(
            provider.clone(),
            PollSettings::from(&config.maestro),
            shutdown.clone(),
        );

        let state = AppState {
            config: config.clone(),
            provider,
            poller,
            history: HistoryStore::new(),
            shutdown,
        };

        // Port 0 = random port for testing
        let addr = config.common.socket_addr();
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Appeal service listening on port {}", port);

        Ok(Self {
            port,
            listener,
            state,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Token that stops the server and cancels in-flight run waits.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.state.shutdown.clone()
    }

    pub fn state(&self) -> AppState {
        self.state.clone()
    }

    /// Serve until the shutdown token is cancelled.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        let shutdown = self.state.shutdown.clone();
        let app = router(self.state);

        axum::serve(self.listener, app)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await
    }
}
