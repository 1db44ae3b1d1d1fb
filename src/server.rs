//! HTTP front end for the assessment coordinator.
//!
//! Routes:
//!
//! - `POST /api/v1/assess?word_size=N&iid=bool&non_iid=bool` with the raw
//!   samples as an `application/octet-stream` body
//! - `GET /health`
//! - `GET /metrics` (404 when metrics are disabled)
//!
//! Assessments run on the blocking pool. The configured timeout bounds how
//! long a request waits; it does not stop a running computation.

use crate::assessment::{
    AssessmentCoordinator, AssessmentError, AssessmentRequest, AssessmentResult, ErrorKind,
    RequestError,
};
use crate::config::ServerConfig;
use crate::estimators::Mode;
use crate::metrics::MetricsRegistry;
use axum::{
    body::Bytes,
    extract::{rejection::QueryRejection, DefaultBodyLimit, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Errors that can occur during server operations.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind to address: {0}")]
    Bind(#[from] std::io::Error),

    #[error("invalid server configuration: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("failed to install signal handler: {0}")]
    Signal(String),

    #[error("server error: {0}")]
    Server(String),
}

/// Shared state for request handlers.
pub struct AppState {
    coordinator: AssessmentCoordinator,
    metrics: Option<Arc<MetricsRegistry>>,
    timeout: Duration,
}

/// HTTP server wrapping an [`AssessmentCoordinator`].
pub struct AssessmentServer {
    bind_addr: SocketAddr,
    max_upload_bytes: usize,
    state: Arc<AppState>,
}

impl AssessmentServer {
    /// Creates a server.
    ///
    /// `metrics` backs the `/metrics` route; attach the same registry to the
    /// coordinator as its observer for it to see assessments.
    pub fn new(
        config: &ServerConfig,
        coordinator: AssessmentCoordinator,
        metrics: Option<Arc<MetricsRegistry>>,
    ) -> Result<Self, ServerError> {
        config.validate()?;
        Ok(Self {
            bind_addr: config.bind_addr()?,
            max_upload_bytes: usize::try_from(config.max_upload_bytes).unwrap_or(usize::MAX),
            state: Arc::new(AppState {
                coordinator,
                metrics,
                timeout: config.timeout(),
            }),
        })
    }

    /// Address the server binds to.
    pub fn bind_addr(&self) -> SocketAddr {
        self.bind_addr
    }

    /// Builds the router with all middleware attached.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/api/v1/assess", post(assess_handler))
            .route("/metrics", get(metrics_handler))
            .route("/health", get(health_handler))
            .layer(DefaultBodyLimit::max(self.max_upload_bytes))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .with_state(Arc::clone(&self.state))
    }

    /// Starts the HTTP server.
    ///
    /// Runs until `shutdown` resolves, then drains in-flight requests.
    pub async fn run<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = self.router();
        let listener = tokio::net::TcpListener::bind(self.bind_addr).await?;

        tracing::info!(
            addr = %self.bind_addr,
            suite = self.state.coordinator.suite().name(),
            metrics = self.state.metrics.is_some(),
            "Assessment server listening"
        );

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| ServerError::Server(e.to_string()))?;

        tracing::info!("Assessment server stopped");
        Ok(())
    }
}

/// Installs a Ctrl-C/SIGTERM handler and returns a future that resolves on
/// the first signal.
pub fn shutdown_signal() -> Result<impl Future<Output = ()> + Send + 'static, ServerError> {
    let (tx, mut rx) = tokio::sync::watch::channel(false);
    ctrlc::set_handler(move || {
        let _ = tx.send(true);
    })
    .map_err(|e| ServerError::Signal(e.to_string()))?;

    Ok(async move {
        let _ = rx.wait_for(|stop| *stop).await;
        tracing::info!("Shutdown signal received");
    })
}

/// Query parameters of `POST /api/v1/assess`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AssessParams {
    /// Bits per symbol, 0 to auto-detect.
    pub word_size: u32,
    /// Run the IID track.
    pub iid: bool,
    /// Run the Non-IID track.
    pub non_iid: bool,
}

#[derive(Debug, Serialize)]
struct AssessResponse {
    request_id: String,
    passed: bool,
    summary: String,
    #[serde(flatten)]
    result: AssessmentResult,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    kind: ErrorKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    mode: Option<Mode>,
    retryable: bool,
    request_id: String,
}

fn status_for(error: &AssessmentError) -> StatusCode {
    match (error, error.kind()) {
        (AssessmentError::Rejected(_), _) => StatusCode::BAD_REQUEST,
        (_, ErrorKind::InvalidInput) => StatusCode::UNPROCESSABLE_ENTITY,
        (_, ErrorKind::ResourceExhausted) => StatusCode::SERVICE_UNAVAILABLE,
        (_, ErrorKind::Foreign) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(status: StatusCode, body: ErrorBody) -> Response {
    (status, Json(body)).into_response()
}

fn assessment_error_response(error: &AssessmentError, request_id: String) -> Response {
    error_response(
        status_for(error),
        ErrorBody {
            error: error.to_string(),
            kind: error.kind(),
            mode: error.mode(),
            retryable: error.kind().is_retryable(),
            request_id,
        },
    )
}

/// Handler for `POST /api/v1/assess`.
async fn assess_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    params: Result<Query<AssessParams>, QueryRejection>,
    body: Bytes,
) -> Response {
    let request_id = headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    let params = match params {
        Ok(Query(params)) => params,
        Err(rejection) => {
            let e = state
                .coordinator
                .reject(RequestError::MalformedQuery(rejection.body_text()));
            tracing::warn!(request_id = %request_id, error = %e, "Assessment rejected");
            return assessment_error_response(&e, request_id);
        }
    };
    let sample_bytes = body.len();
    let started = Instant::now();

    let coordinator = state.coordinator.clone();
    let job = tokio::task::spawn_blocking(move || {
        coordinator.assess(&AssessmentRequest {
            data: &body,
            word_size: params.word_size,
            run_iid: params.iid,
            run_non_iid: params.non_iid,
        })
    });

    match tokio::time::timeout(state.timeout, job).await {
        Ok(Ok(Ok(result))) => {
            tracing::info!(
                request_id = %request_id,
                sample_bytes,
                min_entropy = result.min_entropy,
                word_size = result.word_size,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Assessment completed"
            );
            let summary = format!(
                "min-entropy {:.6} bits per {}-bit sample over {} samples",
                result.min_entropy, result.word_size, result.sample_count
            );
            let response = AssessResponse {
                request_id,
                passed: result.all_passed(),
                summary,
                result,
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Ok(Ok(Err(e))) => {
            let status = status_for(&e);
            tracing::warn!(
                request_id = %request_id,
                error = %e,
                kind = %e.kind(),
                status = status.as_u16(),
                "Assessment failed"
            );
            assessment_error_response(&e, request_id)
        }
        Ok(Err(join_error)) => {
            tracing::error!(request_id = %request_id, error = %join_error, "Assessment task aborted");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody {
                    error: format!("assessment task aborted: {}", join_error),
                    kind: ErrorKind::Foreign,
                    mode: None,
                    retryable: false,
                    request_id,
                },
            )
        }
        Err(_) => {
            // The blocking task keeps running to completion.
            tracing::warn!(
                request_id = %request_id,
                timeout_secs = state.timeout.as_secs_f64(),
                "Assessment exceeded deadline"
            );
            error_response(
                StatusCode::GATEWAY_TIMEOUT,
                ErrorBody {
                    error: format!(
                        "assessment did not finish within {:.0?}",
                        state.timeout
                    ),
                    kind: ErrorKind::ResourceExhausted,
                    mode: None,
                    retryable: true,
                    request_id,
                },
            )
        }
    }
}

/// Handler for the /metrics endpoint.
async fn metrics_handler(State(state): State<Arc<AppState>>) -> Response {
    let Some(registry) = state.metrics.as_ref() else {
        return (StatusCode::NOT_FOUND, "metrics disabled").into_response();
    };

    match registry.encode() {
        Ok(output) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            output,
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain; charset=utf-8")],
            format!("Failed to encode metrics: {}", e),
        )
            .into_response(),
    }
}

/// Handler for the /health endpoint.
async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": crate::VERSION,
    }))
}
