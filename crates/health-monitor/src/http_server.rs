//! HTTP API: health status, registration and discovery, and `/metrics`.

use crate::control_plane::ControlPlane;
use crate::metrics::MetricsRegistry;
use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
};
use serde::Serialize;
use service_registry::{Metadata, ServiceRegistration};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Response wrapper for consistent API format.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            error: None,
        })
    }
}

fn error_response(msg: &str, status: StatusCode) -> Response {
    (
        status,
        Json(ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(msg.to_string()),
        }),
    )
        .into_response()
}

/// Shared handler state
#[derive(Clone)]
pub struct ApiState {
    pub control: Arc<ControlPlane>,
}

impl ApiState {
    /// Map a registry or cache error onto a status code.
    fn failure(&self, resource: &str, err: common::Error) -> Response {
        match err {
            common::Error::NotFound { .. } => {
                if let Some(m) = self.control.metrics() {
                    m.record_not_found(resource);
                }
                error_response(&err.to_string(), StatusCode::NOT_FOUND)
            }
            common::Error::Invalid(_) | common::Error::Config(_) => {
                error_response(&err.to_string(), StatusCode::BAD_REQUEST)
            }
        }
    }
}

/// Build the API router
pub fn build_router(control: Arc<ControlPlane>) -> Router {
    Router::new()
        .route("/status", get(get_all_status))
        .route("/status/:service_name", get(get_service_status))
        .route("/instances", post(register_instance))
        .route("/instances/:service_id", get(get_instance))
        .route("/instances/:service_id/metadata", put(update_metadata))
        .route("/instances/:service_id/deregister", post(deregister_instance))
        .route("/reports/:service_id", delete(purge_report))
        .route("/services", get(list_services))
        .route("/services/:service_name/instances", get(list_instances))
        .route(
            "/services/:service_name/instances/healthy",
            get(list_healthy_instances),
        )
        .route("/services/:service_name/metadata", get(metadata_summary))
        .route("/metrics", get(metrics_handler))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(ApiState { control })
}

/// HTTP server for the API
pub struct ApiServer {
    control: Arc<ControlPlane>,
}

impl ApiServer {
    pub fn new(control: Arc<ControlPlane>) -> Self {
        Self { control }
    }

    /// Serve on `listener` until `cancel` fires, then drain open connections.
    pub async fn serve(self, listener: TcpListener, cancel: CancellationToken) -> std::io::Result<()> {
        let app = build_router(self.control);
        info!(listen_addr = %listener.local_addr()?, "API server listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(async move { cancel.cancelled().await })
            .await?;

        info!("API server stopped");
        Ok(())
    }
}

// ── Health status ──────────────────────────────────────────────

/// GET /status
async fn get_all_status(State(state): State<ApiState>) -> impl IntoResponse {
    ApiResponse::ok(state.control.status())
}

/// GET /status/:service_name
async fn get_service_status(
    State(state): State<ApiState>,
    Path(service_name): Path<String>,
) -> impl IntoResponse {
    ApiResponse::ok(state.control.status_by_service(&service_name))
}

/// DELETE /reports/:service_id
async fn purge_report(
    State(state): State<ApiState>,
    Path(service_id): Path<String>,
) -> impl IntoResponse {
    match state.control.purge_report(&service_id) {
        Ok(report) => ApiResponse::ok(report).into_response(),
        Err(e) => state.failure("report", e),
    }
}

// ── Instances ──────────────────────────────────────────────────

/// POST /instances
async fn register_instance(
    State(state): State<ApiState>,
    body: Result<Json<ServiceRegistration>, JsonRejection>,
) -> impl IntoResponse {
    let Json(registration) = match body {
        Ok(body) => body,
        Err(rejection) => return error_response(&rejection.body_text(), StatusCode::BAD_REQUEST),
    };

    match state.control.register(registration) {
        Ok(instance) => (StatusCode::CREATED, ApiResponse::ok(instance)).into_response(),
        Err(e) => state.failure("instance", e),
    }
}

/// GET /instances/:service_id
async fn get_instance(
    State(state): State<ApiState>,
    Path(service_id): Path<String>,
) -> impl IntoResponse {
    match state.control.get_instance(&service_id) {
        Ok(instance) => ApiResponse::ok(instance).into_response(),
        Err(e) => state.failure("instance", e),
    }
}

/// PUT /instances/:service_id/metadata
async fn update_metadata(
    State(state): State<ApiState>,
    Path(service_id): Path<String>,
    body: Result<Json<Metadata>, JsonRejection>,
) -> impl IntoResponse {
    let Json(updates) = match body {
        Ok(body) => body,
        Err(rejection) => return error_response(&rejection.body_text(), StatusCode::BAD_REQUEST),
    };

    match state.control.update_metadata(&service_id, updates.iter()) {
        Ok(instance) => ApiResponse::ok(instance).into_response(),
        Err(e) => state.failure("instance", e),
    }
}

/// POST /instances/:service_id/deregister
async fn deregister_instance(
    State(state): State<ApiState>,
    Path(service_id): Path<String>,
) -> impl IntoResponse {
    match state.control.deregister(&service_id) {
        Ok(instance) => ApiResponse::ok(instance).into_response(),
        Err(e) => state.failure("instance", e),
    }
}

// ── Discovery ──────────────────────────────────────────────────

/// GET /services
async fn list_services(State(state): State<ApiState>) -> impl IntoResponse {
    ApiResponse::ok(state.control.service_names())
}

/// GET /services/:service_name/instances
async fn list_instances(
    State(state): State<ApiState>,
    Path(service_name): Path<String>,
) -> impl IntoResponse {
    ApiResponse::ok(state.control.list_instances(&service_name))
}

/// GET /services/:service_name/instances/healthy
async fn list_healthy_instances(
    State(state): State<ApiState>,
    Path(service_name): Path<String>,
) -> impl IntoResponse {
    ApiResponse::ok(state.control.healthy_instances(&service_name))
}

/// GET /services/:service_name/metadata
async fn metadata_summary(
    State(state): State<ApiState>,
    Path(service_name): Path<String>,
) -> impl IntoResponse {
    ApiResponse::ok(state.control.metadata_summary(&service_name))
}

// ── Metrics ────────────────────────────────────────────────────

/// GET /metrics
async fn metrics_handler(State(state): State<ApiState>) -> Response {
    match state.control.metrics() {
        Some(registry) => encode_metrics(registry),
        None => error_response("metrics are disabled", StatusCode::NOT_FOUND),
    }
}

fn encode_metrics(registry: &MetricsRegistry) -> Response {
    match registry.render() {
        Ok(buffer) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4")],
            buffer,
        )
            .into_response(),
        Err(e) => {
            warn!(error = %e, "Failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to encode metrics: {}", e),
            )
                .into_response()
        }
    }
}
