// Metrics HTTP API
// GET /metrics, POST /metrics/accuracy, GET /metrics/health and the
// prometheus text export

use crate::errors::MetricsError;
use crate::report::{AccuracyAck, HealthStatus, MetricsReport};
use crate::service::MetricsService;
use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router as AxumRouter,
};
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

#[derive(Debug, Deserialize)]
pub struct AccuracyRequest {
    pub result: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

/// Create the HTTP router with the metrics endpoints
pub fn create_api_router(service: MetricsService) -> AxumRouter {
    AxumRouter::new()
        .route("/metrics", get(get_metrics))
        .route("/metrics/accuracy", post(record_accuracy))
        .route("/metrics/health", get(health_check))
        .route("/metrics/prometheus", get(prometheus_export))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(service)
}

async fn get_metrics(State(service): State<MetricsService>) -> Json<MetricsReport> {
    Json(service.reporter().get_metrics().await)
}

async fn record_accuracy(
    State(service): State<MetricsService>,
    Json(req): Json<AccuracyRequest>,
) -> Result<Json<AccuracyAck>, ApiError> {
    service
        .reporter()
        .record_accuracy_result(&req.result)
        .await
        .map(Json)
        .map_err(error_response)
}

async fn health_check(State(service): State<MetricsService>) -> (StatusCode, Json<HealthStatus>) {
    let status = service.reporter().health().await;
    let code = if status.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(status))
}

async fn prometheus_export() -> Result<String, ApiError> {
    crate::metrics::render().map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: e.to_string(),
            }),
        )
    })
}

fn error_response(err: MetricsError) -> ApiError {
    let code = match err {
        MetricsError::InvalidAccuracy(_) => StatusCode::BAD_REQUEST,
        MetricsError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        code,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
}
