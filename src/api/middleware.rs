// Request latency tracking middleware
// Times each wrapped request and records it through the metrics recorder

use crate::service::MetricsService;
use axum::{
    extract::{MatchedPath, Request, State},
    middleware::{self, Next},
    response::Response,
    Router as AxumRouter,
};
use std::time::Instant;
use tracing::warn;

/// Wrap every route of `router` with [`track_requests`]
pub fn with_request_tracking<S>(router: AxumRouter<S>, service: MetricsService) -> AxumRouter<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(middleware::from_fn_with_state(service, track_requests))
}

/// Record `(route, latency, status)` for the request. Recording failures are
/// logged and never affect the response.
pub async fn track_requests(
    State(service): State<MetricsService>,
    req: Request,
    next: Next,
) -> Response {
    // Prefer the route template so "/items/:id" is one endpoint, not one per id
    let endpoint = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| req.uri().path().to_owned());

    let started = Instant::now();
    let response = next.run(req).await;
    let latency_ms = started.elapsed().as_secs_f64() * 1000.0;

    if let Err(err) = service
        .recorder()
        .record_request(&endpoint, latency_ms, response.status().as_u16())
        .await
    {
        warn!(endpoint = %endpoint, error = %err, "failed to record request metrics");
    }
    response
}
