// HTTP adapter for the metrics service
// Thin axum routes over the reporter plus a middleware that records the
// latency of every request it wraps

pub mod middleware;
pub mod routes;

pub use middleware::{track_requests, with_request_tracking};
pub use routes::create_api_router;
