use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::handlers::{answer_handler, health_check};
use crate::state::AppState;
use std::sync::Arc;

/// Health check path
pub const HEALTH_PATH: &str = "/";

/// Plivo answer URL path
pub const ANSWER_PATH: &str = "/answer";

/// Paths served by [`create_api_router`]; the stream route must not reuse them.
pub const RESERVED_PATHS: [&str; 2] = [HEALTH_PATH, ANSWER_PATH];

/// Create the public HTTP router
///
/// # Endpoints
///
/// - `GET /` - Health check
/// - `GET|POST /answer` - Plivo answer URL returning the `<Stream>` XML
pub fn create_api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route(HEALTH_PATH, get(health_check))
        .route(ANSWER_PATH, get(answer_handler).post(answer_handler))
        .layer(TraceLayer::new_for_http())
}
