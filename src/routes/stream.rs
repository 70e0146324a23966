//! Media stream WebSocket route configuration

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::handlers::stream_handler;
use crate::state::AppState;
use std::sync::Arc;

/// Create the media stream WebSocket router
///
/// # Endpoint
///
/// `GET <path>` - WebSocket upgrade for a Plivo bidirectional media stream
///
/// # Protocol
///
/// Plivo sends JSON text frames (`start`, `media`, `dtmf`, `playedStream`,
/// `clearedAudio`). The server answers with `playAudio`, `checkpoint` and
/// `clearAudio` frames.
pub fn create_stream_router(path: &str) -> Router<Arc<AppState>> {
    Router::new()
        .route(path, get(stream_handler))
        .layer(TraceLayer::new_for_http())
}
