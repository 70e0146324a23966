pub mod api;
pub mod stream;

use std::sync::Arc;

use axum::Router;

use crate::state::AppState;

/// Build the complete application router.
pub fn create_app(state: Arc<AppState>) -> Router {
    let stream_path = state.config.stream_path.clone();

    api::create_api_router()
        .merge(stream::create_stream_router(&stream_path))
        .with_state(state)
}
