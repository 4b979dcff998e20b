// HTTP + WebSocket routes

mod http;
mod ws;

use axum::{
    Router,
    routing::{get, post, put},
};
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use tower_http::cors::{Any, CorsLayer};

use crate::session::Session;

/// Upload bodies are JSON-lines files; allow more than axum's 2 MB default.
const MAX_UPLOAD_BYTES: usize = 32 * 1024 * 1024;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) session: Session,
    pub(crate) ws_stream_connections: Arc<AtomicUsize>,
}

pub fn app(session: Session, ws_stream_connections: Arc<AtomicUsize>) -> Router {
    let state = AppState {
        session,
        ws_stream_connections,
    };
    Router::new()
        .route("/", get(|| async { "procview: process CPU/memory viewer" })) // GET /
        .route("/version", get(http::version_handler)) // GET /version
        .route("/api/view", get(http::view_handler)) // GET /api/view
        .route("/api/samples", post(http::upload_handler)) // POST /api/samples
        .route("/api/samples/demo", post(http::demo_handler)) // POST /api/samples/demo
        .route("/api/range", put(http::range_handler)) // PUT /api/range
        .route("/api/threshold", put(http::threshold_handler)) // PUT /api/threshold
        .route("/api/stream/start", post(http::stream_start_handler)) // POST /api/stream/start
        .route("/api/stream/stop", post(http::stream_stop_handler)) // POST /api/stream/stop
        .route(
            "/api/analysis",
            get(http::analysis_get_handler)
                .post(http::analysis_run_handler)
                .delete(http::analysis_clear_handler),
        ) // GET/POST/DELETE /api/analysis
        .route(
            "/api/analysis/saved",
            get(http::saved_status_handler).post(http::saved_store_handler),
        ) // GET/POST /api/analysis/saved
        .route("/api/analysis/saved/load", post(http::saved_load_handler)) // POST /api/analysis/saved/load
        .route("/ws/stream", get(ws::ws_stream)) // WS /ws/stream
        .layer(axum::extract::DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
