// JSON handlers over the session

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;

use super::AppState;
use crate::analysis::AnalysisError;
use crate::models::TimeRange;
use crate::session::SessionError;
use crate::version::{NAME, VERSION};

/// SessionError → status + `{"error": "..."}` body.
pub(super) struct ApiError(SessionError);

impl From<SessionError> for ApiError {
    fn from(e: SessionError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            SessionError::Ingest(_)
            | SessionError::NoData
            | SessionError::NoAnalysis
            | SessionError::InvalidThreshold(_)
            | SessionError::InvalidRange => StatusCode::BAD_REQUEST,
            SessionError::StreamActive
            | SessionError::RangeLocked
            | SessionError::AnalysisInFlight => StatusCode::CONFLICT,
            SessionError::Analysis(AnalysisError::MissingCredential) => {
                StatusCode::PRECONDITION_FAILED
            }
            SessionError::Analysis(_) => StatusCode::BAD_GATEWAY,
            SessionError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::warn!(error = %self.0, "request failed");
        }
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

pub(super) type ApiResult<T> = Result<T, ApiError>;

/// GET /version: service name and version (from Cargo.toml at build time).
pub(super) async fn version_handler() -> impl IntoResponse {
    Json(json!({
        "name": NAME,
        "version": VERSION,
    }))
}

/// GET /api/view: filtered samples with stats, incidents and analysis state.
pub(super) async fn view_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.session.view().await)
}

/// POST /api/samples: body is JSON-lines text; replaces the current series.
pub(super) async fn upload_handler(
    State(state): State<AppState>,
    body: String,
) -> ApiResult<impl IntoResponse> {
    let count = state.session.load_text(&body).await?;
    Ok(Json(json!({ "count": count })))
}

/// POST /api/samples/demo: replaces the current series with the demo spike.
pub(super) async fn demo_handler(State(state): State<AppState>) -> impl IntoResponse {
    let count = state.session.load_demo().await;
    Json(json!({ "count": count }))
}

/// PUT /api/range: `{"start": "...", "end": "..."}`, either side nullable.
pub(super) async fn range_handler(
    State(state): State<AppState>,
    Json(range): Json<TimeRange>,
) -> ApiResult<impl IntoResponse> {
    state.session.set_range(range).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub(super) struct ThresholdBody {
    threshold: u16,
}

/// PUT /api/threshold: `{"threshold": 1..=100}`.
pub(super) async fn threshold_handler(
    State(state): State<AppState>,
    Json(body): Json<ThresholdBody>,
) -> ApiResult<impl IntoResponse> {
    state.session.set_threshold(body.threshold).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/stream/start: no-op if already streaming.
pub(super) async fn stream_start_handler(
    State(state): State<AppState>,
) -> ApiResult<impl IntoResponse> {
    let started = state.session.start_stream().await?;
    Ok(Json(json!({ "streaming": true, "changed": started })))
}

/// POST /api/stream/stop: no-op if idle.
pub(super) async fn stream_stop_handler(State(state): State<AppState>) -> impl IntoResponse {
    let stopped = state.session.stop_stream().await;
    Json(json!({ "streaming": false, "changed": stopped }))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct AnalyzeBody {
    #[serde(default)]
    confirm_stop_stream: bool,
}

/// POST /api/analysis: optional `{"confirmStopStream": true}` when the stream is running.
pub(super) async fn analysis_run_handler(
    State(state): State<AppState>,
    body: Option<Json<AnalyzeBody>>,
) -> ApiResult<impl IntoResponse> {
    let confirm = body.map(|Json(b)| b.confirm_stop_stream).unwrap_or(false);
    let result = state.session.analyze(confirm).await?;
    Ok(Json(result))
}

/// GET /api/analysis: current in-memory report (null when none).
pub(super) async fn analysis_get_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.session.current_analysis().await)
}

/// DELETE /api/analysis: clears memory and the saved slot.
pub(super) async fn analysis_clear_handler(
    State(state): State<AppState>,
) -> ApiResult<impl IntoResponse> {
    state.session.clear_analysis().await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/analysis/saved: whether a saved report exists.
pub(super) async fn saved_status_handler(
    State(state): State<AppState>,
) -> ApiResult<impl IntoResponse> {
    let saved = state.session.has_saved_analysis().await?;
    Ok(Json(json!({ "saved": saved })))
}

/// POST /api/analysis/saved: saves the current report.
pub(super) async fn saved_store_handler(
    State(state): State<AppState>,
) -> ApiResult<impl IntoResponse> {
    state.session.save_analysis().await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/analysis/saved/load: restores the saved report (null when none or unreadable).
pub(super) async fn saved_load_handler(
    State(state): State<AppState>,
) -> ApiResult<impl IntoResponse> {
    let loaded = state.session.load_saved_analysis().await?;
    Ok(Json(loaded))
}
