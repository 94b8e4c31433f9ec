use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use crate::db::{Stream, StreamRepository};
use crate::error::{AppError, AppResult};
use crate::routes::extract::AppJson;
use crate::services::live_streams::LiveStreamNotice;
use crate::services::streams::{CreateStreamRequest, StreamService};
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/check-live", get(check_live))
        .route("/latest", get(latest_stream))
        .route("/create", post(create_stream))
        .route("/:id/start", post(start_stream))
        .route("/:id/end", post(end_stream))
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckLiveResponse {
    pub new_live_stream: Option<LiveStreamNotice>,
}

#[derive(Debug, Serialize)]
pub struct StreamResponse {
    pub stream: Stream,
}

// ============================================================================
// Handlers
// ============================================================================

/// Poll target of the live-stream widget. Never fails: any error is reported
/// as "nothing new".
async fn check_live(State(state): State<Arc<AppState>>) -> Json<CheckLiveResponse> {
    let new_live_stream = match state.live_streams.next_new_live(&state.db).await {
        Ok(notice) => notice,
        Err(e) => {
            tracing::warn!("Live stream check failed: {}", e);
            None
        }
    };

    Json(CheckLiveResponse { new_live_stream })
}

async fn latest_stream(State(state): State<Arc<AppState>>) -> AppResult<Json<StreamResponse>> {
    let stream = StreamRepository::find_latest_live(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("No live streams found".to_string()))?;

    Ok(Json(StreamResponse { stream }))
}

async fn create_stream(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<CreateStreamRequest>,
) -> AppResult<(StatusCode, Json<StreamResponse>)> {
    let new_stream = StreamService::prepare(req, &state.config.streaming.playback_url)?;
    let stream = StreamRepository::create(&state.db, new_stream).await?;

    tracing::info!("Created stream {} for user {}", stream.id, stream.user_id);

    Ok((StatusCode::CREATED, Json(StreamResponse { stream })))
}

async fn start_stream(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<StreamResponse>> {
    let stream = StreamRepository::start(&state.db, &id)
        .await?
        .ok_or_else(|| AppError::NotFound("Stream not found".to_string()))?;

    tracing::info!("Stream {} is live", stream.id);

    Ok(Json(StreamResponse { stream }))
}

async fn end_stream(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<StreamResponse>> {
    let stream = StreamRepository::end(&state.db, &id)
        .await?
        .ok_or_else(|| AppError::NotFound("Stream not found".to_string()))?;

    tracing::info!("Stream {} ended", stream.id);

    Ok(Json(StreamResponse { stream }))
}
