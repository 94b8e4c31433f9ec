use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    routing::post,
    Json, Router,
};
use serde::Serialize;

use crate::db::StreamRepository;
use crate::error::{AppError, AppResult};
use crate::services::storage::{public_url, thumbnail_key};
use crate::AppState;

/// Room for multipart boundaries and the text fields around the file.
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

pub fn router(max_file_bytes: usize) -> Router<Arc<AppState>> {
    Router::new()
        .route("/thumbnail", post(upload_thumbnail))
        .layer(DefaultBodyLimit::max(max_file_bytes + FORM_OVERHEAD_BYTES))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThumbnailResponse {
    pub thumbnail_url: String,
}

struct UploadedFile {
    name: Option<String>,
    content_type: String,
    bytes: Vec<u8>,
}

async fn upload_thumbnail(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> AppResult<Json<ThumbnailResponse>> {
    let bad_form = |e: axum::extract::multipart::MultipartError| {
        AppError::BadRequest(format!("Invalid upload form: {}", e.body_text()))
    };

    let mut file = None;
    let mut stream_id = None;

    while let Some(field) = multipart.next_field().await.map_err(bad_form)? {
        match field.name() {
            Some("file") => {
                let name = field.file_name().map(str::to_string);
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field.bytes().await.map_err(bad_form)?;
                file = Some(UploadedFile {
                    name,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
            Some("streamId") => {
                let value = field.text().await.map_err(bad_form)?;
                stream_id = Some(value.trim().to_string()).filter(|v| !v.is_empty());
            }
            _ => {}
        }
    }

    let (file, stream_id) = match (file, stream_id) {
        (Some(f), Some(id)) if !f.bytes.is_empty() => (f, id),
        _ => {
            return Err(AppError::BadRequest(
                "File and streamId are required".to_string(),
            ))
        }
    };

    let max = state.config.storage.upload_max_bytes;
    if file.bytes.len() > max {
        return Err(AppError::BadRequest(format!(
            "File too large (max {} bytes)",
            max
        )));
    }

    let key = thumbnail_key(
        &stream_id,
        file.name.as_deref(),
        chrono::Utc::now().timestamp_millis(),
    );
    state
        .storage
        .put(&key, file.bytes, &file.content_type)
        .await
        .map_err(|e| AppError::Storage(format!("{:#}", e)))?;

    let thumbnail_url = public_url(&state.config.storage.cdn_base_url, &key);

    if !StreamRepository::set_thumbnail(&state.db, &stream_id, &thumbnail_url).await? {
        tracing::debug!("Thumbnail stored for unknown stream {}", stream_id);
    }

    Ok(Json(ThumbnailResponse { thumbnail_url }))
}
