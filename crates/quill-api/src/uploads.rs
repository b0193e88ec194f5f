use std::path::Path;

use anyhow::Error;
use axum::Json;
use axum::extract::{Multipart, State};
use chrono::Utc;
use serde::Serialize;
use tokio::fs;
use tracing::error;

use crate::auth::AppState;
use crate::error::ApiError;

/// 5 MB upload limit for images
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// Request body allowance for the upload route: the image itself plus
/// headroom for multipart framing. Without this, axum's default 2 MB body
/// limit rejects uploads before the handler's own size check can run.
pub const UPLOAD_BODY_LIMIT: usize = MAX_IMAGE_BYTES + 64 * 1024;

#[derive(Serialize)]
pub struct UploadResponse {
    pub url: String,
}

/// POST /api/upload — accepts a multipart `image` field, writes it under
/// the public upload dir as `<unix-millis><original extension>`, and
/// returns the relative URL the front-end can embed.
pub async fn upload_image(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::Validation("Malformed multipart body".to_string()))?
    {
        if field.name() != Some("image") {
            continue;
        }

        // Absent or unparsable content types are rejected, not waved through.
        match field.content_type().and_then(|ct| ct.parse::<mime::Mime>().ok()) {
            Some(content_type) if content_type.type_() == mime::IMAGE => {}
            _ => {
                return Err(ApiError::Validation(
                    "Only image uploads are allowed".to_string(),
                ));
            }
        }

        let extension = field
            .file_name()
            .and_then(|name| Path::new(name).extension())
            .and_then(|ext| ext.to_str())
            .map(|ext| format!(".{ext}"))
            .unwrap_or_default();

        let data = field
            .bytes()
            .await
            .map_err(|_| ApiError::Validation("Failed to read uploaded file".to_string()))?;
        if data.len() > MAX_IMAGE_BYTES {
            return Err(ApiError::Validation(
                "Image exceeds the 5MB upload limit".to_string(),
            ));
        }

        // Ensure the upload directory exists
        fs::create_dir_all(&state.upload_dir).await.map_err(|e| {
            error!("failed to create upload dir {}: {}", state.upload_dir.display(), e);
            ApiError::Internal(Error::new(e))
        })?;

        let filename = format!("{}{}", Utc::now().timestamp_millis(), extension);
        let path = state.upload_dir.join(&filename);
        fs::write(&path, &data).await.map_err(|e| {
            error!("failed to write upload {}: {}", path.display(), e);
            ApiError::Internal(Error::new(e))
        })?;

        return Ok(Json(UploadResponse {
            url: format!("/uploads/{filename}"),
        }));
    }

    Err(ApiError::Validation("No file uploaded".to_string()))
}
