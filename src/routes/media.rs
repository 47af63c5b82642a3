use std::path::Path as FsPath;

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::backend::resolve_object_path;
use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Image types a browser renders without running anything. SVG is left out
/// since it can carry script.
const INLINE_IMAGE_TYPES: &[&str] = &[
    "image/png",
    "image/jpeg",
    "image/gif",
    "image/webp",
    "image/avif",
    "image/bmp",
];

/// A stored object. Uploads are user-controlled, so only raster images are
/// shown inline; anything else is downloaded as opaque bytes.
fn media_response(name: &FsPath, body: Vec<u8>) -> Response {
    let guessed = mime_guess::from_path(name).first_or_octet_stream();
    let inline = INLINE_IMAGE_TYPES.contains(&guessed.essence_str());

    let (content_type, disposition) = if inline {
        (guessed.essence_str().to_string(), "inline")
    } else {
        ("application/octet-stream".to_string(), "attachment")
    };

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_DISPOSITION, disposition.to_string()),
            (header::X_CONTENT_TYPE_OPTIONS, "nosniff".to_string()),
            (header::CONTENT_SECURITY_POLICY, "sandbox".to_string()),
            // Keys carry a timestamp, so an object never changes once written
            (
                header::CACHE_CONTROL,
                "public, max-age=31536000, immutable".to_string(),
            ),
        ],
        body,
    )
        .into_response()
}

/// GET /media/{bucket}/{path} serves stored objects from local storage
pub async fn serve(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> AppResult<Response> {
    let file_path =
        resolve_object_path(&state.config.uploads_path(), &path).ok_or(AppError::NotFound)?;

    match tokio::fs::read(&file_path).await {
        Ok(bytes) => Ok(media_response(&file_path, bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(AppError::NotFound),
        Err(e) => Err(AppError::Internal(format!(
            "Failed to read {}: {}",
            file_path.display(),
            e
        ))),
    }
}
