use std::path::Path as FsPath;

use axum::extract::Path;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use rust_embed::Embed;

use crate::error::{AppError, AppResult};

#[derive(Embed)]
#[folder = "assets/"]
struct Assets;

/// A file body typed from its name.
fn file_response(name: &FsPath, body: Vec<u8>, cache_control: &'static str) -> Response {
    let mime = mime_guess::from_path(name).first_or_octet_stream();
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, mime.as_ref().to_string()),
            (header::CACHE_CONTROL, cache_control.to_string()),
        ],
        body,
    )
        .into_response()
}

/// GET /assets/{*path} serves stylesheets compiled into the binary
pub async fn serve(Path(path): Path<String>) -> AppResult<Response> {
    let file = Assets::get(&path).ok_or(AppError::NotFound)?;
    Ok(file_response(
        FsPath::new(&path),
        file.data.into_owned(),
        "public, max-age=86400",
    ))
}
