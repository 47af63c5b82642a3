use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use super::form::ImageFile;

/// Mime type to render the file with, or `None` if it is not an image.
fn image_mime(file: &ImageFile) -> Option<String> {
    let declared = file
        .content_type
        .as_deref()
        .filter(|ct| ct.starts_with("image/"))
        .map(str::to_string);

    declared.or_else(|| {
        mime_guess::from_path(&file.name)
            .first()
            .filter(|mime| mime.type_() == mime_guess::mime::IMAGE)
            .map(|mime| mime.essence_str().to_string())
    })
}

/// Encode the picked image as a `data:` URI for the form preview.
///
/// Encoding runs on the blocking pool. A non-image, an empty file or a failed
/// task all yield no preview.
pub async fn render_preview(file: &ImageFile) -> Option<String> {
    if file.bytes.is_empty() {
        return None;
    }
    let mime = image_mime(file)?;
    let bytes = file.bytes.clone();

    tokio::task::spawn_blocking(move || format!("data:{};base64,{}", mime, STANDARD.encode(&bytes)))
        .await
        .ok()
}
