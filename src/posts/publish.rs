use chrono::Utc;

use super::form::{ImageFile, PostInput};
use crate::backend::Backend;
use crate::db::models::{NewPost, Post};

/// Failures of the upload-then-insert pipeline. The message carries the
/// backend's own reason text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmitError {
    #[error("Image file is required")]
    ImageMissing,

    #[error("Error uploading image: {0}")]
    UploadFailed(String),

    #[error("Error creating post: {0}")]
    InsertFailed(String),
}

/// Longest title or file-name segment kept in a storage key. Two capped
/// segments plus the timestamp stay well under the 255-byte file name limit.
const MAX_KEY_SEGMENT: usize = 100;

/// Storage key for a post image: `{title}-{millis}-{file name}`.
///
/// Characters outside `[A-Za-z0-9._-]` are replaced with `_` so the key is
/// safe both as a file name and as a URL path. The title keeps its first
/// characters and the file name its last, so the extension survives.
pub fn storage_path(title: &str, millis: i64, file_name: &str) -> String {
    let title: String = sanitize(title).take(MAX_KEY_SEGMENT).collect();

    let name: Vec<char> = sanitize(file_name).collect();
    let skip = name.len().saturating_sub(MAX_KEY_SEGMENT);
    let name: String = name[skip..].iter().collect();

    format!("{}-{}-{}", title, millis, name)
}

fn sanitize(segment: &str) -> impl Iterator<Item = char> + '_ {
    segment.chars().map(|c| {
        if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
            c
        } else {
            '_'
        }
    })
}

/// Uploads the cover image and inserts the post row.
#[derive(Clone)]
pub struct PostPublisher {
    backend: Backend,
    bucket: String,
    cleanup_orphans: bool,
}

impl PostPublisher {
    pub fn new(backend: Backend, bucket: impl Into<String>, cleanup_orphans: bool) -> Self {
        Self {
            backend,
            bucket: bucket.into(),
            cleanup_orphans,
        }
    }

    pub async fn upload_post(
        &self,
        post: &PostInput,
        image: Option<&ImageFile>,
    ) -> Result<Vec<Post>, SubmitError> {
        let image = image.ok_or(SubmitError::ImageMissing)?;

        let path = storage_path(&post.title, Utc::now().timestamp_millis(), &image.name);
        tracing::debug!(bucket = %self.bucket, %path, "Uploading post image");

        self.backend
            .storage
            .upload(&self.bucket, &path, image.bytes.clone())
            .await
            .map_err(|e| SubmitError::UploadFailed(e.to_string()))?;

        let image_url = self.backend.storage.public_url(&self.bucket, &path);

        let row = NewPost {
            title: post.title.clone(),
            content: post.content.clone(),
            image_url,
            avatar_url: post.avatar_url.clone(),
            community_id: post.community_id,
        };

        match self.backend.db.insert_post(row).await {
            Ok(rows) => Ok(rows),
            Err(e) => {
                if self.cleanup_orphans {
                    self.remove_orphan(&path).await;
                }
                Err(SubmitError::InsertFailed(e.to_string()))
            }
        }
    }

    async fn remove_orphan(&self, path: &str) {
        if let Err(e) = self.backend.storage.remove(&self.bucket, path).await {
            tracing::warn!(bucket = %self.bucket, %path, "Failed to remove orphaned image: {}", e);
        }
    }
}
