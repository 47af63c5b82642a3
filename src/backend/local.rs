use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use url::Url;

use super::{BackendError, BackendResult, ObjectStorage};

/// Object storage on the local file system, one directory per bucket.
///
/// Objects are published under `{public_base}/media/{bucket}/{path}` and served
/// back by the media route.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
    public_base: String,
}

impl LocalStorage {
    pub fn new(base_path: impl Into<PathBuf>, public_base: impl Into<String>) -> Self {
        Self {
            base_path: base_path.into(),
            public_base: public_base.into(),
        }
    }

    fn object_path(&self, bucket: &str, path: &str) -> BackendResult<PathBuf> {
        resolve_object_path(&self.base_path, &format!("{}/{}", bucket, path))
            .ok_or_else(|| BackendError::Storage(format!("Invalid object path: {}", path)))
    }
}

/// Join a relative object key onto `base`, refusing anything that could step
/// outside of it.
pub fn resolve_object_path(base: &Path, key: &str) -> Option<PathBuf> {
    let relative = Path::new(key);
    if key.is_empty() || relative.components().any(|c| !matches!(c, Component::Normal(_))) {
        return None;
    }
    Some(base.join(relative))
}

#[async_trait]
impl ObjectStorage for LocalStorage {
    async fn upload(&self, bucket: &str, path: &str, content: Bytes) -> BackendResult<()> {
        let target = self.object_path(bucket, path)?;

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut file = match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(BackendError::Storage("The resource already exists".into()));
            }
            Err(e) => return Err(e.into()),
        };
        file.write_all(&content).await?;
        file.flush().await?;

        Ok(())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        match Url::parse(&self.public_base) {
            Ok(mut url) => {
                if let Ok(mut segments) = url.path_segments_mut() {
                    segments.pop_if_empty().push("media").push(bucket);
                    segments.extend(path.split('/'));
                }
                url.to_string()
            }
            Err(_) => format!(
                "{}/media/{}/{}",
                self.public_base.trim_end_matches('/'),
                bucket,
                path
            ),
        }
    }

    async fn remove(&self, bucket: &str, path: &str) -> BackendResult<()> {
        let target = self.object_path(bucket, path)?;
        fs::remove_file(&target).await?;
        Ok(())
    }
}
