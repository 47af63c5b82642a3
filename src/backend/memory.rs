use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use super::{AuthProvider, BackendError, BackendResult, Database, ObjectStorage};
use crate::db::models::{Community, NewPost, Post, SessionUser};

/// One call that reached the fake backend, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    CurrentUser,
    Upload { bucket: String, path: String },
    PublicUrl { bucket: String, path: String },
    Remove { bucket: String, path: String },
    ListCommunities,
    ListPosts,
    InsertPost { title: String },
}

#[derive(Default)]
struct Inner {
    sessions: HashMap<String, SessionUser>,
    objects: HashMap<(String, String), Bytes>,
    communities: Vec<Community>,
    posts: Vec<Post>,
    next_post_id: i64,
    upload_failure: Option<String>,
    insert_failure: Option<String>,
    communities_failure: Option<String>,
    journal: Vec<BackendCall>,
}

/// In-memory backend with failure injection and a call journal.
#[derive(Default)]
pub struct MemoryBackend {
    inner: Mutex<Inner>,
}

fn timestamp() -> String {
    chrono::Utc::now()
        .format("%Y-%m-%d %H:%M:%S%.3f")
        .to_string()
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn add_session(&self, token: &str, user: SessionUser) {
        self.lock().sessions.insert(token.to_string(), user);
    }

    pub fn add_community(&self, name: &str) -> Community {
        let mut inner = self.lock();
        let community = Community {
            id: inner.communities.len() as i64 + 1,
            name: name.to_string(),
            description: None,
            created_at: timestamp(),
        };
        inner.communities.push(community.clone());
        community
    }

    pub fn fail_uploads(&self, reason: &str) {
        self.lock().upload_failure = Some(reason.to_string());
    }

    pub fn fail_inserts(&self, reason: &str) {
        self.lock().insert_failure = Some(reason.to_string());
    }

    pub fn fail_community_fetches(&self, reason: &str) {
        self.lock().communities_failure = Some(reason.to_string());
    }

    /// Clear every injected failure.
    pub fn heal(&self) {
        let mut inner = self.lock();
        inner.upload_failure = None;
        inner.insert_failure = None;
        inner.communities_failure = None;
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.lock().journal.clone()
    }

    /// Number of calls that touched storage or the tables.
    pub fn network_calls(&self) -> usize {
        self.lock()
            .journal
            .iter()
            .filter(|call| !matches!(call, BackendCall::CurrentUser))
            .count()
    }

    pub fn object(&self, bucket: &str, path: &str) -> Option<Bytes> {
        self.lock()
            .objects
            .get(&(bucket.to_string(), path.to_string()))
            .cloned()
    }

    pub fn object_count(&self) -> usize {
        self.lock().objects.len()
    }

    pub fn posts(&self) -> Vec<Post> {
        self.lock().posts.clone()
    }
}

#[async_trait]
impl AuthProvider for MemoryBackend {
    async fn current_user(&self, token: &str) -> BackendResult<Option<SessionUser>> {
        let mut inner = self.lock();
        inner.journal.push(BackendCall::CurrentUser);
        Ok(inner.sessions.get(token).cloned())
    }

    async fn sign_out(&self, token: &str) -> BackendResult<()> {
        self.lock().sessions.remove(token);
        Ok(())
    }
}

#[async_trait]
impl ObjectStorage for MemoryBackend {
    async fn upload(&self, bucket: &str, path: &str, content: Bytes) -> BackendResult<()> {
        let mut inner = self.lock();
        inner.journal.push(BackendCall::Upload {
            bucket: bucket.to_string(),
            path: path.to_string(),
        });

        if let Some(reason) = inner.upload_failure.clone() {
            return Err(BackendError::Storage(reason));
        }

        let key = (bucket.to_string(), path.to_string());
        if inner.objects.contains_key(&key) {
            return Err(BackendError::Storage("The resource already exists".into()));
        }
        inner.objects.insert(key, content);
        Ok(())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        self.lock().journal.push(BackendCall::PublicUrl {
            bucket: bucket.to_string(),
            path: path.to_string(),
        });
        format!("memory://{}/{}", bucket, path)
    }

    async fn remove(&self, bucket: &str, path: &str) -> BackendResult<()> {
        let mut inner = self.lock();
        inner.journal.push(BackendCall::Remove {
            bucket: bucket.to_string(),
            path: path.to_string(),
        });
        inner
            .objects
            .remove(&(bucket.to_string(), path.to_string()))
            .map(|_| ())
            .ok_or_else(|| BackendError::Storage("Object not found".into()))
    }
}

#[async_trait]
impl Database for MemoryBackend {
    async fn list_communities(&self) -> BackendResult<Vec<Community>> {
        let mut inner = self.lock();
        inner.journal.push(BackendCall::ListCommunities);

        if let Some(reason) = inner.communities_failure.clone() {
            return Err(BackendError::Database(reason));
        }
        Ok(inner.communities.iter().rev().cloned().collect())
    }

    async fn list_posts(&self, limit: u32) -> BackendResult<Vec<Post>> {
        let mut inner = self.lock();
        inner.journal.push(BackendCall::ListPosts);
        Ok(inner
            .posts
            .iter()
            .rev()
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn insert_post(&self, row: NewPost) -> BackendResult<Vec<Post>> {
        let mut inner = self.lock();
        inner.journal.push(BackendCall::InsertPost {
            title: row.title.clone(),
        });

        if let Some(reason) = inner.insert_failure.clone() {
            return Err(BackendError::Database(reason));
        }
        if let Some(id) = row.community_id {
            if !inner.communities.iter().any(|c| c.id == id) {
                return Err(BackendError::Database(
                    "FOREIGN KEY constraint failed".into(),
                ));
            }
        }

        inner.next_post_id += 1;
        let post = Post {
            id: inner.next_post_id,
            title: row.title,
            content: row.content,
            image_url: row.image_url,
            avatar_url: row.avatar_url,
            community_id: row.community_id,
            created_at: timestamp(),
        };
        inner.posts.push(post.clone());
        Ok(vec![post])
    }
}
