//! The service boundary the application talks to: session lookup, object
//! storage and the relational tables.
//!
//! Every capability is an object-safe async trait so the request handlers and
//! the post workflow can run against SQLite + local disk in production and
//! against [`MemoryBackend`] in tests.

mod local;
mod memory;
mod sqlite;

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;

use crate::db::models::{Community, NewPost, Post, SessionUser};

pub use self::local::{resolve_object_path, LocalStorage};
pub use self::memory::{BackendCall, MemoryBackend};
pub use self::sqlite::{SqliteAuth, SqliteDatabase};

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("{0}")]
    Storage(String),

    #[error("{0}")]
    Database(String),

    #[error("{0}")]
    Io(#[from] std::io::Error),
}

impl From<rusqlite::Error> for BackendError {
    fn from(e: rusqlite::Error) -> Self {
        BackendError::Database(e.to_string())
    }
}

impl From<r2d2::Error> for BackendError {
    fn from(e: r2d2::Error) -> Self {
        BackendError::Database(e.to_string())
    }
}

impl From<tokio::task::JoinError> for BackendError {
    fn from(e: tokio::task::JoinError) -> Self {
        BackendError::Database(format!("database task failed: {}", e))
    }
}

pub type BackendResult<T> = Result<T, BackendError>;

/// Resolves the user behind a session token.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn current_user(&self, token: &str) -> BackendResult<Option<SessionUser>>;

    /// End the session behind `token`. Unknown tokens are not an error.
    async fn sign_out(&self, token: &str) -> BackendResult<()>;
}

/// Bucketed blob storage with publicly addressable objects.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Store `content` under `path`. Fails if the object already exists.
    async fn upload(&self, bucket: &str, path: &str, content: Bytes) -> BackendResult<()>;

    /// Public URL of an object. Does not check that the object exists.
    fn public_url(&self, bucket: &str, path: &str) -> String;

    async fn remove(&self, bucket: &str, path: &str) -> BackendResult<()>;
}

/// The posts and communities tables.
#[async_trait]
pub trait Database: Send + Sync {
    /// All communities, newest first.
    async fn list_communities(&self) -> BackendResult<Vec<Community>>;

    /// Most recent posts, newest first.
    async fn list_posts(&self, limit: u32) -> BackendResult<Vec<Post>>;

    /// Insert a post and echo back the stored row(s).
    async fn insert_post(&self, row: NewPost) -> BackendResult<Vec<Post>>;
}

/// Handle bundling the three backend capabilities.
#[derive(Clone)]
pub struct Backend {
    pub auth: Arc<dyn AuthProvider>,
    pub storage: Arc<dyn ObjectStorage>,
    pub db: Arc<dyn Database>,
}

impl Backend {
    pub fn new(
        auth: Arc<dyn AuthProvider>,
        storage: Arc<dyn ObjectStorage>,
        db: Arc<dyn Database>,
    ) -> Self {
        Self { auth, storage, db }
    }

    /// Route every capability to one in-memory fake.
    pub fn memory(memory: Arc<MemoryBackend>) -> Self {
        Self {
            auth: memory.clone(),
            storage: memory.clone(),
            db: memory,
        }
    }
}
