//! Read-through cache for the page queries.
//!
//! Entries are keyed by [`QueryKey`]. A fresh entry is served without calling
//! the fetcher; an invalidated (stale) or failed entry is refetched on the next
//! read. Invalidations that land while a fetch is in flight keep the entry
//! stale, so the next reader sees the newer data.

use std::any::Any;
use std::collections::HashMap;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKey {
    Posts,
    Communities,
}

impl QueryKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryKey::Posts => "posts",
            QueryKey::Communities => "communities",
        }
    }
}

#[derive(Debug)]
pub enum QueryState<T> {
    Ready(Arc<T>),
    Failed(String),
}

impl<T> QueryState<T> {
    pub fn is_error(&self) -> bool {
        matches!(self, QueryState::Failed(_))
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            QueryState::Ready(value) => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            QueryState::Failed(message) => Some(message),
            _ => None,
        }
    }
}

#[derive(Default)]
struct Entry {
    value: Option<Arc<dyn Any + Send + Sync>>,
    error: Option<String>,
    stale: bool,
    invalidations: u64,
}

#[derive(Clone, Default)]
pub struct QueryCache {
    entries: Arc<Mutex<HashMap<QueryKey, Entry>>>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `key` from the cache, calling `fetch` when the entry is missing,
    /// stale or failed.
    pub async fn fetch<T, E, F, Fut>(&self, key: QueryKey, fetch: F) -> QueryState<T>
    where
        T: Send + Sync + 'static,
        E: Display,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let generation = {
            let mut entries = self.entries.lock().await;
            let entry = entries.entry(key).or_default();
            if !entry.stale && entry.error.is_none() {
                if let Some(value) = entry.value.clone() {
                    if let Ok(value) = value.downcast::<T>() {
                        return QueryState::Ready(value);
                    }
                }
            }
            entry.invalidations
        };

        let result = fetch().await;

        let mut entries = self.entries.lock().await;
        let entry = entries.entry(key).or_default();

        match result {
            Ok(value) => {
                let value = Arc::new(value);
                entry.value = Some(value.clone());
                entry.error = None;
                entry.stale = entry.invalidations != generation;
                QueryState::Ready(value)
            }
            Err(e) => {
                let message = e.to_string();
                tracing::warn!(query = key.as_str(), "Query failed: {}", message);
                entry.error = Some(message.clone());
                QueryState::Failed(message)
            }
        }
    }

    /// Mark `key` stale so the next read refetches it.
    pub async fn invalidate(&self, key: QueryKey) {
        let mut entries = self.entries.lock().await;
        let entry = entries.entry(key).or_default();
        entry.stale = true;
        entry.invalidations += 1;
        tracing::debug!(query = key.as_str(), "Query invalidated");
    }

    #[cfg(test)]
    async fn is_stale(&self, key: QueryKey) -> bool {
        let entries = self.entries.lock().await;
        entries.get(&key).map(|e| e.stale).unwrap_or(false)
    }

    /// How many times `key` has been invalidated.
    pub async fn invalidations(&self, key: QueryKey) -> u64 {
        let entries = self.entries.lock().await;
        entries.get(&key).map(|e| e.invalidations).unwrap_or(0)
    }
}
