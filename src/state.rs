use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use std::time::Duration;

use crate::backend::Backend;
use crate::cache::QueryCache;
use crate::config::Config;
use crate::graphql::{build_schema, FeedSchema};
use crate::posts::{DraftStore, PostPublisher, PostWorkflow};

pub type DbPool = Pool<SqliteConnectionManager>;

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub config: Config,
    pub backend: Backend,
    pub cache: QueryCache,
    pub drafts: DraftStore,
    pub workflow: PostWorkflow,
    pub graphql_schema: FeedSchema,
}

impl AppState {
    pub fn new(config: Config, db: DbPool, backend: Backend) -> Self {
        let cache = QueryCache::new();
        let publisher = PostPublisher::new(
            backend.clone(),
            config.storage.bucket.clone(),
            config.storage.cleanup_orphans,
        );
        let workflow = PostWorkflow::new(
            publisher,
            cache.clone(),
            config.posts.max_chars,
            Duration::from_secs(config.posts.redirect_delay_secs),
        );
        let graphql_schema = build_schema(backend.db.clone());

        Self {
            db,
            config,
            backend,
            cache,
            drafts: DraftStore::new(),
            workflow,
            graphql_schema,
        }
    }
}
