use std::sync::Arc;

use async_graphql::{EmptyMutation, EmptySubscription, Schema};

use super::queries::QueryRoot;
use crate::backend::Database;

/// GraphQL Schema type
pub type FeedSchema = Schema<QueryRoot, EmptyMutation, EmptySubscription>;

/// Build the read-only GraphQL schema over the given database backend.
pub fn build_schema(db: Arc<dyn Database>) -> FeedSchema {
    Schema::build(QueryRoot, EmptyMutation, EmptySubscription)
        .data(db)
        .finish()
}
