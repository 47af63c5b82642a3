use std::sync::Arc;

use async_graphql::*;

use crate::backend::Database;
use crate::graphql::types::{Community, Post};

const DEFAULT_LIMIT: i32 = 50;
const MAX_LIMIT: i32 = 200;

/// GraphQL Query root
pub struct QueryRoot;

#[Object]
impl QueryRoot {
    /// Most recent posts, newest first
    async fn posts(&self, ctx: &Context<'_>, limit: Option<i32>) -> Result<Vec<Post>> {
        let db = ctx.data::<Arc<dyn Database>>()?;
        let limit = limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT) as u32;

        let posts = db
            .list_posts(limit)
            .await
            .map_err(|e| Error::new(format!("Error fetching posts: {}", e)))?;

        Ok(posts.into_iter().map(Post::from).collect())
    }

    /// All communities, newest first
    async fn communities(&self, ctx: &Context<'_>) -> Result<Vec<Community>> {
        let db = ctx.data::<Arc<dyn Database>>()?;

        let communities = db
            .list_communities()
            .await
            .map_err(|e| Error::new(format!("Error fetching communities: {}", e)))?;

        Ok(communities.into_iter().map(Community::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use crate::db::models::NewPost;
    use crate::graphql::build_schema;

    #[tokio::test]
    async fn posts_query_returns_inserted_posts() {
        let memory = Arc::new(MemoryBackend::new());
        memory
            .insert_post(NewPost {
                title: "Hello World".into(),
                content: "First post!".into(),
                image_url: "memory://post-images/a.png".into(),
                avatar_url: None,
                community_id: None,
            })
            .await
            .unwrap();

        let schema = build_schema(memory.clone());
        let response = schema
            .execute("{ posts(limit: 5) { title charCount imageUrl } }")
            .await;

        assert!(response.errors.is_empty(), "{:?}", response.errors);
        let json = response.data.into_json().unwrap();
        assert_eq!(json["posts"][0]["title"], "Hello World");
        assert_eq!(json["posts"][0]["charCount"], 11);
        assert_eq!(json["posts"][0]["imageUrl"], "memory://post-images/a.png");
    }

    #[tokio::test]
    async fn communities_query_surfaces_backend_errors() {
        let memory = Arc::new(MemoryBackend::new());
        memory.fail_community_fetches("offline");

        let schema = build_schema(memory);
        let response = schema.execute("{ communities { id name } }").await;

        assert_eq!(response.errors.len(), 1);
        assert_eq!(
            response.errors[0].message,
            "Error fetching communities: offline"
        );
    }
}
