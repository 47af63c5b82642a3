use async_graphql::*;
use serde::{Deserialize, Serialize};

use crate::db::models;

/// A post in the feed
#[derive(Clone, Debug, Serialize, Deserialize, SimpleObject)]
#[graphql(complex)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub content: String,

    /// Public URL of the post image
    pub image_url: String,

    /// Author avatar at the time of posting
    pub avatar_url: Option<String>,

    pub community_id: Option<i64>,

    /// Creation timestamp as stored (`YYYY-MM-DD HH:MM:SS.fff`, UTC)
    pub created_at: String,
}

#[ComplexObject]
impl Post {
    /// Length of the post body in UTF-16 code units, as the form counts it
    async fn char_count(&self) -> usize {
        self.content.encode_utf16().count()
    }
}

impl From<models::Post> for Post {
    fn from(post: models::Post) -> Self {
        Self {
            id: post.id,
            title: post.title,
            content: post.content,
            image_url: post.image_url,
            avatar_url: post.avatar_url,
            community_id: post.community_id,
            created_at: post.created_at,
        }
    }
}

/// A community posts can be filed under
#[derive(Clone, Debug, Serialize, Deserialize, SimpleObject)]
pub struct Community {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub created_at: String,
}

impl From<models::Community> for Community {
    fn from(community: models::Community) -> Self {
        Self {
            id: community.id,
            name: community.name,
            description: community.description,
            created_at: community.created_at,
        }
    }
}
