use chrono::{NaiveDateTime, Utc};

use crate::backend::Database;
use crate::cache::{QueryCache, QueryKey, QueryState};
use crate::db::models::Post;

/// Most recent posts through the query cache. Creating a post invalidates
/// this entry.
pub async fn recent_posts(
    db: &dyn Database,
    cache: &QueryCache,
    limit: u32,
) -> QueryState<Vec<Post>> {
    cache
        .fetch(QueryKey::Posts, || async move {
            db.list_posts(limit)
                .await
                .map_err(|e| format!("Error fetching posts: {}", e))
        })
        .await
}

/// A post as shown in the feed.
pub struct FeedPost {
    pub id: i64,
    pub title: String,
    pub excerpt: String,
    pub image_url: String,
    pub avatar_url: Option<String>,
    pub community_id: Option<i64>,
    pub created_at: String,
}

const EXCERPT_CHARS: usize = 160;

impl From<&Post> for FeedPost {
    fn from(post: &Post) -> Self {
        Self {
            id: post.id,
            title: post.title.clone(),
            excerpt: excerpt(&post.content, EXCERPT_CHARS),
            image_url: post.image_url.clone(),
            avatar_url: post.avatar_url.clone(),
            community_id: post.community_id,
            created_at: parse_and_format_time(&post.created_at),
        }
    }
}

fn excerpt(content: &str, max_chars: usize) -> String {
    let trimmed = content.trim();
    if trimmed.chars().count() <= max_chars {
        return trimmed.to_string();
    }
    let cut: String = trimmed.chars().take(max_chars).collect();
    format!("{}…", cut.trim_end())
}

// --- Time formatting ---

fn parse_and_format_time(db_time: &str) -> String {
    NaiveDateTime::parse_from_str(db_time, "%Y-%m-%d %H:%M:%S%.f")
        .map(|dt| format_relative_time(&dt))
        .unwrap_or_else(|_| db_time.to_string())
}

pub fn format_relative_time(dt: &NaiveDateTime) -> String {
    let now = Utc::now().naive_utc();
    let diff = now.signed_duration_since(*dt);

    let seconds = diff.num_seconds();
    if seconds < 60 {
        return "just now".to_string();
    }

    let minutes = diff.num_minutes();
    if minutes < 60 {
        return format!("{}m ago", minutes);
    }

    let hours = diff.num_hours();
    if hours < 24 {
        return format!("{}h ago", hours);
    }

    let days = diff.num_days();
    if days < 7 {
        return format!("{}d ago", days);
    }

    dt.format("%b %-d, %Y").to_string()
}
