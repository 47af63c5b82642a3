use async_trait::async_trait;
use rusqlite::{params, OptionalExtension, Row};

use super::{AuthProvider, BackendResult, Database};
use crate::db::models::{Community, NewPost, Post, SessionUser, UserMetadata};
use crate::state::DbPool;

/// Session lookup against the `sessions` and `users` tables.
#[derive(Clone)]
pub struct SqliteAuth {
    pool: DbPool,
}

impl SqliteAuth {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuthProvider for SqliteAuth {
    async fn current_user(&self, token: &str) -> BackendResult<Option<SessionUser>> {
        let pool = self.pool.clone();
        let token = token.to_string();

        tokio::task::spawn_blocking(move || -> BackendResult<Option<SessionUser>> {
            let conn = pool.get()?;
            let user = conn
                .query_row(
                    "SELECT u.id, u.email, u.avatar_url, u.display_name FROM sessions s \
                     JOIN users u ON u.id = s.user_id \
                     WHERE s.token = ?1 AND s.expires_at > datetime('now')",
                    params![token],
                    |row| {
                        Ok(SessionUser {
                            id: row.get(0)?,
                            email: row.get(1)?,
                            metadata: UserMetadata {
                                avatar_url: row.get(2)?,
                                display_name: row.get(3)?,
                            },
                        })
                    },
                )
                .optional()?;
            Ok(user)
        })
        .await?
    }

    async fn sign_out(&self, token: &str) -> BackendResult<()> {
        let pool = self.pool.clone();
        let token = token.to_string();

        tokio::task::spawn_blocking(move || -> BackendResult<()> {
            let conn = pool.get()?;
            conn.execute("DELETE FROM sessions WHERE token = ?1", params![token])?;
            Ok(())
        })
        .await?
    }
}

/// Posts and communities stored in SQLite.
#[derive(Clone)]
pub struct SqliteDatabase {
    pool: DbPool,
}

impl SqliteDatabase {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

const POST_COLUMNS: &str = "id, title, content, image_url, avatar_url, community_id, created_at";

fn post_from_row(row: &Row<'_>) -> rusqlite::Result<Post> {
    Ok(Post {
        id: row.get(0)?,
        title: row.get(1)?,
        content: row.get(2)?,
        image_url: row.get(3)?,
        avatar_url: row.get(4)?,
        community_id: row.get(5)?,
        created_at: row.get(6)?,
    })
}

#[async_trait]
impl Database for SqliteDatabase {
    async fn list_communities(&self) -> BackendResult<Vec<Community>> {
        let pool = self.pool.clone();

        tokio::task::spawn_blocking(move || -> BackendResult<Vec<Community>> {
            let conn = pool.get()?;
            let mut stmt = conn.prepare(
                "SELECT id, name, description, created_at
                 FROM communities
                 ORDER BY created_at DESC, id DESC",
            )?;
            let communities = stmt
                .query_map([], |row| {
                    Ok(Community {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        description: row.get(2)?,
                        created_at: row.get(3)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(communities)
        })
        .await?
    }

    async fn list_posts(&self, limit: u32) -> BackendResult<Vec<Post>> {
        let pool = self.pool.clone();

        tokio::task::spawn_blocking(move || -> BackendResult<Vec<Post>> {
            let conn = pool.get()?;
            let mut stmt = conn.prepare(&format!(
                "SELECT {POST_COLUMNS} FROM posts ORDER BY created_at DESC, id DESC LIMIT ?1"
            ))?;
            let posts = stmt
                .query_map(params![limit], post_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(posts)
        })
        .await?
    }

    async fn insert_post(&self, row: NewPost) -> BackendResult<Vec<Post>> {
        let pool = self.pool.clone();

        tokio::task::spawn_blocking(move || -> BackendResult<Vec<Post>> {
            let conn = pool.get()?;
            conn.execute(
                "INSERT INTO posts (title, content, image_url, avatar_url, community_id)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    row.title,
                    row.content,
                    row.image_url,
                    row.avatar_url,
                    row.community_id
                ],
            )?;
            let id = conn.last_insert_rowid();
            let post = conn.query_row(
                &format!("SELECT {POST_COLUMNS} FROM posts WHERE id = ?1"),
                params![id],
                post_from_row,
            )?;
            Ok(vec![post])
        })
        .await?
    }
}
