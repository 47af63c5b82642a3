use axum::http::header;
use axum::http::request::Parts;
use rand::Rng;
use rusqlite::params;

use crate::error::AppResult;
use crate::state::DbPool;

/// Create a new session for a user. Returns the session token.
pub fn create_session(pool: &DbPool, user_id: &str, hours: u64) -> AppResult<String> {
    let conn = pool.get()?;

    let token = generate_token();
    let id = uuid::Uuid::now_v7().to_string();

    conn.execute(
        "INSERT INTO sessions (id, user_id, token, expires_at) VALUES (?1, ?2, ?3, datetime('now', ?4))",
        params![id, user_id, token, format!("+{} hours", hours)],
    )?;

    Ok(token)
}

/// Insert the user if the email is new. Returns the user's id either way.
pub fn ensure_user(
    pool: &DbPool,
    email: &str,
    display_name: Option<&str>,
    avatar_url: Option<&str>,
) -> AppResult<String> {
    let conn = pool.get()?;
    conn.execute(
        "INSERT OR IGNORE INTO users (id, email, display_name, avatar_url) VALUES (?1, ?2, ?3, ?4)",
        params![
            uuid::Uuid::now_v7().to_string(),
            email,
            display_name,
            avatar_url
        ],
    )?;

    let id = conn.query_row(
        "SELECT id FROM users WHERE email = ?1",
        params![email],
        |row| row.get(0),
    )?;
    Ok(id)
}

pub fn session_cookie(cookie_name: &str, token: &str, max_age_hours: u64) -> String {
    format!(
        "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
        cookie_name,
        token,
        max_age_hours * 3600
    )
}

pub fn clear_session_cookie(cookie_name: &str) -> String {
    format!("{}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0", cookie_name)
}

/// Value of the session cookie, if the request carries one.
pub fn session_token<'a>(parts: &'a Parts, cookie_name: &str) -> Option<&'a str> {
    parts
        .headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|s| s.split(';'))
        .map(|s| s.trim())
        .find_map(|cookie| {
            let mut split = cookie.splitn(2, '=');
            let key = split.next()?.trim();
            let val = split.next()?.trim();
            if key == cookie_name && !val.is_empty() {
                Some(val)
            } else {
                None
            }
        })
}

/// Generate a cryptographically random 32-byte hex token.
fn generate_token() -> String {
    let mut rng = rand::thread_rng();
    let bytes: [u8; 32] = rng.gen();
    hex::encode(bytes)
}
