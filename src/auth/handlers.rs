use axum::extract::State;
use axum::http::request::Parts;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use rusqlite::params;

use crate::auth::session;
use crate::error::AppResult;
use crate::extractors::MaybeUser;
use crate::state::AppState;

/// POST /auth/logout: end the session, drop the user's draft and go home
pub async fn logout(
    State(state): State<AppState>,
    maybe_user: MaybeUser,
    parts: Parts,
) -> AppResult<Response> {
    let cookie_name = &state.config.auth.cookie_name;

    if let Some(user) = &maybe_user.0 {
        state.drafts.discard(&user.id).await;
    }

    if let Some(token) = session::session_token(&parts, cookie_name) {
        if let Err(e) = state.backend.auth.sign_out(token).await {
            tracing::warn!("Failed to end session: {}", e);
        }
    }

    Ok((
        StatusCode::SEE_OTHER,
        [
            (header::LOCATION, "/".to_string()),
            (header::SET_COOKIE, session::clear_session_cookie(cookie_name)),
        ],
        "",
    )
        .into_response())
}

/// Test-only: seed a user, a session and a community; returns the session cookie.
/// Only mounted when DEVCONNECT_TEST_SEED is set.
pub async fn test_seed(State(state): State<AppState>) -> AppResult<Response> {
    let user_id = session::ensure_user(
        &state.db,
        "devuser@example.com",
        Some("devuser"),
        Some("https://avatars.example.com/devuser.png"),
    )?;

    let community_id: i64 = {
        let conn = state.db.get()?;
        conn.execute(
            "INSERT OR IGNORE INTO communities (name, description) VALUES (?1, ?2)",
            params!["rust", "Systems programming without fear"],
        )?;
        conn.query_row(
            "SELECT id FROM communities WHERE name = 'rust'",
            [],
            |r| r.get(0),
        )?
    };

    let hours = state.config.auth.session_hours;
    let token = session::create_session(&state.db, &user_id, hours)?;
    let cookie = session::session_cookie(&state.config.auth.cookie_name, &token, hours);

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(serde_json::json!({
            "user_id": user_id,
            "community_id": community_id,
        })),
    )
        .into_response())
}
