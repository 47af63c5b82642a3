use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::auth::session;
use crate::db::models::SessionUser;
use crate::error::AppError;
use crate::state::AppState;

/// Optional user extractor. `None` when there is no valid session.
pub struct MaybeUser(pub Option<SessionUser>);

impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(token) = session::session_token(parts, &state.config.auth.cookie_name) else {
            return Ok(MaybeUser(None));
        };

        match state.backend.auth.current_user(token).await {
            Ok(user) => Ok(MaybeUser(user)),
            Err(e) => {
                tracing::warn!("Session lookup failed: {}", e);
                Ok(MaybeUser(None))
            }
        }
    }
}
