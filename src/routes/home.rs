use askama::Template;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::db::models::SessionUser;
use crate::extractors::MaybeUser;
use crate::feed::{self, FeedPost};
use crate::state::AppState;

pub const TAGLINE: &str = "Share ideas, build together, connect with developers worldwide...";

/// The signed-in user as shown in the page header.
pub struct NavUser {
    pub label: String,
    pub avatar_url: Option<String>,
}

impl From<&SessionUser> for NavUser {
    fn from(user: &SessionUser) -> Self {
        Self {
            label: user.label().to_string(),
            avatar_url: user.metadata.avatar_url.clone(),
        }
    }
}

#[derive(Template)]
#[template(path = "pages/home.html")]
pub struct HomeTemplate {
    pub user: Option<NavUser>,
    pub tagline: &'static str,
    pub posts: Vec<FeedPost>,
    pub feed_error: Option<String>,
}

/// Wrapper to render askama templates as axum responses
pub struct Html<T: Template>(pub T);

impl<T: Template> IntoResponse for Html<T> {
    fn into_response(self) -> Response {
        match self.0.render() {
            Ok(body) => (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
                body,
            )
                .into_response(),
            Err(e) => {
                tracing::error!("Template render error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Template error").into_response()
            }
        }
    }
}

pub async fn index(State(state): State<AppState>, maybe_user: MaybeUser) -> Response {
    let feed = feed::recent_posts(
        state.backend.db.as_ref(),
        &state.cache,
        state.config.posts.feed_limit,
    )
    .await;

    let posts: Vec<FeedPost> = feed
        .data()
        .map(|posts| posts.iter().map(FeedPost::from).collect())
        .unwrap_or_default();

    Html(HomeTemplate {
        user: maybe_user.0.as_ref().map(NavUser::from),
        tagline: TAGLINE,
        posts,
        feed_error: feed.error().map(str::to_string),
    })
    .into_response()
}
