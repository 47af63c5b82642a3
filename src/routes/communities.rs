use askama::Template;
use axum::extract::State;
use axum::response::{IntoResponse, Response};

use crate::communities;
use crate::db::models::Community;
use crate::extractors::MaybeUser;
use crate::routes::home::{Html, NavUser};
use crate::state::AppState;

#[derive(Template)]
#[template(path = "pages/communities.html")]
pub struct CommunitiesTemplate {
    pub user: Option<NavUser>,
    pub communities: Vec<Community>,
    pub error: Option<String>,
}

/// GET /communities
pub async fn index(State(state): State<AppState>, maybe_user: MaybeUser) -> Response {
    let lookup = communities::cached_communities(state.backend.db.as_ref(), &state.cache).await;

    Html(CommunitiesTemplate {
        user: maybe_user.0.as_ref().map(NavUser::from),
        communities: lookup.data().cloned().unwrap_or_default(),
        error: lookup.error().map(str::to_string),
    })
    .into_response()
}
