pub mod assets;
pub mod auth;
pub mod communities;
pub mod create;
pub mod graphql;
pub mod home;
pub mod media;

use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::auth::handlers;
use crate::state::AppState;

/// Multipart overhead allowed on top of the image itself.
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

/// Build the application router.
pub fn app(state: AppState) -> Router {
    let body_limit = state.config.posts.max_image_bytes + FORM_OVERHEAD_BYTES;

    let mut app = Router::new()
        .route("/", get(home::index))
        .route("/create", get(create::page).post(create::submit))
        .route("/communities", get(communities::index))
        .route("/media/{*path}", get(media::serve))
        .route("/assets/{*path}", get(assets::serve))
        .merge(auth::router())
        .merge(graphql::router());

    // Test-only seed endpoint: creates a user + session + community
    if std::env::var("DEVCONNECT_TEST_SEED").is_ok() {
        app = app.route("/test/seed", get(handlers::test_seed));
    }

    app.layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
