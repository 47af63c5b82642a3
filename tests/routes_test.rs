use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use tower::ServiceExt;

use devconnect::backend::{Backend, BackendCall, MemoryBackend};
use devconnect::config::Config;
use devconnect::db;
use devconnect::db::models::{SessionUser, UserMetadata};
use devconnect::routes;
use devconnect::state::AppState;

const TOKEN: &str = "test-session-token";
const BOUNDARY: &str = "devconnect-test-boundary";

fn app_with(memory: Arc<MemoryBackend>) -> Router {
    let pool = db::memory_pool().unwrap();
    db::run_migrations(&pool).unwrap();

    memory.add_session(
        TOKEN,
        SessionUser {
            id: "user-1".into(),
            email: "ada@example.com".into(),
            metadata: UserMetadata {
                avatar_url: Some("https://avatars.example.com/ada.png".into()),
                display_name: Some("Ada".into()),
            },
        },
    );

    let state = AppState::new(Config::default(), pool, Backend::memory(memory));
    routes::app(state)
}

fn multipart(fields: &[(&str, &str)], image: Option<(&str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((file_name, bytes)) = image {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"{file_name}\"\r\nContent-Type: image/png\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn create_request(body: Vec<u8>, signed_in: bool) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/create")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        );
    if signed_in {
        builder = builder.header(header::COOKIE, format!("devconnect_session={TOKEN}"));
    }
    builder.body(Body::from(body)).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::COOKIE, format!("devconnect_session={TOKEN}"))
        .body(Body::empty())
        .unwrap()
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn valid_post() -> Vec<u8> {
    multipart(
        &[
            ("title", "Hello World"),
            ("content", "First post!"),
            ("community_id", ""),
        ],
        Some(("cover.png", &b"\x89PNG\r\n\x1a\nfake"[..])),
    )
}

#[tokio::test]
async fn home_shows_tagline_and_new_posts() {
    let memory = Arc::new(MemoryBackend::new());
    let app = app_with(memory.clone());

    let response = app.clone().oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("Share ideas, build together, connect with developers worldwide..."));
    assert!(html.contains("No posts yet"));

    let response = app
        .clone()
        .oneshot(create_request(valid_post(), true))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    // The feed was cached empty above; creating a post invalidates it
    let html = body_text(app.oneshot(get("/")).await.unwrap()).await;
    assert!(html.contains("Hello World"));
    assert!(!html.contains("No posts yet"));
}

#[tokio::test]
async fn created_post_redirects_home() {
    let memory = Arc::new(MemoryBackend::new());
    let app = app_with(memory.clone());

    let response = app
        .oneshot(create_request(valid_post(), true))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(response.headers()[header::REFRESH], "2; url=/");
    let html = body_text(response).await;
    assert!(html.contains("Post created successfully! Redirecting..."));
    assert!(html.contains("Post Created!"));

    let posts = memory.posts();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].title, "Hello World");
    assert_eq!(
        posts[0].avatar_url.as_deref(),
        Some("https://avatars.example.com/ada.png")
    );
}

#[tokio::test]
async fn anonymous_submit_is_rejected() {
    let memory = Arc::new(MemoryBackend::new());
    let app = app_with(memory.clone());

    let response = app
        .oneshot(create_request(valid_post(), false))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body_text(response)
        .await
        .contains("You must be logged in to create a post"));
    assert!(memory
        .calls()
        .iter()
        .all(|call| !matches!(call, BackendCall::Upload { .. } | BackendCall::InsertPost { .. })));
}

#[tokio::test]
async fn over_limit_content_is_rejected_before_upload() {
    let memory = Arc::new(MemoryBackend::new());
    let app = app_with(memory.clone());
    let long = "a".repeat(501);

    let body = multipart(
        &[("title", "Hello World"), ("content", long.as_str())],
        Some(("cover.png", &b"png"[..])),
    );
    let response = app.oneshot(create_request(body, true)).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let html = body_text(response).await;
    assert!(html.contains("Content exceeds character limit"));
    assert!(html.contains("Too Long to Post"));
    assert!(html.contains("501 / 500"));
    assert_eq!(memory.object_count(), 0);
    assert!(memory.posts().is_empty());
}

#[tokio::test]
async fn upload_failure_keeps_the_form_filled() {
    let memory = Arc::new(MemoryBackend::new());
    memory.fail_uploads("quota exceeded");
    let app = app_with(memory.clone());

    let response = app
        .oneshot(create_request(valid_post(), true))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let html = body_text(response).await;
    assert!(html.contains("Error creating post"));
    assert!(html.contains("Error uploading image: quota exceeded"));
    assert!(html.contains("value=\"Hello World\""));
    assert!(html.contains("First post!"));
    assert!(html.contains("Selected: cover.png"));
    assert!(memory.posts().is_empty());
}

#[tokio::test]
async fn resubmitting_a_created_post_conflicts_until_reopened() {
    let memory = Arc::new(MemoryBackend::new());
    let app = app_with(memory.clone());

    let first = app
        .clone()
        .oneshot(create_request(valid_post(), true))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::CREATED);

    let again = app
        .clone()
        .oneshot(create_request(valid_post(), true))
        .await
        .unwrap();
    assert_eq!(again.status(), StatusCode::CONFLICT);
    assert_eq!(memory.posts().len(), 1);

    let page = app.clone().oneshot(get("/create")).await.unwrap();
    assert_eq!(page.status(), StatusCode::OK);
    assert!(body_text(page).await.contains("Create Post"));

    let body = multipart(
        &[("title", "Hello again"), ("content", "Second post")],
        Some(("second.png", &b"png"[..])),
    );
    let third = app
        .oneshot(create_request(body, true))
        .await
        .unwrap();
    assert_eq!(third.status(), StatusCode::CREATED);
    assert_eq!(memory.posts().len(), 2);
}

#[tokio::test]
async fn community_outage_still_renders_the_select() {
    let memory = Arc::new(MemoryBackend::new());
    memory.fail_community_fetches("connection refused");
    let app = app_with(memory.clone());

    let response = app
        .clone()
        .oneshot(get("/create"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("<option value=\"\" selected>Select a community (optional)</option>"));
    assert!(html.contains("Error loading communities"));
    assert!(html.contains("Posting as"));

    let response = app
        .oneshot(create_request(valid_post(), true))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn selected_community_is_stored_with_the_post() {
    let memory = Arc::new(MemoryBackend::new());
    let rust = memory.add_community("rust");
    let app = app_with(memory.clone());
    let community_id = rust.id.to_string();

    let body = multipart(
        &[
            ("title", "Borrowck"),
            ("content", "Lifetimes are fine actually"),
            ("community_id", community_id.as_str()),
        ],
        Some(("crab.png", &b"png"[..])),
    );
    let response = app.oneshot(create_request(body, true)).await.unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(memory.posts()[0].community_id, Some(rust.id));
}

#[tokio::test]
async fn communities_page_lists_communities() {
    let memory = Arc::new(MemoryBackend::new());
    memory.add_community("rust");
    memory.add_community("webdev");
    let app = app_with(memory);

    let response = app.oneshot(get("/communities")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("rust"));
    assert!(html.contains("webdev"));
}

#[tokio::test]
async fn graphql_lists_posts() {
    let memory = Arc::new(MemoryBackend::new());
    let app = app_with(memory.clone());

    app.clone()
        .oneshot(create_request(valid_post(), true))
        .await
        .unwrap();

    let request = Request::builder()
        .method("POST")
        .uri("/graphql")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"query":"{ posts(limit: 10) { title content } }"}"#))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(json["data"]["posts"][0]["title"], "Hello World");
    assert_eq!(json["data"]["posts"][0]["content"], "First post!");
}

#[tokio::test]
async fn logout_ends_the_session() {
    let memory = Arc::new(MemoryBackend::new());
    let app = app_with(memory.clone());

    let request = Request::builder()
        .method("POST")
        .uri("/auth/logout")
        .header(header::COOKIE, format!("devconnect_session={TOKEN}"))
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/");
    let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
    assert!(cookie.contains("Max-Age=0"));

    // The token no longer resolves to a user
    let response = app
        .oneshot(create_request(valid_post(), true))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn media_rejects_paths_outside_the_upload_dir() {
    let app = app_with(Arc::new(MemoryBackend::new()));

    let response = app
        .clone()
        .oneshot(get("/media/post-images/../../etc/passwd"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app.oneshot(get("/assets/css/missing.css")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn uploaded_markup_is_never_served_as_html() {
    let tmp = tempfile::tempdir().unwrap();
    let bucket = tmp.path().join("post-images");
    std::fs::create_dir_all(&bucket).unwrap();
    std::fs::write(
        bucket.join("evil-1-evil.html"),
        "<script>alert(document.domain)</script>",
    )
    .unwrap();
    std::fs::write(bucket.join("cat-1-cat.png"), b"\x89PNG").unwrap();

    let pool = db::memory_pool().unwrap();
    db::run_migrations(&pool).unwrap();
    let mut config = Config::default();
    config.storage.path = Some(tmp.path().to_path_buf());
    let memory = Arc::new(MemoryBackend::new());
    let app = routes::app(AppState::new(config, pool, Backend::memory(memory)));

    let response = app
        .clone()
        .oneshot(get("/media/post-images/evil-1-evil.html"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers[header::CONTENT_TYPE], "application/octet-stream");
    assert_eq!(headers[header::CONTENT_DISPOSITION], "attachment");
    assert_eq!(headers[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
    assert_eq!(headers[header::CONTENT_SECURITY_POLICY], "sandbox");

    let response = app
        .oneshot(get("/media/post-images/cat-1-cat.png"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
    assert_eq!(response.headers()[header::CONTENT_SECURITY_POLICY], "sandbox");
}
