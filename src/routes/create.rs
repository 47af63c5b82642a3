use std::sync::Arc;

use askama::Template;
use axum::extract::{Multipart, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use tokio::sync::Mutex;

use crate::cache::QueryState;
use crate::communities::{self, CommunitySelect};
use crate::db::models::{Community, SessionUser};
use crate::error::AppResult;
use crate::extractors::MaybeUser;
use crate::posts::{Composer, ImageFile, SubmitOutcome};
use crate::routes::home::{Html, NavUser};
use crate::state::AppState;

#[derive(Template)]
#[template(path = "pages/create_post.html")]
pub struct CreatePostTemplate {
    pub user: Option<NavUser>,
    pub title: String,
    pub content: String,
    pub char_count: usize,
    pub max_chars: usize,
    pub over_limit: bool,
    pub locked: bool,
    pub image_name: Option<String>,
    pub image_preview: Option<String>,
    pub communities: CommunitySelect,
    pub button: SubmitButton,
    pub notice: Option<String>,
    pub success: bool,
    pub error: Option<String>,
}

pub struct SubmitButton {
    pub label: &'static str,
    pub disabled: bool,
    pub over_limit: bool,
}

impl SubmitButton {
    pub fn for_composer(composer: &Composer, max_chars: usize) -> Self {
        let status = composer.status();
        let over_limit = composer.form.is_over_limit(max_chars);

        let label = if over_limit {
            "Too Long to Post"
        } else if status.is_pending() {
            "Creating..."
        } else if status.is_success() {
            "Post Created!"
        } else {
            "Create Post"
        };

        Self {
            label,
            disabled: !composer.can_submit(max_chars),
            over_limit,
        }
    }
}

impl CreatePostTemplate {
    fn build(
        composer: &Composer,
        user: Option<&SessionUser>,
        communities: &QueryState<Vec<Community>>,
        max_chars: usize,
        notice: Option<String>,
    ) -> Self {
        let form = &composer.form;
        let status = composer.status();

        Self {
            // Only shown with an avatar, like the "Posting as" card itself
            user: user
                .filter(|u| u.metadata.avatar_url.is_some())
                .map(NavUser::from),
            title: form.title.clone(),
            content: form.content.clone(),
            char_count: form.char_count(),
            max_chars,
            over_limit: form.is_over_limit(max_chars),
            locked: status.is_pending(),
            image_name: form.image.as_ref().map(|image| image.name.clone()),
            image_preview: form.image_preview.clone(),
            communities: CommunitySelect::new(communities, form.community_id),
            button: SubmitButton::for_composer(composer, max_chars),
            notice,
            success: status.is_success(),
            error: status.error().map(str::to_string),
        }
    }
}

/// Raw multipart fields of a post submission. Absent fields leave the draft
/// untouched.
#[derive(Default)]
struct SubmittedFields {
    title: Option<String>,
    content: Option<String>,
    community_id: Option<String>,
    image: Option<ImageFile>,
}

async fn read_fields(mut multipart: Multipart) -> AppResult<SubmittedFields> {
    let mut fields = SubmittedFields::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "title" => fields.title = Some(field.text().await?),
            "content" => fields.content = Some(field.text().await?),
            "community_id" => fields.community_id = Some(field.text().await?),
            "image" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await?;

                // Browsers send an empty part when no file was picked
                if !file_name.is_empty() && !bytes.is_empty() {
                    fields.image = Some(ImageFile {
                        name: file_name,
                        content_type,
                        bytes,
                    });
                }
            }
            other => tracing::debug!("Ignoring unknown form field: {}", other),
        }
    }

    Ok(fields)
}

async fn apply_fields(composer: &mut Composer, fields: SubmittedFields) {
    if let Some(title) = fields.title {
        composer.form.title = title;
    }
    if let Some(content) = fields.content {
        composer.form.content = content;
    }
    if let Some(raw) = fields.community_id {
        composer.form.select_community(&raw);
    }
    if let Some(image) = fields.image {
        composer.form.select_image(image).await;
    }
}

/// The form of a signed-in user, or a one-off form for anonymous visitors.
async fn composer_for(
    state: &AppState,
    user: Option<&SessionUser>,
    fresh: bool,
) -> Arc<Mutex<Composer>> {
    match user {
        Some(user) if fresh => state.drafts.open(&user.id).await,
        Some(user) => state.drafts.get(&user.id).await,
        None => Arc::new(Mutex::new(Composer::new())),
    }
}

/// GET /create
pub async fn page(State(state): State<AppState>, maybe_user: MaybeUser) -> Response {
    let user = maybe_user.0.as_ref();
    let slot = composer_for(&state, user, true).await;
    let communities =
        communities::cached_communities(state.backend.db.as_ref(), &state.cache).await;

    let composer = slot.lock().await;
    Html(CreatePostTemplate::build(
        &composer,
        user,
        &communities,
        state.workflow.max_chars(),
        None,
    ))
    .into_response()
}

/// POST /create
pub async fn submit(
    State(state): State<AppState>,
    maybe_user: MaybeUser,
    multipart: Multipart,
) -> AppResult<Response> {
    let user = maybe_user.0.as_ref();
    let fields = read_fields(multipart).await?;
    let slot = composer_for(&state, user, false).await;

    {
        let mut composer = slot.lock().await;
        // Inputs are locked while a submission is in flight or done
        if composer.status().accepts_submit() {
            apply_fields(&mut composer, fields).await;
        }
    }

    let outcome = state.workflow.submit_shared(&slot, user).await;
    let communities =
        communities::cached_communities(state.backend.db.as_ref(), &state.cache).await;

    let (status, notice, refresh) = match &outcome {
        SubmitOutcome::Created { redirect, .. } => (
            StatusCode::CREATED,
            None,
            Some(format!("{}; url={}", redirect.after.as_secs(), redirect.to)),
        ),
        SubmitOutcome::Rejected(e) => (StatusCode::UNPROCESSABLE_ENTITY, Some(e.to_string()), None),
        SubmitOutcome::Busy => (
            StatusCode::CONFLICT,
            Some("This post is already being submitted".to_string()),
            None,
        ),
        SubmitOutcome::Failed(_) => (StatusCode::BAD_GATEWAY, None, None),
    };

    let composer = slot.lock().await;
    let page = Html(CreatePostTemplate::build(
        &composer,
        user,
        &communities,
        state.workflow.max_chars(),
        notice,
    ));

    let response = match refresh {
        Some(refresh) => (status, [(header::REFRESH, refresh)], page).into_response(),
        None => (status, page).into_response(),
    };
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::posts::MutationStatus;

    fn composer_with(content: &str) -> Composer {
        let mut composer = Composer::new();
        composer.form.title = "Hello".into();
        composer.form.content = content.into();
        composer
    }

    #[test]
    fn button_reads_create_post_when_idle() {
        let button = SubmitButton::for_composer(&composer_with("hi"), 500);
        assert_eq!(button.label, "Create Post");
        assert!(!button.disabled);
    }

    #[test]
    fn button_reports_over_limit_content() {
        let button = SubmitButton::for_composer(&composer_with(&"a".repeat(501)), 500);
        assert_eq!(button.label, "Too Long to Post");
        assert!(button.disabled);
        assert!(button.over_limit);
    }

    #[test]
    fn button_stays_enabled_at_exact_limit() {
        let button = SubmitButton::for_composer(&composer_with(&"a".repeat(500)), 500);
        assert_eq!(button.label, "Create Post");
        assert!(!button.disabled);
    }

    #[test]
    fn page_without_user_has_no_posting_as_card() {
        let composer = Composer::new();
        let communities: QueryState<Vec<Community>> = QueryState::Failed("down".into());
        let html = CreatePostTemplate::build(&composer, None, &communities, 500, None)
            .render()
            .unwrap();

        assert!(!html.contains("Posting as"));
        assert!(html.contains("Error loading communities"));
        assert!(html.contains("Select a community (optional)"));
        assert!(html.contains("0 / 500"));
        assert_eq!(composer.status(), &MutationStatus::Idle);
    }

    #[test]
    fn page_shows_notice_and_avatar() {
        let composer = Composer::new();
        let user = SessionUser {
            id: "u1".into(),
            email: "ada@example.com".into(),
            metadata: crate::db::models::UserMetadata {
                avatar_url: Some("https://avatars.example.com/ada.png".into()),
                display_name: None,
            },
        };
        let communities: QueryState<Vec<Community>> = QueryState::Ready(Arc::new(Vec::new()));
        let html = CreatePostTemplate::build(
            &composer,
            Some(&user),
            &communities,
            500,
            Some("Please select an image".into()),
        )
        .render()
        .unwrap();

        assert!(html.contains("Posting as"));
        assert!(html.contains("ada@example.com"));
        assert!(html.contains("Please select an image"));
    }
}
