use bytes::Bytes;

use super::preview;
use crate::db::models::SessionUser;

/// An image picked on the post form, held until it is uploaded.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageFile {
    pub name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

/// What the submission pipeline receives once the form has been validated.
#[derive(Debug, Clone, PartialEq)]
pub struct PostInput {
    pub title: String,
    pub content: String,
    pub avatar_url: Option<String>,
    pub community_id: Option<i64>,
}

/// Client-side checks, reported before anything is sent to the backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("You must be logged in to create a post")]
    NotLoggedIn,

    #[error("Please select an image")]
    ImageRequired,

    #[error("Please fill in all fields")]
    MissingFields,

    #[error("Content exceeds character limit")]
    ContentTooLong { length: usize, max: usize },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostForm {
    pub title: String,
    pub content: String,
    pub image: Option<ImageFile>,
    pub image_preview: Option<String>,
    pub community_id: Option<i64>,
}

impl PostForm {
    /// Content length as counted against the limit, in UTF-16 code units
    /// the way browsers measure text fields. Characters outside the Basic
    /// Multilingual Plane, most emoji among them, count twice.
    pub fn char_count(&self) -> usize {
        self.content.encode_utf16().count()
    }

    pub fn is_over_limit(&self, max_chars: usize) -> bool {
        self.char_count() > max_chars
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Apply the raw value of the community select. Anything that is not an id
    /// means "none selected".
    pub fn select_community(&mut self, raw: &str) {
        self.community_id = raw.trim().parse().ok();
    }

    /// Keep the picked file and derive its preview.
    pub async fn select_image(&mut self, file: ImageFile) {
        self.image_preview = preview::render_preview(&file).await;
        self.image = Some(file);
    }

    /// Run the pre-flight checks in order, stopping at the first failure.
    pub fn validate(
        &self,
        user: Option<&SessionUser>,
        max_chars: usize,
    ) -> Result<PostInput, ValidationError> {
        let user = user.ok_or(ValidationError::NotLoggedIn)?;

        if self.image.is_none() {
            return Err(ValidationError::ImageRequired);
        }

        if self.title.trim().is_empty() || self.content.trim().is_empty() {
            return Err(ValidationError::MissingFields);
        }

        let length = self.char_count();
        if length > max_chars {
            return Err(ValidationError::ContentTooLong {
                length,
                max: max_chars,
            });
        }

        Ok(PostInput {
            title: self.title.clone(),
            content: self.content.clone(),
            avatar_url: user.metadata.avatar_url.clone(),
            community_id: self.community_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::UserMetadata;

    const MAX: usize = 500;

    fn user() -> SessionUser {
        SessionUser {
            id: "u1".into(),
            email: "ada@example.com".into(),
            metadata: UserMetadata {
                avatar_url: Some("https://avatars.example.com/ada.png".into()),
                display_name: Some("ada".into()),
            },
        }
    }

    fn image() -> ImageFile {
        ImageFile {
            name: "cat.png".into(),
            content_type: Some("image/png".into()),
            bytes: Bytes::from_static(b"\x89PNG"),
        }
    }

    fn filled_form() -> PostForm {
        PostForm {
            title: "Hello World".into(),
            content: "First post!".into(),
            image: Some(image()),
            image_preview: None,
            community_id: None,
        }
    }

    #[test]
    fn valid_form_produces_input_with_avatar() {
        let input = filled_form().validate(Some(&user()), MAX).unwrap();
        assert_eq!(input.title, "Hello World");
        assert_eq!(input.content, "First post!");
        assert_eq!(
            input.avatar_url.as_deref(),
            Some("https://avatars.example.com/ada.png")
        );
        assert_eq!(input.community_id, None);
    }

    #[test]
    fn missing_user_is_checked_first() {
        let form = PostForm::default();
        assert_eq!(form.validate(None, MAX), Err(ValidationError::NotLoggedIn));
    }

    #[test]
    fn missing_image_is_checked_before_fields() {
        let form = PostForm {
            image: None,
            title: String::new(),
            ..filled_form()
        };
        assert_eq!(
            form.validate(Some(&user()), MAX),
            Err(ValidationError::ImageRequired)
        );
    }

    #[test]
    fn whitespace_only_fields_are_rejected() {
        for (title, content) in [("   ", "body"), ("title", "\n\t "), ("", "")] {
            let form = PostForm {
                title: title.into(),
                content: content.into(),
                ..filled_form()
            };
            assert_eq!(
                form.validate(Some(&user()), MAX),
                Err(ValidationError::MissingFields)
            );
        }
    }

    #[test]
    fn content_limit_is_inclusive() {
        let at_limit = PostForm {
            content: "x".repeat(MAX),
            ..filled_form()
        };
        assert!(at_limit.validate(Some(&user()), MAX).is_ok());

        let over = PostForm {
            content: "x".repeat(MAX + 1),
            ..filled_form()
        };
        assert_eq!(
            over.validate(Some(&user()), MAX),
            Err(ValidationError::ContentTooLong {
                length: 501,
                max: 500
            })
        );
        assert!(over.is_over_limit(MAX));
    }

    #[test]
    fn content_limit_counts_utf16_units() {
        // Multi-byte but single-unit characters count once
        let accented = PostForm {
            content: "é".repeat(MAX),
            ..filled_form()
        };
        assert_eq!(accented.char_count(), MAX);
        assert!(accented.validate(Some(&user()), MAX).is_ok());

        // Astral-plane characters take a surrogate pair each
        let emoji = PostForm {
            content: "😀".repeat(251),
            ..filled_form()
        };
        assert_eq!(emoji.char_count(), 502);
        assert!(emoji.is_over_limit(MAX));
        assert_eq!(
            emoji.validate(Some(&user()), MAX),
            Err(ValidationError::ContentTooLong {
                length: 502,
                max: MAX
            })
        );

        let at_limit = PostForm {
            content: "😀".repeat(250),
            ..filled_form()
        };
        assert!(at_limit.validate(Some(&user()), MAX).is_ok());
    }

    #[test]
    fn community_selection_parses_ids() {
        let mut form = PostForm::default();
        form.select_community("42");
        assert_eq!(form.community_id, Some(42));
        form.select_community("");
        assert_eq!(form.community_id, None);
        form.select_community("rust");
        assert_eq!(form.community_id, None);
    }

    #[test]
    fn reset_clears_every_field() {
        let mut form = PostForm {
            image_preview: Some("data:image/png;base64,AAAA".into()),
            community_id: Some(3),
            ..filled_form()
        };
        form.reset();
        assert_eq!(form, PostForm::default());
    }

    #[tokio::test]
    async fn select_image_derives_preview() {
        let mut form = PostForm::default();
        form.select_image(image()).await;
        assert!(form.image.is_some());
        assert_eq!(
            form.image_preview.as_deref(),
            Some("data:image/png;base64,iVBORw==")
        );
    }
}
