use std::time::Duration;
use tokio::sync::Mutex;

use super::form::{ImageFile, PostForm, PostInput, ValidationError};
use super::publish::{PostPublisher, SubmitError};
use crate::cache::{QueryCache, QueryKey};
use crate::db::models::{Post, SessionUser};

/// Lifecycle of the submission started from one form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum MutationStatus {
    #[default]
    Idle,
    Pending,
    Success,
    Error(String),
}

impl MutationStatus {
    pub fn is_pending(&self) -> bool {
        matches!(self, MutationStatus::Pending)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, MutationStatus::Success)
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            MutationStatus::Error(message) => Some(message),
            _ => None,
        }
    }

    /// A new submission may start only from a fresh or failed form.
    pub fn accepts_submit(&self) -> bool {
        matches!(self, MutationStatus::Idle | MutationStatus::Error(_))
    }
}

/// Where to send the user once a post has been created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub to: &'static str,
    pub after: Duration,
}

#[derive(Debug)]
pub enum SubmitOutcome {
    /// Pre-flight check failed; nothing was sent.
    Rejected(ValidationError),
    /// A submission from this form is in flight or has just succeeded.
    Busy,
    Failed(SubmitError),
    Created { posts: Vec<Post>, redirect: Redirect },
}

/// The data a started submission works on, detached from the form.
#[derive(Debug, Clone)]
pub(crate) struct Submission {
    input: PostInput,
    image: Option<ImageFile>,
}

/// One post form instance: its fields plus the status of its submission.
#[derive(Debug, Default)]
pub struct Composer {
    pub form: PostForm,
    status: MutationStatus,
}

impl Composer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> &MutationStatus {
        &self.status
    }

    /// Whether the submit control is interactive.
    pub fn can_submit(&self, max_chars: usize) -> bool {
        self.status.accepts_submit() && !self.form.is_over_limit(max_chars)
    }

    /// Validate the form and mark the submission as pending.
    pub(crate) fn begin(
        &mut self,
        user: Option<&SessionUser>,
        max_chars: usize,
    ) -> Result<Submission, SubmitOutcome> {
        if !self.status.accepts_submit() {
            return Err(SubmitOutcome::Busy);
        }

        let input = self
            .form
            .validate(user, max_chars)
            .map_err(SubmitOutcome::Rejected)?;

        self.status = MutationStatus::Pending;
        Ok(Submission {
            input,
            image: self.form.image.clone(),
        })
    }

    /// Apply the result of a submission started with `begin`.
    pub(crate) async fn complete(
        &mut self,
        result: Result<Vec<Post>, SubmitError>,
        cache: &QueryCache,
        redirect_delay: Duration,
    ) -> SubmitOutcome {
        match result {
            Ok(posts) => {
                self.form.reset();
                cache.invalidate(QueryKey::Posts).await;
                self.status = MutationStatus::Success;
                SubmitOutcome::Created {
                    posts,
                    redirect: Redirect {
                        to: "/",
                        after: redirect_delay,
                    },
                }
            }
            Err(e) => {
                self.status = MutationStatus::Error(e.to_string());
                SubmitOutcome::Failed(e)
            }
        }
    }
}

/// The post submission workflow: validation, upload, insert, feed
/// invalidation and the redirect home.
#[derive(Clone)]
pub struct PostWorkflow {
    publisher: PostPublisher,
    cache: QueryCache,
    max_chars: usize,
    redirect_delay: Duration,
}

impl PostWorkflow {
    pub fn new(
        publisher: PostPublisher,
        cache: QueryCache,
        max_chars: usize,
        redirect_delay: Duration,
    ) -> Self {
        Self {
            publisher,
            cache,
            max_chars,
            redirect_delay,
        }
    }

    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    pub async fn submit(
        &self,
        composer: &mut Composer,
        user: Option<&SessionUser>,
    ) -> SubmitOutcome {
        let submission = match composer.begin(user, self.max_chars) {
            Ok(submission) => submission,
            Err(outcome) => return outcome,
        };

        let result = self.run(&submission).await;
        composer
            .complete(result, &self.cache, self.redirect_delay)
            .await
    }

    /// Submit a form that other requests can reach. The lock is released
    /// while the backend calls run, so concurrent submits see `Pending` and
    /// are turned away instead of queueing.
    pub async fn submit_shared(
        &self,
        slot: &Mutex<Composer>,
        user: Option<&SessionUser>,
    ) -> SubmitOutcome {
        let submission = {
            let mut composer = slot.lock().await;
            match composer.begin(user, self.max_chars) {
                Ok(submission) => submission,
                Err(outcome) => return outcome,
            }
        };

        let result = self.run(&submission).await;

        let mut composer = slot.lock().await;
        composer
            .complete(result, &self.cache, self.redirect_delay)
            .await
    }

    async fn run(&self, submission: &Submission) -> Result<Vec<Post>, SubmitError> {
        tracing::info!(title = %submission.input.title, "Submitting post");

        let result = self
            .publisher
            .upload_post(&submission.input, submission.image.as_ref())
            .await;

        match &result {
            Ok(rows) => tracing::info!(count = rows.len(), "Post created"),
            Err(e) => tracing::warn!("Post submission failed: {}", e),
        }
        result
    }
}
