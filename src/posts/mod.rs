//! Creating posts: the form, its validation, the image preview and the
//! upload-then-insert submission.

mod composer;
mod drafts;
mod form;
pub mod preview;
mod publish;

pub use self::composer::{Composer, MutationStatus, PostWorkflow, Redirect, SubmitOutcome};
pub use self::drafts::DraftStore;
pub use self::form::{ImageFile, PostForm, PostInput, ValidationError};
pub use self::publish::{storage_path, PostPublisher, SubmitError};
