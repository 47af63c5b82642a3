use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::composer::Composer;

/// Post forms of signed-in users, one per user id.
///
/// The form outlives a single request so a failed submission can be corrected
/// and resubmitted without picking the image again.
#[derive(Clone, Default)]
pub struct DraftStore {
    drafts: Arc<Mutex<HashMap<String, Arc<Mutex<Composer>>>>>,
}

impl DraftStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The user's current form, created on first use.
    pub async fn get(&self, user_id: &str) -> Arc<Mutex<Composer>> {
        let mut drafts = self.drafts.lock().await;
        drafts
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(Composer::new())))
            .clone()
    }

    /// The form to show when the user opens the page. A form whose post was
    /// already created is replaced by a new one; a pending or failed form is
    /// kept as is.
    pub async fn open(&self, user_id: &str) -> Arc<Mutex<Composer>> {
        let slot = self.get(user_id).await;
        {
            let mut composer = slot.lock().await;
            if composer.status().is_success() {
                *composer = Composer::new();
            }
        }
        slot
    }

    pub async fn discard(&self, user_id: &str) {
        self.drafts.lock().await.remove(user_id);
    }
}
