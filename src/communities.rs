use crate::backend::Database;
use crate::cache::{QueryCache, QueryKey, QueryState};
use crate::db::models::Community;

/// The community lookup behind the post form failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Error fetching communities: {0}")]
pub struct FetchFailed(pub String);

/// All communities, newest first.
pub async fn list_communities(db: &dyn Database) -> Result<Vec<Community>, FetchFailed> {
    db.list_communities()
        .await
        .map_err(|e| FetchFailed(e.to_string()))
}

/// [`list_communities`] through the query cache.
pub async fn cached_communities(db: &dyn Database, cache: &QueryCache) -> QueryState<Vec<Community>> {
    cache
        .fetch(QueryKey::Communities, || list_communities(db))
        .await
}

pub struct CommunityOption {
    pub id: i64,
    pub name: String,
    pub selected: bool,
}

/// Everything the community `<select>` needs. It always offers a "none
/// selected" option, whether or not the lookup succeeded.
pub struct CommunitySelect {
    pub placeholder: &'static str,
    pub options: Vec<CommunityOption>,
    pub warning: Option<&'static str>,
}

impl CommunitySelect {
    pub fn new(state: &QueryState<Vec<Community>>, selected: Option<i64>) -> Self {
        let options: Vec<CommunityOption> = state
            .data()
            .map(|communities| {
                communities
                    .iter()
                    .map(|c| CommunityOption {
                        id: c.id,
                        name: c.name.clone(),
                        selected: Some(c.id) == selected,
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            placeholder: "Select a community (optional)",
            options,
            warning: state.is_error().then_some("Error loading communities"),
        }
    }

    pub fn none_selected(&self) -> bool {
        !self.options.iter().any(|o| o.selected)
    }
}
