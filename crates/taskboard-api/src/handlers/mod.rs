pub mod activity;
pub mod auth;
pub mod health;
pub mod section;
pub mod task;
pub mod workspace;

use serde::Deserialize;

/// `?include_archived=true` on list endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    #[serde(default)]
    pub include_archived: bool,
}
