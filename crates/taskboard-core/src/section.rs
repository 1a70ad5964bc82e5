use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Ordered container of tasks inside a workspace.
///
/// Active sections of a workspace hold positions `0..n-1`; archived sections
/// are parked at `-1` until they are restored at the end of the list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Section {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub name: String,
    pub position: i32,
    pub is_archived: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Section {
    pub fn new(workspace_id: Uuid, name: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            workspace_id,
            name,
            position: 0,
            is_archived: false,
            created_at: now,
            updated_at: now,
        }
    }
}
