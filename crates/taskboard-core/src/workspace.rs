use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workspace {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub owner_id: Uuid,
    pub is_archived: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Workspace {
    pub fn new(name: String, description: Option<String>, owner_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name,
            description,
            owner_id,
            is_archived: false,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Per-member permission flags. `admin` implies the other three.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permissions {
    #[serde(default)]
    pub read: bool,
    #[serde(default)]
    pub write: bool,
    #[serde(default)]
    pub delete: bool,
    #[serde(default)]
    pub admin: bool,
}

impl Permissions {
    pub fn owner() -> Self {
        Self {
            read: true,
            write: true,
            delete: true,
            admin: true,
        }
    }

    pub fn editor() -> Self {
        Self {
            read: true,
            write: true,
            delete: false,
            admin: false,
        }
    }

    pub fn viewer() -> Self {
        Self {
            read: true,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceMember {
    pub workspace_id: Uuid,
    pub user_id: Uuid,
    pub permissions: Permissions,
    pub joined_at: DateTime<Utc>,
}

impl WorkspaceMember {
    pub fn new(workspace_id: Uuid, user_id: Uuid, permissions: Permissions) -> Self {
        Self {
            workspace_id,
            user_id,
            permissions,
            joined_at: Utc::now(),
        }
    }
}
