use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::Error;

macro_rules! string_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $text)] $variant,)+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(Error::Validation(format!(
                        concat!("unknown ", stringify!($name), ": {}"),
                        other
                    ))),
                }
            }
        }
    };
}

string_enum!(EventKind {
    WorkspaceCreated => "workspace.created",
    WorkspaceUpdated => "workspace.updated",
    WorkspaceArchived => "workspace.archived",
    MemberAdded => "member.added",
    MemberUpdated => "member.updated",
    MemberRemoved => "member.removed",
    SectionCreated => "section.created",
    SectionRenamed => "section.renamed",
    SectionMoved => "section.moved",
    SectionArchived => "section.archived",
    SectionUnarchived => "section.unarchived",
    TaskCreated => "task.created",
    TaskUpdated => "task.updated",
    TaskMoved => "task.moved",
    TaskArchived => "task.archived",
    TaskUnarchived => "task.unarchived",
    TaskDeleted => "task.deleted",
});

string_enum!(EntityType {
    Workspace => "workspace",
    Member => "member",
    Section => "section",
    Task => "task",
});

/// One entry of a workspace's activity feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub actor_id: Uuid,
    pub kind: EventKind,
    pub entity_type: EntityType,
    pub entity_id: Uuid,
    pub summary: String,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl Event {
    pub fn new(
        workspace_id: Uuid,
        actor_id: Uuid,
        kind: EventKind,
        entity_type: EntityType,
        entity_id: Uuid,
        summary: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            workspace_id,
            actor_id,
            kind,
            entity_type,
            entity_id,
            summary: summary.into(),
            payload: serde_json::Value::Null,
            created_at: Utc::now(),
        }
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}
