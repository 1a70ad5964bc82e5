use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use taskboard_core::{Event, Permissions, Section, Task, User, Workspace, WorkspaceMember};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserRecord {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl From<UserRecord> for User {
    fn from(r: UserRecord) -> Self {
        User {
            id: r.id,
            email: r.email,
            display_name: r.display_name,
            password_hash: r.password_hash,
            created_at: r.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WorkspaceRecord {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub owner_id: Uuid,
    pub is_archived: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<WorkspaceRecord> for Workspace {
    fn from(r: WorkspaceRecord) -> Self {
        Workspace {
            id: r.id,
            name: r.name,
            description: r.description,
            owner_id: r.owner_id,
            is_archived: r.is_archived,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MemberRecord {
    pub workspace_id: Uuid,
    pub user_id: Uuid,
    pub can_read: bool,
    pub can_write: bool,
    pub can_delete: bool,
    pub can_admin: bool,
    pub joined_at: DateTime<Utc>,
}

impl From<MemberRecord> for WorkspaceMember {
    fn from(r: MemberRecord) -> Self {
        WorkspaceMember {
            workspace_id: r.workspace_id,
            user_id: r.user_id,
            permissions: Permissions {
                read: r.can_read,
                write: r.can_write,
                delete: r.can_delete,
                admin: r.can_admin,
            },
            joined_at: r.joined_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SectionRecord {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub name: String,
    pub position: i32,
    pub is_archived: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<SectionRecord> for Section {
    fn from(r: SectionRecord) -> Self {
        Section {
            id: r.id,
            workspace_id: r.workspace_id,
            name: r.name,
            position: r.position,
            is_archived: r.is_archived,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TaskRecord {
    pub id: Uuid,
    pub section_id: Uuid,
    pub workspace_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: String,
    pub priority: String,
    pub assignee_id: Option<Uuid>,
    pub due_date: Option<NaiveDate>,
    pub position: i32,
    pub is_archived: bool,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl TryFrom<TaskRecord> for Task {
    type Error = taskboard_core::Error;

    fn try_from(r: TaskRecord) -> Result<Self, Self::Error> {
        Ok(Task {
            id: r.id,
            section_id: r.section_id,
            workspace_id: r.workspace_id,
            title: r.title,
            description: r.description,
            status: r.status.parse()?,
            priority: r.priority.parse()?,
            assignee_id: r.assignee_id,
            due_date: r.due_date,
            position: r.position,
            is_archived: r.is_archived,
            created_by: r.created_by,
            created_at: r.created_at,
            updated_at: r.updated_at,
            completed_at: r.completed_at,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EventRecord {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub actor_id: Uuid,
    pub kind: String,
    pub entity_type: String,
    pub entity_id: Uuid,
    pub summary: String,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<EventRecord> for Event {
    type Error = taskboard_core::Error;

    fn try_from(r: EventRecord) -> Result<Self, Self::Error> {
        Ok(Event {
            id: r.id,
            workspace_id: r.workspace_id,
            actor_id: r.actor_id,
            kind: r.kind.parse()?,
            entity_type: r.entity_type.parse()?,
            entity_id: r.entity_id,
            summary: r.summary,
            payload: r.payload,
            created_at: r.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_member_record_maps_flags() {
        let record = MemberRecord {
            workspace_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            can_read: true,
            can_write: true,
            can_delete: false,
            can_admin: false,
            joined_at: Utc::now(),
        };
        let member = WorkspaceMember::from(record);
        assert_eq!(member.permissions, Permissions::editor());
    }

    #[test]
    fn test_task_record_rejects_unknown_status() {
        let record = TaskRecord {
            id: Uuid::new_v4(),
            section_id: Uuid::new_v4(),
            workspace_id: Uuid::new_v4(),
            title: "T".to_string(),
            description: None,
            status: "blocked".to_string(),
            priority: "high".to_string(),
            assignee_id: None,
            due_date: None,
            position: 0,
            is_archived: false,
            created_by: Uuid::new_v4(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            completed_at: None,
        };
        assert!(Task::try_from(record).is_err());
    }
}
