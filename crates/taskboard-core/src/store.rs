use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::board::TaskPatch;
use crate::{Event, Result, Section, Task, User, Workspace, WorkspaceMember};

/// Persistence seam used by [`crate::Board`].
///
/// Repositioning operations (`archive_*`, `unarchive_*`, `move_*`,
/// `delete_task`, `insert_*`) must be atomic: after each call the active
/// items of every touched container are numbered `0..n-1`.
#[async_trait]
pub trait Store: Send + Sync {
    /// Cheap round trip used by the health endpoint.
    async fn ping(&self) -> Result<()>;

    // Users
    async fn create_user(&self, user: &User) -> Result<()>;
    async fn get_user(&self, user_id: Uuid) -> Result<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;

    // Workspaces
    async fn create_workspace(&self, workspace: &Workspace, owner: &WorkspaceMember) -> Result<()>;
    async fn get_workspace(&self, workspace_id: Uuid) -> Result<Option<Workspace>>;
    async fn list_workspaces_for_user(&self, user_id: Uuid) -> Result<Vec<Workspace>>;
    async fn update_workspace(&self, workspace: &Workspace) -> Result<()>;

    // Members
    async fn get_member(&self, workspace_id: Uuid, user_id: Uuid) -> Result<Option<WorkspaceMember>>;
    async fn list_members(&self, workspace_id: Uuid) -> Result<Vec<WorkspaceMember>>;
    async fn upsert_member(&self, member: &WorkspaceMember) -> Result<()>;
    async fn remove_member(&self, workspace_id: Uuid, user_id: Uuid) -> Result<bool>;

    // Sections
    /// Appends the section after the workspace's active sections.
    async fn insert_section(&self, section: Section) -> Result<Section>;
    async fn get_section(&self, section_id: Uuid) -> Result<Option<Section>>;
    async fn list_sections(&self, workspace_id: Uuid, include_archived: bool) -> Result<Vec<Section>>;
    async fn rename_section(&self, section_id: Uuid, name: &str) -> Result<Section>;
    async fn archive_section(&self, section_id: Uuid) -> Result<Section>;
    async fn unarchive_section(&self, section_id: Uuid) -> Result<Section>;
    async fn move_section(&self, section_id: Uuid, position: i32) -> Result<Section>;

    // Tasks
    /// Inserts the task at `position` (clamped) or appends it.
    async fn insert_task(&self, task: Task, position: Option<i32>) -> Result<Task>;
    async fn get_task(&self, task_id: Uuid) -> Result<Option<Task>>;
    async fn list_tasks(&self, section_id: Uuid, include_archived: bool) -> Result<Vec<Task>>;
    /// Applies `patch` to the current row atomically.
    async fn update_task(&self, task_id: Uuid, patch: &TaskPatch) -> Result<Task>;
    async fn archive_task(&self, task_id: Uuid) -> Result<Task>;
    async fn unarchive_task(&self, task_id: Uuid) -> Result<Task>;
    async fn move_task(&self, task_id: Uuid, section_id: Uuid, position: i32) -> Result<Task>;
    async fn delete_task(&self, task_id: Uuid) -> Result<()>;

    // Activity
    async fn record_event(&self, event: &Event) -> Result<()>;
    async fn list_events(&self, workspace_id: Uuid) -> Result<Vec<Event>>;

    async fn stats(&self) -> Result<StoreStats>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    pub users: i64,
    pub workspaces: i64,
    pub sections: i64,
    pub tasks: i64,
    pub completed_tasks: i64,
    pub events: i64,
}
