use async_trait::async_trait;
use taskboard_core::{
    Event, Result, Section, Store, StoreStats, Task, TaskPatch, User, Workspace, WorkspaceMember,
};
use uuid::Uuid;

use crate::Database;

#[async_trait]
impl Store for Database {
    async fn ping(&self) -> Result<()> {
        Ok(Database::ping(self).await?)
    }

    async fn create_user(&self, user: &User) -> Result<()> {
        Ok(Database::create_user(self, user).await?)
    }

    async fn get_user(&self, user_id: Uuid) -> Result<Option<User>> {
        Ok(Database::get_user(self, user_id).await?.map(User::from))
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(Database::find_user_by_email(self, email).await?.map(User::from))
    }

    async fn create_workspace(&self, workspace: &Workspace, owner: &WorkspaceMember) -> Result<()> {
        Ok(Database::create_workspace(self, workspace, owner).await?)
    }

    async fn get_workspace(&self, workspace_id: Uuid) -> Result<Option<Workspace>> {
        Ok(Database::get_workspace(self, workspace_id)
            .await?
            .map(Workspace::from))
    }

    async fn list_workspaces_for_user(&self, user_id: Uuid) -> Result<Vec<Workspace>> {
        let records = Database::list_workspaces_for_user(self, user_id).await?;
        Ok(records.into_iter().map(Workspace::from).collect())
    }

    async fn update_workspace(&self, workspace: &Workspace) -> Result<()> {
        Ok(Database::update_workspace(self, workspace).await?)
    }

    async fn get_member(&self, workspace_id: Uuid, user_id: Uuid) -> Result<Option<WorkspaceMember>> {
        Ok(Database::get_member(self, workspace_id, user_id)
            .await?
            .map(WorkspaceMember::from))
    }

    async fn list_members(&self, workspace_id: Uuid) -> Result<Vec<WorkspaceMember>> {
        let records = Database::list_members(self, workspace_id).await?;
        Ok(records.into_iter().map(WorkspaceMember::from).collect())
    }

    async fn upsert_member(&self, member: &WorkspaceMember) -> Result<()> {
        Ok(Database::upsert_member(self, member).await?)
    }

    async fn remove_member(&self, workspace_id: Uuid, user_id: Uuid) -> Result<bool> {
        Ok(Database::remove_member(self, workspace_id, user_id).await?)
    }

    async fn insert_section(&self, section: Section) -> Result<Section> {
        Ok(Database::insert_section(self, &section).await?.into())
    }

    async fn get_section(&self, section_id: Uuid) -> Result<Option<Section>> {
        Ok(Database::get_section(self, section_id).await?.map(Section::from))
    }

    async fn list_sections(&self, workspace_id: Uuid, include_archived: bool) -> Result<Vec<Section>> {
        let records = Database::list_sections(self, workspace_id, include_archived).await?;
        Ok(records.into_iter().map(Section::from).collect())
    }

    async fn rename_section(&self, section_id: Uuid, name: &str) -> Result<Section> {
        Ok(Database::rename_section(self, section_id, name).await?.into())
    }

    async fn archive_section(&self, section_id: Uuid) -> Result<Section> {
        Ok(Database::archive_section(self, section_id).await?.into())
    }

    async fn unarchive_section(&self, section_id: Uuid) -> Result<Section> {
        Ok(Database::unarchive_section(self, section_id).await?.into())
    }

    async fn move_section(&self, section_id: Uuid, position: i32) -> Result<Section> {
        Ok(Database::move_section(self, section_id, position).await?.into())
    }

    async fn insert_task(&self, task: Task, position: Option<i32>) -> Result<Task> {
        Database::insert_task(self, &task, position).await?.try_into()
    }

    async fn get_task(&self, task_id: Uuid) -> Result<Option<Task>> {
        Database::get_task(self, task_id)
            .await?
            .map(Task::try_from)
            .transpose()
    }

    async fn list_tasks(&self, section_id: Uuid, include_archived: bool) -> Result<Vec<Task>> {
        Database::list_tasks(self, section_id, include_archived)
            .await?
            .into_iter()
            .map(Task::try_from)
            .collect()
    }

    async fn update_task(&self, task_id: Uuid, patch: &TaskPatch) -> Result<Task> {
        Database::update_task(self, task_id, patch).await?.try_into()
    }

    async fn archive_task(&self, task_id: Uuid) -> Result<Task> {
        Database::archive_task(self, task_id).await?.try_into()
    }

    async fn unarchive_task(&self, task_id: Uuid) -> Result<Task> {
        Database::unarchive_task(self, task_id).await?.try_into()
    }

    async fn move_task(&self, task_id: Uuid, section_id: Uuid, position: i32) -> Result<Task> {
        Database::move_task(self, task_id, section_id, position)
            .await?
            .try_into()
    }

    async fn delete_task(&self, task_id: Uuid) -> Result<()> {
        Ok(Database::delete_task(self, task_id).await?)
    }

    async fn record_event(&self, event: &Event) -> Result<()> {
        Ok(Database::record_event(self, event).await?)
    }

    async fn list_events(&self, workspace_id: Uuid) -> Result<Vec<Event>> {
        Database::list_events(self, workspace_id)
            .await?
            .into_iter()
            .map(Event::try_from)
            .collect()
    }

    async fn stats(&self) -> Result<StoreStats> {
        Ok(Database::get_aggregate_stats(self).await?)
    }
}
