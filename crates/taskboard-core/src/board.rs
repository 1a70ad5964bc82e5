use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use crate::activity::{self, ActivityPage, ActivityQuery, ExportFormat};
use crate::permission::{authorize, Action};
use crate::store::Store;
use crate::{
    validation, EntityType, Error, Event, EventKind, Permissions, Result, Section, Task,
    TaskPriority, TaskStatus, Workspace, WorkspaceMember,
};

pub const DEFAULT_MAX_EXPORT_ROWS: usize = 10_000;

/// Distinguishes "field absent" from "field set to null" in JSON patches.
fn double_option<'de, T, D>(deserializer: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkspacePatch {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MemberPatch {
    pub permissions: Permissions,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewTaskInput {
    pub title: String,
    pub description: Option<String>,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub priority: TaskPriority,
    pub assignee_id: Option<Uuid>,
    pub due_date: Option<NaiveDate>,
    /// Slot to insert at; appended when absent.
    pub position: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskPatch {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    #[serde(default, deserialize_with = "double_option")]
    pub assignee_id: Option<Option<Uuid>>,
    #[serde(default, deserialize_with = "double_option")]
    pub due_date: Option<Option<NaiveDate>>,
}

impl TaskPatch {
    /// Applies the set fields to `task` and returns their names.
    pub fn apply(&self, task: &mut Task) -> Result<Vec<&'static str>> {
        let mut changed = Vec::new();
        if let Some(ref title) = self.title {
            task.title = validation::name("title", title)?;
            changed.push("title");
        }
        if let Some(ref description) = self.description {
            task.description = validation::description(description.clone())?;
            changed.push("description");
        }
        if let Some(status) = self.status {
            task.set_status(status);
            changed.push("status");
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
            changed.push("priority");
        }
        if let Some(assignee) = self.assignee_id {
            task.assignee_id = assignee;
            changed.push("assignee_id");
        }
        if let Some(due_date) = self.due_date {
            task.due_date = due_date;
            changed.push("due_date");
        }
        Ok(changed)
    }
}

/// Workspace, section and task operations with permission checks and
/// activity recording.
#[derive(Clone)]
pub struct Board {
    store: Arc<dyn Store>,
    max_export_rows: usize,
}

impl Board {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            max_export_rows: DEFAULT_MAX_EXPORT_ROWS,
        }
    }

    pub fn with_max_export_rows(mut self, max_export_rows: usize) -> Self {
        self.max_export_rows = max_export_rows.max(1);
        self
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    // ========================================================================
    // Permission checks
    // ========================================================================

    async fn load_workspace(&self, workspace_id: Uuid) -> Result<Workspace> {
        match self.store.get_workspace(workspace_id).await? {
            Some(workspace) if !workspace.is_archived => Ok(workspace),
            _ => Err(Error::not_found("Workspace")),
        }
    }

    async fn authorize_in(&self, workspace_id: Uuid, actor: Uuid, action: Action) -> Result<WorkspaceMember> {
        let member = self.store.get_member(workspace_id, actor).await?;
        authorize(member.as_ref(), action)?;
        member.ok_or_else(|| Error::Forbidden("not a member of this workspace".to_string()))
    }

    pub async fn check_workspace_permission(
        &self,
        actor: Uuid,
        workspace_id: Uuid,
        action: Action,
    ) -> Result<(Workspace, WorkspaceMember)> {
        let workspace = self.load_workspace(workspace_id).await?;
        let member = self.authorize_in(workspace.id, actor, action).await?;
        Ok((workspace, member))
    }

    /// Section lookup, then membership lookup, then the permission flag.
    pub async fn check_section_permission(
        &self,
        actor: Uuid,
        section_id: Uuid,
        action: Action,
    ) -> Result<(Section, WorkspaceMember)> {
        let section = self
            .store
            .get_section(section_id)
            .await?
            .ok_or_else(|| Error::not_found("Section"))?;
        self.load_workspace(section.workspace_id).await?;
        let member = self.authorize_in(section.workspace_id, actor, action).await?;
        Ok((section, member))
    }

    pub async fn check_task_permission(
        &self,
        actor: Uuid,
        task_id: Uuid,
        action: Action,
    ) -> Result<(Task, WorkspaceMember)> {
        let task = self
            .store
            .get_task(task_id)
            .await?
            .ok_or_else(|| Error::not_found("Task"))?;
        self.load_workspace(task.workspace_id).await?;
        let member = self.authorize_in(task.workspace_id, actor, action).await?;
        Ok((task, member))
    }

    /// Events are best effort: a failed write is logged, the mutation stands.
    async fn record(&self, event: Event) {
        if let Err(e) = self.store.record_event(&event).await {
            tracing::error!("Failed to record {} event: {}", event.kind, e);
        }
    }

    // ========================================================================
    // Workspaces
    // ========================================================================

    pub async fn create_workspace(
        &self,
        actor: Uuid,
        name: &str,
        description: Option<String>,
    ) -> Result<Workspace> {
        let name = validation::name("name", name)?;
        let description = validation::description(description)?;

        let workspace = Workspace::new(name, description, actor);
        let owner = WorkspaceMember::new(workspace.id, actor, Permissions::owner());
        self.store.create_workspace(&workspace, &owner).await?;

        tracing::info!("Created workspace: {} ({})", workspace.name, workspace.id);
        self.record(Event::new(
            workspace.id,
            actor,
            EventKind::WorkspaceCreated,
            EntityType::Workspace,
            workspace.id,
            format!("Created workspace \"{}\"", workspace.name),
        ))
        .await;

        Ok(workspace)
    }

    pub async fn list_workspaces(&self, actor: Uuid) -> Result<Vec<Workspace>> {
        self.store.list_workspaces_for_user(actor).await
    }

    pub async fn get_workspace(&self, actor: Uuid, workspace_id: Uuid) -> Result<Workspace> {
        let (workspace, _) = self
            .check_workspace_permission(actor, workspace_id, Action::Read)
            .await?;
        Ok(workspace)
    }

    pub async fn update_workspace(
        &self,
        actor: Uuid,
        workspace_id: Uuid,
        patch: WorkspacePatch,
    ) -> Result<Workspace> {
        let (mut workspace, _) = self
            .check_workspace_permission(actor, workspace_id, Action::Admin)
            .await?;

        if let Some(name) = patch.name {
            workspace.name = validation::name("name", &name)?;
        }
        if let Some(description) = patch.description {
            workspace.description = validation::description(description)?;
        }
        workspace.updated_at = Utc::now();
        self.store.update_workspace(&workspace).await?;

        self.record(Event::new(
            workspace.id,
            actor,
            EventKind::WorkspaceUpdated,
            EntityType::Workspace,
            workspace.id,
            format!("Updated workspace \"{}\"", workspace.name),
        ))
        .await;

        Ok(workspace)
    }

    pub async fn archive_workspace(&self, actor: Uuid, workspace_id: Uuid) -> Result<Workspace> {
        let (mut workspace, _) = self
            .check_workspace_permission(actor, workspace_id, Action::Admin)
            .await?;

        workspace.is_archived = true;
        workspace.updated_at = Utc::now();
        self.store.update_workspace(&workspace).await?;

        tracing::info!("Archived workspace: {} ({})", workspace.name, workspace.id);
        self.record(Event::new(
            workspace.id,
            actor,
            EventKind::WorkspaceArchived,
            EntityType::Workspace,
            workspace.id,
            format!("Archived workspace \"{}\"", workspace.name),
        ))
        .await;

        Ok(workspace)
    }

    // ========================================================================
    // Members
    // ========================================================================

    pub async fn list_members(&self, actor: Uuid, workspace_id: Uuid) -> Result<Vec<WorkspaceMember>> {
        self.check_workspace_permission(actor, workspace_id, Action::Read)
            .await?;
        self.store.list_members(workspace_id).await
    }

    pub async fn add_member(
        &self,
        actor: Uuid,
        workspace_id: Uuid,
        email: &str,
        permissions: Permissions,
    ) -> Result<WorkspaceMember> {
        self.check_workspace_permission(actor, workspace_id, Action::Admin)
            .await?;

        let user = self
            .store
            .find_user_by_email(email)
            .await?
            .ok_or_else(|| Error::not_found("User"))?;
        if self.store.get_member(workspace_id, user.id).await?.is_some() {
            return Err(Error::Conflict(format!("{} is already a member", user.email)));
        }

        let member = WorkspaceMember::new(workspace_id, user.id, permissions);
        self.store.upsert_member(&member).await?;

        self.record(
            Event::new(
                workspace_id,
                actor,
                EventKind::MemberAdded,
                EntityType::Member,
                user.id,
                format!("Added {} to the workspace", user.email),
            )
            .with_payload(json!({ "permissions": permissions })),
        )
        .await;

        Ok(member)
    }

    pub async fn update_member(
        &self,
        actor: Uuid,
        workspace_id: Uuid,
        user_id: Uuid,
        patch: MemberPatch,
    ) -> Result<WorkspaceMember> {
        let (workspace, _) = self
            .check_workspace_permission(actor, workspace_id, Action::Admin)
            .await?;

        let mut member = self
            .store
            .get_member(workspace_id, user_id)
            .await?
            .ok_or_else(|| Error::not_found("Member"))?;
        if user_id == workspace.owner_id && !patch.permissions.admin {
            return Err(Error::Conflict(
                "the workspace owner must keep admin permission".to_string(),
            ));
        }

        member.permissions = patch.permissions;
        self.store.upsert_member(&member).await?;

        self.record(
            Event::new(
                workspace_id,
                actor,
                EventKind::MemberUpdated,
                EntityType::Member,
                user_id,
                "Updated member permissions",
            )
            .with_payload(json!({ "permissions": member.permissions })),
        )
        .await;

        Ok(member)
    }

    /// Admins may remove anyone but the owner; members may remove themselves.
    pub async fn remove_member(&self, actor: Uuid, workspace_id: Uuid, user_id: Uuid) -> Result<()> {
        let workspace = if actor == user_id {
            // Leaving needs a membership row, not any particular flag.
            let workspace = self.load_workspace(workspace_id).await?;
            if self.store.get_member(workspace_id, actor).await?.is_none() {
                return Err(Error::Forbidden("not a member of this workspace".to_string()));
            }
            workspace
        } else {
            self.check_workspace_permission(actor, workspace_id, Action::Admin)
                .await?
                .0
        };

        if user_id == workspace.owner_id {
            return Err(Error::Conflict("the workspace owner cannot be removed".to_string()));
        }
        if !self.store.remove_member(workspace_id, user_id).await? {
            return Err(Error::not_found("Member"));
        }

        self.record(Event::new(
            workspace_id,
            actor,
            EventKind::MemberRemoved,
            EntityType::Member,
            user_id,
            "Removed a member from the workspace",
        ))
        .await;

        Ok(())
    }

    // ========================================================================
    // Sections
    // ========================================================================

    pub async fn list_sections(
        &self,
        actor: Uuid,
        workspace_id: Uuid,
        include_archived: bool,
    ) -> Result<Vec<Section>> {
        self.check_workspace_permission(actor, workspace_id, Action::Read)
            .await?;
        self.store.list_sections(workspace_id, include_archived).await
    }

    pub async fn create_section(&self, actor: Uuid, workspace_id: Uuid, name: &str) -> Result<Section> {
        self.check_workspace_permission(actor, workspace_id, Action::Write)
            .await?;
        let name = validation::name("name", name)?;

        let section = self
            .store
            .insert_section(Section::new(workspace_id, name))
            .await?;

        tracing::info!("Created section: {} ({})", section.name, section.id);
        self.record(Event::new(
            workspace_id,
            actor,
            EventKind::SectionCreated,
            EntityType::Section,
            section.id,
            format!("Created section \"{}\"", section.name),
        ))
        .await;

        Ok(section)
    }

    pub async fn get_section(&self, actor: Uuid, section_id: Uuid) -> Result<Section> {
        let (section, _) = self
            .check_section_permission(actor, section_id, Action::Read)
            .await?;
        Ok(section)
    }

    pub async fn rename_section(&self, actor: Uuid, section_id: Uuid, name: &str) -> Result<Section> {
        let (section, _) = self
            .check_section_permission(actor, section_id, Action::Write)
            .await?;
        let name = validation::name("name", name)?;

        let renamed = self.store.rename_section(section_id, &name).await?;
        self.record(
            Event::new(
                section.workspace_id,
                actor,
                EventKind::SectionRenamed,
                EntityType::Section,
                section_id,
                format!("Renamed section \"{}\" to \"{}\"", section.name, renamed.name),
            )
            .with_payload(json!({ "from": section.name, "to": renamed.name })),
        )
        .await;

        Ok(renamed)
    }

    pub async fn archive_section(&self, actor: Uuid, section_id: Uuid) -> Result<Section> {
        let (section, _) = self
            .check_section_permission(actor, section_id, Action::Write)
            .await?;
        if section.is_archived {
            return Err(Error::Conflict("section is already archived".to_string()));
        }

        let archived = self.store.archive_section(section_id).await?;
        tracing::info!("Archived section: {} ({})", archived.name, archived.id);
        self.record(
            Event::new(
                section.workspace_id,
                actor,
                EventKind::SectionArchived,
                EntityType::Section,
                section_id,
                format!("Archived section \"{}\"", section.name),
            )
            .with_payload(json!({ "previous_position": section.position })),
        )
        .await;

        Ok(archived)
    }

    pub async fn unarchive_section(&self, actor: Uuid, section_id: Uuid) -> Result<Section> {
        let (section, _) = self
            .check_section_permission(actor, section_id, Action::Write)
            .await?;
        if !section.is_archived {
            return Err(Error::Conflict("section is not archived".to_string()));
        }

        let restored = self.store.unarchive_section(section_id).await?;
        self.record(
            Event::new(
                section.workspace_id,
                actor,
                EventKind::SectionUnarchived,
                EntityType::Section,
                section_id,
                format!("Restored section \"{}\"", section.name),
            )
            .with_payload(json!({ "position": restored.position })),
        )
        .await;

        Ok(restored)
    }

    pub async fn move_section(&self, actor: Uuid, section_id: Uuid, position: i32) -> Result<Section> {
        let (section, _) = self
            .check_section_permission(actor, section_id, Action::Write)
            .await?;
        if section.is_archived {
            return Err(Error::Conflict("cannot reorder an archived section".to_string()));
        }

        let moved = self.store.move_section(section_id, position).await?;
        if moved.position != section.position {
            self.record(
                Event::new(
                    section.workspace_id,
                    actor,
                    EventKind::SectionMoved,
                    EntityType::Section,
                    section_id,
                    format!("Moved section \"{}\"", section.name),
                )
                .with_payload(json!({ "from": section.position, "to": moved.position })),
            )
            .await;
        }

        Ok(moved)
    }

    // ========================================================================
    // Tasks
    // ========================================================================

    async fn ensure_assignable(&self, workspace_id: Uuid, assignee: Option<Uuid>) -> Result<()> {
        if let Some(user_id) = assignee {
            if self.store.get_member(workspace_id, user_id).await?.is_none() {
                return Err(Error::Validation(
                    "assignee must be a member of the workspace".to_string(),
                ));
            }
        }
        Ok(())
    }

    pub async fn list_tasks(&self, actor: Uuid, section_id: Uuid, include_archived: bool) -> Result<Vec<Task>> {
        self.check_section_permission(actor, section_id, Action::Read)
            .await?;
        self.store.list_tasks(section_id, include_archived).await
    }

    pub async fn create_task(&self, actor: Uuid, section_id: Uuid, input: NewTaskInput) -> Result<Task> {
        let (section, _) = self
            .check_section_permission(actor, section_id, Action::Write)
            .await?;
        if section.is_archived {
            return Err(Error::Conflict("cannot add tasks to an archived section".to_string()));
        }

        let title = validation::name("title", &input.title)?;
        self.ensure_assignable(section.workspace_id, input.assignee_id)
            .await?;

        let mut task = Task::new(section.id, section.workspace_id, title, actor);
        task.description = validation::description(input.description)?;
        task.priority = input.priority;
        task.assignee_id = input.assignee_id;
        task.due_date = input.due_date;
        task.set_status(input.status);

        let task = self.store.insert_task(task, input.position).await?;

        tracing::info!("Created task: {} ({})", task.title, task.id);
        self.record(
            Event::new(
                task.workspace_id,
                actor,
                EventKind::TaskCreated,
                EntityType::Task,
                task.id,
                format!("Created task \"{}\" in \"{}\"", task.title, section.name),
            )
            .with_payload(json!({ "section_id": section.id, "position": task.position })),
        )
        .await;

        Ok(task)
    }

    pub async fn get_task(&self, actor: Uuid, task_id: Uuid) -> Result<Task> {
        let (task, _) = self
            .check_task_permission(actor, task_id, Action::Read)
            .await?;
        Ok(task)
    }

    pub async fn update_task(&self, actor: Uuid, task_id: Uuid, patch: TaskPatch) -> Result<Task> {
        let (task, _) = self
            .check_task_permission(actor, task_id, Action::Write)
            .await?;

        // Dry run for validation. The store re-applies the patch to the locked row.
        let mut preview = task.clone();
        let changed = patch.apply(&mut preview)?;
        if changed.is_empty() {
            return Ok(task);
        }
        if let Some(assignee) = patch.assignee_id {
            self.ensure_assignable(task.workspace_id, assignee).await?;
        }

        let updated = self.store.update_task(task_id, &patch).await?;
        self.record(
            Event::new(
                updated.workspace_id,
                actor,
                EventKind::TaskUpdated,
                EntityType::Task,
                updated.id,
                format!("Updated {} of task \"{}\"", changed.join(", "), updated.title),
            )
            .with_payload(json!({ "fields": changed, "status": updated.status })),
        )
        .await;

        Ok(updated)
    }

    pub async fn archive_task(&self, actor: Uuid, task_id: Uuid) -> Result<Task> {
        let (task, _) = self
            .check_task_permission(actor, task_id, Action::Write)
            .await?;
        if task.is_archived {
            return Err(Error::Conflict("task is already archived".to_string()));
        }

        let archived = self.store.archive_task(task_id).await?;
        self.record(
            Event::new(
                task.workspace_id,
                actor,
                EventKind::TaskArchived,
                EntityType::Task,
                task_id,
                format!("Archived task \"{}\"", task.title),
            )
            .with_payload(json!({ "previous_position": task.position })),
        )
        .await;

        Ok(archived)
    }

    pub async fn unarchive_task(&self, actor: Uuid, task_id: Uuid) -> Result<Task> {
        let (task, _) = self
            .check_task_permission(actor, task_id, Action::Write)
            .await?;
        if !task.is_archived {
            return Err(Error::Conflict("task is not archived".to_string()));
        }

        let restored = self.store.unarchive_task(task_id).await?;
        self.record(Event::new(
            task.workspace_id,
            actor,
            EventKind::TaskUnarchived,
            EntityType::Task,
            task_id,
            format!("Restored task \"{}\"", task.title),
        ))
        .await;

        Ok(restored)
    }

    /// Moves a task within its section, or into another section of the
    /// same workspace when `section_id` is given.
    pub async fn move_task(
        &self,
        actor: Uuid,
        task_id: Uuid,
        section_id: Option<Uuid>,
        position: i32,
    ) -> Result<Task> {
        let (task, _) = self
            .check_task_permission(actor, task_id, Action::Write)
            .await?;
        if task.is_archived {
            return Err(Error::Conflict("cannot move an archived task".to_string()));
        }

        let target_id = section_id.unwrap_or(task.section_id);
        if target_id != task.section_id {
            let target = self
                .store
                .get_section(target_id)
                .await?
                .ok_or_else(|| Error::not_found("Section"))?;
            if target.workspace_id != task.workspace_id {
                return Err(Error::Validation(
                    "tasks can only move between sections of the same workspace".to_string(),
                ));
            }
            if target.is_archived {
                return Err(Error::Conflict(
                    "cannot move a task into an archived section".to_string(),
                ));
            }
        }

        let moved = self.store.move_task(task_id, target_id, position).await?;
        if moved.section_id != task.section_id || moved.position != task.position {
            self.record(
                Event::new(
                    task.workspace_id,
                    actor,
                    EventKind::TaskMoved,
                    EntityType::Task,
                    task_id,
                    format!("Moved task \"{}\"", task.title),
                )
                .with_payload(json!({
                    "from_section": task.section_id,
                    "from_position": task.position,
                    "to_section": moved.section_id,
                    "to_position": moved.position,
                })),
            )
            .await;
        }

        Ok(moved)
    }

    pub async fn delete_task(&self, actor: Uuid, task_id: Uuid) -> Result<()> {
        let (task, _) = self
            .check_task_permission(actor, task_id, Action::Delete)
            .await?;

        self.store.delete_task(task_id).await?;

        tracing::info!("Deleted task: {} ({})", task.title, task.id);
        self.record(Event::new(
            task.workspace_id,
            actor,
            EventKind::TaskDeleted,
            EntityType::Task,
            task_id,
            format!("Deleted task \"{}\"", task.title),
        ))
        .await;

        Ok(())
    }

    // ========================================================================
    // Activity
    // ========================================================================

    pub async fn activity(
        &self,
        actor: Uuid,
        workspace_id: Uuid,
        query: &ActivityQuery,
    ) -> Result<ActivityPage> {
        query.validate()?;
        self.check_workspace_permission(actor, workspace_id, Action::Read)
            .await?;
        let events = self.store.list_events(workspace_id).await?;
        Ok(activity::run(events, query))
    }

    /// Returns the rendered export and a suggested file name.
    pub async fn export_activity(
        &self,
        actor: Uuid,
        workspace_id: Uuid,
        query: &ActivityQuery,
        format: ExportFormat,
    ) -> Result<(String, String)> {
        self.check_workspace_permission(actor, workspace_id, Action::Read)
            .await?;
        let events = self.store.list_events(workspace_id).await?;
        let (body, file_name) = export_events(events, workspace_id, query, format, self.max_export_rows)?;

        tracing::info!("Exported activity for workspace {} as {:?}", workspace_id, format);
        Ok((body, file_name))
    }
}

/// Filters, sorts and renders events, capped at `max_rows`.
pub fn export_events(
    events: Vec<crate::Event>,
    workspace_id: Uuid,
    query: &ActivityQuery,
    format: ExportFormat,
    max_rows: usize,
) -> Result<(String, String)> {
    query.validate()?;
    let mut matching = activity::filter(events, query);
    activity::sort(&mut matching, query.order);

    let cap = query.limit.map_or(max_rows, |limit| limit.min(max_rows));
    let rows: Vec<crate::Event> = matching.into_iter().skip(query.offset).take(cap).collect();

    let body = activity::export(&rows, format)?;
    let file_name = activity::export_file_name(workspace_id, format, Utc::now());
    Ok((body, file_name))
}
