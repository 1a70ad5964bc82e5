use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::board::TaskPatch;
use crate::position;
use crate::store::{Store, StoreStats};
use crate::{Error, Event, Result, Section, Task, TaskStatus, User, Workspace, WorkspaceMember};

#[derive(Default)]
struct MemoryState {
    users: HashMap<Uuid, User>,
    workspaces: HashMap<Uuid, Workspace>,
    members: HashMap<(Uuid, Uuid), WorkspaceMember>,
    sections: HashMap<Uuid, Section>,
    tasks: HashMap<Uuid, Task>,
    events: Vec<Event>,
}

impl MemoryState {
    fn active_sections(&self, workspace_id: Uuid) -> Vec<(Uuid, i32)> {
        self.sections
            .values()
            .filter(|s| s.workspace_id == workspace_id && !s.is_archived)
            .map(|s| (s.id, s.position))
            .collect()
    }

    fn active_tasks(&self, section_id: Uuid) -> Vec<(Uuid, i32)> {
        self.tasks
            .values()
            .filter(|t| t.section_id == section_id && !t.is_archived)
            .map(|t| (t.id, t.position))
            .collect()
    }

    fn apply_section_plan(&mut self, plan: &[(Uuid, i32)]) {
        let now = Utc::now();
        for (id, position) in plan {
            if let Some(section) = self.sections.get_mut(id) {
                section.position = *position;
                section.updated_at = now;
            }
        }
    }

    fn apply_task_plan(&mut self, plan: &[(Uuid, i32)]) {
        let now = Utc::now();
        for (id, position) in plan {
            if let Some(task) = self.tasks.get_mut(id) {
                task.position = *position;
                task.updated_at = now;
            }
        }
    }

    fn section(&self, section_id: Uuid) -> Result<Section> {
        self.sections
            .get(&section_id)
            .cloned()
            .ok_or_else(|| Error::not_found("Section"))
    }

    fn task(&self, task_id: Uuid) -> Result<Task> {
        self.tasks
            .get(&task_id)
            .cloned()
            .ok_or_else(|| Error::not_found("Task"))
    }
}

/// In-process [`Store`] used when no database is configured, and in tests.
///
/// All state sits behind one lock, so every repositioning call is atomic.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<()> {
        let _state = self.state.read().await;
        Ok(())
    }

    async fn create_user(&self, user: &User) -> Result<()> {
        let mut state = self.state.write().await;
        if state.users.values().any(|u| u.email == user.email) {
            return Err(Error::Conflict(format!("email {} is already registered", user.email)));
        }
        state.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn get_user(&self, user_id: Uuid) -> Result<Option<User>> {
        let state = self.state.read().await;
        Ok(state.users.get(&user_id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let email = crate::user::normalize_email(email);
        let state = self.state.read().await;
        Ok(state.users.values().find(|u| u.email == email).cloned())
    }

    async fn create_workspace(&self, workspace: &Workspace, owner: &WorkspaceMember) -> Result<()> {
        let mut state = self.state.write().await;
        state.workspaces.insert(workspace.id, workspace.clone());
        state
            .members
            .insert((owner.workspace_id, owner.user_id), owner.clone());
        Ok(())
    }

    async fn get_workspace(&self, workspace_id: Uuid) -> Result<Option<Workspace>> {
        let state = self.state.read().await;
        Ok(state.workspaces.get(&workspace_id).cloned())
    }

    async fn list_workspaces_for_user(&self, user_id: Uuid) -> Result<Vec<Workspace>> {
        let state = self.state.read().await;
        let mut workspaces: Vec<Workspace> = state
            .members
            .values()
            .filter(|m| m.user_id == user_id)
            .filter_map(|m| state.workspaces.get(&m.workspace_id))
            .filter(|w| !w.is_archived)
            .cloned()
            .collect();
        workspaces.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(workspaces)
    }

    async fn update_workspace(&self, workspace: &Workspace) -> Result<()> {
        let mut state = self.state.write().await;
        match state.workspaces.get_mut(&workspace.id) {
            Some(existing) => {
                *existing = workspace.clone();
                Ok(())
            }
            None => Err(Error::not_found("Workspace")),
        }
    }

    async fn get_member(&self, workspace_id: Uuid, user_id: Uuid) -> Result<Option<WorkspaceMember>> {
        let state = self.state.read().await;
        Ok(state.members.get(&(workspace_id, user_id)).cloned())
    }

    async fn list_members(&self, workspace_id: Uuid) -> Result<Vec<WorkspaceMember>> {
        let state = self.state.read().await;
        let mut members: Vec<WorkspaceMember> = state
            .members
            .values()
            .filter(|m| m.workspace_id == workspace_id)
            .cloned()
            .collect();
        members.sort_by(|a, b| a.joined_at.cmp(&b.joined_at).then(a.user_id.cmp(&b.user_id)));
        Ok(members)
    }

    async fn upsert_member(&self, member: &WorkspaceMember) -> Result<()> {
        let mut state = self.state.write().await;
        state
            .members
            .insert((member.workspace_id, member.user_id), member.clone());
        Ok(())
    }

    async fn remove_member(&self, workspace_id: Uuid, user_id: Uuid) -> Result<bool> {
        let mut state = self.state.write().await;
        Ok(state.members.remove(&(workspace_id, user_id)).is_some())
    }

    async fn insert_section(&self, mut section: Section) -> Result<Section> {
        let mut state = self.state.write().await;
        let active = state.active_sections(section.workspace_id);
        let (slot, shifts) = position::plan_insertion(&active, section.id, None);
        state.apply_section_plan(&shifts);

        section.position = slot;
        section.is_archived = false;
        state.sections.insert(section.id, section.clone());
        Ok(section)
    }

    async fn get_section(&self, section_id: Uuid) -> Result<Option<Section>> {
        let state = self.state.read().await;
        Ok(state.sections.get(&section_id).cloned())
    }

    async fn list_sections(&self, workspace_id: Uuid, include_archived: bool) -> Result<Vec<Section>> {
        let state = self.state.read().await;
        let mut sections: Vec<Section> = state
            .sections
            .values()
            .filter(|s| s.workspace_id == workspace_id && (include_archived || !s.is_archived))
            .cloned()
            .collect();
        sections.sort_by(|a, b| {
            a.is_archived
                .cmp(&b.is_archived)
                .then(a.position.cmp(&b.position))
                .then(a.created_at.cmp(&b.created_at))
        });
        Ok(sections)
    }

    async fn rename_section(&self, section_id: Uuid, name: &str) -> Result<Section> {
        let mut state = self.state.write().await;
        let section = state
            .sections
            .get_mut(&section_id)
            .ok_or_else(|| Error::not_found("Section"))?;
        section.name = name.to_string();
        section.updated_at = Utc::now();
        Ok(section.clone())
    }

    async fn archive_section(&self, section_id: Uuid) -> Result<Section> {
        let mut state = self.state.write().await;
        let section = state.section(section_id)?;
        if section.is_archived {
            return Err(Error::Conflict("section is already archived".to_string()));
        }

        let active = state.active_sections(section.workspace_id);
        let plan = position::plan_removal(&active, section_id);
        state.apply_section_plan(&plan);

        let section = state
            .sections
            .get_mut(&section_id)
            .ok_or_else(|| Error::not_found("Section"))?;
        section.is_archived = true;
        section.position = -1;
        section.updated_at = Utc::now();
        Ok(section.clone())
    }

    async fn unarchive_section(&self, section_id: Uuid) -> Result<Section> {
        let mut state = self.state.write().await;
        let section = state.section(section_id)?;
        if !section.is_archived {
            return Err(Error::Conflict("section is not archived".to_string()));
        }

        let active = state.active_sections(section.workspace_id);
        let (slot, shifts) = position::plan_insertion(&active, section_id, None);
        state.apply_section_plan(&shifts);

        let section = state
            .sections
            .get_mut(&section_id)
            .ok_or_else(|| Error::not_found("Section"))?;
        section.is_archived = false;
        section.position = slot;
        section.updated_at = Utc::now();
        Ok(section.clone())
    }

    async fn move_section(&self, section_id: Uuid, position: i32) -> Result<Section> {
        let mut state = self.state.write().await;
        let section = state.section(section_id)?;
        if section.is_archived {
            return Err(Error::Conflict("cannot reorder an archived section".to_string()));
        }

        let active = state.active_sections(section.workspace_id);
        let plan = position::plan_move(&active, section_id, position);
        state.apply_section_plan(&plan);
        state.section(section_id)
    }

    async fn insert_task(&self, mut task: Task, position: Option<i32>) -> Result<Task> {
        let mut state = self.state.write().await;
        let active = state.active_tasks(task.section_id);
        let (slot, shifts) = position::plan_insertion(&active, task.id, position);
        state.apply_task_plan(&shifts);

        task.position = slot;
        task.is_archived = false;
        state.tasks.insert(task.id, task.clone());
        Ok(task)
    }

    async fn get_task(&self, task_id: Uuid) -> Result<Option<Task>> {
        let state = self.state.read().await;
        Ok(state.tasks.get(&task_id).cloned())
    }

    async fn list_tasks(&self, section_id: Uuid, include_archived: bool) -> Result<Vec<Task>> {
        let state = self.state.read().await;
        let mut tasks: Vec<Task> = state
            .tasks
            .values()
            .filter(|t| t.section_id == section_id && (include_archived || !t.is_archived))
            .cloned()
            .collect();
        tasks.sort_by(|a, b| {
            a.is_archived
                .cmp(&b.is_archived)
                .then(a.position.cmp(&b.position))
                .then(a.created_at.cmp(&b.created_at))
        });
        Ok(tasks)
    }

    async fn update_task(&self, task_id: Uuid, patch: &TaskPatch) -> Result<Task> {
        let mut state = self.state.write().await;
        let existing = state
            .tasks
            .get_mut(&task_id)
            .ok_or_else(|| Error::not_found("Task"))?;

        patch.apply(existing)?;
        existing.updated_at = Utc::now();
        Ok(existing.clone())
    }

    async fn archive_task(&self, task_id: Uuid) -> Result<Task> {
        let mut state = self.state.write().await;
        let task = state.task(task_id)?;
        if task.is_archived {
            return Err(Error::Conflict("task is already archived".to_string()));
        }

        let active = state.active_tasks(task.section_id);
        let plan = position::plan_removal(&active, task_id);
        state.apply_task_plan(&plan);

        let task = state
            .tasks
            .get_mut(&task_id)
            .ok_or_else(|| Error::not_found("Task"))?;
        task.is_archived = true;
        task.position = -1;
        task.updated_at = Utc::now();
        Ok(task.clone())
    }

    async fn unarchive_task(&self, task_id: Uuid) -> Result<Task> {
        let mut state = self.state.write().await;
        let task = state.task(task_id)?;
        if !task.is_archived {
            return Err(Error::Conflict("task is not archived".to_string()));
        }

        let active = state.active_tasks(task.section_id);
        let (slot, shifts) = position::plan_insertion(&active, task_id, None);
        state.apply_task_plan(&shifts);

        let task = state
            .tasks
            .get_mut(&task_id)
            .ok_or_else(|| Error::not_found("Task"))?;
        task.is_archived = false;
        task.position = slot;
        task.updated_at = Utc::now();
        Ok(task.clone())
    }

    async fn move_task(&self, task_id: Uuid, section_id: Uuid, position: i32) -> Result<Task> {
        let mut state = self.state.write().await;
        let task = state.task(task_id)?;
        if task.is_archived {
            return Err(Error::Conflict("cannot move an archived task".to_string()));
        }

        if task.section_id == section_id {
            let active = state.active_tasks(section_id);
            let plan = position::plan_move(&active, task_id, position);
            state.apply_task_plan(&plan);
            return state.task(task_id);
        }

        let target = state.section(section_id)?;
        if target.is_archived {
            return Err(Error::Conflict("cannot move a task into an archived section".to_string()));
        }

        let source = state.active_tasks(task.section_id);
        let removal = position::plan_removal(&source, task_id);
        state.apply_task_plan(&removal);

        let destination = state.active_tasks(section_id);
        let (slot, shifts) = position::plan_insertion(&destination, task_id, Some(position));
        state.apply_task_plan(&shifts);

        let task = state
            .tasks
            .get_mut(&task_id)
            .ok_or_else(|| Error::not_found("Task"))?;
        task.section_id = section_id;
        task.position = slot;
        task.updated_at = Utc::now();
        Ok(task.clone())
    }

    async fn delete_task(&self, task_id: Uuid) -> Result<()> {
        let mut state = self.state.write().await;
        let task = state.task(task_id)?;

        if !task.is_archived {
            let active = state.active_tasks(task.section_id);
            let plan = position::plan_removal(&active, task_id);
            state.apply_task_plan(&plan);
        }
        state.tasks.remove(&task_id);
        Ok(())
    }

    async fn record_event(&self, event: &Event) -> Result<()> {
        let mut state = self.state.write().await;
        state.events.push(event.clone());
        Ok(())
    }

    async fn list_events(&self, workspace_id: Uuid) -> Result<Vec<Event>> {
        let state = self.state.read().await;
        Ok(state
            .events
            .iter()
            .filter(|e| e.workspace_id == workspace_id)
            .cloned()
            .collect())
    }

    async fn stats(&self) -> Result<StoreStats> {
        let state = self.state.read().await;
        Ok(StoreStats {
            users: state.users.len() as i64,
            workspaces: state.workspaces.len() as i64,
            sections: state.sections.len() as i64,
            tasks: state.tasks.len() as i64,
            completed_tasks: state
                .tasks
                .values()
                .filter(|t| t.status == TaskStatus::Done)
                .count() as i64,
            events: state.events.len() as i64,
        })
    }
}
