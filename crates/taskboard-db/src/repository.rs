use crate::{
    models::{EventRecord, MemberRecord, SectionRecord, TaskRecord, UserRecord, WorkspaceRecord},
    Error, Result,
};
use sqlx::{postgres::PgPoolOptions, Pool, Postgres, Row, Transaction};
use taskboard_core::{
    position, Event, StoreStats, Task, TaskPatch, User, Workspace, WorkspaceMember,
};
use uuid::Uuid;

type Tx<'a> = Transaction<'a, Postgres>;

/// Times a task operation re-reads the section after losing a race with a move.
const LOCK_ATTEMPTS: usize = 3;

const ACTIVE_SECTIONS: &str =
    "SELECT id, position FROM sections WHERE workspace_id = $1 AND NOT is_archived";
const ACTIVE_TASKS: &str =
    "SELECT id, position FROM tasks WHERE section_id = $1 AND NOT is_archived";

#[derive(Clone)]
pub struct Database {
    pool: Pool<Postgres>,
}

impl Database {
    /// Create new database connection
    pub async fn new(database_url: &str) -> Result<Self> {
        Self::with_max_connections(database_url, 5).await
    }

    pub async fn with_max_connections(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| Error::Connection(e.to_string()))?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &Pool<Postgres> {
        &self.pool
    }

    /// Initialize database schema
    pub async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id UUID PRIMARY KEY,
                email VARCHAR(320) NOT NULL UNIQUE,
                display_name TEXT NOT NULL,
                password_hash TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS workspaces (
                id UUID PRIMARY KEY,
                name TEXT NOT NULL,
                description TEXT,
                owner_id UUID NOT NULL REFERENCES users(id),
                is_archived BOOLEAN NOT NULL DEFAULT FALSE,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS workspace_members (
                workspace_id UUID NOT NULL REFERENCES workspaces(id) ON DELETE CASCADE,
                user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                can_read BOOLEAN NOT NULL DEFAULT TRUE,
                can_write BOOLEAN NOT NULL DEFAULT FALSE,
                can_delete BOOLEAN NOT NULL DEFAULT FALSE,
                can_admin BOOLEAN NOT NULL DEFAULT FALSE,
                joined_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                PRIMARY KEY (workspace_id, user_id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sections (
                id UUID PRIMARY KEY,
                workspace_id UUID NOT NULL REFERENCES workspaces(id) ON DELETE CASCADE,
                name TEXT NOT NULL,
                position INTEGER NOT NULL,
                is_archived BOOLEAN NOT NULL DEFAULT FALSE,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS tasks (
                id UUID PRIMARY KEY,
                section_id UUID NOT NULL REFERENCES sections(id) ON DELETE CASCADE,
                workspace_id UUID NOT NULL REFERENCES workspaces(id) ON DELETE CASCADE,
                title TEXT NOT NULL,
                description TEXT,
                status VARCHAR(32) NOT NULL,
                priority VARCHAR(32) NOT NULL,
                assignee_id UUID REFERENCES users(id) ON DELETE SET NULL,
                due_date DATE,
                position INTEGER NOT NULL,
                is_archived BOOLEAN NOT NULL DEFAULT FALSE,
                created_by UUID NOT NULL REFERENCES users(id),
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                completed_at TIMESTAMPTZ
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS events (
                id UUID PRIMARY KEY,
                workspace_id UUID NOT NULL REFERENCES workspaces(id) ON DELETE CASCADE,
                actor_id UUID NOT NULL,
                kind VARCHAR(64) NOT NULL,
                entity_type VARCHAR(32) NOT NULL,
                entity_id UUID NOT NULL,
                summary TEXT NOT NULL,
                payload JSONB NOT NULL DEFAULT 'null'::jsonb,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        // Create indexes
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_members_user ON workspace_members(user_id)")
            .execute(&self.pool)
            .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_sections_workspace ON sections(workspace_id, position)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_tasks_section ON tasks(section_id, position)")
            .execute(&self.pool)
            .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_events_workspace ON events(workspace_id, created_at DESC)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    // ========================================================================
    // User Operations
    // ========================================================================

    pub async fn create_user(&self, user: &User) -> Result<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO users (id, email, display_name, password_hash, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.display_name)
        .bind(&user.password_hash)
        .bind(user.created_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(Error::Conflict(
                format!("email {} is already registered", user.email),
            )),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn get_user(&self, user_id: Uuid) -> Result<Option<UserRecord>> {
        let record = sqlx::query_as::<_, UserRecord>("SELECT * FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(record)
    }

    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>> {
        let record = sqlx::query_as::<_, UserRecord>("SELECT * FROM users WHERE email = $1")
            .bind(taskboard_core::user::normalize_email(email))
            .fetch_optional(&self.pool)
            .await?;

        Ok(record)
    }

    // ========================================================================
    // Workspace Operations
    // ========================================================================

    /// Inserts the workspace and its owner membership in one transaction.
    pub async fn create_workspace(&self, workspace: &Workspace, owner: &WorkspaceMember) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO workspaces (
                id, name, description, owner_id, is_archived, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(workspace.id)
        .bind(&workspace.name)
        .bind(&workspace.description)
        .bind(workspace.owner_id)
        .bind(workspace.is_archived)
        .bind(workspace.created_at)
        .bind(workspace.updated_at)
        .execute(&mut *tx)
        .await?;

        upsert_member(&mut tx, owner).await?;

        tx.commit().await?;
        Ok(())
    }

    pub async fn get_workspace(&self, workspace_id: Uuid) -> Result<Option<WorkspaceRecord>> {
        let record = sqlx::query_as::<_, WorkspaceRecord>("SELECT * FROM workspaces WHERE id = $1")
            .bind(workspace_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(record)
    }

    pub async fn list_workspaces_for_user(&self, user_id: Uuid) -> Result<Vec<WorkspaceRecord>> {
        let records = sqlx::query_as::<_, WorkspaceRecord>(
            r#"
            SELECT w.* FROM workspaces w
            JOIN workspace_members m ON m.workspace_id = w.id
            WHERE m.user_id = $1 AND NOT w.is_archived
            ORDER BY w.created_at, w.id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    pub async fn update_workspace(&self, workspace: &Workspace) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE workspaces
            SET name = $2, description = $3, is_archived = $4, updated_at = $5
            WHERE id = $1
            "#,
        )
        .bind(workspace.id)
        .bind(&workspace.name)
        .bind(&workspace.description)
        .bind(workspace.is_archived)
        .bind(workspace.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound("Workspace"));
        }
        Ok(())
    }

    // ========================================================================
    // Member Operations
    // ========================================================================

    pub async fn get_member(&self, workspace_id: Uuid, user_id: Uuid) -> Result<Option<MemberRecord>> {
        let record = sqlx::query_as::<_, MemberRecord>(
            "SELECT * FROM workspace_members WHERE workspace_id = $1 AND user_id = $2",
        )
        .bind(workspace_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    pub async fn list_members(&self, workspace_id: Uuid) -> Result<Vec<MemberRecord>> {
        let records = sqlx::query_as::<_, MemberRecord>(
            "SELECT * FROM workspace_members WHERE workspace_id = $1 ORDER BY joined_at, user_id",
        )
        .bind(workspace_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    pub async fn upsert_member(&self, member: &WorkspaceMember) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        upsert_member(&mut tx, member).await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn remove_member(&self, workspace_id: Uuid, user_id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            "DELETE FROM workspace_members WHERE workspace_id = $1 AND user_id = $2",
        )
        .bind(workspace_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    // ========================================================================
    // Section Operations
    // ========================================================================

    async fn section_workspace(&self, section_id: Uuid) -> Result<Uuid> {
        let row = sqlx::query("SELECT workspace_id FROM sections WHERE id = $1")
            .bind(section_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(Error::NotFound("Section"))?;

        Ok(row.get("workspace_id"))
    }

    pub async fn insert_section(&self, section: &taskboard_core::Section) -> Result<SectionRecord> {
        let mut tx = self.pool.begin().await?;
        lock_workspace(&mut tx, section.workspace_id).await?;

        let active = active_positions(&mut tx, ACTIVE_SECTIONS, section.workspace_id).await?;
        let (slot, shifts) = position::plan_insertion(&active, section.id, None);
        apply_plan(&mut tx, "sections", &shifts).await?;

        let record = sqlx::query_as::<_, SectionRecord>(
            r#"
            INSERT INTO sections (
                id, workspace_id, name, position, is_archived, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, FALSE, $5, $6)
            RETURNING *
            "#,
        )
        .bind(section.id)
        .bind(section.workspace_id)
        .bind(&section.name)
        .bind(slot)
        .bind(section.created_at)
        .bind(section.updated_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(record)
    }

    pub async fn get_section(&self, section_id: Uuid) -> Result<Option<SectionRecord>> {
        let record = sqlx::query_as::<_, SectionRecord>("SELECT * FROM sections WHERE id = $1")
            .bind(section_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(record)
    }

    pub async fn list_sections(&self, workspace_id: Uuid, include_archived: bool) -> Result<Vec<SectionRecord>> {
        let records = sqlx::query_as::<_, SectionRecord>(
            r#"
            SELECT * FROM sections
            WHERE workspace_id = $1 AND ($2 OR NOT is_archived)
            ORDER BY is_archived, position, created_at
            "#,
        )
        .bind(workspace_id)
        .bind(include_archived)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    pub async fn rename_section(&self, section_id: Uuid, name: &str) -> Result<SectionRecord> {
        let record = sqlx::query_as::<_, SectionRecord>(
            "UPDATE sections SET name = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(section_id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(Error::NotFound("Section"))?;

        Ok(record)
    }

    /// Archives a section and closes the gap it leaves, atomically.
    pub async fn archive_section(&self, section_id: Uuid) -> Result<SectionRecord> {
        let workspace_id = self.section_workspace(section_id).await?;

        let mut tx = self.pool.begin().await?;
        lock_workspace(&mut tx, workspace_id).await?;

        let section = lock_section(&mut tx, section_id).await?;
        if section.is_archived {
            return Err(Error::Conflict("section is already archived".to_string()));
        }

        let active = active_positions(&mut tx, ACTIVE_SECTIONS, workspace_id).await?;
        apply_plan(&mut tx, "sections", &position::plan_removal(&active, section_id)).await?;

        let record = sqlx::query_as::<_, SectionRecord>(
            r#"
            UPDATE sections SET is_archived = TRUE, position = -1, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(section_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::debug!("Archived section {} (was at {})", section_id, section.position);
        Ok(record)
    }

    /// Restores an archived section at the end of the workspace.
    pub async fn unarchive_section(&self, section_id: Uuid) -> Result<SectionRecord> {
        let workspace_id = self.section_workspace(section_id).await?;

        let mut tx = self.pool.begin().await?;
        lock_workspace(&mut tx, workspace_id).await?;

        let section = lock_section(&mut tx, section_id).await?;
        if !section.is_archived {
            return Err(Error::Conflict("section is not archived".to_string()));
        }

        let active = active_positions(&mut tx, ACTIVE_SECTIONS, workspace_id).await?;
        let (slot, shifts) = position::plan_insertion(&active, section_id, None);
        apply_plan(&mut tx, "sections", &shifts).await?;

        let record = sqlx::query_as::<_, SectionRecord>(
            r#"
            UPDATE sections SET is_archived = FALSE, position = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(section_id)
        .bind(slot)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(record)
    }

    pub async fn move_section(&self, section_id: Uuid, target: i32) -> Result<SectionRecord> {
        let workspace_id = self.section_workspace(section_id).await?;

        let mut tx = self.pool.begin().await?;
        lock_workspace(&mut tx, workspace_id).await?;

        let section = lock_section(&mut tx, section_id).await?;
        if section.is_archived {
            return Err(Error::Conflict("cannot reorder an archived section".to_string()));
        }

        let active = active_positions(&mut tx, ACTIVE_SECTIONS, workspace_id).await?;
        apply_plan(&mut tx, "sections", &position::plan_move(&active, section_id, target)).await?;

        let record = lock_section(&mut tx, section_id).await?;
        tx.commit().await?;
        Ok(record)
    }

    // ========================================================================
    // Task Operations
    // ========================================================================

    pub async fn insert_task(&self, task: &Task, target: Option<i32>) -> Result<TaskRecord> {
        let mut tx = self.pool.begin().await?;

        let section = lock_section(&mut tx, task.section_id).await?;
        if section.is_archived {
            return Err(Error::Conflict("cannot add tasks to an archived section".to_string()));
        }

        let active = active_positions(&mut tx, ACTIVE_TASKS, task.section_id).await?;
        let (slot, shifts) = position::plan_insertion(&active, task.id, target);
        apply_plan(&mut tx, "tasks", &shifts).await?;

        let record = sqlx::query_as::<_, TaskRecord>(
            r#"
            INSERT INTO tasks (
                id, section_id, workspace_id, title, description, status, priority,
                assignee_id, due_date, position, is_archived, created_by,
                created_at, updated_at, completed_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, FALSE, $11, $12, $13, $14)
            RETURNING *
            "#,
        )
        .bind(task.id)
        .bind(task.section_id)
        .bind(task.workspace_id)
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.status.as_str())
        .bind(task.priority.as_str())
        .bind(task.assignee_id)
        .bind(task.due_date)
        .bind(slot)
        .bind(task.created_by)
        .bind(task.created_at)
        .bind(task.updated_at)
        .bind(task.completed_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(record)
    }

    pub async fn get_task(&self, task_id: Uuid) -> Result<Option<TaskRecord>> {
        let record = sqlx::query_as::<_, TaskRecord>("SELECT * FROM tasks WHERE id = $1")
            .bind(task_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(record)
    }

    pub async fn list_tasks(&self, section_id: Uuid, include_archived: bool) -> Result<Vec<TaskRecord>> {
        let records = sqlx::query_as::<_, TaskRecord>(
            r#"
            SELECT * FROM tasks
            WHERE section_id = $1 AND ($2 OR NOT is_archived)
            ORDER BY is_archived, position, created_at
            "#,
        )
        .bind(section_id)
        .bind(include_archived)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    /// Re-applies `patch` to the locked row so concurrent patches touching
    /// different fields both land.
    pub async fn update_task(&self, task_id: Uuid, patch: &TaskPatch) -> Result<TaskRecord> {
        let mut tx = self.pool.begin().await?;
        let current = lock_task(&mut tx, task_id).await?;
        let mut task = Task::try_from(current).map_err(|e| Error::Decode(e.to_string()))?;
        patch.apply(&mut task)?;

        let record = sqlx::query_as::<_, TaskRecord>(
            r#"
            UPDATE tasks SET
                title = $2,
                description = $3,
                status = $4,
                priority = $5,
                assignee_id = $6,
                due_date = $7,
                completed_at = $8,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(task.id)
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.status.as_str())
        .bind(task.priority.as_str())
        .bind(task.assignee_id)
        .bind(task.due_date)
        .bind(task.completed_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(record)
    }

    async fn task_section(&self, task_id: Uuid) -> Result<Uuid> {
        let row = sqlx::query("SELECT section_id FROM tasks WHERE id = $1")
            .bind(task_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(Error::NotFound("Task"))?;

        Ok(row.get("section_id"))
    }

    /// Opens a transaction holding the task's section lock and row lock.
    /// The section id is read before locking, so a move that lands in
    /// between sends us around again.
    async fn lock_task_in_section(&self, task_id: Uuid) -> Result<(Tx<'static>, TaskRecord)> {
        for _ in 0..LOCK_ATTEMPTS {
            let section_id = self.task_section(task_id).await?;

            let mut tx = self.pool.begin().await?;
            lock_section(&mut tx, section_id).await?;
            let task = lock_task(&mut tx, task_id).await?;
            if task.section_id == section_id {
                return Ok((tx, task));
            }
            tx.rollback().await?;
        }

        Err(Error::Conflict("task moved concurrently, retry".to_string()))
    }

    pub async fn archive_task(&self, task_id: Uuid) -> Result<TaskRecord> {
        let (mut tx, task) = self.lock_task_in_section(task_id).await?;
        let section_id = task.section_id;
        if task.is_archived {
            return Err(Error::Conflict("task is already archived".to_string()));
        }

        let active = active_positions(&mut tx, ACTIVE_TASKS, section_id).await?;
        apply_plan(&mut tx, "tasks", &position::plan_removal(&active, task_id)).await?;

        let record = sqlx::query_as::<_, TaskRecord>(
            r#"
            UPDATE tasks SET is_archived = TRUE, position = -1, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(task_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(record)
    }

    pub async fn unarchive_task(&self, task_id: Uuid) -> Result<TaskRecord> {
        let (mut tx, task) = self.lock_task_in_section(task_id).await?;
        let section_id = task.section_id;
        if !task.is_archived {
            return Err(Error::Conflict("task is not archived".to_string()));
        }

        let active = active_positions(&mut tx, ACTIVE_TASKS, section_id).await?;
        let (slot, shifts) = position::plan_insertion(&active, task_id, None);
        apply_plan(&mut tx, "tasks", &shifts).await?;

        let record = sqlx::query_as::<_, TaskRecord>(
            r#"
            UPDATE tasks SET is_archived = FALSE, position = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(task_id)
        .bind(slot)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(record)
    }

    /// Moves a task inside its section or into another one. Both section
    /// rows are locked in id order so concurrent cross moves cannot deadlock.
    pub async fn move_task(&self, task_id: Uuid, section_id: Uuid, target: i32) -> Result<TaskRecord> {
        let mut attempts = 0;
        let (mut tx, source_id) = loop {
            attempts += 1;
            let source_id = self.task_section(task_id).await?;

            let mut tx = self.pool.begin().await?;
            let mut containers = vec![source_id, section_id];
            containers.sort();
            containers.dedup();
            for container in &containers {
                let section = lock_section(&mut tx, *container).await?;
                if *container == section_id && section.is_archived {
                    return Err(Error::Conflict(
                        "cannot move a task into an archived section".to_string(),
                    ));
                }
            }

            let task = lock_task(&mut tx, task_id).await?;
            if task.section_id == source_id {
                if task.is_archived {
                    return Err(Error::Conflict("cannot move an archived task".to_string()));
                }
                break (tx, source_id);
            }

            tx.rollback().await?;
            if attempts == LOCK_ATTEMPTS {
                return Err(Error::Conflict("task moved concurrently, retry".to_string()));
            }
        };

        if source_id == section_id {
            let active = active_positions(&mut tx, ACTIVE_TASKS, section_id).await?;
            apply_plan(&mut tx, "tasks", &position::plan_move(&active, task_id, target)).await?;
            let record = lock_task(&mut tx, task_id).await?;
            tx.commit().await?;
            return Ok(record);
        }

        let source = active_positions(&mut tx, ACTIVE_TASKS, source_id).await?;
        apply_plan(&mut tx, "tasks", &position::plan_removal(&source, task_id)).await?;

        let destination = active_positions(&mut tx, ACTIVE_TASKS, section_id).await?;
        let (slot, shifts) = position::plan_insertion(&destination, task_id, Some(target));
        apply_plan(&mut tx, "tasks", &shifts).await?;

        let record = sqlx::query_as::<_, TaskRecord>(
            r#"
            UPDATE tasks SET section_id = $2, position = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(task_id)
        .bind(section_id)
        .bind(slot)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(record)
    }

    pub async fn delete_task(&self, task_id: Uuid) -> Result<()> {
        let (mut tx, task) = self.lock_task_in_section(task_id).await?;
        let section_id = task.section_id;

        sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(task_id)
            .execute(&mut *tx)
            .await?;

        let active = active_positions(&mut tx, ACTIVE_TASKS, section_id).await?;
        apply_plan(&mut tx, "tasks", &position::normalize(&active)).await?;

        tx.commit().await?;
        Ok(())
    }

    // ========================================================================
    // Activity Operations
    // ========================================================================

    pub async fn record_event(&self, event: &Event) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO events (
                id, workspace_id, actor_id, kind, entity_type, entity_id,
                summary, payload, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(event.id)
        .bind(event.workspace_id)
        .bind(event.actor_id)
        .bind(event.kind.as_str())
        .bind(event.entity_type.as_str())
        .bind(event.entity_id)
        .bind(&event.summary)
        .bind(&event.payload)
        .bind(event.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn list_events(&self, workspace_id: Uuid) -> Result<Vec<EventRecord>> {
        let records = sqlx::query_as::<_, EventRecord>(
            "SELECT * FROM events WHERE workspace_id = $1 ORDER BY created_at DESC, id DESC",
        )
        .bind(workspace_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    /// Get aggregate statistics
    pub async fn get_aggregate_stats(&self) -> Result<StoreStats> {
        let row = sqlx::query(
            r#"
            SELECT
                (SELECT COUNT(*) FROM users) AS users,
                (SELECT COUNT(*) FROM workspaces) AS workspaces,
                (SELECT COUNT(*) FROM sections) AS sections,
                (SELECT COUNT(*) FROM tasks) AS tasks,
                (SELECT COUNT(*) FROM tasks WHERE status = 'done') AS completed_tasks,
                (SELECT COUNT(*) FROM events) AS events
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(StoreStats {
            users: row.get("users"),
            workspaces: row.get("workspaces"),
            sections: row.get("sections"),
            tasks: row.get("tasks"),
            completed_tasks: row.get("completed_tasks"),
            events: row.get("events"),
        })
    }
}

// ============================================================================
// Transaction helpers
// ============================================================================

/// The workspace row serialises every section reposition in that workspace.
async fn lock_workspace(tx: &mut Tx<'_>, workspace_id: Uuid) -> Result<()> {
    sqlx::query("SELECT id FROM workspaces WHERE id = $1 FOR UPDATE")
        .bind(workspace_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or(Error::NotFound("Workspace"))?;

    Ok(())
}

/// The section row serialises every task reposition in that section.
async fn lock_section(tx: &mut Tx<'_>, section_id: Uuid) -> Result<SectionRecord> {
    sqlx::query_as::<_, SectionRecord>("SELECT * FROM sections WHERE id = $1 FOR UPDATE")
        .bind(section_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or(Error::NotFound("Section"))
}

async fn lock_task(tx: &mut Tx<'_>, task_id: Uuid) -> Result<TaskRecord> {
    sqlx::query_as::<_, TaskRecord>("SELECT * FROM tasks WHERE id = $1 FOR UPDATE")
        .bind(task_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or(Error::NotFound("Task"))
}

async fn active_positions(tx: &mut Tx<'_>, sql: &str, container: Uuid) -> Result<Vec<(Uuid, i32)>> {
    let rows = sqlx::query_as::<_, (Uuid, i32)>(sql)
        .bind(container)
        .fetch_all(&mut **tx)
        .await?;

    Ok(rows)
}

/// Writes a position plan in a single statement.
async fn apply_plan(tx: &mut Tx<'_>, table: &'static str, plan: &[(Uuid, i32)]) -> Result<()> {
    if plan.is_empty() {
        return Ok(());
    }

    let (ids, positions): (Vec<Uuid>, Vec<i32>) = plan.iter().copied().unzip();
    let sql = format!(
        r#"
        UPDATE {table} AS t
        SET position = u.position, updated_at = NOW()
        FROM UNNEST($1::uuid[], $2::int4[]) AS u(id, position)
        WHERE t.id = u.id
        "#
    );

    sqlx::query(&sql)
        .bind(ids)
        .bind(positions)
        .execute(&mut **tx)
        .await?;

    Ok(())
}

async fn upsert_member(tx: &mut Tx<'_>, member: &WorkspaceMember) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO workspace_members (
            workspace_id, user_id, can_read, can_write, can_delete, can_admin, joined_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (workspace_id, user_id) DO UPDATE SET
            can_read = EXCLUDED.can_read,
            can_write = EXCLUDED.can_write,
            can_delete = EXCLUDED.can_delete,
            can_admin = EXCLUDED.can_admin
        "#,
    )
    .bind(member.workspace_id)
    .bind(member.user_id)
    .bind(member.permissions.read)
    .bind(member.permissions.write)
    .bind(member.permissions.delete)
    .bind(member.permissions.admin)
    .bind(member.joined_at)
    .execute(&mut **tx)
    .await?;

    Ok(())
}
