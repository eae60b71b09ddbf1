//! Task assignment service

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use shared::{Task, TaskPriority, TaskStatus};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};

/// Task service
#[derive(Clone)]
pub struct TaskService {
    db: PgPool,
}

#[derive(Debug, FromRow)]
struct TaskRow {
    id: Uuid,
    farm_id: Uuid,
    title: String,
    description: Option<String>,
    assignee_id: Option<Uuid>,
    due_date: Option<NaiveDate>,
    priority: String,
    status: String,
    created_by: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<TaskRow> for Task {
    type Error = AppError;

    fn try_from(row: TaskRow) -> Result<Self, Self::Error> {
        Ok(Task {
            id: row.id,
            farm_id: row.farm_id,
            title: row.title,
            description: row.description,
            assignee_id: row.assignee_id,
            due_date: row.due_date,
            priority: row.priority.parse::<TaskPriority>().map_err(AppError::Internal)?,
            status: row.status.parse::<TaskStatus>().map_err(AppError::Internal)?,
            created_by: row.created_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Input for creating a task
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTaskInput {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: String,
    #[validate(length(max = 2000, message = "Description must be at most 2000 characters"))]
    pub description: Option<String>,
    pub assignee_id: Option<Uuid>,
    pub due_date: Option<NaiveDate>,
    pub priority: Option<TaskPriority>,
}

/// Input for editing a task
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateTaskInput {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: Option<String>,
    #[validate(length(max = 2000, message = "Description must be at most 2000 characters"))]
    pub description: Option<String>,
    pub assignee_id: Option<Uuid>,
    pub due_date: Option<NaiveDate>,
    pub priority: Option<TaskPriority>,
}

/// Input for moving a task through its workflow
#[derive(Debug, Deserialize)]
pub struct TransitionTaskInput {
    pub status: TaskStatus,
}

const TASK_COLUMNS: &str = "t.id, t.farm_id, t.title, t.description, t.assignee_id, t.due_date, \
                            t.priority, t.status, t.created_by, t.created_at, t.updated_at";

/// Check a status change against the task workflow
pub fn check_transition(task: &Task, next: TaskStatus) -> AppResult<()> {
    if task.status.can_transition_to(next) {
        Ok(())
    } else {
        Err(AppError::InvalidStateTransition(format!(
            "Cannot move task from {} to {}",
            task.status.as_str(),
            next.as_str()
        )))
    }
}

impl TaskService {
    /// Create a new TaskService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create a task on a farm
    pub async fn create_task(
        &self,
        farm_id: Uuid,
        created_by: Uuid,
        input: CreateTaskInput,
    ) -> AppResult<Task> {
        input.validate()?;

        let task: Task = sqlx::query_as::<_, TaskRow>(
            r#"
            INSERT INTO tasks (farm_id, title, description, assignee_id, due_date, priority, status, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, farm_id, title, description, assignee_id, due_date, priority, status,
                      created_by, created_at, updated_at
            "#,
        )
        .bind(farm_id)
        .bind(input.title.trim())
        .bind(&input.description)
        .bind(input.assignee_id)
        .bind(input.due_date)
        .bind(input.priority.unwrap_or(TaskPriority::Medium).as_str())
        .bind(TaskStatus::Pending.as_str())
        .bind(created_by)
        .fetch_one(&self.db)
        .await?
        .try_into()?;

        tracing::info!(task_id = %task.id, farm_id = %farm_id, assignee = ?task.assignee_id, "Task created");
        Ok(task)
    }

    /// Tasks of a farm, optionally filtered by status
    pub async fn list_for_farm(&self, farm_id: Uuid, status: Option<TaskStatus>) -> AppResult<Vec<Task>> {
        let query = format!(
            "SELECT {TASK_COLUMNS} FROM tasks t \
             WHERE t.farm_id = $1 AND ($2::text IS NULL OR t.status = $2) \
             ORDER BY t.due_date ASC NULLS LAST, t.created_at DESC"
        );
        let rows = sqlx::query_as::<_, TaskRow>(&query)
            .bind(farm_id)
            .bind(status.map(|s| s.as_str()))
            .fetch_all(&self.db)
            .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Open and finished tasks assigned to a user across farms
    pub async fn list_assigned(&self, user_id: Uuid) -> AppResult<Vec<Task>> {
        let query = format!(
            "SELECT {TASK_COLUMNS} FROM tasks t \
             WHERE t.assignee_id = $1 \
             ORDER BY t.due_date ASC NULLS LAST, t.created_at DESC"
        );
        let rows = sqlx::query_as::<_, TaskRow>(&query)
            .bind(user_id)
            .fetch_all(&self.db)
            .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Get a task the user owns through its farm
    pub async fn get_owned(&self, owner_id: Uuid, task_id: Uuid) -> AppResult<Task> {
        let query = format!(
            "SELECT {TASK_COLUMNS} FROM tasks t \
             JOIN farms f ON f.id = t.farm_id \
             WHERE t.id = $1 AND f.owner_id = $2"
        );
        sqlx::query_as::<_, TaskRow>(&query)
            .bind(task_id)
            .bind(owner_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Task".to_string()))?
            .try_into()
    }

    /// Get a task the user either owns through its farm or is assigned to
    pub async fn get_visible(&self, user_id: Uuid, task_id: Uuid) -> AppResult<Task> {
        let query = format!(
            "SELECT {TASK_COLUMNS} FROM tasks t \
             JOIN farms f ON f.id = t.farm_id \
             WHERE t.id = $1 AND (f.owner_id = $2 OR t.assignee_id = $2)"
        );
        sqlx::query_as::<_, TaskRow>(&query)
            .bind(task_id)
            .bind(user_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Task".to_string()))?
            .try_into()
    }

    /// Edit task details; status changes go through `transition`
    pub async fn update_task(&self, task: &Task, input: UpdateTaskInput) -> AppResult<Task> {
        input.validate()?;
        if !task.status.is_open() {
            return Err(AppError::InvalidStateTransition(
                "Finished tasks cannot be edited".to_string(),
            ));
        }

        sqlx::query_as::<_, TaskRow>(
            r#"
            UPDATE tasks
            SET title = COALESCE($1, title), description = COALESCE($2, description),
                assignee_id = COALESCE($3, assignee_id), due_date = COALESCE($4, due_date),
                priority = COALESCE($5, priority), updated_at = NOW()
            WHERE id = $6
            RETURNING id, farm_id, title, description, assignee_id, due_date, priority, status,
                      created_by, created_at, updated_at
            "#,
        )
        .bind(input.title.as_deref().map(str::trim))
        .bind(&input.description)
        .bind(input.assignee_id)
        .bind(input.due_date)
        .bind(input.priority.map(|p| p.as_str()))
        .bind(task.id)
        .fetch_one(&self.db)
        .await?
        .try_into()
    }

    /// Move a task to a new status
    pub async fn transition(&self, task: &Task, next: TaskStatus) -> AppResult<Task> {
        check_transition(task, next)?;

        // Guard on the old status so a concurrent move is not overwritten
        let updated = sqlx::query_as::<_, TaskRow>(
            r#"
            UPDATE tasks
            SET status = $1, updated_at = NOW()
            WHERE id = $2 AND status = $3
            RETURNING id, farm_id, title, description, assignee_id, due_date, priority, status,
                      created_by, created_at, updated_at
            "#,
        )
        .bind(next.as_str())
        .bind(task.id)
        .bind(task.status.as_str())
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| {
            AppError::Conflict {
                resource: "status".to_string(),
                message: "Task was changed by someone else".to_string(),
            }
        })?;

        tracing::info!(task_id = %task.id, from = task.status.as_str(), to = next.as_str(), "Task status changed");
        updated.try_into()
    }

    /// Delete a task
    pub async fn delete_task(&self, task: &Task) -> AppResult<()> {
        sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(task.id)
            .execute(&self.db)
            .await?;

        tracing::info!(task_id = %task.id, "Task deleted");
        Ok(())
    }
}
