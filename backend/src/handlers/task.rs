//! Task assignment HTTP handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use shared::{Task, TaskStatus};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::task::{CreateTaskInput, TaskService, TransitionTaskInput, UpdateTaskInput};
use crate::services::FarmService;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct TaskQuery {
    pub status: Option<TaskStatus>,
}

pub async fn list_farm_tasks(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(farm_id): Path<Uuid>,
    Query(query): Query<TaskQuery>,
) -> AppResult<Json<Vec<Task>>> {
    FarmService::new(state.db.clone())
        .ensure_access(current_user.0.user_id, farm_id)
        .await?;

    let tasks = TaskService::new(state.db)
        .list_for_farm(farm_id, query.status)
        .await?;
    Ok(Json(tasks))
}

pub async fn create_task(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(farm_id): Path<Uuid>,
    Json(input): Json<CreateTaskInput>,
) -> AppResult<impl IntoResponse> {
    FarmService::new(state.db.clone())
        .ensure_access(current_user.0.user_id, farm_id)
        .await?;

    let task = TaskService::new(state.db)
        .create_task(farm_id, current_user.0.user_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(task)))
}

/// Tasks assigned to the current user
pub async fn list_my_tasks(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<Task>>> {
    let tasks = TaskService::new(state.db)
        .list_assigned(current_user.0.user_id)
        .await?;
    Ok(Json(tasks))
}

pub async fn update_task(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(task_id): Path<Uuid>,
    Json(input): Json<UpdateTaskInput>,
) -> AppResult<Json<Task>> {
    let service = TaskService::new(state.db);
    let task = service.get_owned(current_user.0.user_id, task_id).await?;
    let updated = service.update_task(&task, input).await?;
    Ok(Json(updated))
}

/// Move a task along its workflow; the farm owner or the assignee may do this
pub async fn transition_task(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(task_id): Path<Uuid>,
    Json(input): Json<TransitionTaskInput>,
) -> AppResult<Json<Task>> {
    let service = TaskService::new(state.db);
    let task = service.get_visible(current_user.0.user_id, task_id).await?;
    let updated = service.transition(&task, input.status).await?;
    Ok(Json(updated))
}

pub async fn delete_task(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(task_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let service = TaskService::new(state.db);
    let task = service.get_owned(current_user.0.user_id, task_id).await?;
    service.delete_task(&task).await?;
    Ok(StatusCode::NO_CONTENT)
}
