//! Batch management HTTP handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use shared::Batch;
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::batch::{BatchService, CreateBatchInput, UpdateBatchInput};
use crate::services::FarmService;
use crate::AppState;

/// List batches of a farm
pub async fn list_batches(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(farm_id): Path<Uuid>,
) -> AppResult<Json<Vec<Batch>>> {
    FarmService::new(state.db.clone())
        .ensure_access(current_user.0.user_id, farm_id)
        .await?;

    let batches = BatchService::new(state.db).list_batches(farm_id).await?;
    Ok(Json(batches))
}

/// Start a batch on a farm
pub async fn create_batch(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(farm_id): Path<Uuid>,
    Json(input): Json<CreateBatchInput>,
) -> AppResult<impl IntoResponse> {
    FarmService::new(state.db.clone())
        .ensure_access(current_user.0.user_id, farm_id)
        .await?;

    let batch = BatchService::new(state.db).create_batch(farm_id, input).await?;
    Ok((StatusCode::CREATED, Json(batch)))
}

pub async fn get_batch(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(batch_id): Path<Uuid>,
) -> AppResult<Json<Batch>> {
    let batch = BatchService::new(state.db)
        .get_owned(current_user.0.user_id, batch_id)
        .await?;
    Ok(Json(batch))
}

pub async fn update_batch(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(batch_id): Path<Uuid>,
    Json(input): Json<UpdateBatchInput>,
) -> AppResult<Json<Batch>> {
    let service = BatchService::new(state.db);
    let batch = service.get_owned(current_user.0.user_id, batch_id).await?;
    let updated = service.update_batch(&batch, input).await?;
    Ok(Json(updated))
}

/// Close a batch so it accepts no further logs
pub async fn close_batch(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(batch_id): Path<Uuid>,
) -> AppResult<Json<Batch>> {
    let service = BatchService::new(state.db);
    let batch = service.get_owned(current_user.0.user_id, batch_id).await?;
    let closed = service.close_batch(&batch).await?;
    Ok(Json(closed))
}

pub async fn delete_batch(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(batch_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let service = BatchService::new(state.db);
    let batch = service.get_owned(current_user.0.user_id, batch_id).await?;
    service.delete_batch(&batch).await?;
    Ok(StatusCode::NO_CONTENT)
}
