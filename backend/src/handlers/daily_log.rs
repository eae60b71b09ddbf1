//! Daily log HTTP handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use shared::DailyLog;
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::daily_log::{CreateDailyLogInput, DailyLogService};
use crate::services::BatchService;
use crate::AppState;

/// Logs of a batch, newest first
pub async fn list_daily_logs(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(batch_id): Path<Uuid>,
) -> AppResult<Json<Vec<DailyLog>>> {
    let batch = BatchService::new(state.db.clone())
        .get_owned(current_user.0.user_id, batch_id)
        .await?;

    let service = DailyLogService::new(state.db, state.inventory);
    let logs = service.list_for_batch(batch.id).await?;
    Ok(Json(logs))
}

/// Save a daily log; fails without writing anything when stock is short
pub async fn create_daily_log(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(batch_id): Path<Uuid>,
    Json(input): Json<CreateDailyLogInput>,
) -> AppResult<impl IntoResponse> {
    let batch = BatchService::new(state.db.clone())
        .get_owned(current_user.0.user_id, batch_id)
        .await?;

    let service = DailyLogService::new(state.db, state.inventory);
    let log = service
        .create_log(&batch, current_user.0.user_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(log)))
}

pub async fn get_daily_log(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(log_id): Path<Uuid>,
) -> AppResult<Json<DailyLog>> {
    let service = DailyLogService::new(state.db, state.inventory);
    let log = service.get_owned(current_user.0.user_id, log_id).await?;
    Ok(Json(log))
}
