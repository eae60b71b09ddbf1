//! Health record HTTP handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use shared::HealthRecord;
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::health_record::{CreateHealthRecordInput, HealthRecordService};
use crate::services::BatchService;
use crate::AppState;

pub async fn list_health_records(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(batch_id): Path<Uuid>,
) -> AppResult<Json<Vec<HealthRecord>>> {
    let batch = BatchService::new(state.db.clone())
        .get_owned(current_user.0.user_id, batch_id)
        .await?;

    let service = HealthRecordService::new(state.db, state.inventory);
    let records = service.list_for_batch(batch.id).await?;
    Ok(Json(records))
}

/// Record a health event, deducting medication from stock
pub async fn create_health_record(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(batch_id): Path<Uuid>,
    Json(input): Json<CreateHealthRecordInput>,
) -> AppResult<impl IntoResponse> {
    let batch = BatchService::new(state.db.clone())
        .get_owned(current_user.0.user_id, batch_id)
        .await?;

    let service = HealthRecordService::new(state.db, state.inventory);
    let record = service
        .create_record(&batch, current_user.0.user_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(record)))
}
