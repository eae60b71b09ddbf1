//! Farm management HTTP handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use shared::Farm;
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::farm::{CreateFarmInput, FarmService, UpdateFarmInput};
use crate::AppState;

/// List farms of the current user
pub async fn list_farms(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<Farm>>> {
    let service = FarmService::new(state.db);
    let farms = service.list_farms(current_user.0.user_id).await?;
    Ok(Json(farms))
}

pub async fn get_farm(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(farm_id): Path<Uuid>,
) -> AppResult<Json<Farm>> {
    let service = FarmService::new(state.db);
    let farm = service.get_farm(current_user.0.user_id, farm_id).await?;
    Ok(Json(farm))
}

pub async fn create_farm(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateFarmInput>,
) -> AppResult<impl IntoResponse> {
    let service = FarmService::new(state.db);
    let farm = service.create_farm(current_user.0.user_id, input).await?;
    Ok((StatusCode::CREATED, Json(farm)))
}

pub async fn update_farm(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(farm_id): Path<Uuid>,
    Json(input): Json<UpdateFarmInput>,
) -> AppResult<Json<Farm>> {
    let service = FarmService::new(state.db);
    let farm = service
        .update_farm(current_user.0.user_id, farm_id, input)
        .await?;
    Ok(Json(farm))
}

/// Delete a farm with all of its records
pub async fn delete_farm(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(farm_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let service = FarmService::new(state.db);
    service.delete_farm(current_user.0.user_id, farm_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
