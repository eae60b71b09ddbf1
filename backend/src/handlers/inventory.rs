//! HTTP handlers for inventory management endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::{Availability, CommittedMovement, InventoryCategory, InventoryItem, InventoryTransaction};
use uuid::Uuid;
use validator::Validate;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::inventory::{
    CreateItemInput, RecordPurchaseInput, RecordUsageInput, UpdateItemInput,
};
use crate::services::FarmService;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct InventoryQuery {
    pub category: Option<InventoryCategory>,
}

#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    pub quantity: Decimal,
}

async fn authorize_farm(state: &AppState, user: &CurrentUser, farm_id: Uuid) -> AppResult<()> {
    FarmService::new(state.db.clone())
        .ensure_access(user.0.user_id, farm_id)
        .await
}

/// Load an item and check the caller owns its farm
async fn owned_item(state: &AppState, user: &CurrentUser, item_id: Uuid) -> AppResult<InventoryItem> {
    let item = state.inventory.get_item(item_id).await?;
    authorize_farm(state, user, item.farm_id).await?;
    Ok(item)
}

/// List items of a farm, optionally one category
pub async fn list_inventory_items(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(farm_id): Path<Uuid>,
    Query(query): Query<InventoryQuery>,
) -> AppResult<Json<Vec<InventoryItem>>> {
    authorize_farm(&state, &current_user, farm_id).await?;

    let items = state
        .inventory
        .list_items(Some(farm_id), query.category)
        .await?;
    Ok(Json(items))
}

/// Register an item with zero stock
pub async fn create_inventory_item(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(farm_id): Path<Uuid>,
    Json(input): Json<CreateItemInput>,
) -> AppResult<impl IntoResponse> {
    authorize_farm(&state, &current_user, farm_id).await?;

    let item = state.inventory.create_item(farm_id, input).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// Record a purchase against an existing or new item
pub async fn record_inventory_purchase(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(farm_id): Path<Uuid>,
    Json(input): Json<RecordPurchaseInput>,
) -> AppResult<impl IntoResponse> {
    authorize_farm(&state, &current_user, farm_id).await?;

    let committed: CommittedMovement = state.inventory.record_purchase(farm_id, input).await?;
    Ok((StatusCode::CREATED, Json(committed)))
}

pub async fn list_low_stock_items(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(farm_id): Path<Uuid>,
) -> AppResult<Json<Vec<InventoryItem>>> {
    authorize_farm(&state, &current_user, farm_id).await?;

    let items = state.inventory.low_stock(farm_id).await?;
    Ok(Json(items))
}

pub async fn get_inventory_item(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(item_id): Path<Uuid>,
) -> AppResult<Json<InventoryItem>> {
    let item = owned_item(&state, &current_user, item_id).await?;
    Ok(Json(item))
}

/// Rename an item or change its low-stock threshold
pub async fn update_inventory_item(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(item_id): Path<Uuid>,
    Json(input): Json<UpdateItemInput>,
) -> AppResult<Json<InventoryItem>> {
    owned_item(&state, &current_user, item_id).await?;

    let item = state.inventory.update_item(item_id, input).await?;
    Ok(Json(item))
}

/// Transactions of an item, newest first
pub async fn list_item_transactions(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(item_id): Path<Uuid>,
) -> AppResult<Json<Vec<InventoryTransaction>>> {
    owned_item(&state, &current_user, item_id).await?;

    let transactions = state.inventory.list_transactions(item_id).await?;
    Ok(Json(transactions))
}

pub async fn check_item_availability(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(item_id): Path<Uuid>,
    Query(query): Query<AvailabilityQuery>,
) -> AppResult<Json<Availability>> {
    owned_item(&state, &current_user, item_id).await?;

    let availability = state
        .inventory
        .check_availability(item_id, query.quantity)
        .await?;
    Ok(Json(availability))
}

/// Record usage of an item; fails with 422 when stock is short
pub async fn record_item_usage(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(item_id): Path<Uuid>,
    Json(input): Json<RecordUsageInput>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;
    owned_item(&state, &current_user, item_id).await?;

    let committed = state
        .inventory
        .record_usage(item_id, input.quantity, &input.note)
        .await?;
    Ok((StatusCode::CREATED, Json(committed)))
}
