//! Sales HTTP handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use shared::{DateRange, Sale};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::CurrentUser;
use crate::services::sales::{RecordSaleInput, SalesService};
use crate::services::FarmService;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct SalesQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl SalesQuery {
    /// Both bounds or none
    fn range(&self) -> AppResult<Option<DateRange>> {
        match (self.start_date, self.end_date) {
            (None, None) => Ok(None),
            (Some(start), Some(end)) if start <= end => Ok(Some(DateRange::new(start, end))),
            (Some(_), Some(_)) => Err(AppError::validation(
                "start_date",
                "Start date must not be after end date",
            )),
            _ => Err(AppError::validation(
                "end_date",
                "Provide both start_date and end_date",
            )),
        }
    }
}

/// Sales of a farm, newest first
pub async fn list_sales(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(farm_id): Path<Uuid>,
    Query(query): Query<SalesQuery>,
) -> AppResult<Json<Vec<Sale>>> {
    FarmService::new(state.db.clone())
        .ensure_access(current_user.0.user_id, farm_id)
        .await?;

    let sales = SalesService::new(state.db)
        .list_sales(farm_id, query.range()?)
        .await?;
    Ok(Json(sales))
}

pub async fn record_sale(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(farm_id): Path<Uuid>,
    Json(input): Json<RecordSaleInput>,
) -> AppResult<impl IntoResponse> {
    FarmService::new(state.db.clone())
        .ensure_access(current_user.0.user_id, farm_id)
        .await?;

    let sale = SalesService::new(state.db).record_sale(farm_id, input).await?;
    Ok((StatusCode::CREATED, Json(sale)))
}

pub async fn get_sale(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(sale_id): Path<Uuid>,
) -> AppResult<Json<Sale>> {
    let sale = SalesService::new(state.db)
        .get_owned(current_user.0.user_id, sale_id)
        .await?;
    Ok(Json(sale))
}
