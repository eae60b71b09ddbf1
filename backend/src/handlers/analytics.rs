//! Analytics handlers for dashboards, charts and report export

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use shared::{CategoryStock, ChartSeries, DashboardSummary, DateRange, TimeBucket};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::CurrentUser;
use crate::services::{
    AnalyticsService, BatchService, DailyLogService, FarmService, SalesService, TaskService,
};
use crate::AppState;

const DEFAULT_WINDOW_DAYS: u32 = 30;

#[derive(Debug, Deserialize)]
pub struct ReportQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub bucket: Option<String>, // "day" or "month"
    pub format: Option<String>, // "json" or "csv"
}

impl ReportQuery {
    /// Requested range, defaulting to the last 30 days
    pub fn range(&self, today: NaiveDate) -> AppResult<DateRange> {
        let end = self.end_date.unwrap_or(today);
        let range = match self.start_date {
            Some(start) => DateRange::new(start, end),
            None => DateRange::last_days(end, DEFAULT_WINDOW_DAYS),
        };
        if !range.is_valid() {
            return Err(AppError::validation(
                "start_date",
                "Start date must not be after end date",
            ));
        }
        Ok(range)
    }

    pub fn bucket(&self) -> AppResult<TimeBucket> {
        match self.bucket.as_deref() {
            None => Ok(TimeBucket::default()),
            Some(raw) => raw
                .parse()
                .map_err(|e: String| AppError::validation("bucket", e)),
        }
    }

    fn wants_csv(&self) -> bool {
        self.format.as_deref() == Some("csv")
    }
}

fn analytics_service(state: &AppState) -> AnalyticsService {
    AnalyticsService::new(
        BatchService::new(state.db.clone()),
        DailyLogService::new(state.db.clone(), state.inventory.clone()),
        SalesService::new(state.db.clone()),
        TaskService::new(state.db.clone()),
        state.inventory.clone(),
    )
}

async fn authorize(state: &AppState, user: &CurrentUser, farm_id: Uuid) -> AppResult<()> {
    FarmService::new(state.db.clone())
        .ensure_access(user.0.user_id, farm_id)
        .await
}

fn csv_or_json<T: Serialize>(data: Vec<T>, csv: bool, filename: &str) -> AppResult<Response> {
    if csv {
        let body = AnalyticsService::export_to_csv(&data)?;
        let disposition = format!("attachment; filename=\"{}\"", filename);
        Ok((
            [
                (header::CONTENT_TYPE, "text/csv".to_string()),
                (header::CONTENT_DISPOSITION, disposition),
            ],
            body,
        )
            .into_response())
    } else {
        Ok(Json(data).into_response())
    }
}

/// Dashboard summary for a farm
pub async fn get_dashboard(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(farm_id): Path<Uuid>,
    Query(query): Query<ReportQuery>,
) -> AppResult<Json<DashboardSummary>> {
    authorize(&state, &current_user, farm_id).await?;

    let today = Utc::now().date_naive();
    let summary = analytics_service(&state)
        .dashboard(farm_id, query.range(today)?, today)
        .await?;
    Ok(Json(summary))
}

pub async fn get_revenue_chart(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(farm_id): Path<Uuid>,
    Query(query): Query<ReportQuery>,
) -> AppResult<Json<ChartSeries>> {
    authorize(&state, &current_user, farm_id).await?;

    let range = query.range(Utc::now().date_naive())?;
    let series = analytics_service(&state)
        .revenue_chart(farm_id, range, query.bucket()?)
        .await?;
    Ok(Json(series))
}

pub async fn get_production_chart(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(farm_id): Path<Uuid>,
    Query(query): Query<ReportQuery>,
) -> AppResult<Json<Vec<ChartSeries>>> {
    authorize(&state, &current_user, farm_id).await?;

    let range = query.range(Utc::now().date_naive())?;
    let series = analytics_service(&state).production_chart(farm_id, range).await?;
    Ok(Json(series))
}

pub async fn get_stock_chart(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(farm_id): Path<Uuid>,
) -> AppResult<Json<Vec<CategoryStock>>> {
    authorize(&state, &current_user, farm_id).await?;

    let stock = analytics_service(&state).stock_chart(farm_id).await?;
    Ok(Json(stock))
}

pub async fn get_usage_chart(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path((farm_id, item_id)): Path<(Uuid, Uuid)>,
    Query(query): Query<ReportQuery>,
) -> AppResult<Json<ChartSeries>> {
    authorize(&state, &current_user, farm_id).await?;

    let range = query.range(Utc::now().date_naive())?;
    let series = analytics_service(&state)
        .usage_chart(farm_id, item_id, range, query.bucket()?)
        .await?;
    Ok(Json(series))
}

/// Sales report as JSON or CSV
pub async fn get_sales_report(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(farm_id): Path<Uuid>,
    Query(query): Query<ReportQuery>,
) -> AppResult<Response> {
    authorize(&state, &current_user, farm_id).await?;

    let range = query.range(Utc::now().date_naive())?;
    let rows = analytics_service(&state).sales_report(farm_id, range).await?;
    csv_or_json(rows, query.wants_csv(), "sales_report.csv")
}

/// Feed and medication usage report as JSON or CSV
pub async fn get_usage_report(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(farm_id): Path<Uuid>,
    Query(query): Query<ReportQuery>,
) -> AppResult<Response> {
    authorize(&state, &current_user, farm_id).await?;

    let range = query.range(Utc::now().date_naive())?;
    let rows = analytics_service(&state).usage_report(farm_id, range).await?;
    csv_or_json(rows, query.wants_csv(), "usage_report.csv")
}
