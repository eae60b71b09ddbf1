//! Dashboard analytics and report exports
//!
//! Rows are loaded per farm and reduced by the pure functions in
//! `shared::analytics`, which the browser client also runs.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use shared::{
    production_series, revenue_series, stock_by_category, summarize_dashboard,
    usage_series, CategoryStock, ChartSeries, DashboardInputs, DashboardSummary, DateRange,
    InventoryItem, InventoryTransaction, TimeBucket, TransactionKind,
};
use uuid::Uuid;

use super::{
    batch::BatchService, daily_log::DailyLogService, inventory::InventoryService,
    sales::SalesService, task::TaskService,
};
use crate::error::{AppError, AppResult};

/// Analytics service
#[derive(Clone)]
pub struct AnalyticsService {
    batches: BatchService,
    logs: DailyLogService,
    sales: SalesService,
    tasks: TaskService,
    inventory: InventoryService,
}

/// One line of the sales report export
#[derive(Debug, Serialize)]
pub struct SalesReportRow {
    pub sale_date: NaiveDate,
    pub product: String,
    pub quantity: Decimal,
    pub unit: String,
    pub unit_price: Decimal,
    pub total_amount: Decimal,
    pub buyer: Option<String>,
}

/// One line of the usage report export
#[derive(Debug, Serialize)]
pub struct UsageReportRow {
    pub transaction_date: NaiveDate,
    pub item_name: String,
    pub category: String,
    pub quantity: Decimal,
    pub unit: String,
    pub notes: Option<String>,
}

/// Build usage report rows for a date range, oldest first
pub fn usage_report_rows(
    history: &[(InventoryItem, Vec<InventoryTransaction>)],
    range: DateRange,
) -> Vec<UsageReportRow> {
    let mut rows: Vec<UsageReportRow> = history
        .iter()
        .flat_map(|(item, transactions)| {
            transactions
                .iter()
                .filter(|t| t.kind == TransactionKind::Usage && range.contains(t.transaction_date))
                .map(move |t| UsageReportRow {
                    transaction_date: t.transaction_date,
                    item_name: item.name.clone(),
                    category: item.category.as_str().to_string(),
                    quantity: t.quantity,
                    unit: t.unit.clone(),
                    notes: t.notes.clone(),
                })
        })
        .collect();
    rows.sort_by(|a, b| {
        a.transaction_date
            .cmp(&b.transaction_date)
            .then_with(|| a.item_name.cmp(&b.item_name))
    });
    rows
}

impl AnalyticsService {
    pub fn new(
        batches: BatchService,
        logs: DailyLogService,
        sales: SalesService,
        tasks: TaskService,
        inventory: InventoryService,
    ) -> Self {
        Self {
            batches,
            logs,
            sales,
            tasks,
            inventory,
        }
    }

    /// Dashboard summary for one farm
    pub async fn dashboard(
        &self,
        farm_id: Uuid,
        window: DateRange,
        today: NaiveDate,
    ) -> AppResult<DashboardSummary> {
        let batches = self.batches.list_batches(farm_id).await?;
        let logs = self.logs.list_for_farm(farm_id, window).await?;
        let sales = self.sales.list_sales(farm_id, Some(window)).await?;
        let tasks = self.tasks.list_for_farm(farm_id, None).await?;
        let items = self.inventory.list_items(Some(farm_id), None).await?;

        let summary = summarize_dashboard(
            farm_id,
            window,
            today,
            DashboardInputs {
                batches: &batches,
                logs: &logs,
                sales: &sales,
                tasks: &tasks,
                items: &items,
            },
        );

        tracing::debug!(farm_id = %farm_id, revenue = %summary.revenue, "Dashboard computed");
        Ok(summary)
    }

    pub async fn revenue_chart(
        &self,
        farm_id: Uuid,
        range: DateRange,
        bucket: TimeBucket,
    ) -> AppResult<ChartSeries> {
        let sales = self.sales.list_sales(farm_id, Some(range)).await?;
        Ok(revenue_series(&sales, bucket))
    }

    /// Eggs collected and mortality per day
    pub async fn production_chart(&self, farm_id: Uuid, range: DateRange) -> AppResult<Vec<ChartSeries>> {
        let logs = self.logs.list_for_farm(farm_id, range).await?;
        Ok(production_series(&logs))
    }

    pub async fn stock_chart(&self, farm_id: Uuid) -> AppResult<Vec<CategoryStock>> {
        let items = self.inventory.list_items(Some(farm_id), None).await?;
        Ok(stock_by_category(&items))
    }

    /// Usage of one farm item per period
    pub async fn usage_chart(
        &self,
        farm_id: Uuid,
        item_id: Uuid,
        range: DateRange,
        bucket: TimeBucket,
    ) -> AppResult<ChartSeries> {
        let item = self.inventory.get_item(item_id).await?;
        if item.farm_id != farm_id {
            return Err(AppError::NotFound("Inventory item".to_string()));
        }

        let transactions: Vec<InventoryTransaction> = self
            .inventory
            .list_transactions(item_id)
            .await?
            .into_iter()
            .filter(|t| range.contains(t.transaction_date))
            .collect();

        let mut series = usage_series(&transactions, bucket);
        series.name = item.name;
        Ok(series)
    }

    /// Sales report rows, oldest first
    pub async fn sales_report(&self, farm_id: Uuid, range: DateRange) -> AppResult<Vec<SalesReportRow>> {
        let mut sales = self.sales.list_sales(farm_id, Some(range)).await?;
        sales.reverse();

        Ok(sales
            .into_iter()
            .map(|s| SalesReportRow {
                sale_date: s.sale_date,
                product: s.product,
                quantity: s.quantity,
                unit: s.unit,
                unit_price: s.unit_price,
                total_amount: s.total_amount,
                buyer: s.buyer,
            })
            .collect())
    }

    /// Usage report rows across every item of a farm
    pub async fn usage_report(&self, farm_id: Uuid, range: DateRange) -> AppResult<Vec<UsageReportRow>> {
        let items = self.inventory.list_items(Some(farm_id), None).await?;
        let mut history = Vec::with_capacity(items.len());
        for item in items {
            let transactions = self.inventory.list_transactions(item.id).await?;
            history.push((item, transactions));
        }
        Ok(usage_report_rows(&history, range))
    }

    /// Export report data as CSV
    pub fn export_to_csv<T: Serialize>(data: &[T]) -> AppResult<String> {
        let mut wtr = csv::Writer::from_writer(vec![]);
        for record in data {
            wtr.serialize(record)
                .map_err(|e| AppError::Internal(format!("CSV serialization error: {}", e)))?;
        }
        let bytes = wtr
            .into_inner()
            .map_err(|e| AppError::Internal(format!("CSV writer error: {}", e)))?;
        String::from_utf8(bytes).map_err(|e| AppError::Internal(format!("UTF-8 conversion error: {}", e)))
    }
}
