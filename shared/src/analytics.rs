//! Chart-series reducers for the dashboard
//!
//! Everything here is a pure reduction over records already loaded for a
//! single farm, so the same code can run on the server or in the browser.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;
use uuid::Uuid;

use crate::models::{
    Batch, DailyLog, InventoryCategory, InventoryItem, InventoryTransaction, Sale, Sector, Task,
    TransactionKind,
};
use crate::types::DateRange;

/// Grouping period for time series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TimeBucket {
    #[default]
    Day,
    Month,
}

impl TimeBucket {
    pub fn key(&self, date: NaiveDate) -> String {
        match self {
            TimeBucket::Day => date.format("%Y-%m-%d").to_string(),
            TimeBucket::Month => date.format("%Y-%m").to_string(),
        }
    }
}

impl FromStr for TimeBucket {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "day" | "daily" => Ok(TimeBucket::Day),
            "month" | "monthly" => Ok(TimeBucket::Month),
            other => Err(format!("Unknown time bucket: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChartPoint {
    pub label: String,
    pub value: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChartSeries {
    pub name: String,
    pub points: Vec<ChartPoint>,
}

impl ChartSeries {
    fn from_buckets(name: &str, buckets: BTreeMap<String, Decimal>) -> Self {
        Self {
            name: name.to_string(),
            points: buckets
                .into_iter()
                .map(|(label, value)| ChartPoint { label, value })
                .collect(),
        }
    }

    pub fn total(&self) -> Decimal {
        self.points.iter().map(|p| p.value).sum()
    }
}

/// Sales revenue per period, in chronological order
pub fn revenue_series(sales: &[Sale], bucket: TimeBucket) -> ChartSeries {
    let mut buckets = BTreeMap::new();
    for sale in sales {
        *buckets.entry(bucket.key(sale.sale_date)).or_insert(Decimal::ZERO) += sale.total_amount;
    }
    ChartSeries::from_buckets("revenue", buckets)
}

/// Eggs collected and mortality per day
pub fn production_series(logs: &[DailyLog]) -> Vec<ChartSeries> {
    let mut eggs = BTreeMap::new();
    let mut mortality = BTreeMap::new();

    for log in logs {
        let key = TimeBucket::Day.key(log.log_date);
        if log.activities.sector() == Sector::Layer {
            *eggs.entry(key.clone()).or_insert(Decimal::ZERO) +=
                Decimal::from(log.activities.eggs_collected());
        }
        *mortality.entry(key).or_insert(Decimal::ZERO) += Decimal::from(log.activities.mortality());
    }

    vec![
        ChartSeries::from_buckets("eggs_collected", eggs),
        ChartSeries::from_buckets("mortality", mortality),
    ]
}

/// Quantity consumed per period; purchases are ignored
pub fn usage_series(transactions: &[InventoryTransaction], bucket: TimeBucket) -> ChartSeries {
    let mut buckets = BTreeMap::new();
    for tx in transactions.iter().filter(|t| t.kind == TransactionKind::Usage) {
        *buckets.entry(bucket.key(tx.transaction_date)).or_insert(Decimal::ZERO) += tx.quantity;
    }
    ChartSeries::from_buckets("usage", buckets)
}

/// Stock totals for one category
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategoryStock {
    pub category: InventoryCategory,
    pub item_count: usize,
    pub total_quantity: Decimal,
    pub low_stock_count: usize,
}

/// Per-category stock totals, one entry per category including empty ones
pub fn stock_by_category(items: &[InventoryItem]) -> Vec<CategoryStock> {
    InventoryCategory::ALL
        .iter()
        .map(|&category| {
            let in_category: Vec<&InventoryItem> =
                items.iter().filter(|i| i.category == category).collect();
            CategoryStock {
                category,
                item_count: in_category.len(),
                total_quantity: in_category.iter().map(|i| i.quantity).sum(),
                low_stock_count: in_category.iter().filter(|i| i.is_low_stock()).count(),
            }
        })
        .collect()
}

/// Items at or below their threshold, sorted by name
pub fn low_stock_items(items: &[InventoryItem]) -> Vec<InventoryItem> {
    let mut low: Vec<InventoryItem> = items.iter().filter(|i| i.is_low_stock()).cloned().collect();
    low.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
    low
}

/// Headline figures for the farm dashboard
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DashboardSummary {
    pub farm_id: Uuid,
    pub window: DateRange,
    pub active_batches: usize,
    pub live_animals: i64,
    pub eggs_collected: i64,
    pub mortality: i64,
    pub revenue: Decimal,
    pub open_tasks: usize,
    pub overdue_tasks: usize,
    pub low_stock_items: usize,
}

/// Records loaded for one farm
pub struct DashboardInputs<'a> {
    pub batches: &'a [Batch],
    pub logs: &'a [DailyLog],
    pub sales: &'a [Sale],
    pub tasks: &'a [Task],
    pub items: &'a [InventoryItem],
}

/// Build the dashboard summary; logs and sales are counted only inside `window`
pub fn summarize_dashboard(
    farm_id: Uuid,
    window: DateRange,
    today: NaiveDate,
    inputs: DashboardInputs<'_>,
) -> DashboardSummary {
    let active: Vec<&Batch> = inputs.batches.iter().filter(|b| b.is_active()).collect();
    let logs_in_window = inputs.logs.iter().filter(|l| window.contains(l.log_date));

    let (eggs_collected, mortality) = logs_in_window.fold((0i64, 0i64), |(eggs, dead), log| {
        (
            eggs + i64::from(log.activities.eggs_collected()),
            dead + i64::from(log.activities.mortality()),
        )
    });

    DashboardSummary {
        farm_id,
        window,
        active_batches: active.len(),
        live_animals: active.iter().map(|b| i64::from(b.current_count)).sum(),
        eggs_collected,
        mortality,
        revenue: inputs
            .sales
            .iter()
            .filter(|s| window.contains(s.sale_date))
            .map(|s| s.total_amount)
            .sum(),
        open_tasks: inputs.tasks.iter().filter(|t| t.status.is_open()).count(),
        overdue_tasks: inputs.tasks.iter().filter(|t| t.is_overdue(today)).count(),
        low_stock_items: inputs.items.iter().filter(|i| i.is_low_stock()).count(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BatchStatus, LogActivities, TaskPriority, TaskStatus};
    use chrono::Utc;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::from_str(s).unwrap()
    }

    fn sale(on: &str, total: &str) -> Sale {
        Sale {
            id: Uuid::new_v4(),
            farm_id: Uuid::nil(),
            batch_id: None,
            sale_date: date(on),
            product: "Eggs (crate)".to_string(),
            quantity: Decimal::ONE,
            unit: "crate".to_string(),
            unit_price: dec(total),
            total_amount: dec(total),
            buyer: None,
            notes: None,
            created_at: Utc::now(),
        }
    }

    fn log(on: &str, activities: LogActivities) -> DailyLog {
        DailyLog {
            id: Uuid::new_v4(),
            batch_id: Uuid::nil(),
            log_date: date(on),
            activities,
            consumption: vec![],
            notes: None,
            created_by: None,
            created_at: Utc::now(),
        }
    }

    fn item(name: &str, category: InventoryCategory, qty: &str, threshold: &str) -> InventoryItem {
        InventoryItem {
            id: Uuid::new_v4(),
            farm_id: Uuid::nil(),
            name: name.to_string(),
            category,
            quantity: dec(qty),
            unit: "kg".to_string(),
            min_threshold: dec(threshold),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_revenue_series_by_month() {
        let sales = vec![
            sale("2025-10-03", "1000"),
            sale("2025-11-01", "250"),
            sale("2025-10-20", "500"),
            sale("2025-11-18", "750"),
        ];
        let series = revenue_series(&sales, TimeBucket::Month);
        assert_eq!(series.points.len(), 2);
        assert_eq!(series.points[0].label, "2025-10");
        assert_eq!(series.points[0].value, dec("1500"));
        assert_eq!(series.points[1].label, "2025-11");
        assert_eq!(series.points[1].value, dec("1000"));
    }

    #[test]
    fn test_revenue_buckets_sum_to_total() {
        let sales = vec![
            sale("2025-11-01", "12.5"),
            sale("2025-11-01", "7.5"),
            sale("2025-11-02", "30"),
        ];
        let total: Decimal = sales.iter().map(|s| s.total_amount).sum();
        assert_eq!(revenue_series(&sales, TimeBucket::Day).total(), total);
        assert_eq!(revenue_series(&sales, TimeBucket::Month).total(), total);
    }

    #[test]
    fn test_production_series_only_counts_layer_eggs() {
        let logs = vec![
            log("2025-11-17", LogActivities::Layer { eggs_collected: 400, cracked_eggs: 3, mortality: 1 }),
            log("2025-11-17", LogActivities::Broiler { mortality: 2, average_weight_kg: None, water_litres: None }),
            log("2025-11-18", LogActivities::Layer { eggs_collected: 410, cracked_eggs: 0, mortality: 0 }),
        ];
        let series = production_series(&logs);
        let eggs = &series[0];
        let mortality = &series[1];

        assert_eq!(eggs.name, "eggs_collected");
        assert_eq!(eggs.total(), dec("810"));
        assert_eq!(mortality.points[0].label, "2025-11-17");
        assert_eq!(mortality.points[0].value, dec("3"));
    }

    #[test]
    fn test_stock_by_category_includes_empty_categories() {
        let items = vec![
            item("Layer Mash", InventoryCategory::Feed, "12", "10"),
            item("Grower Pellets", InventoryCategory::Feed, "40", "10"),
            item("Oxytetracycline", InventoryCategory::Medication, "1", "2"),
        ];
        let stock = stock_by_category(&items);
        assert_eq!(stock.len(), 4);
        assert_eq!(stock[0].category, InventoryCategory::Feed);
        assert_eq!(stock[0].item_count, 2);
        assert_eq!(stock[0].total_quantity, dec("52"));
        assert_eq!(stock[0].low_stock_count, 0);
        assert_eq!(stock[1].low_stock_count, 1);
        assert_eq!(stock[2].item_count, 0);
    }

    #[test]
    fn test_low_stock_items_sorted() {
        let items = vec![
            item("Vitamins", InventoryCategory::Medication, "1", "2"),
            item("Layer Mash", InventoryCategory::Feed, "5", "10"),
            item("Feeder", InventoryCategory::Equipment, "4", "1"),
        ];
        let low: Vec<String> = low_stock_items(&items).into_iter().map(|i| i.name).collect();
        assert_eq!(low, vec!["Layer Mash", "Vitamins"]);
    }

    #[test]
    fn test_summarize_dashboard() {
        let farm_id = Uuid::new_v4();
        let today = date("2025-11-18");
        let window = DateRange::last_days(today, 7);

        let mut closed = Batch {
            id: Uuid::new_v4(),
            farm_id,
            name: "Old layers".to_string(),
            sector: Sector::Layer,
            breed: None,
            start_date: date("2024-01-01"),
            initial_count: 300,
            current_count: 250,
            status: BatchStatus::Closed,
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let mut active = closed.clone();
        active.status = BatchStatus::Active;
        active.current_count = 480;
        closed.id = Uuid::new_v4();

        let logs = vec![
            log("2025-11-18", LogActivities::Layer { eggs_collected: 400, cracked_eggs: 0, mortality: 2 }),
            log("2025-11-01", LogActivities::Layer { eggs_collected: 999, cracked_eggs: 0, mortality: 9 }),
        ];
        let sales = vec![sale("2025-11-15", "300"), sale("2025-10-15", "999")];
        let tasks = vec![Task {
            id: Uuid::new_v4(),
            farm_id,
            title: "Clean drinkers".to_string(),
            description: None,
            assignee_id: None,
            due_date: Some(date("2025-11-10")),
            priority: TaskPriority::Medium,
            status: TaskStatus::Pending,
            created_by: Uuid::new_v4(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }];
        let items = vec![item("Layer Mash", InventoryCategory::Feed, "5", "10")];

        let summary = summarize_dashboard(
            farm_id,
            window,
            today,
            DashboardInputs {
                batches: &[active, closed],
                logs: &logs,
                sales: &sales,
                tasks: &tasks,
                items: &items,
            },
        );

        assert_eq!(summary.active_batches, 1);
        assert_eq!(summary.live_animals, 480);
        assert_eq!(summary.eggs_collected, 400);
        assert_eq!(summary.mortality, 2);
        assert_eq!(summary.revenue, dec("300"));
        assert_eq!(summary.open_tasks, 1);
        assert_eq!(summary.overdue_tasks, 1);
        assert_eq!(summary.low_stock_items, 1);
    }

    #[test]
    fn test_time_bucket_parsing() {
        assert_eq!(TimeBucket::from_str("monthly"), Ok(TimeBucket::Month));
        assert_eq!(TimeBucket::from_str("day"), Ok(TimeBucket::Day));
        assert!(TimeBucket::from_str("week").is_err());
    }
}
