//! Business logic services for the Farm Management Platform

pub mod analytics;
pub mod batch;
pub mod daily_log;
pub mod farm;
pub mod health_record;
pub mod inventory;
pub mod inventory_store;
pub mod log_gate;
pub mod sales;
pub mod task;

pub use analytics::AnalyticsService;
pub use batch::BatchService;
pub use daily_log::DailyLogService;
pub use farm::FarmService;
pub use health_record::HealthRecordService;
pub use inventory::InventoryService;
pub use inventory_store::{InventoryStore, MemoryInventoryStore, PgInventoryStore};
pub use log_gate::{save_with_deduction, LogSlot};
pub use sales::SalesService;
pub use task::TaskService;
