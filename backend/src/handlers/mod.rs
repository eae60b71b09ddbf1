//! HTTP handlers for the Farm Management Platform

pub mod analytics;
pub mod batch;
pub mod daily_log;
pub mod farm;
pub mod health;
pub mod health_record;
pub mod inventory;
pub mod sales;
pub mod task;

pub use analytics::*;
pub use batch::*;
pub use daily_log::*;
pub use farm::*;
pub use health::*;
pub use health_record::*;
pub use inventory::*;
pub use sales::*;
pub use task::*;
