//! WebAssembly module for the Farm Management Platform
//!
//! Provides client-side computation for:
//! - Stock availability checks while a quantity is being typed
//! - Low-stock lists and dashboard chart series
//! - Inventory notes for daily and health logs
//!
//! Exports take and return JSON strings. Each wraps a plain function that
//! returns `Result<String, String>` so the logic runs under native tests.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::str::FromStr;
use uuid::Uuid;
use wasm_bindgen::prelude::*;

// Re-export shared types for use in JavaScript
pub use shared::analytics::*;
pub use shared::models::*;
pub use shared::types::*;
pub use shared::validation::*;

fn parse_json<T: serde::de::DeserializeOwned>(json: &str, what: &str) -> Result<T, String> {
    serde_json::from_str(json).map_err(|e| format!("Invalid {} JSON: {}", what, e))
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, String> {
    serde_json::to_string(value).map_err(|e| format!("Serialization error: {}", e))
}

fn parse_quantity(quantity: &str) -> Result<Decimal, String> {
    Decimal::from_str(quantity.trim()).map_err(|_| format!("Invalid quantity: {}", quantity))
}

fn to_js(result: Result<String, String>) -> Result<String, JsValue> {
    result.map_err(|e| {
        web_sys::console::warn_1(&JsValue::from_str(&e));
        JsValue::from_str(&e)
    })
}

/// Availability of `quantity` units of an item within a snapshot
pub fn availability_json(snapshot_json: &str, item_id: &str, quantity: &str) -> Result<String, String> {
    let snapshot: Vec<InventoryItem> = parse_json(snapshot_json, "inventory")?;
    let item_id = Uuid::parse_str(item_id).map_err(|_| format!("Invalid item id: {}", item_id))?;
    let requested = parse_quantity(quantity)?;

    let availability = check_availability(&snapshot, item_id, requested).map_err(|e| e.to_string())?;
    to_json(&availability)
}

pub fn low_stock_json(snapshot_json: &str) -> Result<String, String> {
    let snapshot: Vec<InventoryItem> = parse_json(snapshot_json, "inventory")?;
    to_json(&low_stock_items(&snapshot))
}

pub fn stock_by_category_json(snapshot_json: &str) -> Result<String, String> {
    let snapshot: Vec<InventoryItem> = parse_json(snapshot_json, "inventory")?;
    to_json(&stock_by_category(&snapshot))
}

pub fn revenue_chart_json(sales_json: &str, bucket: &str) -> Result<String, String> {
    let sales: Vec<Sale> = parse_json(sales_json, "sales")?;
    let bucket = if bucket.is_empty() {
        TimeBucket::default()
    } else {
        TimeBucket::from_str(bucket)?
    };
    to_json(&revenue_series(&sales, bucket))
}

pub fn production_chart_json(logs_json: &str) -> Result<String, String> {
    let logs: Vec<DailyLog> = parse_json(logs_json, "logs")?;
    to_json(&production_series(&logs))
}

/// Note attached to stock deducted by a log
pub fn log_note(sector: &str, date: &str, health: bool) -> Result<String, String> {
    let sector = Sector::from_str(sector)?;
    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|_| format!("Invalid date: {}", date))?;

    Ok(if health {
        health_log_note(sector, date)
    } else {
        daily_log_note(sector, date)
    })
}

/// Check stock for an item in a JSON inventory snapshot
#[wasm_bindgen]
pub fn check_stock_availability(
    snapshot_json: &str,
    item_id: &str,
    quantity: &str,
) -> Result<String, JsValue> {
    to_js(availability_json(snapshot_json, item_id, quantity))
}

/// Message shown when a request exceeds stock
#[wasm_bindgen]
pub fn insufficient_stock_text(item_name: &str, unit: &str, current_qty: &str) -> Result<String, JsValue> {
    let current = parse_quantity(current_qty).map_err(|e| JsValue::from_str(&e))?;
    Ok(insufficient_stock_message(item_name, unit, &current))
}

#[wasm_bindgen]
pub fn low_stock_list(snapshot_json: &str) -> Result<String, JsValue> {
    to_js(low_stock_json(snapshot_json))
}

#[wasm_bindgen]
pub fn revenue_chart(sales_json: &str, bucket: &str) -> Result<String, JsValue> {
    to_js(revenue_chart_json(sales_json, bucket))
}

#[wasm_bindgen]
pub fn production_chart(logs_json: &str) -> Result<String, JsValue> {
    to_js(production_chart_json(logs_json))
}

#[wasm_bindgen]
pub fn stock_by_category_chart(snapshot_json: &str) -> Result<String, JsValue> {
    to_js(stock_by_category_json(snapshot_json))
}

/// Inventory note for a daily or health log; an empty date means today
#[wasm_bindgen]
pub fn usage_note(sector: &str, date: &str, health: bool) -> Result<String, JsValue> {
    if date.is_empty() {
        let today = js_sys::Date::new_0();
        let date = format!(
            "{:04}-{:02}-{:02}",
            today.get_full_year(),
            today.get_month() + 1,
            today.get_date()
        );
        return to_js(log_note(sector, &date, health));
    }
    to_js(log_note(sector, date, health))
}
