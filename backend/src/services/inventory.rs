//! Inventory service: availability checks, usage and purchase recording

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::{
    aggregate_consumption, check_requested, low_stock_items, validate_cost, validate_name,
    validate_positive_quantity, validate_threshold, validate_unit, Availability, CommittedMovement,
    ConsumptionLine, InventoryCategory, InventoryItem, InventoryItemPatch, InventoryTransaction,
    MovementTarget, NewInventoryItem, StockError, StockMovement,
};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use super::inventory_store::InventoryStore;
use crate::error::{AppError, AppResult};

/// Inventory service for checking and moving stock
#[derive(Clone)]
pub struct InventoryService {
    store: Arc<dyn InventoryStore>,
}

/// Input for creating an item without stock
#[derive(Debug, Deserialize, Validate)]
pub struct CreateItemInput {
    #[validate(length(min = 1, max = 120, message = "Name must be 1-120 characters"))]
    pub name: String,
    pub category: InventoryCategory,
    #[validate(length(min = 1, max = 20, message = "Unit must be 1-20 characters"))]
    pub unit: String,
    pub min_threshold: Option<Decimal>,
}

/// Input for updating an item
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateItemInput {
    #[validate(length(min = 1, max = 120, message = "Name must be 1-120 characters"))]
    pub name: Option<String>,
    pub min_threshold: Option<Decimal>,
}

/// Input for recording a usage outside of a log
#[derive(Debug, Deserialize, Validate)]
pub struct RecordUsageInput {
    pub quantity: Decimal,
    #[validate(length(min = 1, max = 500, message = "Note must be 1-500 characters"))]
    pub note: String,
}

/// Input for recording a purchase.
///
/// Either `item_id` names an existing item, or `name` is used to find one
/// on the farm. When no item matches, `category` and `unit` define a new one.
#[derive(Debug, Deserialize, Validate)]
pub struct RecordPurchaseInput {
    pub item_id: Option<Uuid>,
    #[validate(length(min = 1, max = 120, message = "Name must be 1-120 characters"))]
    pub name: Option<String>,
    pub category: Option<InventoryCategory>,
    pub unit: Option<String>,
    pub min_threshold: Option<Decimal>,
    pub quantity: Decimal,
    pub cost: Option<Decimal>,
    #[validate(length(max = 200, message = "Supplier must be at most 200 characters"))]
    pub supplier: Option<String>,
    pub notes: Option<String>,
    pub transaction_date: Option<NaiveDate>,
}

fn field_error(field: &str) -> impl FnOnce(&'static str) -> AppError + '_ {
    move |message| AppError::validation(field, message)
}

impl InventoryService {
    /// Create a new InventoryService over a store
    pub fn new(store: Arc<dyn InventoryStore>) -> Self {
        Self { store }
    }

    /// List items, optionally for one farm and one category
    pub async fn list_items(
        &self,
        farm_id: Option<Uuid>,
        category: Option<InventoryCategory>,
    ) -> AppResult<Vec<InventoryItem>> {
        let items = self.store.list(farm_id).await?;
        Ok(match category {
            Some(category) => items.into_iter().filter(|i| i.category == category).collect(),
            None => items,
        })
    }

    /// Get an item by ID
    pub async fn get_item(&self, item_id: Uuid) -> AppResult<InventoryItem> {
        self.store
            .get(item_id)
            .await?
            .ok_or_else(|| StockError::ItemNotFound(item_id).into())
    }

    /// Create an item with zero quantity; stock arrives through purchases
    pub async fn create_item(&self, farm_id: Uuid, input: CreateItemInput) -> AppResult<InventoryItem> {
        input.validate()?;
        validate_name(&input.name).map_err(field_error("name"))?;
        validate_unit(&input.unit).map_err(field_error("unit"))?;
        let min_threshold = input.min_threshold.unwrap_or(Decimal::ZERO);
        validate_threshold(min_threshold).map_err(field_error("min_threshold"))?;

        let item = self
            .store
            .create(NewInventoryItem {
                farm_id,
                name: input.name,
                category: input.category,
                unit: input.unit,
                min_threshold,
            })
            .await?;

        tracing::info!(item_id = %item.id, farm_id = %farm_id, name = %item.name, "Inventory item created");
        Ok(item)
    }

    /// Update the name or threshold of an item
    pub async fn update_item(&self, item_id: Uuid, input: UpdateItemInput) -> AppResult<InventoryItem> {
        input.validate()?;
        if let Some(name) = &input.name {
            validate_name(name).map_err(field_error("name"))?;
        }
        if let Some(threshold) = input.min_threshold {
            validate_threshold(threshold).map_err(field_error("min_threshold"))?;
        }

        self.store
            .update(
                item_id,
                InventoryItemPatch {
                    name: input.name,
                    min_threshold: input.min_threshold,
                },
            )
            .await
    }

    /// Transactions of an item, newest first
    pub async fn list_transactions(&self, item_id: Uuid) -> AppResult<Vec<InventoryTransaction>> {
        self.get_item(item_id).await?;
        self.store.list_transactions(item_id).await
    }

    /// Check whether `requested` units of an item are in stock.
    ///
    /// Has no side effects; a client may call it on every keystroke.
    pub async fn check_availability(&self, item_id: Uuid, requested: Decimal) -> AppResult<Availability> {
        check_requested(requested)?;
        let item = self.get_item(item_id).await?;
        Ok(item.availability(requested)?)
    }

    /// Record consumption of an item.
    ///
    /// Stock is checked again here and once more under the store's lock,
    /// so an earlier check by the caller is never trusted.
    pub async fn record_usage(
        &self,
        item_id: Uuid,
        quantity_used: Decimal,
        note: &str,
    ) -> AppResult<CommittedMovement> {
        self.check_availability(item_id, quantity_used).await?.require()?;

        let movement = StockMovement::usage(item_id, quantity_used, note, Utc::now().date_naive());
        let committed = self.commit_one(movement).await?;

        tracing::info!(
            item_id = %item_id,
            quantity = %quantity_used,
            remaining = %committed.item.quantity,
            "Usage recorded"
        );
        Ok(committed)
    }

    /// Record a purchase, creating the item on first purchase of a new name
    pub async fn record_purchase(
        &self,
        farm_id: Uuid,
        input: RecordPurchaseInput,
    ) -> AppResult<CommittedMovement> {
        input.validate()?;
        validate_positive_quantity(input.quantity).map_err(field_error("quantity"))?;
        validate_cost(input.cost).map_err(field_error("cost"))?;

        let target = self.resolve_purchase_target(farm_id, &input).await?;
        let date = input.transaction_date.unwrap_or_else(|| Utc::now().date_naive());

        let movement = StockMovement::purchase(target, input.quantity, date)
            .with_cost(input.cost)
            .with_supplier(input.supplier)
            .with_notes(input.notes);
        let committed = self.commit_one(movement).await?;

        tracing::info!(
            item_id = %committed.item.id,
            quantity = %input.quantity,
            total = %committed.item.quantity,
            "Purchase recorded"
        );
        Ok(committed)
    }

    /// Deduct everything a log consumed, or nothing.
    ///
    /// Lines for the same item are summed before checking, and every item
    /// must belong to `farm_id`. Runs before the log itself is written, so a
    /// failure here blocks the save.
    pub async fn deduct_for_log(
        &self,
        farm_id: Uuid,
        lines: &[ConsumptionLine],
        note: &str,
        date: NaiveDate,
    ) -> AppResult<Vec<CommittedMovement>> {
        if lines.is_empty() {
            return Ok(Vec::new());
        }

        let totals = aggregate_consumption(lines);
        let mut movements = Vec::with_capacity(totals.len());

        for (item_id, quantity) in totals {
            let item = self.get_item(item_id).await?;
            if item.farm_id != farm_id {
                return Err(StockError::ItemNotFound(item_id).into());
            }
            item.availability(quantity)?.require()?;
            movements.push(StockMovement::usage(item_id, quantity, note, date));
        }

        let committed = self.store.commit_movements(movements).await?;

        tracing::info!(farm_id = %farm_id, items = committed.len(), note, "Log consumption deducted");
        Ok(committed)
    }

    /// Items at or below their low-stock threshold
    pub async fn low_stock(&self, farm_id: Uuid) -> AppResult<Vec<InventoryItem>> {
        let items = self.store.list(Some(farm_id)).await?;
        Ok(low_stock_items(&items))
    }

    async fn resolve_purchase_target(
        &self,
        farm_id: Uuid,
        input: &RecordPurchaseInput,
    ) -> AppResult<MovementTarget> {
        if let Some(item_id) = input.item_id {
            let item = self.get_item(item_id).await?;
            if item.farm_id != farm_id {
                return Err(StockError::ItemNotFound(item_id).into());
            }
            return Ok(MovementTarget::Existing(item.id));
        }

        let name = input
            .name
            .as_deref()
            .ok_or_else(|| AppError::validation("name", "Either item_id or name is required"))?;
        validate_name(name).map_err(field_error("name"))?;

        if let Some(existing) = self.store.find_by_name(farm_id, name).await? {
            return Ok(MovementTarget::Existing(existing.id));
        }

        let category = input
            .category
            .ok_or_else(|| AppError::validation("category", "Category is required for a new item"))?;
        let unit = input
            .unit
            .clone()
            .ok_or_else(|| AppError::validation("unit", "Unit is required for a new item"))?;
        validate_unit(&unit).map_err(field_error("unit"))?;
        let min_threshold = input.min_threshold.unwrap_or(Decimal::ZERO);
        validate_threshold(min_threshold).map_err(field_error("min_threshold"))?;

        Ok(MovementTarget::New(NewInventoryItem {
            farm_id,
            name: name.to_string(),
            category,
            unit,
            min_threshold,
        }))
    }

    async fn commit_one(&self, movement: StockMovement) -> AppResult<CommittedMovement> {
        self.store
            .commit_movements(vec![movement])
            .await?
            .pop()
            .ok_or_else(|| AppError::Internal("Store returned no committed movement".to_string()))
    }
}
