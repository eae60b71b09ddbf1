//! Inventory management models
//!
//! Stock only moves through transactions: a purchase adds to an item's
//! quantity and a usage removes from it. The rules that decide whether a
//! movement may be applied live here so the server and the web client
//! agree on them.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

use crate::types::format_quantity;
use crate::validation::{fits_scale, QUANTITY_SCALE};

/// Inventory item categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InventoryCategory {
    Feed,
    Medication,
    Equipment,
    Other,
}

impl InventoryCategory {
    pub const ALL: [InventoryCategory; 4] = [
        InventoryCategory::Feed,
        InventoryCategory::Medication,
        InventoryCategory::Equipment,
        InventoryCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InventoryCategory::Feed => "feed",
            InventoryCategory::Medication => "medication",
            InventoryCategory::Equipment => "equipment",
            InventoryCategory::Other => "other",
        }
    }
}

impl FromStr for InventoryCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "feed" => Ok(InventoryCategory::Feed),
            "medication" => Ok(InventoryCategory::Medication),
            "equipment" => Ok(InventoryCategory::Equipment),
            "other" => Ok(InventoryCategory::Other),
            other => Err(format!("Unknown inventory category: {}", other)),
        }
    }
}

impl fmt::Display for InventoryCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            InventoryCategory::Feed => "Feed",
            InventoryCategory::Medication => "Medication",
            InventoryCategory::Equipment => "Equipment",
            InventoryCategory::Other => "Other",
        };
        write!(f, "{}", label)
    }
}

/// Inventory transaction types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Purchase,
    Usage,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Purchase => "purchase",
            TransactionKind::Usage => "usage",
        }
    }

    /// Sign applied to a transaction's magnitude when summing the ledger
    pub fn sign(&self) -> Decimal {
        match self {
            TransactionKind::Purchase => Decimal::ONE,
            TransactionKind::Usage => Decimal::NEGATIVE_ONE,
        }
    }
}

impl FromStr for TransactionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "purchase" => Ok(TransactionKind::Purchase),
            "usage" => Ok(TransactionKind::Usage),
            other => Err(format!("Unknown transaction kind: {}", other)),
        }
    }
}

/// A stock item held by a farm
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InventoryItem {
    pub id: Uuid,
    pub farm_id: Uuid,
    pub name: String,
    pub category: InventoryCategory,
    pub quantity: Decimal,
    pub unit: String,
    /// Low-stock alert level. Never blocks a transaction.
    pub min_threshold: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InventoryItem {
    pub fn is_low_stock(&self) -> bool {
        self.quantity <= self.min_threshold
    }

    /// Check whether `requested` can be drawn from this item
    pub fn availability(&self, requested: Decimal) -> Result<Availability, StockError> {
        check_requested(requested)?;

        Ok(Availability {
            item_id: self.id,
            available: self.quantity >= requested,
            current_qty: self.quantity,
            requested,
            item_name: self.name.clone(),
            unit: self.unit.clone(),
        })
    }

    /// Quantity that results from applying a movement, or the reason it is refused
    pub fn apply(&self, kind: TransactionKind, quantity: Decimal) -> Result<Decimal, StockError> {
        check_requested(quantity)?;

        match kind {
            TransactionKind::Purchase => Ok(self.quantity + quantity),
            TransactionKind::Usage if self.quantity >= quantity => Ok(self.quantity - quantity),
            TransactionKind::Usage => Err(self.insufficient(quantity)),
        }
    }

    fn insufficient(&self, requested: Decimal) -> StockError {
        StockError::InsufficientStock {
            item_id: self.id,
            item_name: self.name.clone(),
            unit: self.unit.clone(),
            current_qty: self.quantity,
            requested,
        }
    }
}

/// An immutable stock movement record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InventoryTransaction {
    pub id: Uuid,
    pub item_id: Uuid,
    pub kind: TransactionKind,
    /// Always a positive magnitude; `kind` carries the direction
    pub quantity: Decimal,
    /// Unit of the item when the transaction was made
    pub unit: String,
    pub transaction_date: NaiveDate,
    pub cost: Option<Decimal>,
    pub supplier: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl InventoryTransaction {
    pub fn signed_quantity(&self) -> Decimal {
        self.kind.sign() * self.quantity
    }
}

/// Result of an availability check
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Availability {
    pub item_id: Uuid,
    pub available: bool,
    pub current_qty: Decimal,
    pub requested: Decimal,
    pub item_name: String,
    pub unit: String,
}

impl Availability {
    /// Convert a negative check into the error a usage would fail with
    pub fn require(self) -> Result<Availability, StockError> {
        if self.available {
            Ok(self)
        } else {
            Err(StockError::InsufficientStock {
                item_id: self.item_id,
                item_name: self.item_name,
                unit: self.unit,
                current_qty: self.current_qty,
                requested: self.requested,
            })
        }
    }
}

/// Reasons a stock check or movement is refused
#[derive(Debug, Clone, Error, PartialEq)]
pub enum StockError {
    #[error("Inventory item {0} not found")]
    ItemNotFound(Uuid),

    #[error("Quantity must be greater than zero")]
    InvalidQuantity,

    #[error("Quantity can have at most 3 decimal places")]
    QuantityTooPrecise,

    #[error("{}", insufficient_stock_message(.item_name, .unit, .current_qty))]
    InsufficientStock {
        item_id: Uuid,
        item_name: String,
        unit: String,
        current_qty: Decimal,
        requested: Decimal,
    },
}

/// Reject quantities that are not positive or that storage would round
pub fn check_requested(quantity: Decimal) -> Result<(), StockError> {
    if quantity <= Decimal::ZERO {
        return Err(StockError::InvalidQuantity);
    }
    if !fits_scale(quantity, QUANTITY_SCALE) {
        return Err(StockError::QuantityTooPrecise);
    }
    Ok(())
}

/// Message shown under a log form when stock runs short
pub fn insufficient_stock_message(item_name: &str, unit: &str, current_qty: &Decimal) -> String {
    format!(
        "Insufficient stock! Only {} {} of {} available.",
        format_quantity(current_qty),
        unit,
        item_name
    )
}

/// Check availability of an item against a snapshot of the inventory.
///
/// An id that is not in the snapshot is reported as `ItemNotFound` rather
/// than treated as unconstrained.
pub fn check_availability(
    snapshot: &[InventoryItem],
    item_id: Uuid,
    requested: Decimal,
) -> Result<Availability, StockError> {
    check_requested(requested)?;

    snapshot
        .iter()
        .find(|item| item.id == item_id)
        .ok_or(StockError::ItemNotFound(item_id))?
        .availability(requested)
}

/// Quantity implied by a transaction history
pub fn replay_quantity(transactions: &[InventoryTransaction]) -> Decimal {
    transactions
        .iter()
        .map(InventoryTransaction::signed_quantity)
        .sum()
}

/// Definition of an item that does not exist yet
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewInventoryItem {
    pub farm_id: Uuid,
    pub name: String,
    pub category: InventoryCategory,
    pub unit: String,
    #[serde(default)]
    pub min_threshold: Decimal,
}

/// Editable item fields. Quantity, category and unit are not editable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InventoryItemPatch {
    pub name: Option<String>,
    pub min_threshold: Option<Decimal>,
}

/// Item a movement applies to
#[derive(Debug, Clone)]
pub enum MovementTarget {
    Existing(Uuid),
    /// Create the item as part of the same commit
    New(NewInventoryItem),
}

/// A pending purchase or usage
#[derive(Debug, Clone)]
pub struct StockMovement {
    pub target: MovementTarget,
    pub kind: TransactionKind,
    pub quantity: Decimal,
    pub transaction_date: NaiveDate,
    pub cost: Option<Decimal>,
    pub supplier: Option<String>,
    pub notes: Option<String>,
}

impl StockMovement {
    pub fn usage(item_id: Uuid, quantity: Decimal, note: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            target: MovementTarget::Existing(item_id),
            kind: TransactionKind::Usage,
            quantity,
            transaction_date: date,
            cost: None,
            supplier: None,
            notes: Some(note.into()),
        }
    }

    pub fn purchase(target: MovementTarget, quantity: Decimal, date: NaiveDate) -> Self {
        Self {
            target,
            kind: TransactionKind::Purchase,
            quantity,
            transaction_date: date,
            cost: None,
            supplier: None,
            notes: None,
        }
    }

    pub fn with_cost(mut self, cost: Option<Decimal>) -> Self {
        self.cost = cost;
        self
    }

    pub fn with_supplier(mut self, supplier: Option<String>) -> Self {
        self.supplier = supplier;
        self
    }

    pub fn with_notes(mut self, notes: Option<String>) -> Self {
        self.notes = notes;
        self
    }
}

/// A movement after it has been persisted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommittedMovement {
    pub item: InventoryItem,
    pub transaction: InventoryTransaction,
}

/// Normalized key used to match purchases of an existing item by name
pub fn item_name_key(name: &str) -> String {
    name.trim().to_lowercase()
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    fn quantity_strategy() -> impl Strategy<Value = Decimal> {
        (1i64..=100_000i64).prop_map(|n| Decimal::new(n, 2))
    }

    fn stocked(quantity: Decimal) -> InventoryItem {
        InventoryItem {
            id: Uuid::new_v4(),
            farm_id: Uuid::new_v4(),
            name: "Fish Pellets".to_string(),
            category: InventoryCategory::Feed,
            quantity,
            unit: "kg".to_string(),
            min_threshold: Decimal::ZERO,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    proptest! {
        #[test]
        fn prop_available_iff_request_fits(
            current in quantity_strategy(),
            requested in quantity_strategy()
        ) {
            let item = stocked(current);
            let availability = item.availability(requested).unwrap();
            prop_assert_eq!(availability.available, requested <= current);
            prop_assert_eq!(availability.current_qty, current);
        }

        #[test]
        fn prop_usage_never_goes_negative(
            current in quantity_strategy(),
            used in quantity_strategy()
        ) {
            let item = stocked(current);
            match item.apply(TransactionKind::Usage, used) {
                Ok(remaining) => {
                    prop_assert!(used <= current);
                    prop_assert_eq!(remaining, current - used);
                }
                Err(err) => {
                    prop_assert!(used > current);
                    let is_shortage = matches!(err, StockError::InsufficientStock { .. });
                    prop_assert!(is_shortage);
                }
            }
        }
    }
}
