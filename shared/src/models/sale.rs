//! Sales records

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A sale of farm produce
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Sale {
    pub id: Uuid,
    pub farm_id: Uuid,
    pub batch_id: Option<Uuid>,
    pub sale_date: NaiveDate,
    /// What was sold, e.g. "Eggs (crate)", "Live broilers", "Catfish"
    pub product: String,
    pub quantity: Decimal,
    pub unit: String,
    pub unit_price: Decimal,
    pub total_amount: Decimal,
    pub buyer: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Line total for a sale, rounded to cents
pub fn sale_total(quantity: Decimal, unit_price: Decimal) -> Decimal {
    (quantity * unit_price).round_dp(crate::validation::MONEY_SCALE)
}
