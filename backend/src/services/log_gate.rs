//! Saving a record that consumes stock
//!
//! A daily log or health record is saved in three steps: claim its slot on
//! the batch, deduct the stock it consumed, then write the row. The claim
//! is held until the write finishes, so two submissions for the same slot
//! never both reach the deduction.

use async_trait::async_trait;
use chrono::NaiveDate;
use shared::ConsumptionLine;
use uuid::Uuid;

use super::inventory::InventoryService;
use crate::error::AppResult;

/// A pending record, holding its batch until written or dropped
#[async_trait]
pub trait LogSlot: Send + Sized {
    type Saved: Send;

    /// Fail with `Conflict` if the slot is already occupied
    async fn claim(&mut self) -> AppResult<()>;

    /// Write the record and release the batch
    async fn write(self) -> AppResult<Self::Saved>;
}

/// Claim, deduct, write. Nothing is deducted for a slot that is taken, and
/// nothing is written when the deduction fails.
pub async fn save_with_deduction<S: LogSlot>(
    inventory: &InventoryService,
    mut slot: S,
    farm_id: Uuid,
    lines: &[ConsumptionLine],
    note: &str,
    date: NaiveDate,
) -> AppResult<S::Saved> {
    slot.claim().await?;
    inventory.deduct_for_log(farm_id, lines, note, date).await?;
    slot.write().await
}
