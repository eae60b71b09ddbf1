//! Persistence for inventory items and their transactions
//!
//! `InventoryStore` is the only way inventory rows are read or written.
//! A purchase or usage is never written as two independent calls: the
//! transaction insert and the quantity update go through
//! `commit_movements`, which applies a whole batch or nothing.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use shared::{
    item_name_key, CommittedMovement, InventoryCategory, InventoryItem, InventoryItemPatch,
    InventoryTransaction, MovementTarget, NewInventoryItem, StockError, StockMovement,
    TransactionKind,
};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::{unique_violation, AppError, AppResult};

const DUPLICATE_ITEM: &str = "An inventory item with this name already exists on the farm";

/// Inventory persistence collaborator
#[async_trait]
pub trait InventoryStore: Send + Sync {
    /// Items, optionally limited to one farm, ordered by name
    async fn list(&self, farm_id: Option<Uuid>) -> AppResult<Vec<InventoryItem>>;

    async fn get(&self, item_id: Uuid) -> AppResult<Option<InventoryItem>>;

    /// Case-insensitive lookup of an item by name within a farm
    async fn find_by_name(&self, farm_id: Uuid, name: &str) -> AppResult<Option<InventoryItem>>;

    /// Create an item with zero quantity
    async fn create(&self, item: NewInventoryItem) -> AppResult<InventoryItem>;

    async fn update(&self, item_id: Uuid, patch: InventoryItemPatch) -> AppResult<InventoryItem>;

    /// Transactions of an item, newest first
    async fn list_transactions(&self, item_id: Uuid) -> AppResult<Vec<InventoryTransaction>>;

    /// Apply movements in order: each one locks its item, re-checks stock,
    /// inserts its transaction and stores the new quantity. Any failure
    /// rolls back the whole batch.
    async fn commit_movements(
        &self,
        movements: Vec<StockMovement>,
    ) -> AppResult<Vec<CommittedMovement>>;
}

// ============================================================================
// PostgreSQL
// ============================================================================

/// Store backed by the `inventory_items` and `inventory_transactions` tables
#[derive(Clone)]
pub struct PgInventoryStore {
    db: PgPool,
}

#[derive(Debug, FromRow)]
struct ItemRow {
    id: Uuid,
    farm_id: Uuid,
    name: String,
    category: String,
    quantity: Decimal,
    unit: String,
    min_threshold: Decimal,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ItemRow> for InventoryItem {
    type Error = AppError;

    fn try_from(row: ItemRow) -> Result<Self, Self::Error> {
        Ok(InventoryItem {
            id: row.id,
            farm_id: row.farm_id,
            name: row.name,
            category: row.category.parse::<InventoryCategory>().map_err(AppError::Internal)?,
            quantity: row.quantity,
            unit: row.unit,
            min_threshold: row.min_threshold,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct TransactionRow {
    id: Uuid,
    item_id: Uuid,
    kind: String,
    quantity: Decimal,
    unit: String,
    transaction_date: NaiveDate,
    cost: Option<Decimal>,
    supplier: Option<String>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<TransactionRow> for InventoryTransaction {
    type Error = AppError;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        Ok(InventoryTransaction {
            id: row.id,
            item_id: row.item_id,
            kind: row.kind.parse::<TransactionKind>().map_err(AppError::Internal)?,
            quantity: row.quantity,
            unit: row.unit,
            transaction_date: row.transaction_date,
            cost: row.cost,
            supplier: row.supplier,
            notes: row.notes,
            created_at: row.created_at,
        })
    }
}

impl PgInventoryStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    async fn lock_item(
        tx: &mut Transaction<'_, Postgres>,
        item_id: Uuid,
    ) -> AppResult<InventoryItem> {
        sqlx::query_as::<_, ItemRow>(
            r#"
            SELECT id, farm_id, name, category, quantity, unit, min_threshold, created_at, updated_at
            FROM inventory_items
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(item_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or(StockError::ItemNotFound(item_id))?
        .try_into()
    }

    /// Lock every existing item a batch touches, in id order, so two
    /// commits over the same items always wait on each other in one
    /// direction.
    async fn lock_all(tx: &mut Transaction<'_, Postgres>, item_ids: &[Uuid]) -> AppResult<()> {
        if item_ids.is_empty() {
            return Ok(());
        }

        sqlx::query("SELECT id FROM inventory_items WHERE id = ANY($1) ORDER BY id FOR UPDATE")
            .bind(item_ids)
            .fetch_all(&mut **tx)
            .await?;
        Ok(())
    }

    async fn insert_item(
        tx: &mut Transaction<'_, Postgres>,
        item: &NewInventoryItem,
    ) -> AppResult<InventoryItem> {
        sqlx::query_as::<_, ItemRow>(
            r#"
            INSERT INTO inventory_items (farm_id, name, category, quantity, unit, min_threshold)
            VALUES ($1, $2, $3, 0, $4, $5)
            RETURNING id, farm_id, name, category, quantity, unit, min_threshold, created_at, updated_at
            "#,
        )
        .bind(item.farm_id)
        .bind(item.name.trim())
        .bind(item.category.as_str())
        .bind(item.unit.trim())
        .bind(item.min_threshold)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| unique_violation(e, "name", DUPLICATE_ITEM))?
        .try_into()
    }
}

#[async_trait]
impl InventoryStore for PgInventoryStore {
    async fn list(&self, farm_id: Option<Uuid>) -> AppResult<Vec<InventoryItem>> {
        let rows = sqlx::query_as::<_, ItemRow>(
            r#"
            SELECT id, farm_id, name, category, quantity, unit, min_threshold, created_at, updated_at
            FROM inventory_items
            WHERE $1::uuid IS NULL OR farm_id = $1
            ORDER BY name ASC
            "#,
        )
        .bind(farm_id)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn get(&self, item_id: Uuid) -> AppResult<Option<InventoryItem>> {
        sqlx::query_as::<_, ItemRow>(
            r#"
            SELECT id, farm_id, name, category, quantity, unit, min_threshold, created_at, updated_at
            FROM inventory_items
            WHERE id = $1
            "#,
        )
        .bind(item_id)
        .fetch_optional(&self.db)
        .await?
        .map(TryInto::try_into)
        .transpose()
    }

    async fn find_by_name(&self, farm_id: Uuid, name: &str) -> AppResult<Option<InventoryItem>> {
        sqlx::query_as::<_, ItemRow>(
            r#"
            SELECT id, farm_id, name, category, quantity, unit, min_threshold, created_at, updated_at
            FROM inventory_items
            WHERE farm_id = $1 AND LOWER(TRIM(name)) = $2
            "#,
        )
        .bind(farm_id)
        .bind(item_name_key(name))
        .fetch_optional(&self.db)
        .await?
        .map(TryInto::try_into)
        .transpose()
    }

    async fn create(&self, item: NewInventoryItem) -> AppResult<InventoryItem> {
        let mut tx = self.db.begin().await?;
        let created = Self::insert_item(&mut tx, &item).await?;
        tx.commit().await?;
        Ok(created)
    }

    async fn update(&self, item_id: Uuid, patch: InventoryItemPatch) -> AppResult<InventoryItem> {
        sqlx::query_as::<_, ItemRow>(
            r#"
            UPDATE inventory_items
            SET name = COALESCE($1, name),
                min_threshold = COALESCE($2, min_threshold),
                updated_at = NOW()
            WHERE id = $3
            RETURNING id, farm_id, name, category, quantity, unit, min_threshold, created_at, updated_at
            "#,
        )
        .bind(patch.name.as_deref().map(str::trim))
        .bind(patch.min_threshold)
        .bind(item_id)
        .fetch_optional(&self.db)
        .await
        .map_err(|e| unique_violation(e, "name", DUPLICATE_ITEM))?
        .ok_or_else(|| AppError::NotFound("Inventory item".to_string()))?
        .try_into()
    }

    async fn list_transactions(&self, item_id: Uuid) -> AppResult<Vec<InventoryTransaction>> {
        let rows = sqlx::query_as::<_, TransactionRow>(
            r#"
            SELECT id, item_id, kind, quantity, unit, transaction_date, cost, supplier, notes, created_at
            FROM inventory_transactions
            WHERE item_id = $1
            ORDER BY transaction_date DESC, created_at DESC
            "#,
        )
        .bind(item_id)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn commit_movements(
        &self,
        movements: Vec<StockMovement>,
    ) -> AppResult<Vec<CommittedMovement>> {
        let mut tx = self.db.begin().await?;
        Self::lock_all(&mut tx, &lock_order(&movements)).await?;
        let mut committed = Vec::with_capacity(movements.len());

        for movement in movements {
            let item = match &movement.target {
                MovementTarget::Existing(item_id) => Self::lock_item(&mut tx, *item_id).await?,
                MovementTarget::New(new_item) => Self::insert_item(&mut tx, new_item).await?,
            };

            let new_quantity = item.apply(movement.kind, movement.quantity)?;

            let transaction: InventoryTransaction = sqlx::query_as::<_, TransactionRow>(
                r#"
                INSERT INTO inventory_transactions (
                    item_id, kind, quantity, unit, transaction_date, cost, supplier, notes
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                RETURNING id, item_id, kind, quantity, unit, transaction_date, cost, supplier, notes, created_at
                "#,
            )
            .bind(item.id)
            .bind(movement.kind.as_str())
            .bind(movement.quantity)
            .bind(&item.unit)
            .bind(movement.transaction_date)
            .bind(movement.cost)
            .bind(&movement.supplier)
            .bind(&movement.notes)
            .fetch_one(&mut *tx)
            .await?
            .try_into()?;

            let item: InventoryItem = sqlx::query_as::<_, ItemRow>(
                r#"
                UPDATE inventory_items
                SET quantity = $1, updated_at = NOW()
                WHERE id = $2
                RETURNING id, farm_id, name, category, quantity, unit, min_threshold, created_at, updated_at
                "#,
            )
            .bind(new_quantity)
            .bind(item.id)
            .fetch_one(&mut *tx)
            .await?
            .try_into()?;

            committed.push(CommittedMovement { item, transaction });
        }

        tx.commit().await?;

        Ok(committed)
    }
}

/// Distinct existing item ids of a batch, sorted
fn lock_order(movements: &[StockMovement]) -> Vec<Uuid> {
    let mut ids: Vec<Uuid> = movements
        .iter()
        .filter_map(|m| match &m.target {
            MovementTarget::Existing(id) => Some(*id),
            MovementTarget::New(_) => None,
        })
        .collect();
    ids.sort();
    ids.dedup();
    ids
}

// ============================================================================
// In-memory
// ============================================================================

/// Store that keeps everything in process memory.
///
/// A single async mutex serializes every read-then-write, so it follows
/// the same per-item ordering as the database store. Used by tests and by
/// embedders that do not need durability.
#[derive(Default)]
pub struct MemoryInventoryStore {
    state: Mutex<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    items: HashMap<Uuid, InventoryItem>,
    /// Append-only, in commit order
    transactions: Vec<InventoryTransaction>,
}

impl MemoryInventoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn name_taken(items: &HashMap<Uuid, InventoryItem>, farm_id: Uuid, name: &str, except: Option<Uuid>) -> bool {
        let key = item_name_key(name);
        items
            .values()
            .any(|i| i.farm_id == farm_id && Some(i.id) != except && item_name_key(&i.name) == key)
    }

    fn build_item(new_item: &NewInventoryItem) -> InventoryItem {
        let now = Utc::now();
        InventoryItem {
            id: Uuid::new_v4(),
            farm_id: new_item.farm_id,
            name: new_item.name.trim().to_string(),
            category: new_item.category,
            quantity: Decimal::ZERO,
            unit: new_item.unit.trim().to_string(),
            min_threshold: new_item.min_threshold,
            created_at: now,
            updated_at: now,
        }
    }

    fn duplicate() -> AppError {
        AppError::Conflict {
            resource: "name".to_string(),
            message: DUPLICATE_ITEM.to_string(),
        }
    }
}

#[async_trait]
impl InventoryStore for MemoryInventoryStore {
    async fn list(&self, farm_id: Option<Uuid>) -> AppResult<Vec<InventoryItem>> {
        let state = self.state.lock().await;
        let mut items: Vec<InventoryItem> = state
            .items
            .values()
            .filter(|i| farm_id.map_or(true, |f| i.farm_id == f))
            .cloned()
            .collect();
        items.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(items)
    }

    async fn get(&self, item_id: Uuid) -> AppResult<Option<InventoryItem>> {
        Ok(self.state.lock().await.items.get(&item_id).cloned())
    }

    async fn find_by_name(&self, farm_id: Uuid, name: &str) -> AppResult<Option<InventoryItem>> {
        let key = item_name_key(name);
        let state = self.state.lock().await;
        Ok(state
            .items
            .values()
            .find(|i| i.farm_id == farm_id && item_name_key(&i.name) == key)
            .cloned())
    }

    async fn create(&self, item: NewInventoryItem) -> AppResult<InventoryItem> {
        let mut state = self.state.lock().await;
        if Self::name_taken(&state.items, item.farm_id, &item.name, None) {
            return Err(Self::duplicate());
        }
        let created = Self::build_item(&item);
        state.items.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update(&self, item_id: Uuid, patch: InventoryItemPatch) -> AppResult<InventoryItem> {
        let mut state = self.state.lock().await;
        let farm_id = state
            .items
            .get(&item_id)
            .map(|i| i.farm_id)
            .ok_or_else(|| AppError::NotFound("Inventory item".to_string()))?;

        if let Some(name) = &patch.name {
            if Self::name_taken(&state.items, farm_id, name, Some(item_id)) {
                return Err(Self::duplicate());
            }
        }

        let item = state
            .items
            .get_mut(&item_id)
            .ok_or_else(|| AppError::NotFound("Inventory item".to_string()))?;
        if let Some(name) = patch.name {
            item.name = name.trim().to_string();
        }
        if let Some(threshold) = patch.min_threshold {
            item.min_threshold = threshold;
        }
        item.updated_at = Utc::now();
        Ok(item.clone())
    }

    async fn list_transactions(&self, item_id: Uuid) -> AppResult<Vec<InventoryTransaction>> {
        let state = self.state.lock().await;
        let mut transactions: Vec<InventoryTransaction> = state
            .transactions
            .iter()
            .filter(|t| t.item_id == item_id)
            .cloned()
            .collect();
        // Commit order breaks ties between transactions on the same date
        transactions.reverse();
        transactions.sort_by(|a, b| b.transaction_date.cmp(&a.transaction_date));
        Ok(transactions)
    }

    async fn commit_movements(
        &self,
        movements: Vec<StockMovement>,
    ) -> AppResult<Vec<CommittedMovement>> {
        let mut state = self.state.lock().await;

        // Stage against a copy so a failure part-way leaves the store untouched
        let mut staged_items = state.items.clone();
        let mut staged_transactions = Vec::with_capacity(movements.len());
        let mut committed = Vec::with_capacity(movements.len());

        for movement in movements {
            let mut item = match &movement.target {
                MovementTarget::Existing(item_id) => staged_items
                    .get(item_id)
                    .cloned()
                    .ok_or(StockError::ItemNotFound(*item_id))?,
                MovementTarget::New(new_item) => {
                    if Self::name_taken(&staged_items, new_item.farm_id, &new_item.name, None) {
                        return Err(Self::duplicate());
                    }
                    Self::build_item(new_item)
                }
            };

            item.quantity = item.apply(movement.kind, movement.quantity)?;
            item.updated_at = Utc::now();

            let transaction = InventoryTransaction {
                id: Uuid::new_v4(),
                item_id: item.id,
                kind: movement.kind,
                quantity: movement.quantity,
                unit: item.unit.clone(),
                transaction_date: movement.transaction_date,
                cost: movement.cost,
                supplier: movement.supplier,
                notes: movement.notes,
                created_at: Utc::now(),
            };

            staged_items.insert(item.id, item.clone());
            staged_transactions.push(transaction.clone());
            committed.push(CommittedMovement { item, transaction });
        }

        state.items = staged_items;
        state.transactions.extend(staged_transactions);

        Ok(committed)
    }
}
