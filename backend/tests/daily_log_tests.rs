//! Daily log and task workflow tests
//!
//! Covers the checks that run before a log touches inventory, the order
//! of a save (claim, deduct, write) and the task status workflow.

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, Utc};
use fms_backend::error::{AppError, AppResult};
use fms_backend::services::daily_log::{validate_log, CreateDailyLogInput};
use fms_backend::services::inventory::RecordPurchaseInput;
use fms_backend::services::task::check_transition;
use fms_backend::services::{save_with_deduction, InventoryService, LogSlot, MemoryInventoryStore};
use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::{
    daily_log_note, Batch, BatchStatus, ConsumptionLine, ConsumptionPurpose, InventoryCategory,
    InventoryItem, LogActivities, Sector, Task, TaskPriority, TaskStatus,
};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 11, 18).unwrap()
}

fn batch(sector: Sector) -> Batch {
    Batch {
        id: Uuid::new_v4(),
        farm_id: Uuid::new_v4(),
        name: "House 2".to_string(),
        sector,
        breed: Some("Isa Brown".to_string()),
        start_date: today() - Duration::days(120),
        initial_count: 500,
        current_count: 488,
        status: BatchStatus::Active,
        notes: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn layer_log(eggs: i32, cracked: i32) -> CreateDailyLogInput {
    CreateDailyLogInput {
        log_date: today(),
        activities: LogActivities::Layer {
            eggs_collected: eggs,
            cracked_eggs: cracked,
            mortality: 1,
        },
        consumption: vec![ConsumptionLine {
            item_id: Uuid::new_v4(),
            quantity: Decimal::from(2),
            purpose: ConsumptionPurpose::Feed,
        }],
        notes: None,
    }
}

fn validation_field(result: Result<(), AppError>) -> Option<String> {
    match result {
        Err(AppError::Validation { field, .. }) => Some(field),
        _ => None,
    }
}

// ============================================================================
// Log Validation
// ============================================================================

#[test]
fn test_valid_layer_log_passes() {
    assert!(validate_log(&batch(Sector::Layer), &layer_log(420, 6), today()).is_ok());
}

#[test]
fn test_closed_batch_rejects_logs() {
    let mut closed = batch(Sector::Layer);
    closed.status = BatchStatus::Closed;

    let result = validate_log(&closed, &layer_log(420, 6), today());
    assert!(matches!(result, Err(AppError::InvalidStateTransition(_))));
}

#[test]
fn test_sector_mismatch_is_rejected() {
    let result = validate_log(&batch(Sector::Broiler), &layer_log(420, 6), today());
    assert_eq!(validation_field(result).as_deref(), Some("activities"));
}

#[test]
fn test_implausible_activities_are_rejected() {
    let result = validate_log(&batch(Sector::Layer), &layer_log(10, 11), today());
    assert_eq!(validation_field(result).as_deref(), Some("activities"));
}

#[test]
fn test_future_and_pre_start_dates_are_rejected() {
    let layer = batch(Sector::Layer);

    let mut future = layer_log(420, 6);
    future.log_date = today() + Duration::days(1);
    assert_eq!(
        validation_field(validate_log(&layer, &future, today())).as_deref(),
        Some("log_date")
    );

    let mut early = layer_log(420, 6);
    early.log_date = layer.start_date - Duration::days(1);
    assert_eq!(
        validation_field(validate_log(&layer, &early, today())).as_deref(),
        Some("log_date")
    );
}

#[test]
fn test_non_positive_consumption_is_rejected() {
    let mut input = layer_log(420, 6);
    input.consumption[0].quantity = Decimal::ZERO;

    let result = validate_log(&batch(Sector::Layer), &input, today());
    assert_eq!(validation_field(result).as_deref(), Some("consumption.quantity"));
}

#[test]
fn test_fish_log_checks_ph_range() {
    let pond = batch(Sector::Fish);
    let mut input = layer_log(0, 0);
    input.activities = LogActivities::Fish {
        mortality: 0,
        average_weight_g: Some(Decimal::from(350)),
        water_temperature_c: Some(Decimal::from(27)),
        ph: Some(Decimal::from(15)),
        dissolved_oxygen_mg_l: None,
    };

    assert_eq!(
        validation_field(validate_log(&pond, &input, today())).as_deref(),
        Some("activities")
    );
}

#[test]
fn test_log_input_parses_tagged_activities() {
    let json = r#"{
        "log_date": "2025-11-18",
        "activities": {"sector": "broiler", "mortality": 3, "average_weight_kg": "1.85"},
        "consumption": [{"item_id": "6f1c2a8e-2b7e-4c1a-9d55-0f7c1b3e9a10", "quantity": "4", "purpose": "feed"}]
    }"#;

    let input: CreateDailyLogInput = serde_json::from_str(json).unwrap();
    assert_eq!(input.activities.sector(), Sector::Broiler);
    assert_eq!(input.activities.mortality(), 3);
    assert_eq!(input.consumption.len(), 1);
    assert!(input.notes.is_none());
}

// ============================================================================
// Save Order
// ============================================================================

/// Saved logs keyed by batch and date. Holding the guard plays the part of
/// the batch row lock.
type LogBook = Arc<Mutex<Vec<(Uuid, NaiveDate)>>>;

struct BookSlot {
    book: OwnedMutexGuard<Vec<(Uuid, NaiveDate)>>,
    batch_id: Uuid,
    date: NaiveDate,
}

impl BookSlot {
    async fn open(book: &LogBook, batch_id: Uuid, date: NaiveDate) -> Self {
        Self {
            book: book.clone().lock_owned().await,
            batch_id,
            date,
        }
    }
}

#[async_trait]
impl LogSlot for BookSlot {
    type Saved = usize;

    async fn claim(&mut self) -> AppResult<()> {
        if self.book.contains(&(self.batch_id, self.date)) {
            return Err(AppError::Conflict {
                resource: "log_date".to_string(),
                message: "A log already exists for this batch on this date".to_string(),
            });
        }
        Ok(())
    }

    async fn write(mut self) -> AppResult<usize> {
        self.book.push((self.batch_id, self.date));
        Ok(self.book.len())
    }
}

async fn feed_in_stock(inventory: &InventoryService, farm_id: Uuid, bags: i64) -> InventoryItem {
    let purchase = RecordPurchaseInput {
        item_id: None,
        name: Some("TopFeed Layer Mash".to_string()),
        category: Some(InventoryCategory::Feed),
        unit: Some("Bags".to_string()),
        min_threshold: None,
        quantity: Decimal::from(bags),
        cost: None,
        supplier: None,
        notes: None,
        transaction_date: None,
    };
    inventory.record_purchase(farm_id, purchase).await.unwrap().item
}

fn feed(item_id: Uuid, bags: i64) -> Vec<ConsumptionLine> {
    vec![ConsumptionLine {
        item_id,
        quantity: Decimal::from(bags),
        purpose: ConsumptionPurpose::Feed,
    }]
}

#[tokio::test]
async fn test_shortage_leaves_no_log() {
    let inventory = InventoryService::new(Arc::new(MemoryInventoryStore::new()));
    let farm_id = Uuid::new_v4();
    let item = feed_in_stock(&inventory, farm_id, 7).await;
    let book = LogBook::default();
    let batch_id = Uuid::new_v4();
    let note = daily_log_note(Sector::Layer, today());

    let slot = BookSlot::open(&book, batch_id, today()).await;
    let err = save_with_deduction(&inventory, slot, farm_id, &feed(item.id, 20), &note, today())
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::InsufficientStock { .. }));
    assert!(book.lock().await.is_empty());
    assert_eq!(inventory.get_item(item.id).await.unwrap().quantity, Decimal::from(7));
    assert_eq!(inventory.list_transactions(item.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_duplicate_date_is_refused_before_deduction() {
    let inventory = InventoryService::new(Arc::new(MemoryInventoryStore::new()));
    let farm_id = Uuid::new_v4();
    let item = feed_in_stock(&inventory, farm_id, 12).await;
    let book = LogBook::default();
    let batch_id = Uuid::new_v4();
    let note = daily_log_note(Sector::Layer, today());

    let slot = BookSlot::open(&book, batch_id, today()).await;
    let saved = save_with_deduction(&inventory, slot, farm_id, &feed(item.id, 5), &note, today())
        .await
        .unwrap();
    assert_eq!(saved, 1);

    let slot = BookSlot::open(&book, batch_id, today()).await;
    let err = save_with_deduction(&inventory, slot, farm_id, &feed(item.id, 5), &note, today())
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Conflict { .. }));
    assert_eq!(book.lock().await.len(), 1);
    assert_eq!(inventory.get_item(item.id).await.unwrap().quantity, Decimal::from(7));
}

#[tokio::test]
async fn test_concurrent_saves_for_one_date_deduct_once() {
    let inventory = InventoryService::new(Arc::new(MemoryInventoryStore::new()));
    let farm_id = Uuid::new_v4();
    let item = feed_in_stock(&inventory, farm_id, 12).await;
    let book = LogBook::default();
    let batch_id = Uuid::new_v4();

    let handles: Vec<_> = (0..2)
        .map(|_| {
            let inventory = inventory.clone();
            let book = book.clone();
            let lines = feed(item.id, 5);
            tokio::spawn(async move {
                let note = daily_log_note(Sector::Layer, today());
                let slot = BookSlot::open(&book, batch_id, today()).await;
                save_with_deduction(&inventory, slot, farm_id, &lines, &note, today()).await
            })
        })
        .collect();

    let mut saved = 0;
    let mut conflicts = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => saved += 1,
            Err(AppError::Conflict { .. }) => conflicts += 1,
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    assert_eq!((saved, conflicts), (1, 1));
    assert_eq!(inventory.get_item(item.id).await.unwrap().quantity, Decimal::from(7));
    assert_eq!(inventory.list_transactions(item.id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_foreign_item_blocks_the_save() {
    let inventory = InventoryService::new(Arc::new(MemoryInventoryStore::new()));
    let item = feed_in_stock(&inventory, Uuid::new_v4(), 12).await;
    let book = LogBook::default();
    let note = daily_log_note(Sector::Layer, today());

    let slot = BookSlot::open(&book, Uuid::new_v4(), today()).await;
    let err = save_with_deduction(&inventory, slot, Uuid::new_v4(), &feed(item.id, 1), &note, today())
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::NotFound(_)));
    assert!(book.lock().await.is_empty());
    assert_eq!(inventory.get_item(item.id).await.unwrap().quantity, Decimal::from(12));
}

// ============================================================================
// Task Workflow
// ============================================================================

fn task(status: TaskStatus) -> Task {
    Task {
        id: Uuid::new_v4(),
        farm_id: Uuid::new_v4(),
        title: "Clean drinkers".to_string(),
        description: None,
        assignee_id: Some(Uuid::new_v4()),
        due_date: Some(today()),
        priority: TaskPriority::High,
        status,
        created_by: Uuid::new_v4(),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn status_strategy() -> impl Strategy<Value = TaskStatus> {
    prop_oneof![
        Just(TaskStatus::Pending),
        Just(TaskStatus::InProgress),
        Just(TaskStatus::Done),
        Just(TaskStatus::Cancelled),
    ]
}

#[test]
fn test_task_workflow_moves() {
    assert!(check_transition(&task(TaskStatus::Pending), TaskStatus::InProgress).is_ok());
    assert!(check_transition(&task(TaskStatus::InProgress), TaskStatus::Done).is_ok());
    assert!(matches!(
        check_transition(&task(TaskStatus::Pending), TaskStatus::Done),
        Err(AppError::InvalidStateTransition(_))
    ));
}

proptest! {
    /// Finished tasks never move again
    #[test]
    fn prop_terminal_statuses_are_final(next in status_strategy()) {
        prop_assert!(check_transition(&task(TaskStatus::Done), next).is_err());
        prop_assert!(check_transition(&task(TaskStatus::Cancelled), next).is_err());
    }

    /// A task never transitions to its own status
    #[test]
    fn prop_no_self_transitions(status in status_strategy()) {
        prop_assert!(check_transition(&task(status), status).is_err());
    }
}
