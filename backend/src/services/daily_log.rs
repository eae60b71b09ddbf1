//! Daily production logging
//!
//! Saving a log first deducts the feed and medication it consumed. If the
//! deduction fails the log is not written. The batch row stays locked from
//! the duplicate-date check until the log is committed.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use shared::{
    daily_log_note, validate_positive_quantity, validate_record_date, Batch, ConsumptionLine,
    DailyLog, DateRange, LogActivities,
};
use sqlx::{types::Json, FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::inventory::InventoryService;
use super::log_gate::{save_with_deduction, LogSlot};
use crate::error::{unique_violation, AppError, AppResult};

const DUPLICATE_LOG: &str = "A log already exists for this batch on this date";

/// Daily log service
#[derive(Clone)]
pub struct DailyLogService {
    db: PgPool,
    inventory: InventoryService,
}

#[derive(Debug, FromRow)]
struct DailyLogRow {
    id: Uuid,
    batch_id: Uuid,
    log_date: NaiveDate,
    activities: Json<LogActivities>,
    consumption: Json<Vec<ConsumptionLine>>,
    notes: Option<String>,
    created_by: Option<Uuid>,
    created_at: DateTime<Utc>,
}

impl From<DailyLogRow> for DailyLog {
    fn from(row: DailyLogRow) -> Self {
        DailyLog {
            id: row.id,
            batch_id: row.batch_id,
            log_date: row.log_date,
            activities: row.activities.0,
            consumption: row.consumption.0,
            notes: row.notes,
            created_by: row.created_by,
            created_at: row.created_at,
        }
    }
}

/// Input for saving a daily log
#[derive(Debug, Deserialize)]
pub struct CreateDailyLogInput {
    pub log_date: NaiveDate,
    pub activities: LogActivities,
    #[serde(default)]
    pub consumption: Vec<ConsumptionLine>,
    pub notes: Option<String>,
}

/// Check a log against its batch before anything is written
pub fn validate_log(batch: &Batch, input: &CreateDailyLogInput, today: NaiveDate) -> AppResult<()> {
    if !batch.is_active() {
        return Err(AppError::InvalidStateTransition(
            "Cannot log against a closed batch".to_string(),
        ));
    }
    if input.activities.sector() != batch.sector {
        return Err(AppError::validation(
            "activities",
            format!(
                "{} activities cannot be logged for a {} batch",
                input.activities.sector(),
                batch.sector
            ),
        ));
    }
    input
        .activities
        .validate()
        .map_err(|m| AppError::validation("activities", m))?;
    validate_record_date(input.log_date, today).map_err(|m| AppError::validation("log_date", m))?;
    if input.log_date < batch.start_date {
        return Err(AppError::validation(
            "log_date",
            "Date cannot be before the batch start date",
        ));
    }
    for line in &input.consumption {
        validate_positive_quantity(line.quantity)
            .map_err(|m| AppError::validation("consumption.quantity", m))?;
    }
    Ok(())
}

impl DailyLogService {
    /// Create a new DailyLogService instance
    pub fn new(db: PgPool, inventory: InventoryService) -> Self {
        Self { db, inventory }
    }

    /// Save a daily log, deducting its consumption from inventory first
    pub async fn create_log(
        &self,
        batch: &Batch,
        user_id: Uuid,
        input: CreateDailyLogInput,
    ) -> AppResult<DailyLog> {
        validate_log(batch, &input, Utc::now().date_naive())?;

        let note = daily_log_note(batch.sector, input.log_date);
        let (farm_id, log_date) = (batch.farm_id, input.log_date);
        let consumption = input.consumption.clone();

        let slot = PgDailyLogSlot::open(&self.db, batch.id, user_id, input).await?;
        let log = save_with_deduction(&self.inventory, slot, farm_id, &consumption, &note, log_date)
            .await?;

        tracing::info!(log_id = %log.id, batch_id = %log.batch_id, date = %log.log_date, "Daily log saved");
        Ok(log)
    }

    /// Logs of a batch, newest first
    pub async fn list_for_batch(&self, batch_id: Uuid) -> AppResult<Vec<DailyLog>> {
        let rows = sqlx::query_as::<_, DailyLogRow>(
            r#"
            SELECT id, batch_id, log_date, activities, consumption, notes, created_by, created_at
            FROM daily_logs
            WHERE batch_id = $1
            ORDER BY log_date DESC
            "#,
        )
        .bind(batch_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(DailyLog::from).collect())
    }

    /// Logs of every batch on a farm within a date range, oldest first
    pub async fn list_for_farm(&self, farm_id: Uuid, range: DateRange) -> AppResult<Vec<DailyLog>> {
        let rows = sqlx::query_as::<_, DailyLogRow>(
            r#"
            SELECT l.id, l.batch_id, l.log_date, l.activities, l.consumption, l.notes,
                   l.created_by, l.created_at
            FROM daily_logs l
            JOIN batches b ON b.id = l.batch_id
            WHERE b.farm_id = $1 AND l.log_date BETWEEN $2 AND $3
            ORDER BY l.log_date ASC
            "#,
        )
        .bind(farm_id)
        .bind(range.start)
        .bind(range.end)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(DailyLog::from).collect())
    }

    /// Get a log the user owns through its farm
    pub async fn get_owned(&self, owner_id: Uuid, log_id: Uuid) -> AppResult<DailyLog> {
        sqlx::query_as::<_, DailyLogRow>(
            r#"
            SELECT l.id, l.batch_id, l.log_date, l.activities, l.consumption, l.notes,
                   l.created_by, l.created_at
            FROM daily_logs l
            JOIN batches b ON b.id = l.batch_id
            JOIN farms f ON f.id = b.farm_id
            WHERE l.id = $1 AND f.owner_id = $2
            "#,
        )
        .bind(log_id)
        .bind(owner_id)
        .fetch_optional(&self.db)
        .await?
        .map(DailyLog::from)
        .ok_or_else(|| AppError::NotFound("Daily log".to_string()))
    }
}

/// One batch-date slot, held by a row lock on the batch
struct PgDailyLogSlot {
    tx: Transaction<'static, Postgres>,
    batch_id: Uuid,
    user_id: Uuid,
    input: CreateDailyLogInput,
}

impl PgDailyLogSlot {
    async fn open(
        db: &PgPool,
        batch_id: Uuid,
        user_id: Uuid,
        input: CreateDailyLogInput,
    ) -> AppResult<Self> {
        let mut tx = db.begin().await?;
        sqlx::query("SELECT id FROM batches WHERE id = $1 FOR UPDATE")
            .bind(batch_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound("Batch".to_string()))?;

        Ok(Self {
            tx,
            batch_id,
            user_id,
            input,
        })
    }
}

#[async_trait]
impl LogSlot for PgDailyLogSlot {
    type Saved = DailyLog;

    async fn claim(&mut self) -> AppResult<()> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM daily_logs WHERE batch_id = $1 AND log_date = $2)",
        )
        .bind(self.batch_id)
        .bind(self.input.log_date)
        .fetch_one(&mut *self.tx)
        .await?;

        if exists {
            return Err(duplicate_log());
        }
        Ok(())
    }

    async fn write(mut self) -> AppResult<DailyLog> {
        let input = &self.input;

        let row = sqlx::query_as::<_, DailyLogRow>(
            r#"
            INSERT INTO daily_logs (batch_id, log_date, activities, consumption, notes, created_by)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, batch_id, log_date, activities, consumption, notes, created_by, created_at
            "#,
        )
        .bind(self.batch_id)
        .bind(input.log_date)
        .bind(Json(&input.activities))
        .bind(Json(&input.consumption))
        .bind(&input.notes)
        .bind(self.user_id)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| unique_violation(e, "log_date", DUPLICATE_LOG))?;

        let mortality = input.activities.mortality();
        if mortality > 0 {
            sqlx::query(
                "UPDATE batches SET current_count = GREATEST(current_count - $1, 0), updated_at = NOW() WHERE id = $2",
            )
            .bind(mortality)
            .bind(self.batch_id)
            .execute(&mut *self.tx)
            .await?;
        }

        self.tx.commit().await?;
        Ok(row.into())
    }
}

fn duplicate_log() -> AppError {
    AppError::Conflict {
        resource: "log_date".to_string(),
        message: DUPLICATE_LOG.to_string(),
    }
}
