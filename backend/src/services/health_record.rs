//! Livestock health records with medication deduction

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use shared::{
    health_log_note, validate_count, validate_positive_quantity, validate_record_date, Batch,
    ConsumptionLine, ConsumptionPurpose, HealthRecord,
};
use sqlx::{types::Json, FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;
use validator::Validate;

use super::inventory::InventoryService;
use super::log_gate::{save_with_deduction, LogSlot};
use crate::error::{AppError, AppResult};

/// Health record service
#[derive(Clone)]
pub struct HealthRecordService {
    db: PgPool,
    inventory: InventoryService,
}

#[derive(Debug, FromRow)]
struct HealthRecordRow {
    id: Uuid,
    batch_id: Uuid,
    record_date: NaiveDate,
    condition: String,
    treatment: Option<String>,
    medication: Option<Json<ConsumptionLine>>,
    mortality: i32,
    notes: Option<String>,
    created_by: Option<Uuid>,
    created_at: DateTime<Utc>,
}

impl From<HealthRecordRow> for HealthRecord {
    fn from(row: HealthRecordRow) -> Self {
        HealthRecord {
            id: row.id,
            batch_id: row.batch_id,
            record_date: row.record_date,
            condition: row.condition,
            treatment: row.treatment,
            medication: row.medication.map(|m| m.0),
            mortality: row.mortality,
            notes: row.notes,
            created_by: row.created_by,
            created_at: row.created_at,
        }
    }
}

/// Input for recording a health event
#[derive(Debug, Deserialize, Validate)]
pub struct CreateHealthRecordInput {
    pub record_date: NaiveDate,
    #[validate(length(min = 1, max = 200, message = "Condition must be 1-200 characters"))]
    pub condition: String,
    #[validate(length(max = 500, message = "Treatment must be at most 500 characters"))]
    pub treatment: Option<String>,
    pub medication: Option<ConsumptionLine>,
    #[serde(default)]
    pub mortality: i32,
    pub notes: Option<String>,
}

impl HealthRecordService {
    /// Create a new HealthRecordService instance
    pub fn new(db: PgPool, inventory: InventoryService) -> Self {
        Self { db, inventory }
    }

    /// Record a health event, deducting any medication used first
    pub async fn create_record(
        &self,
        batch: &Batch,
        user_id: Uuid,
        input: CreateHealthRecordInput,
    ) -> AppResult<HealthRecord> {
        input.validate()?;
        if !batch.is_active() {
            return Err(AppError::InvalidStateTransition(
                "Cannot record health events for a closed batch".to_string(),
            ));
        }
        validate_record_date(input.record_date, Utc::now().date_naive())
            .map_err(|m| AppError::validation("record_date", m))?;
        validate_count(input.mortality).map_err(|m| AppError::validation("mortality", m))?;

        if let Some(medication) = &input.medication {
            validate_positive_quantity(medication.quantity)
                .map_err(|m| AppError::validation("medication.quantity", m))?;
            if medication.purpose != ConsumptionPurpose::Medication {
                return Err(AppError::validation(
                    "medication.purpose",
                    "Health records can only consume medication",
                ));
            }
        }

        let note = health_log_note(batch.sector, input.record_date);
        let (farm_id, record_date) = (batch.farm_id, input.record_date);
        let medication: Vec<ConsumptionLine> = input.medication.iter().cloned().collect();

        let slot = PgHealthRecordSlot::open(&self.db, batch.id, user_id, input).await?;
        let record =
            save_with_deduction(&self.inventory, slot, farm_id, &medication, &note, record_date)
                .await?;

        tracing::info!(record_id = %record.id, batch_id = %record.batch_id, condition = %record.condition, "Health record saved");
        Ok(record)
    }

    /// Health records of a batch, newest first
    pub async fn list_for_batch(&self, batch_id: Uuid) -> AppResult<Vec<HealthRecord>> {
        let rows = sqlx::query_as::<_, HealthRecordRow>(
            r#"
            SELECT id, batch_id, record_date, condition, treatment, medication, mortality,
                   notes, created_by, created_at
            FROM health_records
            WHERE batch_id = $1
            ORDER BY record_date DESC, created_at DESC
            "#,
        )
        .bind(batch_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(HealthRecord::from).collect())
    }
}

/// A pending health record; several may share a date, so the claim only
/// takes the batch lock
struct PgHealthRecordSlot {
    tx: Transaction<'static, Postgres>,
    batch_id: Uuid,
    user_id: Uuid,
    input: CreateHealthRecordInput,
}

impl PgHealthRecordSlot {
    async fn open(
        db: &PgPool,
        batch_id: Uuid,
        user_id: Uuid,
        input: CreateHealthRecordInput,
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
impl LogSlot for PgHealthRecordSlot {
    type Saved = HealthRecord;

    async fn claim(&mut self) -> AppResult<()> {
        Ok(())
    }

    async fn write(mut self) -> AppResult<HealthRecord> {
        let input = &self.input;

        let row = sqlx::query_as::<_, HealthRecordRow>(
            r#"
            INSERT INTO health_records (batch_id, record_date, condition, treatment, medication,
                                        mortality, notes, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, batch_id, record_date, condition, treatment, medication, mortality,
                      notes, created_by, created_at
            "#,
        )
        .bind(self.batch_id)
        .bind(input.record_date)
        .bind(input.condition.trim())
        .bind(&input.treatment)
        .bind(input.medication.as_ref().map(Json))
        .bind(input.mortality)
        .bind(&input.notes)
        .bind(self.user_id)
        .fetch_one(&mut *self.tx)
        .await?;

        if input.mortality > 0 {
            sqlx::query(
                "UPDATE batches SET current_count = GREATEST(current_count - $1, 0), updated_at = NOW() WHERE id = $2",
            )
            .bind(input.mortality)
            .bind(self.batch_id)
            .execute(&mut *self.tx)
            .await?;
        }

        self.tx.commit().await?;
        Ok(row.into())
    }
}
