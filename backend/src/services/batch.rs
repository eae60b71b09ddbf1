//! Batch management service for flocks and fish stocks

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use shared::{validate_count, validate_name, Batch, BatchStatus, Sector};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};

/// Batch service
#[derive(Clone)]
pub struct BatchService {
    db: PgPool,
}

#[derive(Debug, FromRow)]
struct BatchRow {
    id: Uuid,
    farm_id: Uuid,
    name: String,
    sector: String,
    breed: Option<String>,
    start_date: NaiveDate,
    initial_count: i32,
    current_count: i32,
    status: String,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<BatchRow> for Batch {
    type Error = AppError;

    fn try_from(row: BatchRow) -> Result<Self, Self::Error> {
        Ok(Batch {
            id: row.id,
            farm_id: row.farm_id,
            name: row.name,
            sector: row.sector.parse::<Sector>().map_err(AppError::Internal)?,
            breed: row.breed,
            start_date: row.start_date,
            initial_count: row.initial_count,
            current_count: row.current_count,
            status: row.status.parse::<BatchStatus>().map_err(AppError::Internal)?,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Input for starting a batch
#[derive(Debug, Deserialize, Validate)]
pub struct CreateBatchInput {
    #[validate(length(min = 1, max = 120, message = "Name must be 1-120 characters"))]
    pub name: String,
    pub sector: Sector,
    #[validate(length(max = 120, message = "Breed must be at most 120 characters"))]
    pub breed: Option<String>,
    pub start_date: NaiveDate,
    pub initial_count: i32,
    pub notes: Option<String>,
}

/// Input for updating a batch. Sector is fixed once logs reference it.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateBatchInput {
    #[validate(length(min = 1, max = 120, message = "Name must be 1-120 characters"))]
    pub name: Option<String>,
    #[validate(length(max = 120, message = "Breed must be at most 120 characters"))]
    pub breed: Option<String>,
    pub current_count: Option<i32>,
    pub notes: Option<String>,
}

impl BatchService {
    /// Create a new BatchService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Get a batch the user owns through its farm
    pub async fn get_owned(&self, owner_id: Uuid, batch_id: Uuid) -> AppResult<Batch> {
        sqlx::query_as::<_, BatchRow>(
            r#"
            SELECT b.id, b.farm_id, b.name, b.sector, b.breed, b.start_date, b.initial_count,
                   b.current_count, b.status, b.notes, b.created_at, b.updated_at
            FROM batches b
            JOIN farms f ON f.id = b.farm_id
            WHERE b.id = $1 AND f.owner_id = $2
            "#,
        )
        .bind(batch_id)
        .bind(owner_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Batch".to_string()))?
        .try_into()
    }

    /// List batches of a farm, newest first
    pub async fn list_batches(&self, farm_id: Uuid) -> AppResult<Vec<Batch>> {
        let rows = sqlx::query_as::<_, BatchRow>(
            r#"
            SELECT id, farm_id, name, sector, breed, start_date, initial_count,
                   current_count, status, notes, created_at, updated_at
            FROM batches
            WHERE farm_id = $1
            ORDER BY start_date DESC, created_at DESC
            "#,
        )
        .bind(farm_id)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Start a new batch on a farm
    pub async fn create_batch(&self, farm_id: Uuid, input: CreateBatchInput) -> AppResult<Batch> {
        input.validate()?;
        validate_name(&input.name).map_err(|m| AppError::validation("name", m))?;
        validate_count(input.initial_count).map_err(|m| AppError::validation("initial_count", m))?;

        let batch: Batch = sqlx::query_as::<_, BatchRow>(
            r#"
            INSERT INTO batches (farm_id, name, sector, breed, start_date, initial_count, current_count, status, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $6, $7, $8)
            RETURNING id, farm_id, name, sector, breed, start_date, initial_count,
                      current_count, status, notes, created_at, updated_at
            "#,
        )
        .bind(farm_id)
        .bind(input.name.trim())
        .bind(input.sector.as_str())
        .bind(&input.breed)
        .bind(input.start_date)
        .bind(input.initial_count)
        .bind(BatchStatus::Active.as_str())
        .bind(&input.notes)
        .fetch_one(&self.db)
        .await?
        .try_into()?;

        tracing::info!(batch_id = %batch.id, farm_id = %farm_id, sector = %batch.sector, "Batch started");
        Ok(batch)
    }

    /// Update a batch
    pub async fn update_batch(&self, batch: &Batch, input: UpdateBatchInput) -> AppResult<Batch> {
        input.validate()?;
        if let Some(name) = &input.name {
            validate_name(name).map_err(|m| AppError::validation("name", m))?;
        }
        if let Some(count) = input.current_count {
            validate_count(count).map_err(|m| AppError::validation("current_count", m))?;
        }

        sqlx::query_as::<_, BatchRow>(
            r#"
            UPDATE batches
            SET name = COALESCE($1, name), breed = COALESCE($2, breed),
                current_count = COALESCE($3, current_count), notes = COALESCE($4, notes),
                updated_at = NOW()
            WHERE id = $5
            RETURNING id, farm_id, name, sector, breed, start_date, initial_count,
                      current_count, status, notes, created_at, updated_at
            "#,
        )
        .bind(input.name.as_deref().map(str::trim))
        .bind(&input.breed)
        .bind(input.current_count)
        .bind(&input.notes)
        .bind(batch.id)
        .fetch_one(&self.db)
        .await?
        .try_into()
    }

    /// Close a batch; closed batches accept no further logs
    pub async fn close_batch(&self, batch: &Batch) -> AppResult<Batch> {
        if !batch.is_active() {
            return Err(AppError::InvalidStateTransition(
                "Batch is already closed".to_string(),
            ));
        }

        let closed: Batch = sqlx::query_as::<_, BatchRow>(
            r#"
            UPDATE batches
            SET status = $1, updated_at = NOW()
            WHERE id = $2
            RETURNING id, farm_id, name, sector, breed, start_date, initial_count,
                      current_count, status, notes, created_at, updated_at
            "#,
        )
        .bind(BatchStatus::Closed.as_str())
        .bind(batch.id)
        .fetch_one(&self.db)
        .await?
        .try_into()?;

        tracing::info!(batch_id = %batch.id, "Batch closed");
        Ok(closed)
    }

    /// Delete a batch with its logs and health records
    pub async fn delete_batch(&self, batch: &Batch) -> AppResult<()> {
        sqlx::query("DELETE FROM batches WHERE id = $1")
            .bind(batch.id)
            .execute(&self.db)
            .await?;

        tracing::info!(batch_id = %batch.id, "Batch deleted");
        Ok(())
    }
}
