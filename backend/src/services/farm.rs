//! Farm management service

use chrono::{DateTime, Utc};
use serde::Deserialize;
use shared::{validate_name, Farm};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};

/// Farm service for managing a user's farms
#[derive(Clone)]
pub struct FarmService {
    db: PgPool,
}

#[derive(Debug, FromRow)]
struct FarmRow {
    id: Uuid,
    owner_id: Uuid,
    name: String,
    location: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<FarmRow> for Farm {
    fn from(row: FarmRow) -> Self {
        Farm {
            id: row.id,
            owner_id: row.owner_id,
            name: row.name,
            location: row.location,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Input for creating a farm
#[derive(Debug, Deserialize, Validate)]
pub struct CreateFarmInput {
    #[validate(length(min = 1, max = 120, message = "Name must be 1-120 characters"))]
    pub name: String,
    #[validate(length(max = 255, message = "Location must be at most 255 characters"))]
    pub location: Option<String>,
}

/// Input for updating a farm
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateFarmInput {
    #[validate(length(min = 1, max = 120, message = "Name must be 1-120 characters"))]
    pub name: Option<String>,
    #[validate(length(max = 255, message = "Location must be at most 255 characters"))]
    pub location: Option<String>,
}

impl FarmService {
    /// Create a new FarmService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Fail with NotFound unless the farm exists and belongs to the user
    pub async fn ensure_access(&self, owner_id: Uuid, farm_id: Uuid) -> AppResult<()> {
        let owned = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM farms WHERE id = $1 AND owner_id = $2)",
        )
        .bind(farm_id)
        .bind(owner_id)
        .fetch_one(&self.db)
        .await?;

        if !owned {
            return Err(AppError::NotFound("Farm".to_string()));
        }

        Ok(())
    }

    /// List farms owned by a user
    pub async fn list_farms(&self, owner_id: Uuid) -> AppResult<Vec<Farm>> {
        let rows = sqlx::query_as::<_, FarmRow>(
            r#"
            SELECT id, owner_id, name, location, created_at, updated_at
            FROM farms
            WHERE owner_id = $1
            ORDER BY name ASC
            "#,
        )
        .bind(owner_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Farm::from).collect())
    }

    /// Get a farm by ID
    pub async fn get_farm(&self, owner_id: Uuid, farm_id: Uuid) -> AppResult<Farm> {
        sqlx::query_as::<_, FarmRow>(
            r#"
            SELECT id, owner_id, name, location, created_at, updated_at
            FROM farms
            WHERE id = $1 AND owner_id = $2
            "#,
        )
        .bind(farm_id)
        .bind(owner_id)
        .fetch_optional(&self.db)
        .await?
        .map(Farm::from)
        .ok_or_else(|| AppError::NotFound("Farm".to_string()))
    }

    /// Create a farm
    pub async fn create_farm(&self, owner_id: Uuid, input: CreateFarmInput) -> AppResult<Farm> {
        input.validate()?;
        validate_name(&input.name).map_err(|m| AppError::validation("name", m))?;

        let row = sqlx::query_as::<_, FarmRow>(
            r#"
            INSERT INTO farms (owner_id, name, location)
            VALUES ($1, $2, $3)
            RETURNING id, owner_id, name, location, created_at, updated_at
            "#,
        )
        .bind(owner_id)
        .bind(input.name.trim())
        .bind(&input.location)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(farm_id = %row.id, owner_id = %owner_id, "Farm created");
        Ok(row.into())
    }

    /// Update a farm
    pub async fn update_farm(
        &self,
        owner_id: Uuid,
        farm_id: Uuid,
        input: UpdateFarmInput,
    ) -> AppResult<Farm> {
        input.validate()?;
        if let Some(name) = &input.name {
            validate_name(name).map_err(|m| AppError::validation("name", m))?;
        }

        sqlx::query_as::<_, FarmRow>(
            r#"
            UPDATE farms
            SET name = COALESCE($1, name), location = COALESCE($2, location), updated_at = NOW()
            WHERE id = $3 AND owner_id = $4
            RETURNING id, owner_id, name, location, created_at, updated_at
            "#,
        )
        .bind(input.name.as_deref().map(str::trim))
        .bind(&input.location)
        .bind(farm_id)
        .bind(owner_id)
        .fetch_optional(&self.db)
        .await?
        .map(Farm::from)
        .ok_or_else(|| AppError::NotFound("Farm".to_string()))
    }

    /// Delete a farm and everything recorded under it
    pub async fn delete_farm(&self, owner_id: Uuid, farm_id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM farms WHERE id = $1 AND owner_id = $2")
            .bind(farm_id)
            .bind(owner_id)
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Farm".to_string()));
        }

        tracing::info!(farm_id = %farm_id, "Farm deleted");
        Ok(())
    }
}
