//! Sales tracking service

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::{
    sale_total, validate_name, validate_positive_quantity, validate_record_date, validate_unit,
    validate_unit_price, DateRange, Sale,
};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};

/// Sales service
#[derive(Clone)]
pub struct SalesService {
    db: PgPool,
}

#[derive(Debug, FromRow)]
struct SaleRow {
    id: Uuid,
    farm_id: Uuid,
    batch_id: Option<Uuid>,
    sale_date: NaiveDate,
    product: String,
    quantity: Decimal,
    unit: String,
    unit_price: Decimal,
    total_amount: Decimal,
    buyer: Option<String>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<SaleRow> for Sale {
    fn from(row: SaleRow) -> Self {
        Sale {
            id: row.id,
            farm_id: row.farm_id,
            batch_id: row.batch_id,
            sale_date: row.sale_date,
            product: row.product,
            quantity: row.quantity,
            unit: row.unit,
            unit_price: row.unit_price,
            total_amount: row.total_amount,
            buyer: row.buyer,
            notes: row.notes,
            created_at: row.created_at,
        }
    }
}

/// Input for recording a sale
#[derive(Debug, Deserialize, Validate)]
pub struct RecordSaleInput {
    pub batch_id: Option<Uuid>,
    pub sale_date: Option<NaiveDate>,
    #[validate(length(min = 1, max = 120, message = "Product must be 1-120 characters"))]
    pub product: String,
    pub quantity: Decimal,
    pub unit: String,
    pub unit_price: Decimal,
    #[validate(length(max = 200, message = "Buyer must be at most 200 characters"))]
    pub buyer: Option<String>,
    pub notes: Option<String>,
}

impl SalesService {
    /// Create a new SalesService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Record a sale on a farm
    pub async fn record_sale(&self, farm_id: Uuid, input: RecordSaleInput) -> AppResult<Sale> {
        input.validate()?;
        validate_name(&input.product).map_err(|m| AppError::validation("product", m))?;
        validate_positive_quantity(input.quantity).map_err(|m| AppError::validation("quantity", m))?;
        validate_unit(&input.unit).map_err(|m| AppError::validation("unit", m))?;
        validate_unit_price(input.unit_price).map_err(|m| AppError::validation("unit_price", m))?;

        let today = Utc::now().date_naive();
        let sale_date = input.sale_date.unwrap_or(today);
        validate_record_date(sale_date, today).map_err(|m| AppError::validation("sale_date", m))?;

        if let Some(batch_id) = input.batch_id {
            let batch_on_farm = sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS(SELECT 1 FROM batches WHERE id = $1 AND farm_id = $2)",
            )
            .bind(batch_id)
            .bind(farm_id)
            .fetch_one(&self.db)
            .await?;

            if !batch_on_farm {
                return Err(AppError::NotFound("Batch".to_string()));
            }
        }

        let total_amount = sale_total(input.quantity, input.unit_price);

        let row = sqlx::query_as::<_, SaleRow>(
            r#"
            INSERT INTO sales (farm_id, batch_id, sale_date, product, quantity, unit, unit_price,
                               total_amount, buyer, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id, farm_id, batch_id, sale_date, product, quantity, unit, unit_price,
                      total_amount, buyer, notes, created_at
            "#,
        )
        .bind(farm_id)
        .bind(input.batch_id)
        .bind(sale_date)
        .bind(input.product.trim())
        .bind(input.quantity)
        .bind(input.unit.trim())
        .bind(input.unit_price)
        .bind(total_amount)
        .bind(&input.buyer)
        .bind(&input.notes)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(sale_id = %row.id, farm_id = %farm_id, total = %total_amount, "Sale recorded");
        Ok(row.into())
    }

    /// Sales of a farm, optionally within a date range, newest first
    pub async fn list_sales(&self, farm_id: Uuid, range: Option<DateRange>) -> AppResult<Vec<Sale>> {
        let rows = sqlx::query_as::<_, SaleRow>(
            r#"
            SELECT id, farm_id, batch_id, sale_date, product, quantity, unit, unit_price,
                   total_amount, buyer, notes, created_at
            FROM sales
            WHERE farm_id = $1
              AND ($2::date IS NULL OR sale_date >= $2)
              AND ($3::date IS NULL OR sale_date <= $3)
            ORDER BY sale_date DESC, created_at DESC
            "#,
        )
        .bind(farm_id)
        .bind(range.map(|r| r.start))
        .bind(range.map(|r| r.end))
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Sale::from).collect())
    }

    /// Get a sale the user owns through its farm
    pub async fn get_owned(&self, owner_id: Uuid, sale_id: Uuid) -> AppResult<Sale> {
        sqlx::query_as::<_, SaleRow>(
            r#"
            SELECT s.id, s.farm_id, s.batch_id, s.sale_date, s.product, s.quantity, s.unit,
                   s.unit_price, s.total_amount, s.buyer, s.notes, s.created_at
            FROM sales s
            JOIN farms f ON f.id = s.farm_id
            WHERE s.id = $1 AND f.owner_id = $2
            "#,
        )
        .bind(sale_id)
        .bind(owner_id)
        .fetch_optional(&self.db)
        .await?
        .map(Sale::from)
        .ok_or_else(|| AppError::NotFound("Sale".to_string()))
    }
}
