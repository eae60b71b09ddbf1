//! Livestock health records

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ConsumptionLine;

/// A health event for a batch, optionally treated with stocked medication
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthRecord {
    pub id: Uuid,
    pub batch_id: Uuid,
    pub record_date: NaiveDate,
    pub condition: String,
    pub treatment: Option<String>,
    pub medication: Option<ConsumptionLine>,
    pub mortality: i32,
    pub notes: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}
