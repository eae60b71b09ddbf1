//! Daily production log models

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Sector;

/// Sector-specific activity figures recorded in a daily log
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "sector", rename_all = "snake_case")]
pub enum LogActivities {
    Layer {
        eggs_collected: i32,
        #[serde(default)]
        cracked_eggs: i32,
        #[serde(default)]
        mortality: i32,
    },
    Broiler {
        #[serde(default)]
        mortality: i32,
        average_weight_kg: Option<Decimal>,
        water_litres: Option<Decimal>,
    },
    Fish {
        #[serde(default)]
        mortality: i32,
        average_weight_g: Option<Decimal>,
        water_temperature_c: Option<Decimal>,
        ph: Option<Decimal>,
        dissolved_oxygen_mg_l: Option<Decimal>,
    },
}

impl LogActivities {
    pub fn sector(&self) -> Sector {
        match self {
            LogActivities::Layer { .. } => Sector::Layer,
            LogActivities::Broiler { .. } => Sector::Broiler,
            LogActivities::Fish { .. } => Sector::Fish,
        }
    }

    pub fn mortality(&self) -> i32 {
        match self {
            LogActivities::Layer { mortality, .. }
            | LogActivities::Broiler { mortality, .. }
            | LogActivities::Fish { mortality, .. } => *mortality,
        }
    }

    /// Eggs collected; zero outside the layer sector
    pub fn eggs_collected(&self) -> i32 {
        match self {
            LogActivities::Layer { eggs_collected, .. } => *eggs_collected,
            _ => 0,
        }
    }

    /// Check the figures are physically plausible
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.mortality() < 0 {
            return Err("Mortality cannot be negative");
        }

        match self {
            LogActivities::Layer {
                eggs_collected,
                cracked_eggs,
                ..
            } => {
                if *eggs_collected < 0 || *cracked_eggs < 0 {
                    return Err("Egg counts cannot be negative");
                }
                if cracked_eggs > eggs_collected {
                    return Err("Cracked eggs cannot exceed eggs collected");
                }
            }
            LogActivities::Broiler {
                average_weight_kg,
                water_litres,
                ..
            } => {
                if matches!(average_weight_kg, Some(w) if *w <= Decimal::ZERO) {
                    return Err("Average weight must be positive");
                }
                if matches!(water_litres, Some(w) if *w < Decimal::ZERO) {
                    return Err("Water consumption cannot be negative");
                }
            }
            LogActivities::Fish {
                average_weight_g,
                ph,
                dissolved_oxygen_mg_l,
                ..
            } => {
                if matches!(average_weight_g, Some(w) if *w <= Decimal::ZERO) {
                    return Err("Average weight must be positive");
                }
                if let Some(ph) = ph {
                    crate::validation::validate_ph(*ph)?;
                }
                if matches!(dissolved_oxygen_mg_l, Some(o) if *o < Decimal::ZERO) {
                    return Err("Dissolved oxygen cannot be negative");
                }
            }
        }

        Ok(())
    }
}

/// Why a stock item was consumed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsumptionPurpose {
    Feed,
    Medication,
}

/// One item consumed while logging
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConsumptionLine {
    pub item_id: Uuid,
    pub quantity: Decimal,
    pub purpose: ConsumptionPurpose,
}

/// A daily production log entry for a batch
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DailyLog {
    pub id: Uuid,
    pub batch_id: Uuid,
    pub log_date: NaiveDate,
    pub activities: LogActivities,
    pub consumption: Vec<ConsumptionLine>,
    pub notes: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Note attached to usage transactions created by a daily log
pub fn daily_log_note(sector: Sector, date: NaiveDate) -> String {
    format!("Daily log ({}) — {}", sector, date.format("%Y-%m-%d"))
}

/// Note attached to usage transactions created by a health record
pub fn health_log_note(sector: Sector, date: NaiveDate) -> String {
    format!("Health log ({}) — {}", sector, date.format("%Y-%m-%d"))
}

/// Sum consumption per item, keeping the order in which items first appear
pub fn aggregate_consumption(lines: &[ConsumptionLine]) -> Vec<(Uuid, Decimal)> {
    let mut totals: Vec<(Uuid, Decimal)> = Vec::with_capacity(lines.len());
    for line in lines {
        match totals.iter_mut().find(|(id, _)| *id == line.item_id) {
            Some((_, total)) => *total += line.quantity,
            None => totals.push((line.item_id, line.quantity)),
        }
    }
    totals
}
