//! Livestock batch models

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Production sector of a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sector {
    /// Egg-laying poultry
    Layer,
    /// Meat poultry
    Broiler,
    Fish,
}

impl Sector {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sector::Layer => "layer",
            Sector::Broiler => "broiler",
            Sector::Fish => "fish",
        }
    }
}

impl FromStr for Sector {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "layer" => Ok(Sector::Layer),
            "broiler" => Ok(Sector::Broiler),
            "fish" => Ok(Sector::Fish),
            other => Err(format!("Unknown sector: {}", other)),
        }
    }
}

impl fmt::Display for Sector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Sector::Layer => "Layer",
            Sector::Broiler => "Broiler",
            Sector::Fish => "Fish",
        };
        write!(f, "{}", label)
    }
}

/// Batch lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Active,
    Closed,
}

impl BatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchStatus::Active => "active",
            BatchStatus::Closed => "closed",
        }
    }
}

impl FromStr for BatchStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(BatchStatus::Active),
            "closed" => Ok(BatchStatus::Closed),
            other => Err(format!("Unknown batch status: {}", other)),
        }
    }
}

/// A cohort of birds or fish tracked together from a start date
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Batch {
    pub id: Uuid,
    pub farm_id: Uuid,
    pub name: String,
    pub sector: Sector,
    pub breed: Option<String>,
    pub start_date: NaiveDate,
    pub initial_count: i32,
    pub current_count: i32,
    pub status: BatchStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Batch {
    pub fn is_active(&self) -> bool {
        self.status == BatchStatus::Active
    }

    /// Head count after recording `mortality` deaths
    pub fn count_after_mortality(&self, mortality: i32) -> i32 {
        (self.current_count - mortality.max(0)).max(0)
    }

    /// Age of the batch in days on `date`
    pub fn age_in_days(&self, date: NaiveDate) -> i64 {
        (date - self.start_date).num_days().max(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch(current_count: i32) -> Batch {
        Batch {
            id: Uuid::new_v4(),
            farm_id: Uuid::new_v4(),
            name: "Broilers March".to_string(),
            sector: Sector::Broiler,
            breed: Some("Cobb 500".to_string()),
            start_date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            initial_count: 500,
            current_count,
            status: BatchStatus::Active,
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_mortality_reduces_count() {
        assert_eq!(batch(500).count_after_mortality(3), 497);
    }

    #[test]
    fn test_mortality_never_goes_below_zero() {
        assert_eq!(batch(2).count_after_mortality(5), 0);
        assert_eq!(batch(2).count_after_mortality(-4), 2);
    }

    #[test]
    fn test_age_in_days() {
        let b = batch(500);
        assert_eq!(b.age_in_days(NaiveDate::from_ymd_opt(2025, 3, 15).unwrap()), 14);
        assert_eq!(b.age_in_days(NaiveDate::from_ymd_opt(2025, 2, 15).unwrap()), 0);
    }

    #[test]
    fn test_sector_labels() {
        assert_eq!(Sector::Broiler.to_string(), "Broiler");
        assert_eq!(Sector::from_str("FISH"), Ok(Sector::Fish));
        assert!(Sector::from_str("cattle").is_err());
    }
}
