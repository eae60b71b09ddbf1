//! Common types used across the platform

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Inclusive date range for queries and chart windows
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Range covering the `days` days that end on `end` (inclusive)
    pub fn last_days(end: NaiveDate, days: u32) -> Self {
        let span = i64::from(days.max(1)) - 1;
        Self {
            start: end - chrono::Duration::days(span),
            end,
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    pub fn is_valid(&self) -> bool {
        self.start <= self.end
    }
}

/// Render a quantity without trailing zeros ("12.00" -> "12", "2.50" -> "2.5")
pub fn format_quantity(quantity: &Decimal) -> String {
    quantity.normalize().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::from_str(s).unwrap()
    }

    #[test]
    fn test_last_days_is_inclusive() {
        let range = DateRange::last_days(date("2025-11-18"), 7);
        assert_eq!(range.start, date("2025-11-12"));
        assert!(range.contains(date("2025-11-12")));
        assert!(range.contains(date("2025-11-18")));
        assert!(!range.contains(date("2025-11-19")));
    }

    #[test]
    fn test_last_days_zero_means_single_day() {
        let range = DateRange::last_days(date("2025-11-18"), 0);
        assert_eq!(range.start, range.end);
    }

    #[test]
    fn test_format_quantity_strips_trailing_zeros() {
        assert_eq!(format_quantity(&Decimal::from_str("12.00").unwrap()), "12");
        assert_eq!(format_quantity(&Decimal::from_str("2.50").unwrap()), "2.5");
        assert_eq!(format_quantity(&Decimal::ZERO), "0");
    }
}
