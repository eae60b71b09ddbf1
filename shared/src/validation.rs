//! Validation utilities for the Farm Management Platform

use chrono::NaiveDate;
use rust_decimal::Decimal;

// ============================================================================
// Inventory Validations
// ============================================================================

/// Decimal places stored for stock quantities and thresholds
pub const QUANTITY_SCALE: u32 = 3;

/// Decimal places stored for money amounts
pub const MONEY_SCALE: u32 = 2;

/// Whether `value` is representable with at most `places` decimal places.
/// Trailing zeros do not count: `1.5000` fits in one place.
pub fn fits_scale(value: Decimal, places: u32) -> bool {
    value.normalize().scale() <= places
}

/// Validate a transaction or consumption quantity
pub fn validate_positive_quantity(quantity: Decimal) -> Result<(), &'static str> {
    if quantity <= Decimal::ZERO {
        return Err("Quantity must be greater than zero");
    }
    if !fits_scale(quantity, QUANTITY_SCALE) {
        return Err("Quantity can have at most 3 decimal places");
    }
    Ok(())
}

/// Validate a low-stock threshold
pub fn validate_threshold(threshold: Decimal) -> Result<(), &'static str> {
    if threshold < Decimal::ZERO {
        return Err("Threshold cannot be negative");
    }
    if !fits_scale(threshold, QUANTITY_SCALE) {
        return Err("Threshold can have at most 3 decimal places");
    }
    Ok(())
}

/// Validate an optional purchase cost
pub fn validate_cost(cost: Option<Decimal>) -> Result<(), &'static str> {
    match cost {
        Some(c) if c < Decimal::ZERO => Err("Cost cannot be negative"),
        Some(c) if !fits_scale(c, MONEY_SCALE) => Err("Cost can have at most 2 decimal places"),
        _ => Ok(()),
    }
}

/// Validate a sale unit price
pub fn validate_unit_price(price: Decimal) -> Result<(), &'static str> {
    if price < Decimal::ZERO {
        return Err("Unit price cannot be negative");
    }
    if !fits_scale(price, MONEY_SCALE) {
        return Err("Unit price can have at most 2 decimal places");
    }
    Ok(())
}

/// Validate a unit label such as "kg" or "Bags"
pub fn validate_unit(unit: &str) -> Result<(), &'static str> {
    let unit = unit.trim();
    if unit.is_empty() {
        return Err("Unit is required");
    }
    if unit.chars().count() > 20 {
        return Err("Unit must be at most 20 characters");
    }
    Ok(())
}

// ============================================================================
// General Validations
// ============================================================================

/// Validate a display name (farm, batch, item, product)
pub fn validate_name(name: &str) -> Result<(), &'static str> {
    let name = name.trim();
    if name.is_empty() {
        return Err("Name is required");
    }
    if name.chars().count() > 120 {
        return Err("Name must be at most 120 characters");
    }
    Ok(())
}

/// Validate a head count (birds or fish)
pub fn validate_count(count: i32) -> Result<(), &'static str> {
    if count < 0 {
        return Err("Count cannot be negative");
    }
    Ok(())
}

/// Records cannot be dated in the future
pub fn validate_record_date(date: NaiveDate, today: NaiveDate) -> Result<(), &'static str> {
    if date > today {
        return Err("Date cannot be in the future");
    }
    Ok(())
}

// ============================================================================
// Water Quality Validations
// ============================================================================

/// Validate pH reading is on the 0-14 scale
pub fn validate_ph(ph: Decimal) -> Result<(), &'static str> {
    if ph < Decimal::ZERO || ph > Decimal::from(14) {
        return Err("pH must be between 0 and 14");
    }
    Ok(())
}

/// Check if pH is in the comfortable range for pond fish (6.5-9.0)
pub fn is_ideal_pond_ph(ph: Decimal) -> bool {
    ph >= Decimal::new(65, 1) && ph <= Decimal::from(9)
}
