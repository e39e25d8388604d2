//! Validation utilities for the café costing platform
//!
//! Plain checks shared by the backend request handlers and the WASM bindings.

use rust_decimal::Decimal;

use crate::models::MeasureUnit;

// ============================================================================
// Master Data Validations
// ============================================================================

/// Validate raw item code format (2-20 chars, uppercase alphanumeric or '-')
pub fn validate_raw_item_code(code: &str) -> Result<(), &'static str> {
    if code.len() < 2 {
        return Err("Raw item code must be at least 2 characters");
    }
    if code.len() > 20 {
        return Err("Raw item code must be at most 20 characters");
    }
    if !code
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '-')
    {
        return Err("Raw item code must be uppercase alphanumeric or '-'");
    }
    Ok(())
}

/// Both the Arabic and English names are required
pub fn validate_item_names(name_ar: &str, name_en: &str) -> Result<(), &'static str> {
    if name_ar.trim().is_empty() {
        return Err("Arabic name is required");
    }
    if name_en.trim().is_empty() {
        return Err("English name is required");
    }
    Ok(())
}

/// Decimal places kept by stored quantities, costs and thresholds
pub const STORED_QUANTITY_SCALE: u32 = 4;

/// Exclusive magnitude bound of stored quantities, costs and thresholds
const STORED_QUANTITY_LIMIT: i64 = 10_000_000_000;

fn fits_column(value: Decimal, scale: u32) -> bool {
    value.normalize().scale() <= scale && value.abs() < Decimal::from(STORED_QUANTITY_LIMIT)
}

/// A quantity must be stored exactly, or the ledger identity
/// `new = previous + signed` would not survive the round trip.
pub fn validate_stock_quantity(quantity: Decimal) -> Result<(), &'static str> {
    if !fits_column(quantity, STORED_QUANTITY_SCALE) {
        return Err("Quantity must have at most 4 decimal places and be below 10,000,000,000");
    }
    Ok(())
}

pub fn validate_unit_cost(unit_cost: Decimal) -> Result<(), &'static str> {
    if unit_cost < Decimal::ZERO {
        return Err("Unit cost cannot be negative");
    }
    if !fits_column(unit_cost, STORED_QUANTITY_SCALE) {
        return Err("Unit cost must have at most 4 decimal places and be below 10,000,000,000");
    }
    Ok(())
}

pub fn validate_stock_threshold(threshold: Decimal) -> Result<(), &'static str> {
    if threshold < Decimal::ZERO {
        return Err("Minimum stock threshold cannot be negative");
    }
    validate_stock_quantity(threshold)
}

// ============================================================================
// Costing Validations
// ============================================================================

/// Validate a recipe consumption quantity
pub fn validate_recipe_quantity(quantity: Decimal) -> Result<(), &'static str> {
    if quantity <= Decimal::ZERO {
        return Err("Recipe quantity must be positive");
    }
    validate_stock_quantity(quantity)
}

/// Validate a tenant conversion factor
pub fn validate_conversion(
    from_unit: MeasureUnit,
    to_unit: MeasureUnit,
    factor: Decimal,
) -> Result<(), &'static str> {
    if from_unit == to_unit {
        return Err("Conversion units must differ");
    }
    if factor <= Decimal::ZERO {
        return Err("Conversion factor must be positive");
    }
    if !fits_column(factor, 8) {
        return Err("Conversion factor must have at most 8 decimal places and be below 10,000,000,000");
    }
    Ok(())
}

/// Validate an order line quantity
pub fn validate_order_quantity(quantity: i32) -> Result<(), &'static str> {
    if quantity < 1 {
        return Err("Order quantity must be at least 1");
    }
    Ok(())
}

// ============================================================================
// Query Parameters
// ============================================================================

/// Apply a default and clamp a list limit to `1..=max`
pub fn clamp_limit(requested: Option<i64>, default: i64, max: i64) -> i64 {
    requested.unwrap_or(default).clamp(1, max.max(1))
}
