//! Domain errors raised by the pure costing and stock computations

use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use crate::models::MeasureUnit;

/// Errors produced by shared domain logic.
///
/// The backend maps each variant onto an HTTP status; nothing here performs I/O.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DomainError {
    #[error("quantity must be greater than zero")]
    NonPositiveQuantity,

    #[error("adjustment quantity must not be zero")]
    ZeroAdjustment,

    #[error("insufficient stock: {available} available, {requested} requested")]
    InsufficientStock { available: Decimal, requested: Decimal },

    #[error("no conversion factor from {from} to {to}")]
    UnitConversionMissing { from: MeasureUnit, to: MeasureUnit },

    #[error("raw item {0} is not part of the costing input")]
    UnknownRawItem(Uuid),

    #[error("invalid date range: start {start} is after end {end}")]
    InvalidDateRange {
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
    },

    #[error("quantity is out of the supported range")]
    QuantityOverflow,

    #[error("unknown {kind} '{value}'")]
    UnknownVariant { kind: &'static str, value: String },
}
