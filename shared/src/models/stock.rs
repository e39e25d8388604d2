//! Raw items, the stock movement ledger and low-stock alerts

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::MeasureUnit;
use crate::error::DomainError;

/// A stock-keeping ingredient or material
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawItem {
    pub id: Uuid,
    pub tenant_id: Uuid,
    /// Short code, unique per tenant (e.g. "MILK-FULL")
    pub code: String,
    pub name_ar: String,
    pub name_en: String,
    pub unit: MeasureUnit,
    /// Cost of one `unit`
    pub unit_cost: Decimal,
    pub current_stock: Decimal,
    pub min_stock_threshold: Decimal,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Kind of change recorded in the ledger
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MovementType {
    In,
    Out,
    Waste,
    /// Signed correction after a physical count
    Adjustment,
}

impl MovementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementType::In => "in",
            MovementType::Out => "out",
            MovementType::Waste => "waste",
            MovementType::Adjustment => "adjustment",
        }
    }

    /// Signed effect of `quantity` on the running balance.
    ///
    /// `in`, `out` and `waste` take a positive magnitude; `adjustment` takes a
    /// non-zero signed delta.
    pub fn signed_quantity(&self, quantity: Decimal) -> Result<Decimal, DomainError> {
        match self {
            MovementType::Adjustment => {
                if quantity.is_zero() {
                    Err(DomainError::ZeroAdjustment)
                } else {
                    Ok(quantity)
                }
            }
            _ if quantity <= Decimal::ZERO => Err(DomainError::NonPositiveQuantity),
            MovementType::In => Ok(quantity),
            MovementType::Out | MovementType::Waste => Ok(-quantity),
        }
    }
}

impl std::fmt::Display for MovementType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MovementType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in" => Ok(MovementType::In),
            "out" => Ok(MovementType::Out),
            "waste" => Ok(MovementType::Waste),
            "adjustment" => Ok(MovementType::Adjustment),
            other => Err(DomainError::UnknownVariant {
                kind: "movement type",
                value: other.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for MovementType {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// What caused a movement to be posted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovementSource {
    /// Entered by staff on the inventory screens
    Manual,
    /// Deducted when an order is completed
    Order,
}

impl MovementSource {
    /// Value stored in `stock_movements.reference_type`
    pub fn reference_type(&self) -> &'static str {
        match self {
            MovementSource::Manual => "manual",
            MovementSource::Order => "order",
        }
    }

    /// Deactivated raw items take no new manual entries, but orders whose
    /// recipes still use them must be able to complete.
    pub fn accepts_inactive(&self) -> bool {
        matches!(self, MovementSource::Order)
    }
}

/// Balance transition produced by one movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockChange {
    pub previous_quantity: Decimal,
    pub signed_quantity: Decimal,
    pub new_quantity: Decimal,
}

/// Apply a movement to the current balance.
///
/// The result always satisfies `new = previous + signed`. Movements that would
/// take the balance below zero are rejected rather than clamped.
pub fn apply_movement(
    current_stock: Decimal,
    movement_type: MovementType,
    quantity: Decimal,
) -> Result<StockChange, DomainError> {
    let signed_quantity = movement_type.signed_quantity(quantity)?;
    let new_quantity = current_stock
        .checked_add(signed_quantity)
        .ok_or(DomainError::QuantityOverflow)?;

    if new_quantity < Decimal::ZERO {
        return Err(DomainError::InsufficientStock {
            available: current_stock,
            requested: -signed_quantity,
        });
    }

    Ok(StockChange {
        previous_quantity: current_stock,
        signed_quantity,
        new_quantity,
    })
}

/// Whether a balance is below the item's minimum threshold
pub fn is_below_threshold(stock: Decimal, min_stock_threshold: Decimal) -> bool {
    stock < min_stock_threshold
}

/// Whether recording `change` should open a new alert
pub fn should_raise_alert(
    change: &StockChange,
    min_stock_threshold: Decimal,
    has_open_alert: bool,
) -> bool {
    !has_open_alert && is_below_threshold(change.new_quantity, min_stock_threshold)
}

/// An immutable ledger row
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockMovement {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub branch_id: Uuid,
    pub raw_item_id: Uuid,
    pub movement_type: MovementType,
    pub quantity: Decimal,
    pub previous_quantity: Decimal,
    pub new_quantity: Decimal,
    /// Raw item cost in force when the row was written
    pub unit_cost: Decimal,
    pub reference_type: Option<String>,
    pub reference_id: Option<Uuid>,
    pub notes: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Lifecycle of a low-stock alert: `open -> resolved`, no way back
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    Open,
    Resolved,
}

impl AlertStatus {
    pub fn from_resolved(is_resolved: bool) -> Self {
        if is_resolved {
            AlertStatus::Resolved
        } else {
            AlertStatus::Open
        }
    }

    /// Returns the next status and whether anything changed
    pub fn resolve(self) -> (AlertStatus, bool) {
        match self {
            AlertStatus::Open => (AlertStatus::Resolved, true),
            AlertStatus::Resolved => (AlertStatus::Resolved, false),
        }
    }
}

/// A low-stock alert for a raw item in a branch
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockAlert {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub branch_id: Uuid,
    pub raw_item_id: Uuid,
    pub current_stock: Decimal,
    pub threshold: Decimal,
    pub is_resolved: bool,
    pub action_taken: Option<String>,
    pub resolved_by: Option<Uuid>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    fn any_decimal() -> impl Strategy<Value = Decimal> {
        (any::<i64>(), any::<i64>(), 0u32..=28).prop_map(|(hi, lo, scale)| {
            let mantissa = (i128::from(hi) << 32) ^ i128::from(lo);
            Decimal::from_i128_with_scale(mantissa % 79_228_162_514_264_337_593_543_950_335, scale)
        })
    }

    fn movement_type() -> impl Strategy<Value = MovementType> {
        prop_oneof![
            Just(MovementType::In),
            Just(MovementType::Out),
            Just(MovementType::Waste),
            Just(MovementType::Adjustment),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Any accepted movement keeps the ledger identity and a non-negative balance
        #[test]
        fn prop_movement_never_panics(
            stock in any_decimal(),
            movement in movement_type(),
            quantity in any_decimal()
        ) {
            if let Ok(change) = apply_movement(stock, movement, quantity) {
                prop_assert_eq!(change.new_quantity, change.previous_quantity + change.signed_quantity);
                prop_assert!(change.new_quantity >= Decimal::ZERO);
            }
        }
    }
}
