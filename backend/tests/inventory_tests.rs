//! Stock ledger and low-stock alert tests
//!
//! Covers movement application, negative-stock rejection, alert thresholds
//! and idempotent alert resolution.

use proptest::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;

use shared::{
    apply_movement, is_below_threshold, should_raise_alert, AlertStatus, DomainError, MovementType,
};

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Test that a delivery increases the balance
    #[test]
    fn test_in_movement_adds_stock() {
        let change = apply_movement(dec("2.5"), MovementType::In, dec("10")).unwrap();
        assert_eq!(change.previous_quantity, dec("2.5"));
        assert_eq!(change.signed_quantity, dec("10"));
        assert_eq!(change.new_quantity, dec("12.5"));
    }

    /// Test that out and waste both deduct
    #[test]
    fn test_out_and_waste_deduct_stock() {
        let out = apply_movement(dec("5"), MovementType::Out, dec("0.018")).unwrap();
        assert_eq!(out.new_quantity, dec("4.982"));

        let waste = apply_movement(dec("5"), MovementType::Waste, dec("1.5")).unwrap();
        assert_eq!(waste.signed_quantity, dec("-1.5"));
        assert_eq!(waste.new_quantity, dec("3.5"));
    }

    /// Test that adjustments take a signed delta
    #[test]
    fn test_adjustment_is_signed_delta() {
        let up = apply_movement(dec("3"), MovementType::Adjustment, dec("0.25")).unwrap();
        assert_eq!(up.new_quantity, dec("3.25"));

        let down = apply_movement(dec("3"), MovementType::Adjustment, dec("-1")).unwrap();
        assert_eq!(down.new_quantity, dec("2"));
    }

    /// Test that a zero adjustment is rejected
    #[test]
    fn test_zero_adjustment_rejected() {
        let err = apply_movement(dec("3"), MovementType::Adjustment, Decimal::ZERO).unwrap_err();
        assert_eq!(err, DomainError::ZeroAdjustment);
    }

    /// Test that non-positive quantities are rejected for directional movements
    #[test]
    fn test_non_positive_quantity_rejected() {
        for movement_type in [MovementType::In, MovementType::Out, MovementType::Waste] {
            assert_eq!(
                apply_movement(dec("3"), movement_type, Decimal::ZERO).unwrap_err(),
                DomainError::NonPositiveQuantity
            );
            assert_eq!(
                apply_movement(dec("3"), movement_type, dec("-1")).unwrap_err(),
                DomainError::NonPositiveQuantity
            );
        }
    }

    /// Test that overdrawing stock is an error, never a clamp to zero
    #[test]
    fn test_overdraw_rejected() {
        let err = apply_movement(dec("0.5"), MovementType::Out, dec("0.6")).unwrap_err();
        assert_eq!(
            err,
            DomainError::InsufficientStock {
                available: dec("0.5"),
                requested: dec("0.6"),
            }
        );
    }

    /// Test that the balance may reach exactly zero
    #[test]
    fn test_exact_depletion_allowed() {
        let change = apply_movement(dec("0.5"), MovementType::Waste, dec("0.5")).unwrap();
        assert_eq!(change.new_quantity, Decimal::ZERO);
    }

    /// Test the strict threshold comparison
    #[test]
    fn test_threshold_is_strict() {
        assert!(is_below_threshold(dec("1.999"), dec("2")));
        assert!(!is_below_threshold(dec("2"), dec("2")));
        assert!(!is_below_threshold(dec("0"), dec("0")));
    }

    /// Test that crossing below the threshold raises an alert once
    #[test]
    fn test_alert_raised_only_without_open_alert() {
        let change = apply_movement(dec("2.5"), MovementType::Out, dec("1")).unwrap();
        assert!(should_raise_alert(&change, dec("2"), false));
        assert!(!should_raise_alert(&change, dec("2"), true));
    }

    /// Test that no alert is raised while stock stays above the threshold
    #[test]
    fn test_no_alert_above_threshold() {
        let change = apply_movement(dec("10"), MovementType::Out, dec("1")).unwrap();
        assert!(!should_raise_alert(&change, dec("2"), false));
    }

    /// Test that resolving twice changes nothing the second time
    #[test]
    fn test_resolve_is_idempotent() {
        let (status, changed) = AlertStatus::Open.resolve();
        assert_eq!(status, AlertStatus::Resolved);
        assert!(changed);

        let (status, changed) = status.resolve();
        assert_eq!(status, AlertStatus::Resolved);
        assert!(!changed);
    }

    /// Test movement type parsing from stored strings
    #[test]
    fn test_movement_type_parsing() {
        assert_eq!("waste".parse::<MovementType>().unwrap(), MovementType::Waste);
        assert_eq!(MovementType::Adjustment.as_str(), "adjustment");
        assert!("transfer".parse::<MovementType>().is_err());
    }
}

// ============================================================================
// Property Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    /// Quantities in thousandths, 0.001 to 100.000
    fn quantity_strategy() -> impl Strategy<Value = Decimal> {
        (1i64..=100_000i64).prop_map(|n| Decimal::new(n, 3))
    }

    fn stock_strategy() -> impl Strategy<Value = Decimal> {
        (0i64..=1_000_000i64).prop_map(|n| Decimal::new(n, 3))
    }

    fn movement_type_strategy() -> impl Strategy<Value = MovementType> {
        prop_oneof![
            Just(MovementType::In),
            Just(MovementType::Out),
            Just(MovementType::Waste),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// new = previous + signed for every accepted movement
        #[test]
        fn prop_balance_identity(
            stock in stock_strategy(),
            movement_type in movement_type_strategy(),
            quantity in quantity_strategy()
        ) {
            if let Ok(change) = apply_movement(stock, movement_type, quantity) {
                prop_assert_eq!(change.new_quantity, change.previous_quantity + change.signed_quantity);
                prop_assert!(change.new_quantity >= Decimal::ZERO);
            }
        }

        /// Receiving then issuing the same quantity returns to the start
        #[test]
        fn prop_in_then_out_restores_balance(
            stock in stock_strategy(),
            quantity in quantity_strategy()
        ) {
            let received = apply_movement(stock, MovementType::In, quantity).unwrap();
            let issued = apply_movement(received.new_quantity, MovementType::Out, quantity).unwrap();
            prop_assert_eq!(issued.new_quantity, stock);
        }

        /// A ledger replay never goes negative and matches the running sum
        #[test]
        fn prop_ledger_never_negative(
            movements in prop::collection::vec(
                (movement_type_strategy(), quantity_strategy()),
                1..30
            )
        ) {
            let mut balance = Decimal::ZERO;
            let mut accepted = Decimal::ZERO;

            for (movement_type, quantity) in &movements {
                match apply_movement(balance, *movement_type, *quantity) {
                    Ok(change) => {
                        accepted += change.signed_quantity;
                        balance = change.new_quantity;
                    }
                    Err(DomainError::InsufficientStock { available, .. }) => {
                        prop_assert_eq!(available, balance);
                    }
                    Err(other) => prop_assert!(false, "unexpected error {:?}", other),
                }
                prop_assert!(balance >= Decimal::ZERO);
            }

            prop_assert_eq!(balance, accepted);
        }

        /// An open alert always suppresses a new one
        #[test]
        fn prop_open_alert_suppresses(
            stock in stock_strategy(),
            quantity in quantity_strategy(),
            threshold in stock_strategy()
        ) {
            let change = apply_movement(stock, MovementType::In, quantity).unwrap();
            prop_assert!(!should_raise_alert(&change, threshold, true));
            prop_assert_eq!(
                should_raise_alert(&change, threshold, false),
                change.new_quantity < threshold
            );
        }
    }
}
