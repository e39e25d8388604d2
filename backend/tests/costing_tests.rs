//! Recipe costing and stock consumption tests
//!
//! A latte uses 18 g of beans at 12 SAR/kg and 200 ml of milk at 0.9 SAR/l,
//! so one cup costs 0.216 + 0.18 = 0.396, reported as 0.40.

use proptest::prelude::*;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::str::FromStr;
use uuid::Uuid;

use shared::{
    apply_movement, check_deductions_fit, compute_consumption, compute_item_cost,
    plan_order_completion, profit_margin, round_money, round_quantity, CompletionLine,
    ConversionTable, DomainError, MeasureUnit, MovementType, RawItemCost, RecipeLine,
};

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

struct Pantry {
    beans: Uuid,
    milk: Uuid,
    cups: Uuid,
    raw_items: HashMap<Uuid, RawItemCost>,
}

fn pantry() -> Pantry {
    let beans = Uuid::new_v4();
    let milk = Uuid::new_v4();
    let cups = Uuid::new_v4();
    let raw_items = [
        (beans, MeasureUnit::Kg, "12"),
        (milk, MeasureUnit::L, "0.9"),
        (cups, MeasureUnit::Pcs, "0.15"),
    ]
    .into_iter()
    .map(|(id, unit, cost)| {
        (
            id,
            RawItemCost {
                raw_item_id: id,
                unit,
                unit_cost: dec(cost),
            },
        )
    })
    .collect();

    Pantry {
        beans,
        milk,
        cups,
        raw_items,
    }
}

fn line(raw_item_id: Uuid, quantity: &str, unit: MeasureUnit) -> RecipeLine {
    RecipeLine {
        raw_item_id,
        quantity: dec(quantity),
        unit,
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Test the latte cost across g→kg and ml→l
    #[test]
    fn test_latte_cost() {
        let p = pantry();
        let recipe = vec![
            line(p.beans, "18", MeasureUnit::G),
            line(p.milk, "200", MeasureUnit::Ml),
        ];

        let cost = compute_item_cost(&recipe, &p.raw_items, &ConversionTable::new()).unwrap();
        assert_eq!(cost.total_cost, dec("0.396"));
        assert_eq!(round_money(cost.total_cost), dec("0.40"));
        assert_eq!(cost.ingredients.len(), 2);
        assert_eq!(cost.ingredients[0].stock_quantity, dec("0.018"));
        assert_eq!(cost.ingredients[1].stock_quantity, dec("0.2"));
    }

    /// Test that an item without a recipe costs nothing
    #[test]
    fn test_empty_recipe_costs_zero() {
        let p = pantry();
        let cost = compute_item_cost(&[], &p.raw_items, &ConversionTable::new()).unwrap();
        assert_eq!(cost.total_cost, Decimal::ZERO);
        assert!(cost.ingredients.is_empty());
    }

    /// Test that a mismatched unit without a factor is an error
    #[test]
    fn test_missing_conversion_fails() {
        let p = pantry();
        let recipe = vec![line(p.cups, "80", MeasureUnit::G)];

        let err = compute_item_cost(&recipe, &p.raw_items, &ConversionTable::new()).unwrap_err();
        assert_eq!(
            err,
            DomainError::UnitConversionMissing {
                from: MeasureUnit::G,
                to: MeasureUnit::Pcs,
            }
        );
    }

    /// Test that a tenant factor makes the same recipe costable
    #[test]
    fn test_tenant_conversion_used() {
        let p = pantry();
        let recipe = vec![line(p.cups, "80", MeasureUnit::G)];
        let mut table = ConversionTable::new();
        table.insert(MeasureUnit::Pcs, MeasureUnit::G, dec("80"));

        let cost = compute_item_cost(&recipe, &p.raw_items, &table).unwrap();
        assert_eq!(cost.total_cost, dec("0.15"));
    }

    /// Test that a recipe pointing at an unknown raw item fails
    #[test]
    fn test_unknown_raw_item_fails() {
        let p = pantry();
        let stray = Uuid::new_v4();
        let err = compute_item_cost(
            &[line(stray, "1", MeasureUnit::Pcs)],
            &p.raw_items,
            &ConversionTable::new(),
        )
        .unwrap_err();
        assert_eq!(err, DomainError::UnknownRawItem(stray));
    }

    /// Test consumption for ten lattes in stock units
    #[test]
    fn test_consumption_for_ten_lattes() {
        let p = pantry();
        let recipe = vec![
            line(p.beans, "18", MeasureUnit::G),
            line(p.milk, "200", MeasureUnit::Ml),
        ];

        let consumed =
            compute_consumption(&recipe, dec("10"), &p.raw_items, &ConversionTable::new()).unwrap();
        assert_eq!(consumed, vec![(p.beans, dec("0.18")), (p.milk, dec("2.0"))]);
    }

    /// Test that repeated raw items are merged in first-seen order
    #[test]
    fn test_consumption_merges_duplicate_lines() {
        let p = pantry();
        let recipe = vec![
            line(p.milk, "150", MeasureUnit::Ml),
            line(p.beans, "18", MeasureUnit::G),
            line(p.milk, "0.05", MeasureUnit::L),
        ];

        let consumed =
            compute_consumption(&recipe, dec("2"), &p.raw_items, &ConversionTable::new()).unwrap();
        assert_eq!(consumed.len(), 2);
        assert_eq!(consumed[0].0, p.milk);
        assert_eq!(consumed[0].1, dec("0.4"));
        assert_eq!(consumed[1], (p.beans, dec("0.036")));
    }

    /// Test the item margin used on the cost report
    #[test]
    fn test_item_margin() {
        assert_eq!(profit_margin(dec("14.60"), dec("15.00")), dec("97.33"));
        assert_eq!(profit_margin(dec("5"), Decimal::ZERO), Decimal::ZERO);
    }

    /// Test half-away-from-zero rounding of money and quantities
    #[test]
    fn test_rounding_rules() {
        assert_eq!(round_money(dec("0.395")), dec("0.40"));
        assert_eq!(round_money(dec("-0.395")), dec("-0.40"));
        assert_eq!(round_quantity(dec("0.0185")), dec("0.019"));
    }
}

// ============================================================================
// Order Completion Tests
// ============================================================================

#[cfg(test)]
mod completion_tests {
    use super::*;

    struct Menu {
        latte: Uuid,
        cortado: Uuid,
        water: Uuid,
        recipes: HashMap<Uuid, Vec<RecipeLine>>,
    }

    fn menu(p: &Pantry) -> Menu {
        let latte = Uuid::new_v4();
        let cortado = Uuid::new_v4();
        let water = Uuid::new_v4();
        let recipes = HashMap::from([
            (
                latte,
                vec![
                    line(p.beans, "18", MeasureUnit::G),
                    line(p.milk, "200", MeasureUnit::Ml),
                    line(p.cups, "1", MeasureUnit::Pcs),
                ],
            ),
            (
                cortado,
                vec![
                    line(p.beans, "18", MeasureUnit::G),
                    line(p.milk, "60", MeasureUnit::Ml),
                ],
            ),
        ]);
        Menu {
            latte,
            cortado,
            water,
            recipes,
        }
    }

    fn order_line(coffee_item_id: Uuid, quantity: i32) -> CompletionLine {
        CompletionLine {
            line_id: Uuid::new_v4(),
            coffee_item_id,
            quantity,
        }
    }

    /// Test that each line freezes the unit cost at current prices
    #[test]
    fn test_cost_frozen_per_line() {
        let p = pantry();
        let m = menu(&p);
        let lines = vec![order_line(m.latte, 2), order_line(m.water, 1)];

        let plan = plan_order_completion(&lines, &m.recipes, &p.raw_items, &ConversionTable::new())
            .unwrap();
        // 0.216 beans + 0.18 milk + 0.15 cup
        assert_eq!(plan.line_costs[0], (lines[0].line_id, dec("0.546")));
        assert_eq!(plan.line_costs[1], (lines[1].line_id, Decimal::ZERO));
    }

    /// Test that deductions merge across lines in raw item order
    #[test]
    fn test_deductions_merged_across_lines() {
        let p = pantry();
        let m = menu(&p);
        let lines = vec![order_line(m.latte, 2), order_line(m.cortado, 3)];

        let plan = plan_order_completion(&lines, &m.recipes, &p.raw_items, &ConversionTable::new())
            .unwrap();

        let mut expected = vec![
            (p.beans, dec("0.09")),
            (p.milk, dec("0.58")),
            (p.cups, dec("2")),
        ];
        expected.sort_by_key(|(id, _)| *id);
        assert_eq!(plan.deductions.len(), 3);
        for ((id, qty), (want_id, want_qty)) in plan.deductions.iter().zip(&expected) {
            assert_eq!(id, want_id);
            assert_eq!(qty, want_qty);
        }
    }

    /// Test that consumption too small for stock precision is dropped
    #[test]
    fn test_negligible_deduction_dropped() {
        let p = pantry();
        let syrup = Uuid::new_v4();
        let recipes = HashMap::from([(syrup, vec![line(p.milk, "0.4", MeasureUnit::Ml)])]);

        let plan = plan_order_completion(
            &[order_line(syrup, 1)],
            &recipes,
            &p.raw_items,
            &ConversionTable::new(),
        )
        .unwrap();
        assert!(plan.deductions.is_empty());
        assert_eq!(plan.line_costs.len(), 1);
    }

    /// Test that one short ingredient rejects the whole order
    #[test]
    fn test_insufficient_stock_rejects_everything() {
        let p = pantry();
        let m = menu(&p);
        let plan = plan_order_completion(
            &[order_line(m.latte, 10)],
            &m.recipes,
            &p.raw_items,
            &ConversionTable::new(),
        )
        .unwrap();

        let balances = HashMap::from([
            (p.beans, dec("5")),
            (p.milk, dec("1.5")),
            (p.cups, dec("100")),
        ]);
        let err = check_deductions_fit(&plan.deductions, &balances).unwrap_err();
        assert_eq!(
            err,
            DomainError::InsufficientStock {
                available: dec("1.5"),
                requested: dec("2.0"),
            }
        );

        let enough = HashMap::from([
            (p.beans, dec("5")),
            (p.milk, dec("2")),
            (p.cups, dec("100")),
        ]);
        assert!(check_deductions_fit(&plan.deductions, &enough).is_ok());
    }

    /// Test that a missing conversion fails before anything is planned
    #[test]
    fn test_unconvertible_recipe_fails_plan() {
        let p = pantry();
        let toast = Uuid::new_v4();
        let recipes = HashMap::from([(toast, vec![line(p.cups, "80", MeasureUnit::G)])]);

        let err = plan_order_completion(
            &[order_line(toast, 1)],
            &recipes,
            &p.raw_items,
            &ConversionTable::new(),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::UnitConversionMissing { .. }));
    }

    /// Test that an absurd movement is rejected instead of overflowing
    #[test]
    fn test_overflowing_movement_rejected() {
        let err = apply_movement(
            Decimal::ONE,
            MovementType::In,
            dec("79228162514264337593543950335"),
        )
        .unwrap_err();
        assert_eq!(err, DomainError::QuantityOverflow);
    }
}

// ============================================================================
// Property Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    fn grams_strategy() -> impl Strategy<Value = Decimal> {
        (1i64..=50_000i64).prop_map(|n| Decimal::new(n, 1))
    }

    fn price_strategy() -> impl Strategy<Value = Decimal> {
        (1i64..=100_000i64).prop_map(|n| Decimal::new(n, 2))
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Grams and kilograms of the same recipe cost the same
        #[test]
        fn prop_cost_independent_of_recipe_unit(
            grams in grams_strategy(),
            price in price_strategy()
        ) {
            let beans = Uuid::new_v4();
            let raw_items = HashMap::from([(
                beans,
                RawItemCost { raw_item_id: beans, unit: MeasureUnit::Kg, unit_cost: price },
            )]);
            let table = ConversionTable::new();

            let in_grams = compute_item_cost(
                &[RecipeLine { raw_item_id: beans, quantity: grams, unit: MeasureUnit::G }],
                &raw_items,
                &table,
            ).unwrap();
            let in_kilos = compute_item_cost(
                &[RecipeLine {
                    raw_item_id: beans,
                    quantity: grams / Decimal::ONE_THOUSAND,
                    unit: MeasureUnit::Kg,
                }],
                &raw_items,
                &table,
            ).unwrap();

            prop_assert_eq!(in_grams.total_cost, in_kilos.total_cost);
        }

        /// Total cost is the sum of the ingredient lines
        #[test]
        fn prop_total_is_sum_of_lines(
            quantities in prop::collection::vec(grams_strategy(), 1..8)
        ) {
            let p = pantry();
            let recipe: Vec<RecipeLine> = quantities
                .iter()
                .map(|q| RecipeLine { raw_item_id: p.beans, quantity: *q, unit: MeasureUnit::G })
                .collect();

            let cost = compute_item_cost(&recipe, &p.raw_items, &ConversionTable::new()).unwrap();
            let sum: Decimal = cost.ingredients.iter().map(|i| i.line_cost).sum();
            prop_assert_eq!(cost.total_cost, sum);
        }

        /// Consumption scales linearly with units sold
        #[test]
        fn prop_consumption_scales(
            grams in grams_strategy(),
            units in 1i64..=200i64
        ) {
            let p = pantry();
            let recipe = vec![RecipeLine { raw_item_id: p.beans, quantity: grams, unit: MeasureUnit::G }];
            let table = ConversionTable::new();

            let one = compute_consumption(&recipe, Decimal::ONE, &p.raw_items, &table).unwrap();
            let many = compute_consumption(&recipe, Decimal::from(units), &p.raw_items, &table).unwrap();
            prop_assert_eq!(many[0].1, one[0].1 * Decimal::from(units));
        }
    }
}
