//! Recipes (bill of materials) and per-item cost computation

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ConversionTable, MeasureUnit};
use crate::error::DomainError;

/// A sellable menu item
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoffeeItem {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name_ar: String,
    pub name_en: String,
    pub category: Option<String>,
    pub price: Decimal,
    pub is_available: bool,
}

/// One ingredient line of a recipe: `quantity` of `unit` consumed per unit sold
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecipeLine {
    pub raw_item_id: Uuid,
    pub quantity: Decimal,
    pub unit: MeasureUnit,
}

/// Costing view of a raw item
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RawItemCost {
    pub raw_item_id: Uuid,
    pub unit: MeasureUnit,
    pub unit_cost: Decimal,
}

/// Cost contribution of one ingredient
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CostedIngredient {
    pub raw_item_id: Uuid,
    pub recipe_quantity: Decimal,
    pub recipe_unit: MeasureUnit,
    /// Recipe quantity expressed in the raw item's stock unit
    pub stock_quantity: Decimal,
    pub stock_unit: MeasureUnit,
    pub unit_cost: Decimal,
    pub line_cost: Decimal,
}

/// Unit cost of a sellable item with its breakdown
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ItemCost {
    pub total_cost: Decimal,
    pub ingredients: Vec<CostedIngredient>,
}

impl ItemCost {
    pub fn zero() -> Self {
        Self {
            total_cost: Decimal::ZERO,
            ingredients: Vec::new(),
        }
    }
}

/// Compute the COGS of one unit of a sellable item.
///
/// `cost = Σ rawItem.unitCost × convert(line.quantity, line.unit → rawItem.unit)`.
/// An item with no recipe lines costs zero. Full precision is kept; rounding is
/// a reporting concern.
pub fn compute_item_cost(
    lines: &[RecipeLine],
    raw_items: &HashMap<Uuid, RawItemCost>,
    conversions: &ConversionTable,
) -> Result<ItemCost, DomainError> {
    let mut ingredients = Vec::with_capacity(lines.len());
    let mut total_cost = Decimal::ZERO;

    for line in lines {
        let raw = raw_items
            .get(&line.raw_item_id)
            .ok_or(DomainError::UnknownRawItem(line.raw_item_id))?;
        let stock_quantity = conversions.convert(line.quantity, line.unit, raw.unit)?;
        let line_cost = stock_quantity
            .checked_mul(raw.unit_cost)
            .ok_or(DomainError::QuantityOverflow)?;
        total_cost = total_cost
            .checked_add(line_cost)
            .ok_or(DomainError::QuantityOverflow)?;

        ingredients.push(CostedIngredient {
            raw_item_id: line.raw_item_id,
            recipe_quantity: line.quantity,
            recipe_unit: line.unit,
            stock_quantity,
            stock_unit: raw.unit,
            unit_cost: raw.unit_cost,
            line_cost,
        });
    }

    Ok(ItemCost {
        total_cost,
        ingredients,
    })
}

/// Stock consumed by selling `units_sold` of an item, per raw item in stock units.
///
/// Lines referring to the same raw item are merged; the result is ordered by
/// first appearance so deductions happen in a stable order.
pub fn compute_consumption(
    lines: &[RecipeLine],
    units_sold: Decimal,
    raw_items: &HashMap<Uuid, RawItemCost>,
    conversions: &ConversionTable,
) -> Result<Vec<(Uuid, Decimal)>, DomainError> {
    let mut consumed: Vec<(Uuid, Decimal)> = Vec::new();

    for line in lines {
        let raw = raw_items
            .get(&line.raw_item_id)
            .ok_or(DomainError::UnknownRawItem(line.raw_item_id))?;
        let quantity = conversions
            .convert(line.quantity, line.unit, raw.unit)?
            .checked_mul(units_sold)
            .ok_or(DomainError::QuantityOverflow)?;

        match consumed.iter_mut().find(|(id, _)| *id == line.raw_item_id) {
            Some((_, total)) => {
                *total = total
                    .checked_add(quantity)
                    .ok_or(DomainError::QuantityOverflow)?
            }
            None => consumed.push((line.raw_item_id, quantity)),
        }
    }

    Ok(consumed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn milk() -> RawItemCost {
        RawItemCost {
            raw_item_id: Uuid::new_v4(),
            unit: MeasureUnit::L,
            unit_cost: dec("2.0"),
        }
    }

    #[test]
    fn latte_costs_forty_halalas() {
        let milk = milk();
        let raw_items = HashMap::from([(milk.raw_item_id, milk)]);
        let lines = vec![RecipeLine {
            raw_item_id: milk.raw_item_id,
            quantity: dec("0.2"),
            unit: MeasureUnit::L,
        }];

        let cost = compute_item_cost(&lines, &raw_items, &ConversionTable::new()).unwrap();
        assert_eq!(cost.total_cost, dec("0.4"));
        assert_eq!(cost.ingredients.len(), 1);
    }

    #[test]
    fn recipe_in_ml_is_converted_to_litres() {
        let milk = milk();
        let raw_items = HashMap::from([(milk.raw_item_id, milk)]);
        let lines = vec![RecipeLine {
            raw_item_id: milk.raw_item_id,
            quantity: dec("200"),
            unit: MeasureUnit::Ml,
        }];

        let cost = compute_item_cost(&lines, &raw_items, &ConversionTable::new()).unwrap();
        assert_eq!(cost.total_cost, dec("0.4"));
        assert_eq!(cost.ingredients[0].stock_quantity, dec("0.2"));
    }

    #[test]
    fn unconvertible_unit_fails() {
        let milk = milk();
        let raw_items = HashMap::from([(milk.raw_item_id, milk)]);
        let lines = vec![RecipeLine {
            raw_item_id: milk.raw_item_id,
            quantity: dec("1"),
            unit: MeasureUnit::Pcs,
        }];

        assert!(matches!(
            compute_item_cost(&lines, &raw_items, &ConversionTable::new()),
            Err(DomainError::UnitConversionMissing { .. })
        ));
    }

    #[test]
    fn unknown_raw_item_fails() {
        let lines = vec![RecipeLine {
            raw_item_id: Uuid::new_v4(),
            quantity: dec("1"),
            unit: MeasureUnit::G,
        }];
        assert!(matches!(
            compute_item_cost(&lines, &HashMap::new(), &ConversionTable::new()),
            Err(DomainError::UnknownRawItem(_))
        ));
    }

    #[test]
    fn empty_recipe_costs_nothing() {
        let cost = compute_item_cost(&[], &HashMap::new(), &ConversionTable::new()).unwrap();
        assert_eq!(cost, ItemCost::zero());
    }

    #[test]
    fn consumption_merges_repeated_ingredients() {
        let beans = RawItemCost {
            raw_item_id: Uuid::new_v4(),
            unit: MeasureUnit::Kg,
            unit_cost: dec("80"),
        };
        let raw_items = HashMap::from([(beans.raw_item_id, beans)]);
        let lines = vec![
            RecipeLine {
                raw_item_id: beans.raw_item_id,
                quantity: dec("18"),
                unit: MeasureUnit::G,
            },
            RecipeLine {
                raw_item_id: beans.raw_item_id,
                quantity: dec("2"),
                unit: MeasureUnit::G,
            },
        ];

        let consumed =
            compute_consumption(&lines, dec("3"), &raw_items, &ConversionTable::new()).unwrap();
        assert_eq!(consumed, vec![(beans.raw_item_id, dec("0.06"))]);
    }
}
