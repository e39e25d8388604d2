//! Orders as seen by the accounting side

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{compute_consumption, compute_item_cost, ConversionTable, RawItemCost, RecipeLine};
use crate::error::DomainError;
use crate::types::round_quantity;

/// Order lifecycle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    InProgress,
    Ready,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::InProgress => "in_progress",
            OrderStatus::Ready => "ready",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }

    /// Completion is allowed from every non-terminal status
    pub fn can_complete(&self) -> bool {
        !self.is_terminal()
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "in_progress" => Ok(OrderStatus::InProgress),
            "ready" => Ok(OrderStatus::Ready),
            "completed" => Ok(OrderStatus::Completed),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(DomainError::UnknownVariant {
                kind: "order status",
                value: other.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for OrderStatus {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A customer order
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub branch_id: Uuid,
    pub order_number: String,
    pub status: OrderStatus,
    pub total_amount: Decimal,
    pub items: Vec<OrderLine>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// A line of an order with name, category and price captured at order time
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub id: Uuid,
    pub coffee_item_id: Uuid,
    pub item_name: String,
    pub category: Option<String>,
    pub quantity: i32,
    pub unit_price: Decimal,
    /// COGS per unit frozen when the order completed
    pub unit_cost: Option<Decimal>,
}

/// Sum of `unit_price × quantity` over the lines
pub fn order_total(lines: &[(Decimal, i32)]) -> Decimal {
    lines
        .iter()
        .map(|(price, qty)| *price * Decimal::from(*qty))
        .sum()
}

/// An order line as needed to plan its completion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletionLine {
    pub line_id: Uuid,
    pub coffee_item_id: Uuid,
    pub quantity: i32,
}

/// Writes a completing order must perform
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CompletionPlan {
    /// `(order line id, unit cost)` to freeze on each line
    pub line_costs: Vec<(Uuid, Decimal)>,
    /// `(raw item id, quantity)` to deduct, merged across lines, rounded to
    /// stock precision, zero amounts dropped, ordered by raw item id
    pub deductions: Vec<(Uuid, Decimal)>,
}

/// Cost every line at current prices and total the stock the order consumes.
///
/// Items without a recipe freeze a zero cost and deduct nothing.
pub fn plan_order_completion(
    lines: &[CompletionLine],
    recipes: &HashMap<Uuid, Vec<RecipeLine>>,
    raw_items: &HashMap<Uuid, RawItemCost>,
    conversions: &ConversionTable,
) -> Result<CompletionPlan, DomainError> {
    let mut line_costs = Vec::with_capacity(lines.len());
    // Keyed by raw item id so rows are locked in a stable order
    let mut consumption: BTreeMap<Uuid, Decimal> = BTreeMap::new();

    for line in lines {
        let recipe = recipes
            .get(&line.coffee_item_id)
            .map(Vec::as_slice)
            .unwrap_or_default();

        let cost = compute_item_cost(recipe, raw_items, conversions)?;
        line_costs.push((line.line_id, cost.total_cost));

        let used = compute_consumption(recipe, Decimal::from(line.quantity), raw_items, conversions)?;
        for (raw_item_id, quantity) in used {
            let total = consumption.entry(raw_item_id).or_default();
            *total = total
                .checked_add(quantity)
                .ok_or(DomainError::QuantityOverflow)?;
        }
    }

    let deductions = consumption
        .into_iter()
        .map(|(id, quantity)| (id, round_quantity(quantity)))
        .filter(|(_, quantity)| !quantity.is_zero())
        .collect();

    Ok(CompletionPlan {
        line_costs,
        deductions,
    })
}

/// Reject the whole plan if any raw item cannot cover its deduction
pub fn check_deductions_fit(
    deductions: &[(Uuid, Decimal)],
    balances: &HashMap<Uuid, Decimal>,
) -> Result<(), DomainError> {
    for (raw_item_id, quantity) in deductions {
        let available = balances
            .get(raw_item_id)
            .copied()
            .ok_or(DomainError::UnknownRawItem(*raw_item_id))?;
        if available < *quantity {
            return Err(DomainError::InsufficientStock {
                available,
                requested: *quantity,
            });
        }
    }
    Ok(())
}
