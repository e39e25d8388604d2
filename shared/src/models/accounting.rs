//! Revenue, COGS and profit aggregation over completed orders
//!
//! Aggregation runs at full decimal precision. Values leave this module rounded
//! to halalas (money) and thousandths (quantities), and profit is always the
//! difference of the rounded revenue and COGS so the two reconcile exactly.

use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::MeasureUnit;
use crate::types::{round_money, round_quantity};

/// Category label for lines sold without one
pub const UNCATEGORIZED: &str = "uncategorized";

/// A completed order line with its frozen unit cost
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SoldLine {
    pub coffee_item_id: Uuid,
    pub item_name: String,
    pub category: Option<String>,
    pub quantity: i64,
    pub unit_price: Decimal,
    pub unit_cost: Decimal,
}

impl SoldLine {
    pub fn revenue(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }

    pub fn cogs(&self) -> Decimal {
        self.unit_cost * Decimal::from(self.quantity)
    }
}

/// `profit / revenue × 100`, or zero when nothing was sold
pub fn profit_margin(total_profit: Decimal, total_revenue: Decimal) -> Decimal {
    if total_revenue.is_zero() {
        return Decimal::ZERO;
    }
    round_money(total_profit / total_revenue * Decimal::ONE_HUNDRED)
}

#[derive(Debug, Default, Clone)]
struct Totals {
    quantity: i64,
    revenue: Decimal,
    cogs: Decimal,
}

impl Totals {
    fn add(&mut self, line: &SoldLine) {
        self.quantity += line.quantity;
        self.revenue += line.revenue();
        self.cogs += line.cogs();
    }

    /// Rounded (revenue, cogs, profit, margin)
    fn finish(&self) -> (Decimal, Decimal, Decimal, Decimal) {
        let revenue = round_money(self.revenue);
        let cogs = round_money(self.cogs);
        let profit = revenue - cogs;
        (revenue, cogs, profit, profit_margin(profit, revenue))
    }
}

/// Profitability of one menu item over a period
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ItemProfit {
    pub coffee_item_id: Uuid,
    pub item_name: String,
    pub category: Option<String>,
    pub quantity_sold: i64,
    pub total_revenue: Decimal,
    #[serde(rename = "totalCOGS")]
    pub total_cogs: Decimal,
    pub total_profit: Decimal,
    pub profit_margin: Decimal,
}

/// Profitability of one menu category over a period
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CategoryProfit {
    pub category: String,
    pub items_count: usize,
    pub quantity_sold: i64,
    pub total_revenue: Decimal,
    #[serde(rename = "totalCOGS")]
    pub total_cogs: Decimal,
    pub total_profit: Decimal,
    pub profit_margin: Decimal,
}

/// Group lines by menu item, highest revenue first
pub fn profit_per_item(lines: &[SoldLine]) -> Vec<ItemProfit> {
    let mut order: Vec<Uuid> = Vec::new();
    let mut groups: HashMap<Uuid, (&SoldLine, Totals)> = HashMap::new();

    for line in lines {
        let entry = groups.entry(line.coffee_item_id).or_insert_with(|| {
            order.push(line.coffee_item_id);
            (line, Totals::default())
        });
        entry.1.add(line);
    }

    let mut items: Vec<ItemProfit> = order
        .iter()
        .filter_map(|id| groups.get(id))
        .map(|(first, totals)| {
            let (total_revenue, total_cogs, total_profit, profit_margin) = totals.finish();
            ItemProfit {
                coffee_item_id: first.coffee_item_id,
                item_name: first.item_name.clone(),
                category: first.category.clone(),
                quantity_sold: totals.quantity,
                total_revenue,
                total_cogs,
                total_profit,
                profit_margin,
            }
        })
        .collect();

    items.sort_by(|a, b| {
        b.total_revenue
            .cmp(&a.total_revenue)
            .then_with(|| a.item_name.cmp(&b.item_name))
    });
    items
}

/// Group lines by category, highest revenue first
pub fn profit_per_category(lines: &[SoldLine]) -> Vec<CategoryProfit> {
    let mut groups: HashMap<String, (Totals, Vec<Uuid>)> = HashMap::new();

    for line in lines {
        let key = line
            .category
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .unwrap_or(UNCATEGORIZED)
            .to_string();
        let (totals, item_ids) = groups.entry(key).or_default();
        totals.add(line);
        if !item_ids.contains(&line.coffee_item_id) {
            item_ids.push(line.coffee_item_id);
        }
    }

    let mut categories: Vec<CategoryProfit> = groups
        .into_iter()
        .map(|(category, (totals, item_ids))| {
            let (total_revenue, total_cogs, total_profit, profit_margin) = totals.finish();
            CategoryProfit {
                category,
                items_count: item_ids.len(),
                quantity_sold: totals.quantity,
                total_revenue,
                total_cogs,
                total_profit,
                profit_margin,
            }
        })
        .collect();

    categories.sort_by(|a, b| {
        b.total_revenue
            .cmp(&a.total_revenue)
            .then_with(|| a.category.cmp(&b.category))
    });
    categories
}

/// The `limit` most profitable items, descending by profit
pub fn top_items(mut items: Vec<ItemProfit>, limit: usize) -> Vec<ItemProfit> {
    items.sort_by(|a, b| {
        b.total_profit
            .cmp(&a.total_profit)
            .then_with(|| a.item_name.cmp(&b.item_name))
    });
    items.truncate(limit);
    items
}

/// The `limit` least profitable items, ascending by profit
pub fn worst_items(mut items: Vec<ItemProfit>, limit: usize) -> Vec<ItemProfit> {
    items.sort_by(|a, b| {
        a.total_profit
            .cmp(&b.total_profit)
            .then_with(|| a.item_name.cmp(&b.item_name))
    });
    items.truncate(limit);
    items
}

/// A waste movement joined with its raw item
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WasteMovement {
    pub raw_item_id: Uuid,
    pub code: String,
    pub name_ar: String,
    pub name_en: String,
    pub unit: MeasureUnit,
    pub quantity: Decimal,
    /// Cost frozen on the movement
    pub unit_cost: Decimal,
}

/// Waste of one raw item over a period
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WasteEntry {
    pub raw_item_id: Uuid,
    pub code: String,
    pub name_ar: String,
    pub name_en: String,
    pub unit: MeasureUnit,
    pub total_quantity: Decimal,
    pub total_cost: Decimal,
    pub occurrences: i64,
}

/// Sum waste per raw item, most costly first
pub fn waste_report(movements: &[WasteMovement]) -> Vec<WasteEntry> {
    let mut groups: HashMap<Uuid, (&WasteMovement, Decimal, Decimal, i64)> = HashMap::new();

    for m in movements {
        let entry = groups
            .entry(m.raw_item_id)
            .or_insert((m, Decimal::ZERO, Decimal::ZERO, 0));
        entry.1 += m.quantity;
        entry.2 += m.quantity * m.unit_cost;
        entry.3 += 1;
    }

    let mut entries: Vec<WasteEntry> = groups
        .into_values()
        .map(|(m, quantity, cost, occurrences)| WasteEntry {
            raw_item_id: m.raw_item_id,
            code: m.code.clone(),
            name_ar: m.name_ar.clone(),
            name_en: m.name_en.clone(),
            unit: m.unit,
            total_quantity: round_quantity(quantity),
            total_cost: round_money(cost),
            occurrences,
        })
        .collect();

    entries.sort_by(|a, b| b.total_cost.cmp(&a.total_cost).then_with(|| a.code.cmp(&b.code)));
    entries
}

pub fn waste_total(entries: &[WasteEntry]) -> Decimal {
    entries.iter().map(|e| e.total_cost).sum()
}

/// Aggregate of one branch and business day
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DailySnapshot {
    pub branch_id: Uuid,
    pub date: NaiveDate,
    pub total_revenue: Decimal,
    #[serde(rename = "totalCOGS")]
    pub total_cogs: Decimal,
    pub total_profit: Decimal,
    pub profit_margin: Decimal,
    pub items_sold: i64,
    pub orders_count: i64,
    pub waste_cost: Decimal,
    pub waste_details: Vec<WasteEntry>,
}

/// Build the snapshot of one business day from its sold lines and waste
pub fn build_daily_snapshot(
    branch_id: Uuid,
    date: NaiveDate,
    lines: &[SoldLine],
    orders_count: i64,
    waste_details: Vec<WasteEntry>,
) -> DailySnapshot {
    let mut totals = Totals::default();
    for line in lines {
        totals.add(line);
    }
    let (total_revenue, total_cogs, total_profit, profit_margin) = totals.finish();

    DailySnapshot {
        branch_id,
        date,
        total_revenue,
        total_cogs,
        total_profit,
        profit_margin,
        items_sold: totals.quantity,
        orders_count,
        waste_cost: waste_total(&waste_details),
        waste_details,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn line(id: Uuid, name: &str, category: Option<&str>, qty: i64, price: &str, cost: &str) -> SoldLine {
        SoldLine {
            coffee_item_id: id,
            item_name: name.to_string(),
            category: category.map(str::to_string),
            quantity: qty,
            unit_price: dec(price),
            unit_cost: dec(cost),
        }
    }

    #[test]
    fn ten_lattes() {
        let latte = Uuid::new_v4();
        let lines = vec![line(latte, "Latte", Some("hot"), 10, "15", "0.4")];
        let items = profit_per_item(&lines);

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity_sold, 10);
        assert_eq!(items[0].total_revenue, dec("150"));
        assert_eq!(items[0].total_cogs, dec("4"));
        assert_eq!(items[0].total_profit, dec("146"));
        assert_eq!(items[0].profit_margin, dec("97.33"));
    }

    #[test]
    fn margin_is_zero_without_revenue() {
        assert_eq!(profit_margin(dec("-3"), Decimal::ZERO), Decimal::ZERO);
        let giveaway = line(Uuid::new_v4(), "Water", None, 4, "0", "0.5");
        let items = profit_per_item(&[giveaway]);
        assert_eq!(items[0].profit_margin, Decimal::ZERO);
        assert_eq!(items[0].total_profit, dec("-2"));
    }

    #[test]
    fn lines_of_same_item_are_merged() {
        let mocha = Uuid::new_v4();
        let lines = vec![
            line(mocha, "Mocha", Some("hot"), 1, "18", "3.25"),
            line(mocha, "Mocha", Some("hot"), 2, "18", "3.25"),
        ];
        let items = profit_per_item(&lines);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity_sold, 3);
        assert_eq!(items[0].total_cogs, dec("9.75"));
    }

    #[test]
    fn categories_group_and_default() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();
        let lines = vec![
            line(a, "Latte", Some("hot"), 2, "15", "1"),
            line(b, "Americano", Some("hot"), 1, "12", "0.8"),
            line(c, "Cookie", None, 3, "6", "2"),
        ];
        let cats = profit_per_category(&lines);
        assert_eq!(cats.len(), 2);
        assert_eq!(cats[0].category, "hot");
        assert_eq!(cats[0].items_count, 2);
        assert_eq!(cats[0].total_revenue, dec("42"));
        assert_eq!(cats[1].category, UNCATEGORIZED);
        assert_eq!(cats[1].total_profit, dec("12"));
    }

    #[test]
    fn top_and_worst_are_ordered_and_bounded() {
        let lines = vec![
            line(Uuid::new_v4(), "A", None, 1, "10", "1"),
            line(Uuid::new_v4(), "B", None, 1, "10", "9"),
            line(Uuid::new_v4(), "C", None, 1, "10", "5"),
        ];
        let items = profit_per_item(&lines);

        let top = top_items(items.clone(), 2);
        assert_eq!(top.iter().map(|i| i.item_name.as_str()).collect::<Vec<_>>(), ["A", "C"]);

        let worst = worst_items(items.clone(), 2);
        assert_eq!(worst.iter().map(|i| i.item_name.as_str()).collect::<Vec<_>>(), ["B", "C"]);

        assert_eq!(top_items(items, 10).len(), 3);
    }

    #[test]
    fn waste_is_valued_at_frozen_cost() {
        let milk = Uuid::new_v4();
        let base = WasteMovement {
            raw_item_id: milk,
            code: "MILK".into(),
            name_ar: "حليب".into(),
            name_en: "Milk".into(),
            unit: MeasureUnit::L,
            quantity: dec("1.5"),
            unit_cost: dec("2"),
        };
        let pricier = WasteMovement {
            quantity: dec("0.5"),
            unit_cost: dec("2.5"),
            ..base.clone()
        };
        let report = waste_report(&[base, pricier]);
        assert_eq!(report.len(), 1);
        assert_eq!(report[0].total_quantity, dec("2"));
        assert_eq!(report[0].total_cost, dec("4.25"));
        assert_eq!(report[0].occurrences, 2);
        assert_eq!(waste_total(&report), dec("4.25"));
    }

    #[test]
    fn empty_day_snapshot_is_all_zero() {
        let day = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let snap = build_daily_snapshot(Uuid::new_v4(), day, &[], 0, Vec::new());
        assert_eq!(snap.total_revenue, Decimal::ZERO);
        assert_eq!(snap.profit_margin, Decimal::ZERO);
        assert_eq!(snap.items_sold, 0);
        assert!(snap.waste_details.is_empty());
    }
}
