//! WebAssembly module for the café costing dashboards
//!
//! Provides client-side computation for:
//! - Recipe cost previews while a manager edits a recipe
//! - Margin and profit figures on menu screens
//! - Stock movement previews before they are posted
//! - Offline form validation

use std::collections::HashMap;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::Deserialize;
use wasm_bindgen::prelude::*;

// Re-export shared types for use in JavaScript
pub use shared::models::*;
pub use shared::types::*;
pub use shared::validation::*;

/// Initialize the WASM module
#[wasm_bindgen(start)]
pub fn init() {
    web_sys::console::debug_1(&JsValue::from_str("cafe-accounting-wasm loaded"));
}

fn js_error(message: impl std::fmt::Display) -> JsValue {
    js_sys::Error::new(&message.to_string()).into()
}

fn parse_decimal(field: &str, value: &str) -> Result<Decimal, JsValue> {
    Decimal::from_str(value.trim()).map_err(|_| js_error(format!("{} is not a number", field)))
}

/// Recipe and raw item data posted by the recipe editor
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CostPreviewInput {
    lines: Vec<RecipeLine>,
    raw_items: Vec<RawItemCost>,
    #[serde(default)]
    conversions: Vec<ConversionFactor>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConversionFactor {
    from_unit: MeasureUnit,
    to_unit: MeasureUnit,
    factor: Decimal,
}

/// Cost one unit of a menu item; returns the `ItemCost` as JSON
#[wasm_bindgen]
pub fn preview_item_cost(input_json: &str) -> Result<String, JsValue> {
    let input: CostPreviewInput = serde_json::from_str(input_json)
        .map_err(|e| js_error(format!("Invalid recipe JSON: {}", e)))?;

    let raw_items: HashMap<_, _> = input
        .raw_items
        .into_iter()
        .map(|r| (r.raw_item_id, r))
        .collect();
    let mut table = ConversionTable::new();
    for c in &input.conversions {
        table.insert(c.from_unit, c.to_unit, c.factor);
    }

    let mut cost = compute_item_cost(&input.lines, &raw_items, &table).map_err(js_error)?;
    cost.total_cost = round_money(cost.total_cost);
    serde_json::to_string(&cost).map_err(js_error)
}

/// Profit margin percentage, two decimals
#[wasm_bindgen]
pub fn margin_percent(price: &str, unit_cost: &str) -> Result<String, JsValue> {
    let revenue = round_money(parse_decimal("price", price)?);
    let cost = round_money(parse_decimal("unitCost", unit_cost)?);
    Ok(profit_margin(revenue - cost, revenue).to_string())
}

/// Balance after a movement, or the reason it would be rejected
#[wasm_bindgen]
pub fn preview_movement(
    current_stock: &str,
    movement_type: &str,
    quantity: &str,
) -> Result<String, JsValue> {
    let stock = parse_decimal("currentStock", current_stock)?;
    let movement_type = MovementType::from_str(movement_type).map_err(js_error)?;
    let quantity = parse_decimal("quantity", quantity)?;

    let change = apply_movement(stock, movement_type, quantity).map_err(js_error)?;
    serde_json::to_string(&change).map_err(js_error)
}

/// Whether a balance would trip the low-stock alert
#[wasm_bindgen]
pub fn is_low_stock(stock: &str, threshold: &str) -> Result<bool, JsValue> {
    Ok(is_below_threshold(
        parse_decimal("stock", stock)?,
        parse_decimal("threshold", threshold)?,
    ))
}

/// Raw item code check for the create form
#[wasm_bindgen]
pub fn check_raw_item_code(code: &str) -> Option<String> {
    validate_raw_item_code(code).err().map(str::to_string)
}

/// Recipe quantity check for the recipe editor
#[wasm_bindgen]
pub fn check_recipe_quantity(quantity: &str) -> Option<String> {
    match Decimal::from_str(quantity.trim()) {
        Ok(q) => validate_recipe_quantity(q).err().map(str::to_string),
        Err(_) => Some("Quantity must be a number".to_string()),
    }
}
