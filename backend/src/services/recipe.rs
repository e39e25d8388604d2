//! Recipe service: bill-of-materials lines and per-item cost

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{
    compute_item_cost, profit_margin, CostedIngredient, MeasureUnit, RawItemCost, RecipeLine,
};
use crate::services::inventory::load_conversions;
use shared::{round_money, validation::validate_recipe_quantity};

/// Recipe service
#[derive(Clone)]
pub struct RecipeService {
    db: PgPool,
}

/// A stored recipe line with the raw item it consumes
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RecipeItem {
    pub id: Uuid,
    pub coffee_item_id: Uuid,
    pub raw_item_id: Uuid,
    pub raw_item_code: String,
    pub raw_item_name_ar: String,
    pub raw_item_name_en: String,
    pub quantity: Decimal,
    #[sqlx(try_from = "String")]
    pub unit: MeasureUnit,
    pub created_at: DateTime<Utc>,
}

/// Input for adding a recipe line
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddRecipeLineInput {
    pub raw_item_id: Uuid,
    pub quantity: Decimal,
    pub unit: MeasureUnit,
}

/// Unit cost of a menu item against its current price
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemCostReport {
    pub coffee_item_id: Uuid,
    pub name_ar: String,
    pub name_en: String,
    pub price: Decimal,
    pub unit_cost: Decimal,
    pub unit_profit: Decimal,
    pub profit_margin: Decimal,
    pub ingredients: Vec<CostedIngredient>,
}

/// Recipes and raw item costs needed to cost a set of menu items
#[derive(Debug, Default)]
pub(crate) struct CostingInputs {
    pub recipes: HashMap<Uuid, Vec<RecipeLine>>,
    pub raw_items: HashMap<Uuid, RawItemCost>,
}

#[derive(Debug, FromRow)]
struct CoffeeItemRow {
    name_ar: String,
    name_en: String,
    price: Decimal,
}

#[derive(Debug, FromRow)]
struct CostingRow {
    coffee_item_id: Uuid,
    raw_item_id: Uuid,
    quantity: Decimal,
    #[sqlx(try_from = "String")]
    unit: MeasureUnit,
    #[sqlx(try_from = "String")]
    raw_unit: MeasureUnit,
    unit_cost: Decimal,
}

impl RecipeService {
    /// Create a new RecipeService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Recipe lines of a menu item
    pub async fn list_recipe(&self, tenant_id: Uuid, coffee_item_id: Uuid) -> AppResult<Vec<RecipeItem>> {
        let lines = sqlx::query_as::<_, RecipeItem>(
            r#"
            SELECT ri.id, ri.coffee_item_id, ri.raw_item_id,
                   r.code AS raw_item_code, r.name_ar AS raw_item_name_ar, r.name_en AS raw_item_name_en,
                   ri.quantity, ri.unit, ri.created_at
            FROM recipe_items ri
            JOIN raw_items r ON r.id = ri.raw_item_id
            WHERE ri.coffee_item_id = $1 AND ri.tenant_id = $2
            ORDER BY r.code
            "#,
        )
        .bind(coffee_item_id)
        .bind(tenant_id)
        .fetch_all(&self.db)
        .await?;

        Ok(lines)
    }

    /// Add an ingredient line. The recipe unit must be convertible to the raw
    /// item's stock unit so the item stays costable.
    pub async fn add_line(
        &self,
        tenant_id: Uuid,
        coffee_item_id: Uuid,
        input: AddRecipeLineInput,
    ) -> AppResult<RecipeItem> {
        validate_recipe_quantity(input.quantity)
            .map_err(|m| AppError::invalid("quantity", m, "الكمية يجب أن تكون موجبة"))?;

        let mut conn = self.db.acquire().await?;

        fetch_coffee_item(&mut *conn, tenant_id, coffee_item_id).await?;

        let raw_unit = sqlx::query_scalar::<_, String>(
            "SELECT unit FROM raw_items WHERE id = $1 AND tenant_id = $2 AND is_active",
        )
        .bind(input.raw_item_id)
        .bind(tenant_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Raw item".to_string()))?;
        let raw_unit = MeasureUnit::try_from(raw_unit)?;

        let conversions = load_conversions(&mut *conn, tenant_id).await?;
        conversions.factor(input.unit, raw_unit)?;

        let id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO recipe_items (tenant_id, coffee_item_id, raw_item_id, quantity, unit)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(tenant_id)
        .bind(coffee_item_id)
        .bind(input.raw_item_id)
        .bind(input.quantity)
        .bind(input.unit.as_str())
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| AppError::from_unique_violation(e, "recipe ingredient"))?;

        let line = sqlx::query_as::<_, RecipeItem>(
            r#"
            SELECT ri.id, ri.coffee_item_id, ri.raw_item_id,
                   r.code AS raw_item_code, r.name_ar AS raw_item_name_ar, r.name_en AS raw_item_name_en,
                   ri.quantity, ri.unit, ri.created_at
            FROM recipe_items ri
            JOIN raw_items r ON r.id = ri.raw_item_id
            WHERE ri.id = $1
            "#,
        )
        .bind(id)
        .fetch_one(&mut *conn)
        .await?;

        tracing::info!(
            coffee_item_id = %coffee_item_id,
            raw_item_id = %input.raw_item_id,
            "Recipe line added"
        );

        Ok(line)
    }

    /// Remove an ingredient line
    pub async fn remove_line(
        &self,
        tenant_id: Uuid,
        coffee_item_id: Uuid,
        raw_item_id: Uuid,
    ) -> AppResult<()> {
        let result = sqlx::query(
            "DELETE FROM recipe_items WHERE coffee_item_id = $1 AND raw_item_id = $2 AND tenant_id = $3",
        )
        .bind(coffee_item_id)
        .bind(raw_item_id)
        .bind(tenant_id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Recipe line".to_string()));
        }

        Ok(())
    }

    /// Current unit cost of a menu item from its recipe
    pub async fn compute_item_cost(
        &self,
        tenant_id: Uuid,
        coffee_item_id: Uuid,
    ) -> AppResult<ItemCostReport> {
        let mut conn = self.db.acquire().await?;

        let item = fetch_coffee_item(&mut *conn, tenant_id, coffee_item_id).await?;
        let inputs = load_costing_inputs(&mut *conn, tenant_id, &[coffee_item_id]).await?;
        let conversions = load_conversions(&mut *conn, tenant_id).await?;

        let lines = inputs
            .recipes
            .get(&coffee_item_id)
            .map(Vec::as_slice)
            .unwrap_or_default();
        let cost = compute_item_cost(lines, &inputs.raw_items, &conversions)?;

        let unit_cost = round_money(cost.total_cost);
        let unit_profit = round_money(item.price) - unit_cost;

        Ok(ItemCostReport {
            coffee_item_id,
            name_ar: item.name_ar,
            name_en: item.name_en,
            price: item.price,
            unit_cost,
            unit_profit,
            profit_margin: profit_margin(unit_profit, item.price),
            ingredients: cost.ingredients,
        })
    }
}

async fn fetch_coffee_item(
    conn: &mut PgConnection,
    tenant_id: Uuid,
    coffee_item_id: Uuid,
) -> AppResult<CoffeeItemRow> {
    sqlx::query_as::<_, CoffeeItemRow>(
        "SELECT name_ar, name_en, price FROM coffee_items WHERE id = $1 AND tenant_id = $2",
    )
    .bind(coffee_item_id)
    .bind(tenant_id)
    .fetch_optional(conn)
    .await?
    .ok_or_else(|| AppError::NotFound("Coffee item".to_string()))
}

/// Recipe lines and current raw item costs for the given menu items.
/// Inactive raw items still cost: a recipe may outlive its ingredient.
pub(crate) async fn load_costing_inputs(
    conn: &mut PgConnection,
    tenant_id: Uuid,
    coffee_item_ids: &[Uuid],
) -> AppResult<CostingInputs> {
    let rows = sqlx::query_as::<_, CostingRow>(
        r#"
        SELECT ri.coffee_item_id, ri.raw_item_id, ri.quantity, ri.unit,
               r.unit AS raw_unit, r.unit_cost
        FROM recipe_items ri
        JOIN raw_items r ON r.id = ri.raw_item_id
        WHERE ri.tenant_id = $1 AND ri.coffee_item_id = ANY($2)
        ORDER BY ri.coffee_item_id, ri.created_at
        "#,
    )
    .bind(tenant_id)
    .bind(coffee_item_ids)
    .fetch_all(conn)
    .await?;

    let mut inputs = CostingInputs::default();
    for row in rows {
        inputs.raw_items.insert(
            row.raw_item_id,
            RawItemCost {
                raw_item_id: row.raw_item_id,
                unit: row.raw_unit,
                unit_cost: row.unit_cost,
            },
        );
        inputs
            .recipes
            .entry(row.coffee_item_id)
            .or_default()
            .push(RecipeLine {
                raw_item_id: row.raw_item_id,
                quantity: row.quantity,
                unit: row.unit,
            });
    }

    Ok(inputs)
}
