//! Order service: order intake and completion with cost freezing and stock deduction

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::models::{
    check_deductions_fit, order_total, plan_order_completion, CompletionLine, MovementSource,
    MovementType, Order, OrderLine, OrderStatus,
};
use crate::services::inventory::{
    ensure_branch, load_conversions, record_movement_in_tx, MovementRequest,
};
use crate::services::recipe::load_costing_inputs;
use shared::validation::validate_order_quantity;

/// Order service
#[derive(Clone)]
pub struct OrderService {
    db: PgPool,
}

/// Input for creating an order
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderInput {
    pub branch_id: Uuid,
    #[validate(length(min = 1, max = 100))]
    pub items: Vec<CreateOrderLineInput>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderLineInput {
    pub coffee_item_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, FromRow)]
struct OrderRow {
    id: Uuid,
    tenant_id: Uuid,
    branch_id: Uuid,
    order_number: String,
    #[sqlx(try_from = "String")]
    status: OrderStatus,
    total_amount: Decimal,
    created_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl OrderRow {
    fn with_items(self, items: Vec<OrderLine>) -> Order {
        Order {
            id: self.id,
            tenant_id: self.tenant_id,
            branch_id: self.branch_id,
            order_number: self.order_number,
            status: self.status,
            total_amount: self.total_amount,
            items,
            created_at: self.created_at,
            completed_at: self.completed_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct OrderLineRow {
    id: Uuid,
    coffee_item_id: Uuid,
    item_name: String,
    category: Option<String>,
    quantity: i32,
    unit_price: Decimal,
    unit_cost: Option<Decimal>,
}

impl From<OrderLineRow> for OrderLine {
    fn from(row: OrderLineRow) -> Self {
        OrderLine {
            id: row.id,
            coffee_item_id: row.coffee_item_id,
            item_name: row.item_name,
            category: row.category,
            quantity: row.quantity,
            unit_price: row.unit_price,
            unit_cost: row.unit_cost,
        }
    }
}

#[derive(Debug, FromRow)]
struct MenuItemRow {
    id: Uuid,
    name_en: String,
    category: Option<String>,
    price: Decimal,
}

const ORDER_COLUMNS: &str =
    "id, tenant_id, branch_id, order_number, status, total_amount, created_at, completed_at";

impl OrderService {
    /// Create a new OrderService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create a pending order, capturing item name, category and price
    pub async fn create_order(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        input: CreateOrderInput,
    ) -> AppResult<Order> {
        input.validate()?;
        for line in &input.items {
            validate_order_quantity(line.quantity).map_err(|m| {
                AppError::invalid("quantity", m, "الكمية يجب أن تكون 1 على الأقل")
            })?;
        }

        let mut tx = self.db.begin().await?;

        ensure_branch(&mut *tx, tenant_id, input.branch_id).await?;

        let ids: Vec<Uuid> = input.items.iter().map(|l| l.coffee_item_id).collect();
        let menu = sqlx::query_as::<_, MenuItemRow>(
            r#"
            SELECT id, name_en, category, price
            FROM coffee_items
            WHERE tenant_id = $1 AND id = ANY($2) AND is_available
            "#,
        )
        .bind(tenant_id)
        .bind(&ids)
        .fetch_all(&mut *tx)
        .await?;

        let mut priced = Vec::with_capacity(input.items.len());
        for line in &input.items {
            let item = menu
                .iter()
                .find(|m| m.id == line.coffee_item_id)
                .ok_or_else(|| AppError::NotFound("Coffee item".to_string()))?;
            priced.push((item, line.quantity));
        }
        let total = order_total(
            &priced
                .iter()
                .map(|(item, qty)| (item.price, *qty))
                .collect::<Vec<_>>(),
        );

        let now = Utc::now();
        let order_number = next_order_number(&mut *tx, input.branch_id, now).await?;

        let order = sqlx::query_as::<_, OrderRow>(&format!(
            r#"
            INSERT INTO orders (tenant_id, branch_id, order_number, status, total_amount, created_by, created_at)
            VALUES ($1, $2, $3, 'pending', $4, $5, $6)
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(tenant_id)
        .bind(input.branch_id)
        .bind(&order_number)
        .bind(total)
        .bind(user_id)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::from_unique_violation(e, "orderNumber"))?;

        let mut items = Vec::with_capacity(priced.len());
        for (item, quantity) in priced {
            let line = sqlx::query_as::<_, OrderLineRow>(
                r#"
                INSERT INTO order_items (order_id, coffee_item_id, item_name, category, quantity, unit_price)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING id, coffee_item_id, item_name, category, quantity, unit_price, unit_cost
                "#,
            )
            .bind(order.id)
            .bind(item.id)
            .bind(&item.name_en)
            .bind(&item.category)
            .bind(quantity)
            .bind(item.price)
            .fetch_one(&mut *tx)
            .await?;
            items.push(line.into());
        }

        tx.commit().await?;

        tracing::info!(order_id = %order.id, order_number = %order.order_number, "Order created");

        Ok(order.with_items(items))
    }

    /// Fetch an order with its lines
    pub async fn get_order(&self, tenant_id: Uuid, order_id: Uuid) -> AppResult<Order> {
        let order = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 AND tenant_id = $2"
        ))
        .bind(order_id)
        .bind(tenant_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Order".to_string()))?;

        let mut conn = self.db.acquire().await?;
        let items = fetch_lines(&mut *conn, order_id).await?;

        Ok(order.with_items(items))
    }

    /// Complete an order: freeze each line's unit cost, deduct the recipe
    /// consumption from stock and mark the order completed, all or nothing.
    pub async fn complete_order(
        &self,
        tenant_id: Uuid,
        order_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<Order> {
        let mut tx = self.db.begin().await?;

        let order = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 AND tenant_id = $2 FOR UPDATE"
        ))
        .bind(order_id)
        .bind(tenant_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Order".to_string()))?;

        if !order.status.can_complete() {
            return Err(AppError::InvalidStateTransition(format!(
                "Order {} is already {}",
                order.order_number, order.status
            )));
        }

        let lines = fetch_lines(&mut *tx, order_id).await?;
        let item_ids: Vec<Uuid> = lines.iter().map(|l| l.coffee_item_id).collect();
        let inputs = load_costing_inputs(&mut *tx, tenant_id, &item_ids).await?;
        let conversions = load_conversions(&mut *tx, tenant_id).await?;

        let completion: Vec<CompletionLine> = lines
            .iter()
            .map(|l| CompletionLine {
                line_id: l.id,
                coffee_item_id: l.coffee_item_id,
                quantity: l.quantity,
            })
            .collect();
        let plan =
            plan_order_completion(&completion, &inputs.recipes, &inputs.raw_items, &conversions)?;

        let raw_item_ids: Vec<Uuid> = plan.deductions.iter().map(|(id, _)| *id).collect();
        let balances: HashMap<Uuid, Decimal> = sqlx::query_as::<_, (Uuid, Decimal)>(
            r#"
            SELECT id, current_stock
            FROM raw_items
            WHERE tenant_id = $1 AND id = ANY($2)
            ORDER BY id
            FOR UPDATE
            "#,
        )
        .bind(tenant_id)
        .bind(&raw_item_ids)
        .fetch_all(&mut *tx)
        .await?
        .into_iter()
        .collect();
        check_deductions_fit(&plan.deductions, &balances)?;

        for (line_id, unit_cost) in &plan.line_costs {
            sqlx::query("UPDATE order_items SET unit_cost = $1 WHERE id = $2")
                .bind(unit_cost)
                .bind(line_id)
                .execute(&mut *tx)
                .await?;
        }

        for (raw_item_id, quantity) in plan.deductions {
            record_movement_in_tx(
                &mut *tx,
                tenant_id,
                MovementRequest {
                    branch_id: order.branch_id,
                    raw_item_id,
                    movement_type: MovementType::Out,
                    quantity,
                    source: MovementSource::Order,
                    reference_id: Some(order_id),
                    notes: Some(order.order_number.as_str()),
                    created_by: user_id,
                },
            )
            .await?;
        }

        let completed = sqlx::query_as::<_, OrderRow>(&format!(
            r#"
            UPDATE orders
            SET status = 'completed', completed_at = NOW()
            WHERE id = $1
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(order_id)
        .fetch_one(&mut *tx)
        .await?;

        let items = fetch_lines(&mut *tx, order_id).await?;

        tx.commit().await?;

        tracing::info!(
            order_id = %completed.id,
            branch_id = %completed.branch_id,
            lines = items.len(),
            "Order completed"
        );

        Ok(completed.with_items(items))
    }
}

async fn fetch_lines(conn: &mut PgConnection, order_id: Uuid) -> AppResult<Vec<OrderLine>> {
    let rows = sqlx::query_as::<_, OrderLineRow>(
        r#"
        SELECT id, coffee_item_id, item_name, category, quantity, unit_price, unit_cost
        FROM order_items
        WHERE order_id = $1
        ORDER BY id
        "#,
    )
    .bind(order_id)
    .fetch_all(conn)
    .await?;

    Ok(rows.into_iter().map(Into::into).collect())
}

/// Per-branch running number for the UTC day of `now`, e.g. `20240501-0007`.
///
/// The counter row stays locked until the caller's transaction ends, so
/// concurrent orders in one branch are numbered one after the other.
async fn next_order_number(
    conn: &mut PgConnection,
    branch_id: Uuid,
    now: DateTime<Utc>,
) -> AppResult<String> {
    let sequence = sqlx::query_scalar::<_, i32>(
        r#"
        INSERT INTO order_counters (branch_id, order_date, last_value)
        VALUES ($1, $2, 1)
        ON CONFLICT (branch_id, order_date)
        DO UPDATE SET last_value = order_counters.last_value + 1
        RETURNING last_value
        "#,
    )
    .bind(branch_id)
    .bind(now.date_naive())
    .fetch_one(conn)
    .await?;

    Ok(format_order_number(now, sequence))
}

fn format_order_number(now: DateTime<Utc>, sequence: i32) -> String {
    format!("{}-{:04}", now.format("%Y%m%d"), sequence)
}
