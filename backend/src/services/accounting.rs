//! Accounting engine: revenue, COGS, profit and waste reporting per branch
//!
//! Reports are recomputed from completed orders and the stock ledger on every
//! call. Orders are costed with the unit cost frozen on each line at
//! completion, so later raw item price edits never rewrite history.

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{types::Json, FromRow, PgPool};
use uuid::Uuid;

use crate::config::AccountingConfig;
use crate::error::{AppError, AppResult};
use crate::models::{
    build_daily_snapshot, profit_per_category, profit_per_item, top_items, waste_report,
    waste_total, worst_items, CategoryProfit, DailySnapshot, ItemProfit, MeasureUnit, SoldLine,
    WasteEntry, WasteMovement,
};
use crate::services::inventory::ensure_branch;
use shared::{business_today, DateRange};

/// Accounting engine bound to the business time zone
#[derive(Clone)]
pub struct AccountingEngine {
    db: PgPool,
    offset: FixedOffset,
}

/// Waste breakdown with its grand total
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WasteReport {
    pub branch_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_cost: Decimal,
    pub items: Vec<WasteEntry>,
}

/// A persisted daily snapshot
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredSnapshot {
    pub id: Uuid,
    pub tenant_id: Uuid,
    #[serde(flatten)]
    pub snapshot: DailySnapshot,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct SoldLineRow {
    coffee_item_id: Uuid,
    item_name: String,
    category: Option<String>,
    quantity: i64,
    unit_price: Decimal,
    unit_cost: Decimal,
}

impl From<SoldLineRow> for SoldLine {
    fn from(row: SoldLineRow) -> Self {
        SoldLine {
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
struct WasteRow {
    raw_item_id: Uuid,
    code: String,
    name_ar: String,
    name_en: String,
    #[sqlx(try_from = "String")]
    unit: MeasureUnit,
    quantity: Decimal,
    unit_cost: Decimal,
}

impl From<WasteRow> for WasteMovement {
    fn from(row: WasteRow) -> Self {
        WasteMovement {
            raw_item_id: row.raw_item_id,
            code: row.code,
            name_ar: row.name_ar,
            name_en: row.name_en,
            unit: row.unit,
            quantity: row.quantity,
            unit_cost: row.unit_cost,
        }
    }
}

#[derive(Debug, FromRow)]
struct SnapshotRow {
    id: Uuid,
    tenant_id: Uuid,
    branch_id: Uuid,
    snapshot_date: NaiveDate,
    total_revenue: Decimal,
    total_cogs: Decimal,
    total_profit: Decimal,
    profit_margin: Decimal,
    items_sold: i64,
    orders_count: i64,
    waste_cost: Decimal,
    waste_details: Json<Vec<WasteEntry>>,
    created_by: Option<Uuid>,
    created_at: DateTime<Utc>,
}

impl From<SnapshotRow> for StoredSnapshot {
    fn from(row: SnapshotRow) -> Self {
        StoredSnapshot {
            id: row.id,
            tenant_id: row.tenant_id,
            snapshot: DailySnapshot {
                branch_id: row.branch_id,
                date: row.snapshot_date,
                total_revenue: row.total_revenue,
                total_cogs: row.total_cogs,
                total_profit: row.total_profit,
                profit_margin: row.profit_margin,
                items_sold: row.items_sold,
                orders_count: row.orders_count,
                waste_cost: row.waste_cost,
                waste_details: row.waste_details.0,
            },
            created_by: row.created_by,
            created_at: row.created_at,
        }
    }
}

const SNAPSHOT_COLUMNS: &str = "id, tenant_id, branch_id, snapshot_date, total_revenue, total_cogs, \
     total_profit, profit_margin, items_sold, orders_count, waste_cost, waste_details, \
     created_by, created_at";

impl AccountingEngine {
    pub fn new(db: PgPool, config: &AccountingConfig) -> Self {
        Self {
            db,
            offset: config.business_offset(),
        }
    }

    /// Current business day
    pub fn today(&self) -> NaiveDate {
        business_today(self.offset)
    }

    /// Today's revenue, COGS, profit and waste for a branch
    pub async fn get_daily_snapshot(&self, tenant_id: Uuid, branch_id: Uuid) -> AppResult<DailySnapshot> {
        self.snapshot_for(tenant_id, branch_id, self.today()).await
    }

    async fn snapshot_for(
        &self,
        tenant_id: Uuid,
        branch_id: Uuid,
        date: NaiveDate,
    ) -> AppResult<DailySnapshot> {
        let range = DateRange::single_day(date);
        let lines = self.sold_lines(tenant_id, branch_id, range).await?;
        let orders_count = self.orders_count(tenant_id, branch_id, range).await?;
        let waste = waste_report(&self.waste_movements(tenant_id, branch_id, range).await?);

        Ok(build_daily_snapshot(branch_id, date, &lines, orders_count, waste))
    }

    /// Profit per menu item, highest revenue first
    pub async fn get_profit_per_drink(
        &self,
        tenant_id: Uuid,
        branch_id: Uuid,
        range: DateRange,
    ) -> AppResult<Vec<ItemProfit>> {
        let lines = self.sold_lines(tenant_id, branch_id, range).await?;
        Ok(profit_per_item(&lines))
    }

    /// Profit per menu category, highest revenue first
    pub async fn get_profit_per_category(
        &self,
        tenant_id: Uuid,
        branch_id: Uuid,
        range: DateRange,
    ) -> AppResult<Vec<CategoryProfit>> {
        let lines = self.sold_lines(tenant_id, branch_id, range).await?;
        Ok(profit_per_category(&lines))
    }

    pub async fn get_top_profitable_items(
        &self,
        tenant_id: Uuid,
        branch_id: Uuid,
        range: DateRange,
        limit: usize,
    ) -> AppResult<Vec<ItemProfit>> {
        let items = self.get_profit_per_drink(tenant_id, branch_id, range).await?;
        Ok(top_items(items, limit))
    }

    pub async fn get_worst_items(
        &self,
        tenant_id: Uuid,
        branch_id: Uuid,
        range: DateRange,
        limit: usize,
    ) -> AppResult<Vec<ItemProfit>> {
        let items = self.get_profit_per_drink(tenant_id, branch_id, range).await?;
        Ok(worst_items(items, limit))
    }

    /// Waste per raw item valued at the cost frozen on each movement
    pub async fn get_waste_report(
        &self,
        tenant_id: Uuid,
        branch_id: Uuid,
        range: DateRange,
    ) -> AppResult<WasteReport> {
        let items = waste_report(&self.waste_movements(tenant_id, branch_id, range).await?);

        Ok(WasteReport {
            branch_id,
            start_date: range.start,
            end_date: range.end,
            total_cost: waste_total(&items),
            items,
        })
    }

    /// Compute today's snapshot and persist it as a new row
    pub async fn save_daily_snapshot(
        &self,
        tenant_id: Uuid,
        branch_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<StoredSnapshot> {
        {
            let mut conn = self.db.acquire().await?;
            ensure_branch(&mut *conn, tenant_id, branch_id).await?;
        }

        let snapshot = self.get_daily_snapshot(tenant_id, branch_id).await?;

        let row = sqlx::query_as::<_, SnapshotRow>(&format!(
            r#"
            INSERT INTO daily_snapshots (
                tenant_id, branch_id, snapshot_date, total_revenue, total_cogs, total_profit,
                profit_margin, items_sold, orders_count, waste_cost, waste_details, created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {SNAPSHOT_COLUMNS}
            "#
        ))
        .bind(tenant_id)
        .bind(branch_id)
        .bind(snapshot.date)
        .bind(snapshot.total_revenue)
        .bind(snapshot.total_cogs)
        .bind(snapshot.total_profit)
        .bind(snapshot.profit_margin)
        .bind(snapshot.items_sold)
        .bind(snapshot.orders_count)
        .bind(snapshot.waste_cost)
        .bind(Json(&snapshot.waste_details))
        .bind(user_id)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(
            snapshot_id = %row.id,
            branch_id = %branch_id,
            date = %row.snapshot_date,
            revenue = %row.total_revenue,
            profit = %row.total_profit,
            "Daily snapshot saved"
        );

        Ok(row.into())
    }

    /// Persisted snapshots of a branch, newest first
    pub async fn list_snapshots(
        &self,
        tenant_id: Uuid,
        branch_id: Uuid,
        limit: i64,
    ) -> AppResult<Vec<StoredSnapshot>> {
        let rows = sqlx::query_as::<_, SnapshotRow>(&format!(
            r#"
            SELECT {SNAPSHOT_COLUMNS}
            FROM daily_snapshots
            WHERE tenant_id = $1 AND branch_id = $2
            ORDER BY snapshot_date DESC, created_at DESC
            LIMIT $3
            "#
        ))
        .bind(tenant_id)
        .bind(branch_id)
        .bind(limit)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Completed order lines in the range, collapsed per item, price and cost
    async fn sold_lines(
        &self,
        tenant_id: Uuid,
        branch_id: Uuid,
        range: DateRange,
    ) -> AppResult<Vec<SoldLine>> {
        let (from, until) = range.utc_bounds(self.offset)?;

        let rows = sqlx::query_as::<_, SoldLineRow>(
            r#"
            SELECT oi.coffee_item_id, oi.item_name, oi.category,
                   SUM(oi.quantity)::BIGINT AS quantity,
                   oi.unit_price,
                   COALESCE(oi.unit_cost, 0) AS unit_cost
            FROM order_items oi
            JOIN orders o ON o.id = oi.order_id
            WHERE o.tenant_id = $1
              AND o.branch_id = $2
              AND o.status = 'completed'
              AND o.completed_at >= $3
              AND o.completed_at < $4
            GROUP BY oi.coffee_item_id, oi.item_name, oi.category, oi.unit_price, oi.unit_cost
            "#,
        )
        .bind(tenant_id)
        .bind(branch_id)
        .bind(from)
        .bind(until)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn orders_count(&self, tenant_id: Uuid, branch_id: Uuid, range: DateRange) -> AppResult<i64> {
        let (from, until) = range.utc_bounds(self.offset)?;

        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM orders
            WHERE tenant_id = $1
              AND branch_id = $2
              AND status = 'completed'
              AND completed_at >= $3
              AND completed_at < $4
            "#,
        )
        .bind(tenant_id)
        .bind(branch_id)
        .bind(from)
        .bind(until)
        .fetch_one(&self.db)
        .await?;

        Ok(count)
    }

    async fn waste_movements(
        &self,
        tenant_id: Uuid,
        branch_id: Uuid,
        range: DateRange,
    ) -> AppResult<Vec<WasteMovement>> {
        let (from, until) = range.utc_bounds(self.offset)?;

        let rows = sqlx::query_as::<_, WasteRow>(
            r#"
            SELECT m.raw_item_id, r.code, r.name_ar, r.name_en, r.unit, m.quantity, m.unit_cost
            FROM stock_movements m
            JOIN raw_items r ON r.id = m.raw_item_id
            WHERE m.tenant_id = $1
              AND m.branch_id = $2
              AND m.movement_type = 'waste'
              AND m.created_at >= $3
              AND m.created_at < $4
            "#,
        )
        .bind(tenant_id)
        .bind(branch_id)
        .bind(from)
        .bind(until)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Export report rows as CSV
    pub fn export_to_csv<T: Serialize>(data: &[T]) -> AppResult<String> {
        let mut wtr = csv::Writer::from_writer(vec![]);
        for record in data {
            wtr.serialize(record)
                .map_err(|e| AppError::Internal(format!("CSV serialization error: {}", e)))?;
        }
        let bytes = wtr
            .into_inner()
            .map_err(|e| AppError::Internal(format!("CSV writer error: {}", e)))?;
        String::from_utf8(bytes)
            .map_err(|e| AppError::Internal(format!("UTF-8 conversion error: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn item_profit_exports_with_header() {
        let rows = vec![ItemProfit {
            coffee_item_id: Uuid::nil(),
            item_name: "Latte".to_string(),
            category: Some("hot".to_string()),
            quantity_sold: 10,
            total_revenue: dec("150.00"),
            total_cogs: dec("4.00"),
            total_profit: dec("146.00"),
            profit_margin: dec("97.33"),
        }];

        let csv = AccountingEngine::export_to_csv(&rows).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next().unwrap(),
            "coffeeItemId,itemName,category,quantitySold,totalRevenue,totalCOGS,totalProfit,profitMargin"
        );
        assert!(lines.next().unwrap().contains("Latte,hot,10,150.00,4.00,146.00,97.33"));
    }

    #[test]
    fn empty_export_is_empty() {
        let rows: Vec<ItemProfit> = Vec::new();
        assert_eq!(AccountingEngine::export_to_csv(&rows).unwrap(), "");
    }
}
