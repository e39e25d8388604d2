//! Inventory service: raw items, the stock movement ledger, low-stock alerts
//! and tenant unit conversions

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::models::{
    apply_movement, should_raise_alert, AlertStatus, ConversionTable, MeasureUnit, MovementSource,
    MovementType, RawItem, StockAlert, StockMovement, UnitConversion,
};
use shared::validation::{
    validate_conversion, validate_item_names, validate_raw_item_code, validate_stock_quantity,
    validate_stock_threshold, validate_unit_cost,
};

/// Inventory service for managing raw items, stock movements and alerts
#[derive(Clone)]
pub struct InventoryService {
    db: PgPool,
}

/// Input for creating a raw item
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateRawItemInput {
    #[validate(length(min = 2, max = 20))]
    pub code: String,
    #[validate(length(min = 1, max = 200))]
    pub name_ar: String,
    #[validate(length(min = 1, max = 200))]
    pub name_en: String,
    pub unit: MeasureUnit,
    pub unit_cost: Decimal,
    #[serde(default)]
    pub min_stock_threshold: Decimal,
}

/// Input for updating a raw item; absent fields keep their value
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRawItemInput {
    #[validate(length(min = 1, max = 200))]
    pub name_ar: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub name_en: Option<String>,
    pub unit_cost: Option<Decimal>,
    pub min_stock_threshold: Option<Decimal>,
}

/// Input for recording a stock movement
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RecordMovementInput {
    pub branch_id: Uuid,
    pub raw_item_id: Uuid,
    pub movement_type: MovementType,
    /// Positive magnitude, or a signed delta for `adjustment`
    pub quantity: Decimal,
    #[validate(length(max = 500))]
    pub notes: Option<String>,
}

/// Input for resolving an alert
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ResolveAlertInput {
    #[validate(length(max = 500))]
    pub action_taken: Option<String>,
}

/// Input for adding a unit conversion factor
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddUnitInput {
    pub from_unit: MeasureUnit,
    pub to_unit: MeasureUnit,
    pub factor: Decimal,
}

/// A movement together with the alert it raised, if any
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordedMovement {
    pub movement: StockMovement,
    pub alert: Option<StockAlert>,
}

/// Ledger write requested by the inventory API or by order completion
pub(crate) struct MovementRequest<'a> {
    pub branch_id: Uuid,
    pub raw_item_id: Uuid,
    pub movement_type: MovementType,
    pub quantity: Decimal,
    pub source: MovementSource,
    pub reference_id: Option<Uuid>,
    pub notes: Option<&'a str>,
    pub created_by: Uuid,
}

#[derive(Debug, FromRow)]
struct RawItemRow {
    id: Uuid,
    tenant_id: Uuid,
    code: String,
    name_ar: String,
    name_en: String,
    #[sqlx(try_from = "String")]
    unit: MeasureUnit,
    unit_cost: Decimal,
    current_stock: Decimal,
    min_stock_threshold: Decimal,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<RawItemRow> for RawItem {
    fn from(row: RawItemRow) -> Self {
        RawItem {
            id: row.id,
            tenant_id: row.tenant_id,
            code: row.code,
            name_ar: row.name_ar,
            name_en: row.name_en,
            unit: row.unit,
            unit_cost: row.unit_cost,
            current_stock: row.current_stock,
            min_stock_threshold: row.min_stock_threshold,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct MovementRow {
    id: Uuid,
    tenant_id: Uuid,
    branch_id: Uuid,
    raw_item_id: Uuid,
    #[sqlx(try_from = "String")]
    movement_type: MovementType,
    quantity: Decimal,
    previous_quantity: Decimal,
    new_quantity: Decimal,
    unit_cost: Decimal,
    reference_type: Option<String>,
    reference_id: Option<Uuid>,
    notes: Option<String>,
    created_by: Option<Uuid>,
    created_at: DateTime<Utc>,
}

impl From<MovementRow> for StockMovement {
    fn from(row: MovementRow) -> Self {
        StockMovement {
            id: row.id,
            tenant_id: row.tenant_id,
            branch_id: row.branch_id,
            raw_item_id: row.raw_item_id,
            movement_type: row.movement_type,
            quantity: row.quantity,
            previous_quantity: row.previous_quantity,
            new_quantity: row.new_quantity,
            unit_cost: row.unit_cost,
            reference_type: row.reference_type,
            reference_id: row.reference_id,
            notes: row.notes,
            created_by: row.created_by,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct AlertRow {
    id: Uuid,
    tenant_id: Uuid,
    branch_id: Uuid,
    raw_item_id: Uuid,
    current_stock: Decimal,
    threshold: Decimal,
    is_resolved: bool,
    action_taken: Option<String>,
    resolved_by: Option<Uuid>,
    resolved_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl From<AlertRow> for StockAlert {
    fn from(row: AlertRow) -> Self {
        StockAlert {
            id: row.id,
            tenant_id: row.tenant_id,
            branch_id: row.branch_id,
            raw_item_id: row.raw_item_id,
            current_stock: row.current_stock,
            threshold: row.threshold,
            is_resolved: row.is_resolved,
            action_taken: row.action_taken,
            resolved_by: row.resolved_by,
            resolved_at: row.resolved_at,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct ConversionRow {
    id: Uuid,
    tenant_id: Uuid,
    #[sqlx(try_from = "String")]
    from_unit: MeasureUnit,
    #[sqlx(try_from = "String")]
    to_unit: MeasureUnit,
    factor: Decimal,
}

impl From<ConversionRow> for UnitConversion {
    fn from(row: ConversionRow) -> Self {
        UnitConversion {
            id: row.id,
            tenant_id: row.tenant_id,
            from_unit: row.from_unit,
            to_unit: row.to_unit,
            factor: row.factor,
        }
    }
}

/// Locked balance of a raw item inside a transaction
#[derive(Debug, FromRow)]
struct LockedStock {
    current_stock: Decimal,
    min_stock_threshold: Decimal,
    unit_cost: Decimal,
}

const RAW_ITEM_COLUMNS: &str = "id, tenant_id, code, name_ar, name_en, unit, unit_cost, \
     current_stock, min_stock_threshold, is_active, created_at, updated_at";

const MOVEMENT_COLUMNS: &str = "id, tenant_id, branch_id, raw_item_id, movement_type, quantity, \
     previous_quantity, new_quantity, unit_cost, reference_type, reference_id, notes, \
     created_by, created_at";

const ALERT_COLUMNS: &str = "id, tenant_id, branch_id, raw_item_id, current_stock, threshold, \
     is_resolved, action_taken, resolved_by, resolved_at, created_at";

fn invalid(field: &str, message: &str) -> AppError {
    AppError::Validation {
        field: field.to_string(),
        message: message.to_string(),
        message_ar: format!("قيمة غير صالحة للحقل {}", field),
    }
}

impl InventoryService {
    /// Create a new InventoryService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    // ------------------------------------------------------------------
    // Raw items
    // ------------------------------------------------------------------

    /// Create a raw item with an empty balance
    pub async fn create_raw_item(
        &self,
        tenant_id: Uuid,
        input: CreateRawItemInput,
    ) -> AppResult<RawItem> {
        input.validate()?;
        let code = input.code.trim().to_uppercase();
        validate_raw_item_code(&code).map_err(|m| invalid("code", m))?;
        validate_item_names(&input.name_ar, &input.name_en).map_err(|m| invalid("name", m))?;
        validate_unit_cost(input.unit_cost).map_err(|m| invalid("unitCost", m))?;
        validate_stock_threshold(input.min_stock_threshold)
            .map_err(|m| invalid("minStockThreshold", m))?;

        let row = sqlx::query_as::<_, RawItemRow>(&format!(
            r#"
            INSERT INTO raw_items (tenant_id, code, name_ar, name_en, unit, unit_cost, min_stock_threshold)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {RAW_ITEM_COLUMNS}
            "#
        ))
        .bind(tenant_id)
        .bind(&code)
        .bind(input.name_ar.trim())
        .bind(input.name_en.trim())
        .bind(input.unit.as_str())
        .bind(input.unit_cost)
        .bind(input.min_stock_threshold)
        .fetch_one(&self.db)
        .await
        .map_err(|e| AppError::from_unique_violation(e, "code"))?;

        tracing::info!(raw_item_id = %row.id, code = %row.code, "Raw item created");

        Ok(row.into())
    }

    /// List raw items of a tenant ordered by code
    pub async fn list_raw_items(
        &self,
        tenant_id: Uuid,
        include_inactive: bool,
    ) -> AppResult<Vec<RawItem>> {
        let rows = sqlx::query_as::<_, RawItemRow>(&format!(
            r#"
            SELECT {RAW_ITEM_COLUMNS}
            FROM raw_items
            WHERE tenant_id = $1 AND (is_active OR $2)
            ORDER BY code
            "#
        ))
        .bind(tenant_id)
        .bind(include_inactive)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Update names, cost or threshold; stock only changes through movements
    pub async fn update_raw_item(
        &self,
        tenant_id: Uuid,
        raw_item_id: Uuid,
        input: UpdateRawItemInput,
    ) -> AppResult<RawItem> {
        input.validate()?;
        if let Some(cost) = input.unit_cost {
            validate_unit_cost(cost).map_err(|m| invalid("unitCost", m))?;
        }
        if let Some(threshold) = input.min_stock_threshold {
            validate_stock_threshold(threshold).map_err(|m| invalid("minStockThreshold", m))?;
        }

        let row = sqlx::query_as::<_, RawItemRow>(&format!(
            r#"
            UPDATE raw_items
            SET name_ar = COALESCE($3, name_ar),
                name_en = COALESCE($4, name_en),
                unit_cost = COALESCE($5, unit_cost),
                min_stock_threshold = COALESCE($6, min_stock_threshold),
                updated_at = NOW()
            WHERE id = $1 AND tenant_id = $2
            RETURNING {RAW_ITEM_COLUMNS}
            "#
        ))
        .bind(raw_item_id)
        .bind(tenant_id)
        .bind(input.name_ar.as_deref().map(str::trim))
        .bind(input.name_en.as_deref().map(str::trim))
        .bind(input.unit_cost)
        .bind(input.min_stock_threshold)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Raw item".to_string()))?;

        Ok(row.into())
    }

    /// Deactivate a raw item; its ledger history is kept
    pub async fn deactivate_raw_item(&self, tenant_id: Uuid, raw_item_id: Uuid) -> AppResult<RawItem> {
        let row = sqlx::query_as::<_, RawItemRow>(&format!(
            r#"
            UPDATE raw_items
            SET is_active = FALSE, updated_at = NOW()
            WHERE id = $1 AND tenant_id = $2
            RETURNING {RAW_ITEM_COLUMNS}
            "#
        ))
        .bind(raw_item_id)
        .bind(tenant_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Raw item".to_string()))?;

        tracing::info!(raw_item_id = %row.id, "Raw item deactivated");

        Ok(row.into())
    }

    // ------------------------------------------------------------------
    // Movements
    // ------------------------------------------------------------------

    /// Record a stock movement and update the balance atomically
    pub async fn record_movement(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
        input: RecordMovementInput,
    ) -> AppResult<RecordedMovement> {
        input.validate()?;

        let mut tx = self.db.begin().await?;

        ensure_branch(&mut *tx, tenant_id, input.branch_id).await?;

        let recorded = record_movement_in_tx(
            &mut *tx,
            tenant_id,
            MovementRequest {
                branch_id: input.branch_id,
                raw_item_id: input.raw_item_id,
                movement_type: input.movement_type,
                quantity: input.quantity,
                source: MovementSource::Manual,
                reference_id: None,
                notes: input.notes.as_deref(),
                created_by: user_id,
            },
        )
        .await?;

        tx.commit().await?;

        Ok(recorded)
    }

    /// Most recent movements of a branch
    pub async fn list_movements(
        &self,
        tenant_id: Uuid,
        branch_id: Uuid,
        limit: i64,
    ) -> AppResult<Vec<StockMovement>> {
        let rows = sqlx::query_as::<_, MovementRow>(&format!(
            r#"
            SELECT {MOVEMENT_COLUMNS}
            FROM stock_movements
            WHERE tenant_id = $1 AND branch_id = $2
            ORDER BY created_at DESC, id
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

    // ------------------------------------------------------------------
    // Alerts
    // ------------------------------------------------------------------

    /// Alerts of a branch, newest first
    pub async fn list_alerts(
        &self,
        tenant_id: Uuid,
        branch_id: Uuid,
        unresolved_only: bool,
    ) -> AppResult<Vec<StockAlert>> {
        let rows = sqlx::query_as::<_, AlertRow>(&format!(
            r#"
            SELECT {ALERT_COLUMNS}
            FROM stock_alerts
            WHERE tenant_id = $1 AND branch_id = $2 AND (NOT $3 OR NOT is_resolved)
            ORDER BY created_at DESC
            "#
        ))
        .bind(tenant_id)
        .bind(branch_id)
        .bind(unresolved_only)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Resolve an alert. Resolving a resolved alert returns it unchanged.
    pub async fn resolve_alert(
        &self,
        tenant_id: Uuid,
        alert_id: Uuid,
        user_id: Uuid,
        input: ResolveAlertInput,
    ) -> AppResult<StockAlert> {
        input.validate()?;

        let mut tx = self.db.begin().await?;

        let current = sqlx::query_as::<_, AlertRow>(&format!(
            "SELECT {ALERT_COLUMNS} FROM stock_alerts WHERE id = $1 AND tenant_id = $2 FOR UPDATE"
        ))
        .bind(alert_id)
        .bind(tenant_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Alert".to_string()))?;

        let (_, changed) = AlertStatus::from_resolved(current.is_resolved).resolve();
        if !changed {
            tx.commit().await?;
            return Ok(current.into());
        }

        let row = sqlx::query_as::<_, AlertRow>(&format!(
            r#"
            UPDATE stock_alerts
            SET is_resolved = TRUE, action_taken = $2, resolved_by = $3, resolved_at = NOW()
            WHERE id = $1
            RETURNING {ALERT_COLUMNS}
            "#
        ))
        .bind(alert_id)
        .bind(&input.action_taken)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(alert_id = %row.id, raw_item_id = %row.raw_item_id, "Stock alert resolved");

        Ok(row.into())
    }

    // ------------------------------------------------------------------
    // Unit conversions
    // ------------------------------------------------------------------

    /// Tenant conversion rows
    pub async fn list_units(&self, tenant_id: Uuid) -> AppResult<Vec<UnitConversion>> {
        let rows = sqlx::query_as::<_, ConversionRow>(
            r#"
            SELECT id, tenant_id, from_unit, to_unit, factor
            FROM unit_conversions
            WHERE tenant_id = $1
            ORDER BY from_unit, to_unit
            "#,
        )
        .bind(tenant_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Add a conversion factor; a duplicate pair is a conflict
    pub async fn add_unit(&self, tenant_id: Uuid, input: AddUnitInput) -> AppResult<UnitConversion> {
        validate_conversion(input.from_unit, input.to_unit, input.factor)
            .map_err(|m| invalid("factor", m))?;

        let row = sqlx::query_as::<_, ConversionRow>(
            r#"
            INSERT INTO unit_conversions (tenant_id, from_unit, to_unit, factor)
            VALUES ($1, $2, $3, $4)
            RETURNING id, tenant_id, from_unit, to_unit, factor
            "#,
        )
        .bind(tenant_id)
        .bind(input.from_unit.as_str())
        .bind(input.to_unit.as_str())
        .bind(input.factor)
        .fetch_one(&self.db)
        .await
        .map_err(|e| AppError::from_unique_violation(e, "unit conversion"))?;

        tracing::info!(
            from = %row.from_unit,
            to = %row.to_unit,
            factor = %row.factor,
            "Unit conversion added"
        );

        Ok(row.into())
    }
}

/// Fail with 404 unless the branch exists and belongs to the tenant
pub(crate) async fn ensure_branch(
    conn: &mut PgConnection,
    tenant_id: Uuid,
    branch_id: Uuid,
) -> AppResult<()> {
    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM branches WHERE id = $1 AND tenant_id = $2 AND is_active)",
    )
    .bind(branch_id)
    .bind(tenant_id)
    .fetch_one(conn)
    .await?;

    if !exists {
        return Err(AppError::NotFound("Branch".to_string()));
    }
    Ok(())
}

/// Conversion table of a tenant, usable inside or outside a transaction
pub(crate) async fn load_conversions(
    conn: &mut PgConnection,
    tenant_id: Uuid,
) -> AppResult<ConversionTable> {
    let rows = sqlx::query_as::<_, ConversionRow>(
        "SELECT id, tenant_id, from_unit, to_unit, factor FROM unit_conversions WHERE tenant_id = $1",
    )
    .bind(tenant_id)
    .fetch_all(conn)
    .await?;

    let conversions: Vec<UnitConversion> = rows.into_iter().map(Into::into).collect();
    Ok(ConversionTable::from_conversions(&conversions))
}

/// Lock the raw item, apply the movement, append the ledger row and raise an
/// alert when the balance drops below threshold. Runs on the caller's
/// transaction; nothing is committed here.
///
/// Manual entries need an active item; order deductions also reach items
/// deactivated after the recipe was written.
pub(crate) async fn record_movement_in_tx(
    conn: &mut PgConnection,
    tenant_id: Uuid,
    req: MovementRequest<'_>,
) -> AppResult<RecordedMovement> {
    validate_stock_quantity(req.quantity).map_err(|m| invalid("quantity", m))?;

    let locked = sqlx::query_as::<_, LockedStock>(
        r#"
        SELECT current_stock, min_stock_threshold, unit_cost
        FROM raw_items
        WHERE id = $1 AND tenant_id = $2 AND (is_active OR $3)
        FOR UPDATE
        "#,
    )
    .bind(req.raw_item_id)
    .bind(tenant_id)
    .bind(req.source.accepts_inactive())
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound("Raw item".to_string()))?;

    let change = apply_movement(locked.current_stock, req.movement_type, req.quantity)?;
    validate_stock_quantity(change.new_quantity).map_err(|m| invalid("quantity", m))?;

    sqlx::query("UPDATE raw_items SET current_stock = $1, updated_at = NOW() WHERE id = $2")
        .bind(change.new_quantity)
        .bind(req.raw_item_id)
        .execute(&mut *conn)
        .await?;

    let movement = sqlx::query_as::<_, MovementRow>(&format!(
        r#"
        INSERT INTO stock_movements (
            tenant_id, branch_id, raw_item_id, movement_type, quantity,
            previous_quantity, new_quantity, unit_cost, reference_type, reference_id,
            notes, created_by
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        RETURNING {MOVEMENT_COLUMNS}
        "#
    ))
    .bind(tenant_id)
    .bind(req.branch_id)
    .bind(req.raw_item_id)
    .bind(req.movement_type.as_str())
    .bind(req.quantity)
    .bind(change.previous_quantity)
    .bind(change.new_quantity)
    .bind(locked.unit_cost)
    .bind(req.source.reference_type())
    .bind(req.reference_id)
    .bind(req.notes)
    .bind(req.created_by)
    .fetch_one(&mut *conn)
    .await?;

    let has_open_alert = sqlx::query_scalar::<_, bool>(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM stock_alerts
            WHERE branch_id = $1 AND raw_item_id = $2 AND NOT is_resolved
        )
        "#,
    )
    .bind(req.branch_id)
    .bind(req.raw_item_id)
    .fetch_one(&mut *conn)
    .await?;

    let alert = if should_raise_alert(&change, locked.min_stock_threshold, has_open_alert) {
        sqlx::query_as::<_, AlertRow>(&format!(
            r#"
            INSERT INTO stock_alerts (tenant_id, branch_id, raw_item_id, current_stock, threshold)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (branch_id, raw_item_id) WHERE NOT is_resolved DO NOTHING
            RETURNING {ALERT_COLUMNS}
            "#
        ))
        .bind(tenant_id)
        .bind(req.branch_id)
        .bind(req.raw_item_id)
        .bind(change.new_quantity)
        .bind(locked.min_stock_threshold)
        .fetch_optional(&mut *conn)
        .await?
        .map(StockAlert::from)
    } else {
        None
    };

    tracing::info!(
        raw_item_id = %req.raw_item_id,
        branch_id = %req.branch_id,
        movement_type = %req.movement_type,
        previous = %change.previous_quantity,
        new = %change.new_quantity,
        "Stock movement recorded"
    );
    if let Some(alert) = &alert {
        tracing::info!(
            alert_id = %alert.id,
            raw_item_id = %alert.raw_item_id,
            stock = %alert.current_stock,
            threshold = %alert.threshold,
            "Low stock alert raised"
        );
    }

    Ok(RecordedMovement {
        movement: movement.into(),
        alert,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn movement_input_accepts_camel_case() {
        let input: RecordMovementInput = serde_json::from_value(serde_json::json!({
            "branchId": Uuid::nil(),
            "rawItemId": Uuid::nil(),
            "movementType": "waste",
            "quantity": "1.5",
            "notes": "spilled"
        }))
        .unwrap();
        assert_eq!(input.movement_type, MovementType::Waste);
        assert!(input.validate().is_ok());
    }

    #[test]
    fn unknown_movement_type_is_rejected() {
        let parsed: Result<RecordMovementInput, _> = serde_json::from_value(serde_json::json!({
            "branchId": Uuid::nil(),
            "rawItemId": Uuid::nil(),
            "movementType": "theft",
            "quantity": 1
        }));
        assert!(parsed.is_err());
    }
}
