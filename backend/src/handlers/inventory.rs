//! HTTP handlers for raw items, stock movements, alerts and unit conversions

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::extract::{AppJson, AppQuery};
use crate::middleware::{require_permission, CurrentUser};
use crate::models::{Action, RawItem, Resource, StockAlert, StockMovement, UnitConversion};
use crate::services::inventory::{
    AddUnitInput, CreateRawItemInput, InventoryService, RecordMovementInput, RecordedMovement,
    ResolveAlertInput, UpdateRawItemInput,
};
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawItemListQuery {
    #[serde(default)]
    pub include_inactive: bool,
}

#[derive(Debug, Deserialize)]
pub struct MovementListQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct AlertListQuery {
    #[serde(default)]
    pub unresolved: bool,
}

/// Create a raw item
pub async fn create_raw_item(
    State(state): State<AppState>,
    current_user: CurrentUser,
    AppJson(input): AppJson<CreateRawItemInput>,
) -> AppResult<(StatusCode, Json<RawItem>)> {
    require_permission(&current_user.0, Resource::Inventory, Action::Create)?;
    let service = InventoryService::new(state.db);
    let item = service.create_raw_item(current_user.0.tenant_id, input).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// List raw items of the tenant
pub async fn list_raw_items(
    State(state): State<AppState>,
    current_user: CurrentUser,
    AppQuery(query): AppQuery<RawItemListQuery>,
) -> AppResult<Json<Vec<RawItem>>> {
    require_permission(&current_user.0, Resource::Inventory, Action::View)?;
    let service = InventoryService::new(state.db);
    let items = service
        .list_raw_items(current_user.0.tenant_id, query.include_inactive)
        .await?;
    Ok(Json(items))
}

/// Update a raw item
pub async fn update_raw_item(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(raw_item_id): Path<Uuid>,
    AppJson(input): AppJson<UpdateRawItemInput>,
) -> AppResult<Json<RawItem>> {
    require_permission(&current_user.0, Resource::Inventory, Action::Edit)?;
    let service = InventoryService::new(state.db);
    let item = service
        .update_raw_item(current_user.0.tenant_id, raw_item_id, input)
        .await?;
    Ok(Json(item))
}

/// Deactivate a raw item
pub async fn deactivate_raw_item(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(raw_item_id): Path<Uuid>,
) -> AppResult<Json<RawItem>> {
    require_permission(&current_user.0, Resource::Inventory, Action::Edit)?;
    let service = InventoryService::new(state.db);
    let item = service
        .deactivate_raw_item(current_user.0.tenant_id, raw_item_id)
        .await?;
    Ok(Json(item))
}

/// Record a stock movement
pub async fn record_movement(
    State(state): State<AppState>,
    current_user: CurrentUser,
    AppJson(input): AppJson<RecordMovementInput>,
) -> AppResult<(StatusCode, Json<RecordedMovement>)> {
    require_permission(&current_user.0, Resource::Inventory, Action::Create)?;
    let service = InventoryService::new(state.db);
    let recorded = service
        .record_movement(current_user.0.tenant_id, current_user.0.user_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(recorded)))
}

/// List recent movements of a branch
pub async fn list_movements(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(branch_id): Path<Uuid>,
    AppQuery(query): AppQuery<MovementListQuery>,
) -> AppResult<Json<Vec<StockMovement>>> {
    require_permission(&current_user.0, Resource::Inventory, Action::View)?;
    let limit = state.config.accounting.movement_limit(query.limit);
    let service = InventoryService::new(state.db);
    let movements = service
        .list_movements(current_user.0.tenant_id, branch_id, limit)
        .await?;
    Ok(Json(movements))
}

/// List alerts of a branch
pub async fn list_alerts(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(branch_id): Path<Uuid>,
    AppQuery(query): AppQuery<AlertListQuery>,
) -> AppResult<Json<Vec<StockAlert>>> {
    require_permission(&current_user.0, Resource::Inventory, Action::View)?;
    let service = InventoryService::new(state.db);
    let alerts = service
        .list_alerts(current_user.0.tenant_id, branch_id, query.unresolved)
        .await?;
    Ok(Json(alerts))
}

/// Resolve an alert
pub async fn resolve_alert(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(alert_id): Path<Uuid>,
    input: Option<AppJson<ResolveAlertInput>>,
) -> AppResult<Json<StockAlert>> {
    require_permission(&current_user.0, Resource::Inventory, Action::Resolve)?;
    let input = input.map(|AppJson(i)| i).unwrap_or_default();
    let service = InventoryService::new(state.db);
    let alert = service
        .resolve_alert(
            current_user.0.tenant_id,
            alert_id,
            current_user.0.user_id,
            input,
        )
        .await?;
    Ok(Json(alert))
}

/// List unit conversions of the caller's tenant
pub async fn list_units(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(tenant_id): Path<Uuid>,
) -> AppResult<Json<Vec<UnitConversion>>> {
    require_permission(&current_user.0, Resource::Inventory, Action::View)?;
    if tenant_id != current_user.0.tenant_id {
        return Err(AppError::InsufficientPermissions);
    }
    let service = InventoryService::new(state.db);
    let units = service.list_units(tenant_id).await?;
    Ok(Json(units))
}

/// Add a unit conversion factor
pub async fn add_unit(
    State(state): State<AppState>,
    current_user: CurrentUser,
    AppJson(input): AppJson<AddUnitInput>,
) -> AppResult<(StatusCode, Json<UnitConversion>)> {
    require_permission(&current_user.0, Resource::Inventory, Action::Edit)?;
    let service = InventoryService::new(state.db);
    let unit = service.add_unit(current_user.0.tenant_id, input).await?;
    Ok((StatusCode::CREATED, Json(unit)))
}
