//! HTTP handlers for orders

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::extract::AppJson;
use crate::middleware::{require_permission, CurrentUser};
use crate::models::{Action, Order, Resource};
use crate::services::order::{CreateOrderInput, OrderService};
use crate::AppState;

/// Create an order
pub async fn create_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    AppJson(input): AppJson<CreateOrderInput>,
) -> AppResult<(StatusCode, Json<Order>)> {
    require_permission(&current_user.0, Resource::Order, Action::Create)?;
    let service = OrderService::new(state.db);
    let order = service
        .create_order(current_user.0.tenant_id, current_user.0.user_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// Get an order with its lines
pub async fn get_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<Order>> {
    require_permission(&current_user.0, Resource::Order, Action::View)?;
    let service = OrderService::new(state.db);
    let order = service.get_order(current_user.0.tenant_id, order_id).await?;
    Ok(Json(order))
}

/// Complete an order, freezing costs and deducting stock
pub async fn complete_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<Order>> {
    require_permission(&current_user.0, Resource::Order, Action::Edit)?;
    let service = OrderService::new(state.db);
    let order = service
        .complete_order(current_user.0.tenant_id, order_id, current_user.0.user_id)
        .await?;
    Ok(Json(order))
}
