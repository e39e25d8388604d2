//! Route definitions for the café costing platform

use axum::{
    middleware,
    routing::{delete, get, patch, post, put},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Auth routes (public)
        .nest("/auth", auth_routes())
        // Protected routes
        .nest("/inventory", inventory_routes(state.clone()))
        .nest("/recipes", recipe_routes(state.clone()))
        .nest("/orders", order_routes(state.clone()))
        .nest("/accounting", accounting_routes(state))
}

/// Authentication routes (public)
fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(handlers::login))
        .route("/refresh", post(handlers::refresh))
}

/// Raw items, stock ledger, alerts and units (protected)
fn inventory_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/raw-items",
            get(handlers::list_raw_items).post(handlers::create_raw_item),
        )
        .route("/raw-items/:raw_item_id", put(handlers::update_raw_item))
        .route(
            "/raw-items/:raw_item_id/deactivate",
            post(handlers::deactivate_raw_item),
        )
        .route("/movements", post(handlers::record_movement))
        .route("/movements/:branch_id", get(handlers::list_movements))
        // `:id` is the branch on the list route and the alert on resolve
        .route("/alerts/:id", get(handlers::list_alerts))
        .route("/alerts/:id/resolve", patch(handlers::resolve_alert))
        .route("/units", post(handlers::add_unit))
        .route("/units/:tenant_id", get(handlers::list_units))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Recipe management and costing (protected)
fn recipe_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/:coffee_item_id",
            get(handlers::list_recipe).post(handlers::add_recipe_line),
        )
        .route("/:coffee_item_id/cost", get(handlers::get_item_cost))
        .route(
            "/:coffee_item_id/lines/:raw_item_id",
            delete(handlers::remove_recipe_line),
        )
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Order intake and completion (protected)
fn order_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::create_order))
        .route("/:order_id", get(handlers::get_order))
        .route("/:order_id/complete", post(handlers::complete_order))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Accounting reports (protected)
fn accounting_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/daily-snapshot/:branch_id",
            get(handlers::get_daily_snapshot).post(handlers::save_daily_snapshot),
        )
        .route("/snapshots/:branch_id", get(handlers::list_snapshots))
        .route("/profit-by-item/:branch_id", get(handlers::get_profit_by_item))
        .route(
            "/profit-by-category/:branch_id",
            get(handlers::get_profit_by_category),
        )
        .route("/top-items/:branch_id", get(handlers::get_top_items))
        .route("/worst-items/:branch_id", get(handlers::get_worst_items))
        .route("/waste-report/:branch_id", get(handlers::get_waste_report))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}
