//! HTTP handlers for recipes and item costing

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::extract::AppJson;
use crate::middleware::{require_permission, CurrentUser};
use crate::models::{Action, Resource};
use crate::services::recipe::{AddRecipeLineInput, ItemCostReport, RecipeItem, RecipeService};
use crate::AppState;

/// List the recipe lines of a menu item
pub async fn list_recipe(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(coffee_item_id): Path<Uuid>,
) -> AppResult<Json<Vec<RecipeItem>>> {
    require_permission(&current_user.0, Resource::Recipe, Action::View)?;
    let service = RecipeService::new(state.db);
    let lines = service
        .list_recipe(current_user.0.tenant_id, coffee_item_id)
        .await?;
    Ok(Json(lines))
}

/// Add an ingredient to a recipe
pub async fn add_recipe_line(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(coffee_item_id): Path<Uuid>,
    AppJson(input): AppJson<AddRecipeLineInput>,
) -> AppResult<(StatusCode, Json<RecipeItem>)> {
    require_permission(&current_user.0, Resource::Recipe, Action::Create)?;
    let service = RecipeService::new(state.db);
    let line = service
        .add_line(current_user.0.tenant_id, coffee_item_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(line)))
}

/// Remove an ingredient from a recipe
pub async fn remove_recipe_line(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path((coffee_item_id, raw_item_id)): Path<(Uuid, Uuid)>,
) -> AppResult<StatusCode> {
    require_permission(&current_user.0, Resource::Recipe, Action::Edit)?;
    let service = RecipeService::new(state.db);
    service
        .remove_line(current_user.0.tenant_id, coffee_item_id, raw_item_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Current unit cost of a menu item
pub async fn get_item_cost(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(coffee_item_id): Path<Uuid>,
) -> AppResult<Json<ItemCostReport>> {
    require_permission(&current_user.0, Resource::Recipe, Action::View)?;
    let service = RecipeService::new(state.db);
    let cost = service
        .compute_item_cost(current_user.0.tenant_id, coffee_item_id)
        .await?;
    Ok(Json(cost))
}
