//! Accounting report handlers
//!
//! Range reports take `?startDate=&endDate=` (inclusive business days,
//! defaulting to today) and `?format=csv` for a download.

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppResult;
use crate::extract::AppQuery;
use crate::middleware::{require_permission, AuthUser, CurrentUser};
use crate::models::{Action, DailySnapshot, Resource};
use crate::services::accounting::{AccountingEngine, StoredSnapshot};
use crate::AppState;
use shared::DateRange;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub limit: Option<i64>,
    pub format: Option<String>, // "json" or "csv"
}

impl RangeQuery {
    /// Missing end means today, missing start means the end day
    fn range(&self, today: NaiveDate) -> AppResult<DateRange> {
        let end = self.end_date.unwrap_or(today);
        let start = self.start_date.unwrap_or(end);
        Ok(DateRange::new(start, end)?)
    }

    fn wants_csv(&self) -> bool {
        self.format.as_deref() == Some("csv")
    }
}

#[derive(Debug, Deserialize)]
pub struct SnapshotListQuery {
    pub limit: Option<i64>,
}

fn engine(state: &AppState) -> AccountingEngine {
    AccountingEngine::new(state.db.clone(), &state.config.accounting)
}

fn ranking_limit(state: &AppState, requested: Option<i64>) -> usize {
    usize::try_from(state.config.accounting.ranking_limit(requested)).unwrap_or(1)
}

/// Reports need `accounting:view`; CSV downloads also need `accounting:export`
fn authorize_report(user: &AuthUser, query: &RangeQuery) -> AppResult<()> {
    require_permission(user, Resource::Accounting, Action::View)?;
    if query.wants_csv() {
        require_permission(user, Resource::Accounting, Action::Export)?;
    }
    Ok(())
}

/// JSON by default, CSV attachment on request
fn report_response<T: Serialize>(
    query: &RangeQuery,
    filename: &str,
    data: Vec<T>,
) -> AppResult<Response> {
    if query.wants_csv() {
        let csv = AccountingEngine::export_to_csv(&data)?;
        let disposition = format!("attachment; filename=\"{}.csv\"", filename);
        Ok((
            [
                (header::CONTENT_TYPE, "text/csv".to_string()),
                (header::CONTENT_DISPOSITION, disposition),
            ],
            csv,
        )
            .into_response())
    } else {
        Ok(Json(data).into_response())
    }
}

/// Today's snapshot, computed on demand
pub async fn get_daily_snapshot(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(branch_id): Path<Uuid>,
) -> AppResult<Json<DailySnapshot>> {
    require_permission(&current_user.0, Resource::Accounting, Action::View)?;
    let snapshot = engine(&state)
        .get_daily_snapshot(current_user.0.tenant_id, branch_id)
        .await?;
    Ok(Json(snapshot))
}

/// Persist today's snapshot
pub async fn save_daily_snapshot(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(branch_id): Path<Uuid>,
) -> AppResult<(StatusCode, Json<StoredSnapshot>)> {
    require_permission(&current_user.0, Resource::Accounting, Action::Create)?;
    let stored = engine(&state)
        .save_daily_snapshot(current_user.0.tenant_id, branch_id, current_user.0.user_id)
        .await?;
    Ok((StatusCode::CREATED, Json(stored)))
}

/// Snapshot history
pub async fn list_snapshots(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(branch_id): Path<Uuid>,
    AppQuery(query): AppQuery<SnapshotListQuery>,
) -> AppResult<Json<Vec<StoredSnapshot>>> {
    require_permission(&current_user.0, Resource::Accounting, Action::View)?;
    let limit = state.config.accounting.ranking_limit(query.limit);
    let snapshots = engine(&state)
        .list_snapshots(current_user.0.tenant_id, branch_id, limit)
        .await?;
    Ok(Json(snapshots))
}

/// Profit per menu item
pub async fn get_profit_by_item(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(branch_id): Path<Uuid>,
    AppQuery(query): AppQuery<RangeQuery>,
) -> AppResult<Response> {
    authorize_report(&current_user.0, &query)?;
    let engine = engine(&state);
    let range = query.range(engine.today())?;
    let data = engine
        .get_profit_per_drink(current_user.0.tenant_id, branch_id, range)
        .await?;
    report_response(&query, "profit_by_item", data)
}

/// Profit per menu category
pub async fn get_profit_by_category(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(branch_id): Path<Uuid>,
    AppQuery(query): AppQuery<RangeQuery>,
) -> AppResult<Response> {
    authorize_report(&current_user.0, &query)?;
    let engine = engine(&state);
    let range = query.range(engine.today())?;
    let data = engine
        .get_profit_per_category(current_user.0.tenant_id, branch_id, range)
        .await?;
    report_response(&query, "profit_by_category", data)
}

/// Most profitable items
pub async fn get_top_items(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(branch_id): Path<Uuid>,
    AppQuery(query): AppQuery<RangeQuery>,
) -> AppResult<Response> {
    authorize_report(&current_user.0, &query)?;
    let limit = ranking_limit(&state, query.limit);
    let engine = engine(&state);
    let range = query.range(engine.today())?;
    let data = engine
        .get_top_profitable_items(current_user.0.tenant_id, branch_id, range, limit)
        .await?;
    report_response(&query, "top_items", data)
}

/// Least profitable items
pub async fn get_worst_items(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(branch_id): Path<Uuid>,
    AppQuery(query): AppQuery<RangeQuery>,
) -> AppResult<Response> {
    authorize_report(&current_user.0, &query)?;
    let limit = ranking_limit(&state, query.limit);
    let engine = engine(&state);
    let range = query.range(engine.today())?;
    let data = engine
        .get_worst_items(current_user.0.tenant_id, branch_id, range, limit)
        .await?;
    report_response(&query, "worst_items", data)
}

/// Waste cost breakdown
pub async fn get_waste_report(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(branch_id): Path<Uuid>,
    AppQuery(query): AppQuery<RangeQuery>,
) -> AppResult<Response> {
    authorize_report(&current_user.0, &query)?;
    let engine = engine(&state);
    let range = query.range(engine.today())?;
    let report = engine
        .get_waste_report(current_user.0.tenant_id, branch_id, range)
        .await?;

    if query.wants_csv() {
        report_response(&query, "waste_report", report.items)
    } else {
        Ok(Json(report).into_response())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn empty_query_means_today() {
        let today = day(2024, 5, 1);
        let range = RangeQuery::default().range(today).unwrap();
        assert_eq!(range, DateRange::single_day(today));
    }

    #[test]
    fn start_only_runs_to_today() {
        let query = RangeQuery {
            start_date: Some(day(2024, 4, 1)),
            ..Default::default()
        };
        let range = query.range(day(2024, 5, 1)).unwrap();
        assert_eq!(range.start, day(2024, 4, 1));
        assert_eq!(range.end, day(2024, 5, 1));
    }

    #[test]
    fn inverted_range_is_rejected() {
        let query = RangeQuery {
            start_date: Some(day(2024, 5, 2)),
            end_date: Some(day(2024, 5, 1)),
            ..Default::default()
        };
        assert!(query.range(day(2024, 5, 3)).is_err());
    }

    #[test]
    fn query_parses_camel_case_dates() {
        let query: RangeQuery =
            serde_json::from_str(r#"{"startDate":"2024-05-01","endDate":"2024-05-31","format":"csv"}"#)
                .unwrap();
        assert!(query.wants_csv());
        assert_eq!(query.end_date, Some(day(2024, 5, 31)));
    }
}
