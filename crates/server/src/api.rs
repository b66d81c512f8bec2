use std::ops::RangeInclusive;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use chrono::{Datelike, Duration, NaiveDate};
use portfolio_tracker_core::{
    models::{
        analytics::PortfolioStats,
        chart::Dashboard,
        lot::{Lot, NewLot, EARLIEST_PURCHASE_YEAR},
        snapshot::PortfolioSnapshot,
    },
    PortfolioTracker, MAX_CHART_RANGE_DAYS,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use uuid::Uuid;

use crate::{
    config::Config,
    error::{ApiError, ApiResult},
    main_lib::AppState,
};

pub async fn healthz() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn list_lots(State(state): State<Arc<AppState>>) -> Json<Vec<Lot>> {
    let tracker = state.tracker.read().await;
    Json(tracker.lots().to_vec())
}

async fn create_lot(
    State(state): State<Arc<AppState>>,
    Json(input): Json<NewLot>,
) -> ApiResult<(StatusCode, Json<Lot>)> {
    // The price lookup runs under the read lock so readers are not blocked.
    let lot = state.tracker.read().await.resolve_lot(&input).await?;
    state.tracker.write().await.insert_lot(lot.clone());
    Ok((StatusCode::CREATED, Json(lot)))
}

async fn delete_lot(
    Path(id): Path<Uuid>,
    State(state): State<Arc<AppState>>,
) -> ApiResult<StatusCode> {
    state.tracker.write().await.remove_lot(id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn clear_lots(State(state): State<Arc<AppState>>) -> StatusCode {
    state.tracker.write().await.clear_lots();
    StatusCode::NO_CONTENT
}

#[derive(Serialize)]
struct ImportResult {
    imported: usize,
}

/// Body is a JSON array of lots, as produced by `GET /lots`.
async fn import_lots(
    State(state): State<Arc<AppState>>,
    body: String,
) -> ApiResult<Json<ImportResult>> {
    let imported = state.tracker.write().await.import_lots_from_json(&body)?;
    Ok(Json(ImportResult { imported }))
}

#[derive(Deserialize)]
struct RangeQuery {
    start: Option<String>,
    end: Option<String>,
}

async fn get_valuations(
    State(state): State<Arc<AppState>>,
    Query(q): Query<RangeQuery>,
) -> ApiResult<Json<Vec<PortfolioSnapshot>>> {
    let tracker = state.tracker.read().await;
    let (start, end) = resolve_range(&tracker, &q)?;
    let snapshots = tracker.compute_timeseries(start, end).await?;
    Ok(Json(snapshots))
}

async fn get_dashboard(
    State(state): State<Arc<AppState>>,
    Query(q): Query<RangeQuery>,
) -> ApiResult<Json<Dashboard>> {
    let tracker = state.tracker.read().await;
    let (start, end) = resolve_range(&tracker, &q)?;
    let dashboard = tracker.dashboard(start, end).await?;
    Ok(Json(dashboard))
}

async fn get_stats(State(state): State<Arc<AppState>>) -> Json<PortfolioStats> {
    Json(state.tracker.read().await.stats().await)
}

/// Missing `end` is today; missing `start` is the earliest purchase date,
/// kept within `MAX_CHART_RANGE_DAYS` of `end`.
fn resolve_range(tracker: &PortfolioTracker, q: &RangeQuery) -> ApiResult<(NaiveDate, NaiveDate)> {
    let end = match &q.end {
        Some(raw) => parse_date("end", raw)?,
        None => chrono::Utc::now().date_naive(),
    };
    let start = match &q.start {
        Some(raw) => parse_date("start", raw)?,
        None => {
            let earliest_allowed = end
                .checked_sub_signed(Duration::days(MAX_CHART_RANGE_DAYS))
                .unwrap_or(NaiveDate::MIN);
            tracker
                .earliest_purchase_date()
                .unwrap_or(end)
                .clamp(earliest_allowed, end)
        }
    };
    Ok((start, end))
}

/// Query dates outside these years are rejected.
const QUERY_YEARS: RangeInclusive<i32> = EARLIEST_PURCHASE_YEAR..=9999;

fn parse_date(field: &str, raw: &str) -> ApiResult<NaiveDate> {
    let date = NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|e| ApiError::BadRequest(format!("Invalid {field} date '{raw}': {e}")))?;
    if !QUERY_YEARS.contains(&date.year()) {
        return Err(ApiError::BadRequest(format!(
            "Invalid {field} date '{raw}': year must be between {} and {}",
            QUERY_YEARS.start(),
            QUERY_YEARS.end()
        )));
    }
    Ok(date)
}

pub fn app_router(state: Arc<AppState>, config: &Config) -> Router {
    let api = Router::new()
        .route("/healthz", get(healthz))
        .route("/lots", get(list_lots).post(create_lot).delete(clear_lots))
        .route("/lots/import", post(import_lots))
        .route("/lots/{id}", delete(delete_lot))
        .route("/valuations", get(get_valuations))
        .route("/dashboard", get(get_dashboard))
        .route("/stats", get(get_stats));

    Router::new()
        .nest("/api/v1", api)
        .with_state(state)
        .layer(CorsLayer::new().allow_origin(Any))
        .layer(TimeoutLayer::new(config.request_timeout))
        .layer(TraceLayer::new_for_http())
}
