use crate::dto::{
    AnalyzeResponse, ChangePointDto, ChangePointEventDto, EventDto, ImpactQuery, PriceDto,
    UploadResponse,
};
use crate::{AppState, error::AppError};
use axum::{
    Json,
    body::Bytes,
    extract::{Path, Query, State},
};
use axum_extra::extract::WithRejection;
use core_types::Revision;
use query::{AnalyzeRequest, ChangePointQuery};
use std::sync::Arc;

/// Response header carrying the revision an answer was computed against.
pub const REVISION_HEADER: &str = "x-data-revision";

type WithRevision<T> = ([(&'static str, String); 1], Json<T>);

fn revisioned<T>(revision: Revision, body: T) -> WithRevision<T> {
    ([(REVISION_HEADER, revision.value().to_string())], Json(body))
}

/// # GET /api/prices
pub async fn get_prices(State(state): State<Arc<AppState>>) -> WithRevision<Vec<PriceDto>> {
    let prices = state.facade.prices();
    let body = prices.value.iter().map(PriceDto::from).collect();
    revisioned(prices.revision, body)
}

/// # GET /api/events
pub async fn get_events(State(state): State<Arc<AppState>>) -> WithRevision<Vec<EventDto>> {
    let events = state.facade.events();
    let body = events.value.iter().map(EventDto::from).collect();
    revisioned(events.revision, body)
}

/// # GET /api/change_points
/// Supports `page`, `limit`, `max_points` and `min_confidence` query parameters.
pub async fn get_change_points(
    State(state): State<Arc<AppState>>,
    WithRejection(Query(query), _): WithRejection<Query<ChangePointQuery>, AppError>,
) -> Result<WithRevision<Vec<ChangePointDto>>, AppError> {
    let result = state.facade.change_points(&query)?;
    let body = result.value.into_iter().map(ChangePointDto::from).collect();
    Ok(revisioned(result.revision, body))
}

/// # GET /api/change_points/events
/// Each change point with the nearest catalog event, if one is close enough.
pub async fn get_change_point_events(
    State(state): State<Arc<AppState>>,
    WithRejection(Query(query), _): WithRejection<Query<ChangePointQuery>, AppError>,
) -> Result<WithRevision<Vec<ChangePointEventDto>>, AppError> {
    let result = state.facade.change_point_matches(&query)?;
    let body = result
        .value
        .into_iter()
        .map(ChangePointEventDto::from)
        .collect();
    Ok(revisioned(result.revision, body))
}

/// # POST /api/analyze
/// Body: `{"start_date": "YYYY-MM-DD", "end_date": "YYYY-MM-DD"}` or `{"event": "..."}`.
pub async fn analyze_period(
    State(state): State<Arc<AppState>>,
    WithRejection(Json(request), _): WithRejection<Json<AnalyzeRequest>, AppError>,
) -> Result<WithRevision<AnalyzeResponse>, AppError> {
    let stats = state.facade.analyze(&request)?;
    Ok(revisioned(stats.revision, stats.value.into()))
}

/// # GET /api/events/:name/impact
pub async fn get_event_impact(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    WithRejection(Query(window), _): WithRejection<Query<ImpactQuery>, AppError>,
) -> Result<WithRevision<AnalyzeResponse>, AppError> {
    let stats = state
        .facade
        .event_impact(&name, window.before_months, window.after_months)?;
    Ok(revisioned(stats.revision, stats.value.into()))
}

/// # POST /api/upload
/// Replaces the price series with a `Date,Price` CSV body. Encoding problems are
/// reported by the CSV reader like any other malformed upload.
pub async fn upload_prices(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<UploadResponse>, AppError> {
    let points = data_loader::read_prices(&body[..], &state.loader_options)?;
    let count = points.len();
    let revision = state.facade.load_prices(points)?;
    tracing::info!(%revision, points = count, "Accepted uploaded price series.");
    Ok(Json(UploadResponse {
        revision,
        points: count,
    }))
}
