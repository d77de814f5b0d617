//! REST API routes.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use searoute_core::models::{parse_lat_lng_pairs, GenerateRouteRequest, RouteResponse, SmoothRequest, SmoothResponse};
use searoute_core::segment::{IDEMPOTENCY_KEY_HEADER, SaveSegmentResponse, SegmentHistoryResponse, SegmentRecord, SegmentSaveRequest};
use searoute_core::smoothing::smooth;
use std::sync::Arc;

use crate::api::error::ApiError;
use crate::persistence;
use crate::state::AppState;

/// Create the API router.
pub fn create_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/v1/routes/generate", post(generate_route))
        .route("/v1/routes/smooth", post(smooth_route))
        .route("/v1/segments", post(save_segment))
        .route("/v1/segments/:segment_id", get(get_segment))
        .route("/v1/segments/:segment_id/history", get(get_segment_history))
}

/// POST /v1/routes/generate
async fn generate_route(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<GenerateRouteRequest>, JsonRejection>,
) -> Result<Json<RouteResponse>, ApiError> {
    let Json(request) = payload?;
    let (origin, destination) = request.endpoints()?;

    let route = state.synthesizer().synthesize_points(&origin, &destination)?;
    tracing::info!(
        "Generated {:?} route {} -> {}: {} points, {:.1} nm",
        route.kind,
        origin,
        destination,
        route.coordinates.len(),
        route.total_distance_nm
    );

    Ok(Json(RouteResponse::from_route(route, request.units)))
}

/// POST /v1/routes/smooth
async fn smooth_route(payload: Result<Json<SmoothRequest>, JsonRejection>) -> Result<Json<SmoothResponse>, ApiError> {
    let Json(request) = payload?;
    let vertices = parse_lat_lng_pairs(&request.vertices, "vertices")?;
    let smoothed = smooth(&vertices)?;
    Ok(Json(SmoothResponse {
        vertices: smoothed.iter().map(|p| p.to_lat_lng()).collect(),
    }))
}

/// POST /v1/segments
///
/// Validation runs before any storage access. A cache failure after the
/// write is logged and does not affect the response. With an
/// `Idempotency-Key` header, a repeat of a committed save answers 200 with
/// the stored version.
async fn save_segment(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<SegmentSaveRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SaveSegmentResponse>), ApiError> {
    let Json(request) = payload?;
    let candidate = request.validate().map_err(|err| {
        tracing::warn!("Rejected segment save ({}): {}", err.field(), err);
        ApiError::from(err)
    })?;

    let request_id = headers
        .get(IDEMPOTENCY_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty());

    let pool = state.database().pool();
    let outcome = match request_id {
        Some(request_id) => persistence::save_segment_once(pool, &candidate, request_id).await,
        None => persistence::save_segment(pool, &candidate).await,
    }
    .map_err(ApiError::SaveFailed)?;

    let (status, message) = if outcome.replayed {
        (
            StatusCode::OK,
            format!("Segment {} already saved as version {}", outcome.segment_id, outcome.version),
        )
    } else {
        state.invalidate_segment(&outcome.segment_id);
        (
            StatusCode::CREATED,
            format!("Segment {} saved as version {}", outcome.segment_id, outcome.version),
        )
    };

    Ok((
        status,
        Json(SaveSegmentResponse {
            message,
            segment_id: outcome.segment_id,
            version: outcome.version,
            created_at: outcome.created_at,
            updated_at: outcome.updated_at,
        }),
    ))
}

/// GET /v1/segments/:segment_id
async fn get_segment(
    State(state): State<Arc<AppState>>,
    Path(segment_id): Path<String>,
) -> Result<Json<SegmentRecord>, ApiError> {
    if let Some(record) = state.cached_segment(&segment_id) {
        return Ok(Json(record));
    }

    let generation = state.cache_generation(&segment_id);
    let record = persistence::load_active_segment(state.database().pool(), &segment_id)
        .await
        .map_err(ApiError::Storage)?
        .ok_or_else(|| ApiError::NotFound(segment_id.clone()))?;

    state.remember_segment(&record, generation);
    Ok(Json(record))
}

/// GET /v1/segments/:segment_id/history
async fn get_segment_history(
    State(state): State<Arc<AppState>>,
    Path(segment_id): Path<String>,
) -> Result<Json<SegmentHistoryResponse>, ApiError> {
    let versions = persistence::load_segment_history(state.database().pool(), &segment_id)
        .await
        .map_err(ApiError::Storage)?;
    if versions.is_empty() {
        return Err(ApiError::NotFound(segment_id));
    }
    Ok(Json(SegmentHistoryResponse { segment_id, versions }))
}
