//! Trip planning endpoint.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::{Extension, Json};
use evroute_core::TripPlan;

use crate::api::error::ApiError;
use crate::api::request_id::RequestId;
use crate::state::AppState;
use crate::trip_planner::{self, PlanTripRequest};

pub async fn plan_trip_handler(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    payload: Result<Json<PlanTripRequest>, JsonRejection>,
) -> Result<Json<TripPlan>, ApiError> {
    let Json(request) = payload.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    tracing::debug!(%request_id, "Plan request accepted");
    let plan = trip_planner::plan(state.as_ref(), request).await?;
    Ok(Json(plan))
}
