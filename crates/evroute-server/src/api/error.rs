//! Error responses for the HTTP API.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use evroute_core::{PlanningError, TripPlan};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Planning(#[from] PlanningError),
    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
pub struct ErrorBody<'a> {
    pub error: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partial_plan: Option<&'a TripPlan>,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Planning(err) => match err {
                PlanningError::EmptyRoute { .. }
                | PlanningError::InvalidGeometry(_)
                | PlanningError::InvalidVehicle(_) => StatusCode::BAD_REQUEST,
                PlanningError::SegmentUnreachable { .. }
                | PlanningError::InsufficientChargingInfrastructure { .. } => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
                PlanningError::UpstreamUnavailable { .. } => StatusCode::BAD_GATEWAY,
                PlanningError::Cancelled { .. } => StatusCode::GATEWAY_TIMEOUT,
            },
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "bad_request",
            Self::Internal(_) => "internal",
            Self::Planning(err) => err.code(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(code = self.code(), "{}", self);
        } else {
            tracing::debug!(code = self.code(), "{}", self);
        }
        let body = ErrorBody {
            error: self.code(),
            message: self.to_string(),
            partial_plan: match &self {
                Self::Planning(err) => err.partial_plan(),
                _ => None,
            },
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn planning_errors_map_to_statuses() {
        let cases = [
            (PlanningError::EmptyRoute { points: 1 }, StatusCode::BAD_REQUEST),
            (PlanningError::InvalidVehicle("x".into()), StatusCode::BAD_REQUEST),
            (
                PlanningError::SegmentUnreachable {
                    index: 0,
                    cost_percent: 120.0,
                },
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (PlanningError::upstream("geocoder", "down"), StatusCode::BAD_GATEWAY),
            (
                PlanningError::Cancelled {
                    completed_segments: 3,
                },
                StatusCode::GATEWAY_TIMEOUT,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
        assert_eq!(ApiError::BadRequest("nope".into()).code(), "bad_request");
    }
}
