use thiserror::Error;

use crate::models::{Coordinate, TripPlan};

/// Typed failure of a planning run. Every variant is terminal.
#[derive(Debug, Error)]
pub enum PlanningError {
    #[error("route geometry needs at least 2 distinct points, got {points}")]
    EmptyRoute { points: usize },
    #[error("invalid route geometry: {0}")]
    InvalidGeometry(String),
    #[error("invalid vehicle parameters: {0}")]
    InvalidVehicle(String),
    #[error("segment {index} costs {cost_percent:.1}% of a full battery and cannot be driven in one hop")]
    SegmentUnreachable { index: usize, cost_percent: f64 },
    #[error("no available charging station within {radius_m:.0} m of {at} ({battery_percent:.1}% battery left)")]
    InsufficientChargingInfrastructure {
        at: Coordinate,
        battery_percent: f64,
        radius_m: f64,
        /// Plan up to and including the segment where the run stalled
        partial_plan: Box<TripPlan>,
    },
    #[error("{service} unavailable: {message}")]
    UpstreamUnavailable { service: String, message: String },
    #[error("planning cancelled after {completed_segments} segments")]
    Cancelled { completed_segments: usize },
}

impl PlanningError {
    pub fn upstream(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::UpstreamUnavailable {
            service: service.into(),
            message: message.into(),
        }
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::EmptyRoute { .. } => "empty_route",
            Self::InvalidGeometry(_) => "invalid_geometry",
            Self::InvalidVehicle(_) => "invalid_vehicle",
            Self::SegmentUnreachable { .. } => "segment_unreachable",
            Self::InsufficientChargingInfrastructure { .. } => {
                "insufficient_charging_infrastructure"
            }
            Self::UpstreamUnavailable { .. } => "upstream_unavailable",
            Self::Cancelled { .. } => "cancelled",
        }
    }

    pub fn partial_plan(&self) -> Option<&TripPlan> {
        match self {
            Self::InsufficientChargingInfrastructure { partial_plan, .. } => {
                Some(partial_plan.as_ref())
            }
            _ => None,
        }
    }
}
