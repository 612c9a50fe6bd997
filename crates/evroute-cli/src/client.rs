//! HTTP client for the trip planning server.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use evroute_core::{ChargingStation, Coordinate, TripPlan, VehicleState, WeatherSample};
use serde::{Deserialize, Serialize};

/// Request body for `POST /v1/trips/plan`.
#[derive(Debug, Clone, Serialize)]
pub struct PlanTripBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geometry: Option<Vec<Coordinate>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub polyline: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_address: Option<String>,
    pub vehicle: VehicleState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stations: Option<Vec<ChargingStation>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weather: Option<Vec<WeatherSample>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub departure_at: Option<DateTime<Utc>>,
}

impl PlanTripBody {
    pub fn between_addresses(
        origin: impl Into<String>,
        destination: impl Into<String>,
        vehicle: VehicleState,
    ) -> Self {
        Self {
            geometry: None,
            polyline: None,
            origin_address: Some(origin.into()),
            destination_address: Some(destination.into()),
            vehicle,
            stations: None,
            weather: None,
            departure_at: None,
        }
    }
}

/// Error body returned by the server.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(default)]
    pub partial_plan: Option<TripPlan>,
}

#[derive(Debug, Clone)]
pub enum PlanOutcome {
    Planned(TripPlan),
    Rejected { status: u16, error: ErrorResponse },
}

/// Client for the planning server.
pub struct PlannerClient {
    base_url: String,
    client: reqwest::Client,
}

impl PlannerClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Submit a plan request. Planning failures come back as [`PlanOutcome::Rejected`];
    /// only transport problems and unreadable bodies are errors.
    pub async fn plan(&self, body: &PlanTripBody) -> Result<PlanOutcome> {
        let url = format!("{}/v1/trips/plan", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .with_context(|| format!("Failed to reach {}", url))?;

        let status = response.status();
        let request_id = response
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        tracing::debug!(status = status.as_u16(), request_id = ?request_id, "Plan response");

        if status.is_success() {
            let plan: TripPlan = response.json().await.context("Invalid trip plan body")?;
            return Ok(PlanOutcome::Planned(plan));
        }
        let error: ErrorResponse = response
            .json()
            .await
            .with_context(|| format!("Server returned {} without an error body", status))?;
        Ok(PlanOutcome::Rejected {
            status: status.as_u16(),
            error,
        })
    }
}
