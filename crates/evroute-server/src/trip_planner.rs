//! Resolves a plan request against the collaborators and runs the planner.
//!
//! Route geometry comes from one of three sources: explicit points, an
//! encoded polyline, or an origin/destination address pair that is geocoded
//! and routed. Weather and stations are taken from the request when given,
//! otherwise prefetched concurrently along the route. The simulation then
//! runs on the blocking pool under a wall-clock budget.

use chrono::{DateTime, Utc};
use evroute_core::{
    plan_trip, CancelFlag, ChargingStation, Coordinate, PlanningError, RouteGeometry,
    SampledWeather, SchedulerConfig, TripPlan, TripRequest, VehicleState, WeatherSample,
};
use evroute_services::route::{sample_weather, stations_along};
use evroute_services::{DirectionsProvider, Geocoder};
use serde::Deserialize;

use crate::api::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Clone, Deserialize)]
pub struct PlanTripRequest {
    #[serde(default)]
    pub geometry: Option<Vec<Coordinate>>,
    #[serde(default)]
    pub polyline: Option<String>,
    #[serde(default)]
    pub origin_address: Option<String>,
    #[serde(default)]
    pub destination_address: Option<String>,
    pub vehicle: VehicleState,
    /// Skip the station directory and plan against these stations only
    #[serde(default)]
    pub stations: Option<Vec<ChargingStation>>,
    /// Skip the weather provider; samples must carry a location
    #[serde(default)]
    pub weather: Option<Vec<WeatherSample>>,
    #[serde(default)]
    pub departure_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub station_search_radius_m: Option<f64>,
}

enum RouteSource {
    Points(Vec<Coordinate>),
    Polyline(String),
    Addresses { origin: String, destination: String },
}

impl PlanTripRequest {
    fn route_source(&self) -> Result<RouteSource, ApiError> {
        let addresses = match (&self.origin_address, &self.destination_address) {
            (Some(origin), Some(destination)) => Some((origin.trim(), destination.trim())),
            (None, None) => None,
            _ => {
                return Err(ApiError::BadRequest(
                    "origin_address and destination_address must be given together".into(),
                ))
            }
        };

        match (&self.geometry, &self.polyline, addresses) {
            (Some(points), None, None) => Ok(RouteSource::Points(points.clone())),
            (None, Some(encoded), None) => Ok(RouteSource::Polyline(encoded.clone())),
            (None, None, Some((origin, destination))) => {
                if origin.is_empty() || destination.is_empty() {
                    return Err(ApiError::BadRequest("addresses must not be blank".into()));
                }
                Ok(RouteSource::Addresses {
                    origin: origin.to_string(),
                    destination: destination.to_string(),
                })
            }
            (None, None, None) => Err(ApiError::BadRequest(
                "one of geometry, polyline or origin_address/destination_address is required"
                    .into(),
            )),
            _ => Err(ApiError::BadRequest(
                "geometry, polyline and addresses are mutually exclusive".into(),
            )),
        }
    }

    /// Scheduler settings; the search radius defaults to `default_radius_m`.
    fn scheduler_config(&self, default_radius_m: f64) -> Result<SchedulerConfig, ApiError> {
        let station_search_radius_m = match self.station_search_radius_m {
            Some(radius) if !radius.is_finite() || radius <= 0.0 => {
                return Err(ApiError::BadRequest(
                    "station_search_radius_m must be positive".into(),
                ))
            }
            Some(radius) => radius,
            None => default_radius_m,
        };
        Ok(SchedulerConfig {
            station_search_radius_m,
        })
    }
}

async fn resolve_geometry(state: &AppState, source: RouteSource) -> Result<RouteGeometry, ApiError> {
    match source {
        RouteSource::Points(points) => Ok(RouteGeometry::new(points)?),
        RouteSource::Polyline(encoded) => Ok(RouteGeometry::from_polyline(&encoded)?),
        RouteSource::Addresses {
            origin,
            destination,
        } => {
            let (from, to) = tokio::try_join!(
                state.maps.geocode(&origin),
                state.maps.geocode(&destination)
            )
            .map_err(|err| err.into_planning_error("geocoder"))?;
            tracing::debug!(%from, %to, "Resolved addresses");
            let geometry = state
                .maps
                .directions(from, to)
                .await
                .map_err(|err| err.into_planning_error("directions"))?;
            Ok(geometry)
        }
    }
}

/// Plan a trip end to end.
pub async fn plan(state: &AppState, request: PlanTripRequest) -> Result<TripPlan, ApiError> {
    // Cheap checks first so bad input never costs an upstream call
    request.vehicle.validate()?;
    let config = state.config();
    let scheduler = request.scheduler_config(config.station_radius_m)?;
    let source = request.route_source()?;

    let geometry = resolve_geometry(state, source).await?;
    let concurrency = config.prefetch_concurrency.max(1);

    let weather_fut = async {
        match &request.weather {
            Some(samples) => SampledWeather::new(samples.iter().cloned()),
            None => {
                let points = geometry.points();
                let starts = &points[..points.len() - 1];
                sample_weather(&state.weather, starts, concurrency).await
            }
        }
    };
    let stations_fut = async {
        match &request.stations {
            Some(stations) => Ok(stations.clone()),
            None => stations_along(
                &state.stations,
                &geometry,
                config.station_sample_spacing_m,
                scheduler.station_search_radius_m,
                concurrency,
            )
            .await
            .map_err(|err| err.into_planning_error("stations")),
        }
    };
    let (weather, stations) = tokio::join!(weather_fut, stations_fut);
    let stations = stations?;

    tracing::info!(
        points = geometry.len(),
        length_km = geometry.length_m() / 1000.0,
        stations = stations.len(),
        weather_samples = weather.len(),
        "Planning trip"
    );

    let mut trip = TripRequest::new(geometry, request.vehicle).with_stations(stations);
    trip.departure_at = request.departure_at;
    trip.scheduler = scheduler;

    let plan = run_with_budget(trip, weather, config.plan_timeout()).await?;
    tracing::info!(
        stops = plan.stops.len(),
        final_battery = plan.final_battery_percent,
        anxiety = plan.anxiety_level.label(),
        "Trip planned"
    );
    Ok(plan)
}

/// Run the simulation on the blocking pool; raise the cancel flag once the budget is spent.
async fn run_with_budget(
    trip: TripRequest,
    weather: SampledWeather,
    budget: std::time::Duration,
) -> Result<TripPlan, ApiError> {
    let cancel = CancelFlag::new();
    let worker_cancel = cancel.clone();
    let mut handle =
        tokio::task::spawn_blocking(move || plan_trip(&trip, &weather, Some(&worker_cancel)));

    let joined = match tokio::time::timeout(budget, &mut handle).await {
        Ok(joined) => joined,
        Err(_) => {
            tracing::warn!(budget_ms = budget.as_millis() as u64, "Planning budget exceeded, cancelling");
            cancel.cancel();
            handle.await
        }
    };

    let outcome = joined.map_err(|err| ApiError::Internal(format!("planner task failed: {err}")))?;
    outcome.map_err(|err| {
        if let PlanningError::InsufficientChargingInfrastructure { at, battery_percent, .. } = &err {
            tracing::info!(%at, battery_percent, "No reachable charging station");
        }
        ApiError::from(err)
    })
}
