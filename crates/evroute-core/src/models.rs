//! Core data models for EV trip planning.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::anxiety::AnxietyLevel;
use crate::error::PlanningError;
use crate::polyline;
use crate::spatial::path_length;

/// Two consecutive geometry points closer than this (in degrees) are treated as identical.
const DUPLICATE_EPSILON_DEG: f64 = 1e-9;

pub const DEFAULT_MIN_SAFETY_PERCENT: f64 = 20.0;
pub const DEFAULT_TARGET_CHARGE_PERCENT: f64 = 80.0;

/// A WGS84 position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }

    pub fn approx_eq(&self, other: &Coordinate) -> bool {
        (self.lat - other.lat).abs() <= DUPLICATE_EPSILON_DEG
            && (self.lon - other.lon).abs() <= DUPLICATE_EPSILON_DEG
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.5},{:.5}", self.lat, self.lon)
    }
}

/// Ordered route polyline from origin to destination.
///
/// Always holds at least two points and never two consecutive identical ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Coordinate>", into = "Vec<Coordinate>")]
pub struct RouteGeometry {
    points: Vec<Coordinate>,
}

impl RouteGeometry {
    /// Build a geometry, collapsing consecutive duplicate points.
    pub fn new(points: Vec<Coordinate>) -> Result<Self, PlanningError> {
        if let Some(index) = points.iter().position(|point| !point.is_valid()) {
            return Err(PlanningError::InvalidGeometry(format!(
                "point {} is not a valid WGS84 coordinate",
                index
            )));
        }

        let mut deduped: Vec<Coordinate> = Vec::with_capacity(points.len());
        for point in points {
            if deduped.last().is_some_and(|last| last.approx_eq(&point)) {
                continue;
            }
            deduped.push(point);
        }

        if deduped.len() < 2 {
            return Err(PlanningError::EmptyRoute {
                points: deduped.len(),
            });
        }
        Ok(Self { points: deduped })
    }

    /// Decode a Google encoded polyline (precision 5).
    pub fn from_polyline(encoded: &str) -> Result<Self, PlanningError> {
        Self::new(polyline::decode(encoded)?)
    }

    pub fn points(&self) -> &[Coordinate] {
        &self.points
    }

    pub fn origin(&self) -> Coordinate {
        self.points[0]
    }

    pub fn destination(&self) -> Coordinate {
        self.points[self.points.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Total great-circle length in meters.
    pub fn length_m(&self) -> f64 {
        path_length(&self.points)
    }

    pub fn to_polyline(&self) -> String {
        polyline::encode(&self.points)
    }
}

impl TryFrom<Vec<Coordinate>> for RouteGeometry {
    type Error = PlanningError;

    fn try_from(points: Vec<Coordinate>) -> Result<Self, Self::Error> {
        Self::new(points)
    }
}

impl From<RouteGeometry> for Vec<Coordinate> {
    fn from(geometry: RouteGeometry) -> Self {
        geometry.points
    }
}

/// Weather observed (or forecast) at a point along the route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSample {
    pub temperature_c: f64,
    #[serde(default)]
    pub precipitation_mm: f64,
    #[serde(default)]
    pub wind_speed_kmh: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Coordinate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_at: Option<DateTime<Utc>>,
}

impl WeatherSample {
    pub fn new(temperature_c: f64, precipitation_mm: f64, wind_speed_kmh: f64) -> Self {
        Self {
            temperature_c,
            precipitation_mm,
            wind_speed_kmh,
            location: None,
            observed_at: None,
        }
    }

    /// Mild, dry and calm conditions used when no observation is available.
    pub fn neutral() -> Self {
        Self::new(20.0, 0.0, 0.0)
    }

    pub fn at(mut self, location: Coordinate) -> Self {
        self.location = Some(location);
        self
    }

    pub fn observed(mut self, observed_at: DateTime<Utc>) -> Self {
        self.observed_at = Some(observed_at);
        self
    }
}

impl Default for WeatherSample {
    fn default() -> Self {
        Self::neutral()
    }
}

/// Battery state and range model of the vehicle at departure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleState {
    pub battery_percent: f64,
    pub battery_capacity_kwh: f64,
    /// Range on a full battery at reference conditions
    pub nominal_range_km: f64,
    /// Battery level below which the vehicle must already have stopped to charge
    #[serde(default = "default_min_safety_percent")]
    pub min_safety_percent: f64,
    /// Battery level a charging stop fills up to
    #[serde(default = "default_target_charge_percent")]
    pub target_charge_percent: f64,
}

fn default_min_safety_percent() -> f64 {
    DEFAULT_MIN_SAFETY_PERCENT
}

fn default_target_charge_percent() -> f64 {
    DEFAULT_TARGET_CHARGE_PERCENT
}

impl VehicleState {
    pub fn new(battery_percent: f64, battery_capacity_kwh: f64, nominal_range_km: f64) -> Self {
        Self {
            battery_percent,
            battery_capacity_kwh,
            nominal_range_km,
            min_safety_percent: DEFAULT_MIN_SAFETY_PERCENT,
            target_charge_percent: DEFAULT_TARGET_CHARGE_PERCENT,
        }
    }

    pub fn with_thresholds(mut self, min_safety_percent: f64, target_charge_percent: f64) -> Self {
        self.min_safety_percent = min_safety_percent;
        self.target_charge_percent = target_charge_percent;
        self
    }

    pub fn validate(&self) -> Result<(), PlanningError> {
        let invalid = |reason: String| Err(PlanningError::InvalidVehicle(reason));

        if !(0.0..=100.0).contains(&self.battery_percent) {
            return invalid(format!(
                "battery_percent must be within [0, 100], got {}",
                self.battery_percent
            ));
        }
        if !(self.battery_capacity_kwh.is_finite() && self.battery_capacity_kwh > 0.0) {
            return invalid(format!(
                "battery_capacity_kwh must be positive, got {}",
                self.battery_capacity_kwh
            ));
        }
        if !(self.nominal_range_km.is_finite() && self.nominal_range_km > 0.0) {
            return invalid(format!(
                "nominal_range_km must be positive, got {}",
                self.nominal_range_km
            ));
        }
        if !(0.0..100.0).contains(&self.min_safety_percent) {
            return invalid(format!(
                "min_safety_percent must be within [0, 100), got {}",
                self.min_safety_percent
            ));
        }
        if !(self.target_charge_percent > self.min_safety_percent
            && self.target_charge_percent <= 100.0)
        {
            return invalid(format!(
                "target_charge_percent must be above min_safety_percent ({}) and at most 100, got {}",
                self.min_safety_percent, self.target_charge_percent
            ));
        }
        Ok(())
    }
}

/// A straight leg between two consecutive geometry points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteSegment {
    pub start: Coordinate,
    pub end: Coordinate,
    pub distance_m: f64,
    pub weather: WeatherSample,
    pub duration_s: f64,
    pub battery_cost_percent: f64,
}

/// Directory snapshot of a charging station. Never mutated by the planner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChargingStation {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    pub location: Coordinate,
    pub available: bool,
    pub power_kw: f64,
    #[serde(default)]
    pub price_per_kwh: f64,
}

impl ChargingStation {
    pub fn new(id: impl Into<String>, location: Coordinate, power_kw: f64) -> Self {
        Self {
            id: id.into(),
            name: None,
            address: None,
            location,
            available: true,
            power_kw,
            price_per_kwh: 0.0,
        }
    }

    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    pub fn with_price(mut self, price_per_kwh: f64) -> Self {
        self.price_per_kwh = price_per_kwh;
        self
    }

    /// Whether the station can actually deliver energy right now.
    pub fn is_usable(&self) -> bool {
        self.available && self.power_kw.is_finite() && self.power_kw > 0.0
    }
}

/// A charging stop emitted by the scheduler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChargingStop {
    pub station_id: String,
    pub station: ChargingStation,
    /// Index of the segment whose end triggered the stop
    pub arrival_order_index: usize,
    pub arrival_battery_percent: f64,
    pub departure_battery_percent: f64,
    pub charging_duration_s: f64,
    pub energy_added_kwh: f64,
    pub charging_cost: f64,
    /// Straight-line distance from the route point to the station
    pub detour_distance_m: f64,
    /// Seconds since departure when the vehicle plugs in
    pub arrival_offset_s: f64,
    pub departure_offset_s: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arrival_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub departure_at: Option<DateTime<Utc>>,
}

/// Final plan for one planning run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripPlan {
    pub segments: Vec<RouteSegment>,
    pub stops: Vec<ChargingStop>,
    pub total_distance_m: f64,
    pub travel_duration_s: f64,
    pub charging_duration_s: f64,
    /// Travel plus charging
    pub total_duration_s: f64,
    pub total_battery_consumed_percent: f64,
    pub final_battery_percent: f64,
    pub total_charging_cost: f64,
    pub anxiety_index: f64,
    pub anxiety_level: AnxietyLevel,
    pub advisory_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub departure_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arrival_at: Option<DateTime<Utc>>,
}

/// Everything one `plan_trip` run needs apart from the weather source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripRequest {
    pub geometry: RouteGeometry,
    pub vehicle: VehicleState,
    #[serde(default)]
    pub stations: Vec<ChargingStation>,
    #[serde(default)]
    pub departure_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub scheduler: crate::scheduler::SchedulerConfig,
}

impl TripRequest {
    pub fn new(geometry: RouteGeometry, vehicle: VehicleState) -> Self {
        Self {
            geometry,
            vehicle,
            stations: Vec::new(),
            departure_at: None,
            scheduler: Default::default(),
        }
    }

    pub fn with_stations(mut self, stations: Vec<ChargingStation>) -> Self {
        self.stations = stations;
        self
    }

    pub fn departing_at(mut self, departure_at: DateTime<Utc>) -> Self {
        self.departure_at = Some(departure_at);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn geometry_collapses_consecutive_duplicates() {
        let a = Coordinate::new(45.0, 5.0);
        let b = Coordinate::new(45.1, 5.1);
        let geometry = RouteGeometry::new(vec![a, a, b, b, a]).unwrap();
        assert_eq!(geometry.points(), &[a, b, a]);
        assert_eq!(geometry.origin(), a);
        assert_eq!(geometry.destination(), a);
    }

    #[test]
    fn geometry_rejects_single_point_routes() {
        let a = Coordinate::new(45.0, 5.0);
        let err = RouteGeometry::new(vec![a, a]).unwrap_err();
        assert!(matches!(err, PlanningError::EmptyRoute { points: 1 }));

        let err = RouteGeometry::new(Vec::new()).unwrap_err();
        assert!(matches!(err, PlanningError::EmptyRoute { points: 0 }));
    }

    #[test]
    fn geometry_rejects_out_of_range_coordinates() {
        let err = RouteGeometry::new(vec![Coordinate::new(45.0, 5.0), Coordinate::new(95.0, 5.0)])
            .unwrap_err();
        assert!(matches!(err, PlanningError::InvalidGeometry(_)));
    }

    #[test]
    fn geometry_deserializes_from_point_list() {
        let geometry: RouteGeometry =
            serde_json::from_str(r#"[{"lat": 1.0, "lon": 2.0}, {"lat": 1.5, "lon": 2.5}]"#).unwrap();
        assert_eq!(geometry.len(), 2);

        let err = serde_json::from_str::<RouteGeometry>(r#"[{"lat": 1.0, "lon": 2.0}]"#);
        assert!(err.is_err());
    }

    #[test]
    fn vehicle_defaults_apply_when_thresholds_omitted() {
        let vehicle: VehicleState = serde_json::from_str(
            r#"{"battery_percent": 90, "battery_capacity_kwh": 75, "nominal_range_km": 450}"#,
        )
        .unwrap();
        assert_eq!(vehicle.min_safety_percent, 20.0);
        assert_eq!(vehicle.target_charge_percent, 80.0);
        assert!(vehicle.validate().is_ok());
    }

    #[test]
    fn vehicle_validation_rejects_bad_parameters() {
        assert!(VehicleState::new(120.0, 75.0, 450.0).validate().is_err());
        assert!(VehicleState::new(50.0, 0.0, 450.0).validate().is_err());
        assert!(VehicleState::new(50.0, 75.0, -1.0).validate().is_err());
        assert!(VehicleState::new(50.0, 75.0, 450.0)
            .with_thresholds(30.0, 25.0)
            .validate()
            .is_err());
        assert!(VehicleState::new(50.0, 75.0, f64::NAN).validate().is_err());
    }

    #[test]
    fn station_usability_requires_power() {
        let location = Coordinate::new(45.0, 5.0);
        assert!(ChargingStation::new("a", location, 50.0).is_usable());
        assert!(!ChargingStation::new("b", location, 0.0).is_usable());
        assert!(!ChargingStation::new("c", location, 50.0).unavailable().is_usable());
    }
}
