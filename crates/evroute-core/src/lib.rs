//! EV route core: weather-aware segmentation and charging-stop planning.
//!
//! Everything here is synchronous and pure. I/O collaborators (geocoding,
//! directions, weather, station directory) live in other crates and hand
//! their results to [`plan_trip`].

pub mod anxiety;
pub mod assembler;
pub mod consumption;
pub mod error;
pub mod models;
pub mod planner;
pub mod polyline;
pub mod scheduler;
pub mod segmenter;
pub mod spatial;
pub mod stations;

pub use anxiety::{anxiety_index, AnxietyLevel};
pub use assembler::TripPlanAssembler;
pub use consumption::{ConsumptionModel, LinearWeatherModel, SegmentCost, WeatherFactors};
pub use error::PlanningError;
pub use models::{
    ChargingStation, ChargingStop, Coordinate, RouteGeometry, RouteSegment, TripPlan, TripRequest,
    VehicleState, WeatherSample,
};
pub use planner::{plan_trip, plan_trip_with_model};
pub use scheduler::{CancelFlag, ChargeStopScheduler, SchedulerConfig, SchedulerState};
pub use segmenter::{segment_route, NeutralWeather, SampledWeather, WeatherLookup};
pub use spatial::haversine_distance;
pub use stations::StationIndex;
