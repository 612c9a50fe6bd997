//! HTTP adapters for the collaborators a trip plan depends on.
//!
//! Each provider is a small async trait with one reqwest-backed client:
//! - [`MapsClient`]: geocoding and driving directions
//! - [`WeatherClient`]: current conditions, cached per grid cell
//! - [`StationClient`]: charging stations near a point
//!
//! All clients share the same [`RetryPolicy`] semantics.

use std::future::Future;

use evroute_core::{ChargingStation, Coordinate, RouteGeometry, WeatherSample};

pub mod cache;
pub mod error;
pub mod maps;
pub mod retry;
pub mod route;
pub mod stations;
pub mod weather;

pub use cache::WeatherCache;
pub use error::ServiceError;
pub use maps::MapsClient;
pub use retry::{Backoff, RetryPolicy};
pub use route::{sample_weather, stations_along};
pub use stations::StationClient;
pub use weather::WeatherClient;

pub trait Geocoder: Send + Sync {
    fn geocode(&self, address: &str)
        -> impl Future<Output = Result<Coordinate, ServiceError>> + Send;
}

pub trait DirectionsProvider: Send + Sync {
    /// Driving route between two points, decoded from the overview polyline.
    fn directions(
        &self,
        origin: Coordinate,
        destination: Coordinate,
    ) -> impl Future<Output = Result<RouteGeometry, ServiceError>> + Send;
}

pub trait WeatherProvider: Send + Sync {
    fn current(&self, point: Coordinate)
        -> impl Future<Output = Result<WeatherSample, ServiceError>> + Send;
}

pub trait StationDirectory: Send + Sync {
    fn stations_near(
        &self,
        point: Coordinate,
        radius_m: f64,
    ) -> impl Future<Output = Result<Vec<ChargingStation>, ServiceError>> + Send;
}
