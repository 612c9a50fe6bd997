//! Route-wide prefetch of weather and station data.
//!
//! Planning itself is synchronous, so everything the simulation needs is
//! gathered up front with bounded concurrency and handed over as plain data.

use std::collections::BTreeMap;

use evroute_core::spatial::sample_along;
use evroute_core::{ChargingStation, Coordinate, RouteGeometry, SampledWeather, WeatherSample};
use futures::stream::{self, StreamExt, TryStreamExt};

use crate::error::ServiceError;
use crate::{StationDirectory, WeatherProvider};

pub const DEFAULT_CONCURRENCY: usize = 8;

/// Current weather at every point, in input order.
///
/// A failed lookup degrades to the neutral sample at that point so one flaky
/// call does not sink the plan.
pub async fn sample_weather<P>(provider: &P, points: &[Coordinate], concurrency: usize) -> SampledWeather
where
    P: WeatherProvider,
{
    let samples: Vec<WeatherSample> = stream::iter(points.iter().copied())
        .map(|point| async move {
            match provider.current(point).await {
                Ok(sample) => sample.at(point),
                Err(err) => {
                    tracing::warn!(%point, "Weather lookup failed, assuming neutral conditions: {}", err);
                    WeatherSample::neutral().at(point)
                }
            }
        })
        .buffered(concurrency.max(1))
        .collect()
        .await;
    SampledWeather::new(samples)
}

/// Every station the scheduler could pick along the route.
///
/// Probes are sampled every `spacing_m` along the path, so any route point is
/// within `spacing_m / 2` of a probe. Each probe queries `search_radius_m`
/// plus that slack, which covers a `search_radius_m` circle around every
/// segment end. Results are de-duplicated by id and ordered by id. Any failed
/// query fails the whole lookup.
pub async fn stations_along<D>(
    directory: &D,
    geometry: &RouteGeometry,
    spacing_m: f64,
    search_radius_m: f64,
    concurrency: usize,
) -> Result<Vec<ChargingStation>, ServiceError>
where
    D: StationDirectory,
{
    let spacing_m = spacing_m.max(1.0);
    let probes = sample_along(geometry.points(), spacing_m);
    let query_radius_m = search_radius_m + spacing_m / 2.0;
    tracing::debug!(probes = probes.len(), query_radius_m, "Querying stations along route");

    let batches: Vec<Vec<ChargingStation>> = stream::iter(probes)
        .map(|point| directory.stations_near(point, query_radius_m))
        .buffered(concurrency.max(1))
        .try_collect()
        .await?;

    let mut by_id: BTreeMap<String, ChargingStation> = BTreeMap::new();
    for station in batches.into_iter().flatten() {
        by_id.entry(station.id.clone()).or_insert(station);
    }
    Ok(by_id.into_values().collect())
}
