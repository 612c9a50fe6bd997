//! Decomposes a route into segments with per-segment weather.

use crate::consumption::ConsumptionModel;
use crate::error::PlanningError;
use crate::models::{Coordinate, RouteSegment, VehicleState, WeatherSample};
use crate::spatial::haversine_distance;

/// Source of weather samples for segment start points.
///
/// Lookups are infallible: an adapter that cannot reach its provider should
/// answer with [`WeatherSample::neutral`].
pub trait WeatherLookup {
    fn weather_at(&self, point: Coordinate) -> WeatherSample;
}

impl<F> WeatherLookup for F
where
    F: Fn(Coordinate) -> WeatherSample,
{
    fn weather_at(&self, point: Coordinate) -> WeatherSample {
        self(point)
    }
}

/// Always answers with the neutral sample.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeutralWeather;

impl WeatherLookup for NeutralWeather {
    fn weather_at(&self, point: Coordinate) -> WeatherSample {
        WeatherSample::neutral().at(point)
    }
}

/// Prefetched samples; each lookup returns the geographically nearest one.
#[derive(Debug, Clone, Default)]
pub struct SampledWeather {
    samples: Vec<(Coordinate, WeatherSample)>,
}

impl SampledWeather {
    /// Samples without a location are ignored.
    pub fn new(samples: impl IntoIterator<Item = WeatherSample>) -> Self {
        let samples = samples
            .into_iter()
            .filter_map(|sample| sample.location.map(|location| (location, sample)))
            .collect();
        Self { samples }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

impl WeatherLookup for SampledWeather {
    fn weather_at(&self, point: Coordinate) -> WeatherSample {
        let mut best: Option<(f64, &WeatherSample)> = None;
        for (location, sample) in &self.samples {
            let distance = haversine_distance(point, *location);
            if best.map_or(true, |(best_distance, _)| distance < best_distance) {
                best = Some((distance, sample));
            }
        }
        best.map(|(_, sample)| sample.clone())
            .unwrap_or_else(|| WeatherSample::neutral().at(point))
    }
}

/// Build one segment per consecutive pair of points.
///
/// Weather is looked up exactly once per segment, at its start point.
pub fn segment_route<W, M>(
    points: &[Coordinate],
    weather: &W,
    model: &M,
    vehicle: &VehicleState,
) -> Result<Vec<RouteSegment>, PlanningError>
where
    W: WeatherLookup + ?Sized,
    M: ConsumptionModel + ?Sized,
{
    if points.len() < 2 {
        return Err(PlanningError::EmptyRoute {
            points: points.len(),
        });
    }

    let segments = points
        .windows(2)
        .map(|pair| {
            let (start, end) = (pair[0], pair[1]);
            let distance_m = haversine_distance(start, end);
            let sample = weather.weather_at(start);
            let cost = model.segment_cost(distance_m, &sample, vehicle);
            RouteSegment {
                start,
                end,
                distance_m,
                weather: sample,
                duration_s: cost.duration_s,
                battery_cost_percent: cost.battery_cost_percent,
            }
        })
        .collect();
    Ok(segments)
}
