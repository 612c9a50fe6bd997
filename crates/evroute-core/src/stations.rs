//! Read-only proximity queries over a charging-station snapshot.

use std::cmp::Ordering;

use crate::models::{ChargingStation, Coordinate};
use crate::spatial::haversine_distance;

/// A station together with its distance from the query point.
#[derive(Debug, Clone, Copy)]
pub struct StationMatch<'a> {
    pub station: &'a ChargingStation,
    pub distance_m: f64,
}

impl StationMatch<'_> {
    fn cmp_by_distance(&self, other: &Self) -> Ordering {
        self.distance_m
            .total_cmp(&other.distance_m)
            .then_with(|| self.station.id.cmp(&other.station.id))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct StationIndex<'a> {
    stations: &'a [ChargingStation],
}

impl<'a> StationIndex<'a> {
    pub fn new(stations: &'a [ChargingStation]) -> Self {
        Self { stations }
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    /// Closest usable station within `max_radius_m`; ties go to the lowest id.
    pub fn nearest_available(
        &self,
        point: Coordinate,
        max_radius_m: f64,
    ) -> Option<StationMatch<'a>> {
        self.candidates(point, max_radius_m)
            .min_by(StationMatch::cmp_by_distance)
    }

    fn candidates(
        &self,
        point: Coordinate,
        radius_m: f64,
    ) -> impl Iterator<Item = StationMatch<'a>> + 'a {
        self.stations
            .iter()
            .filter(|station| station.is_usable())
            .map(move |station| StationMatch {
                station,
                distance_m: haversine_distance(point, station.location),
            })
            .filter(move |candidate| candidate.distance_m <= radius_m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn station(id: &str, lat: f64, lon: f64) -> ChargingStation {
        ChargingStation::new(id, Coordinate::new(lat, lon), 150.0)
    }

    #[test]
    fn picks_closest_available_station() {
        let stations = vec![
            station("far", 45.02, 5.0),
            station("near", 45.005, 5.0),
            station("closest-but-busy", 45.001, 5.0).unavailable(),
        ];
        let index = StationIndex::new(&stations);
        let found = index
            .nearest_available(Coordinate::new(45.0, 5.0), 5_000.0)
            .expect("station in range");
        assert_eq!(found.station.id, "near");
        assert!(found.distance_m < 600.0);
    }

    #[test]
    fn ties_break_on_lowest_id() {
        let stations = vec![station("b", 45.01, 5.0), station("a", 45.01, 5.0)];
        let found = StationIndex::new(&stations)
            .nearest_available(Coordinate::new(45.0, 5.0), 5_000.0)
            .unwrap();
        assert_eq!(found.station.id, "a");
    }

    #[test]
    fn respects_search_radius() {
        let stations = vec![station("out-of-range", 45.1, 5.0)];
        let index = StationIndex::new(&stations);
        assert!(index
            .nearest_available(Coordinate::new(45.0, 5.0), 5_000.0)
            .is_none());
        assert!(index
            .nearest_available(Coordinate::new(45.0, 5.0), 20_000.0)
            .is_some());
    }

    #[test]
    fn empty_catalog_yields_none() {
        let index = StationIndex::new(&[]);
        assert!(index.is_empty());
        assert!(index
            .nearest_available(Coordinate::new(0.0, 0.0), 5_000.0)
            .is_none());
    }
}
