//! Spherical distance and bearing math.

use crate::models::Coordinate;

pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance between two points in meters (Haversine formula).
pub fn haversine_distance(a: Coordinate, b: Coordinate) -> f64 {
    let phi1 = a.lat.to_radians();
    let phi2 = b.lat.to_radians();
    let dphi = (b.lat - a.lat).to_radians();
    let dlambda = (b.lon - a.lon).to_radians();
    let h = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    let h = h.clamp(0.0, 1.0);
    2.0 * EARTH_RADIUS_M * h.sqrt().atan2((1.0 - h).sqrt())
}

/// Initial bearing from `a` towards `b` in degrees, normalized to [0, 360).
pub fn bearing(a: Coordinate, b: Coordinate) -> f64 {
    let start_lat = a.lat.to_radians();
    let end_lat = b.lat.to_radians();
    let d_lon = (b.lon - a.lon).to_radians();

    let y = d_lon.sin() * end_lat.cos();
    let x = start_lat.cos() * end_lat.sin() - start_lat.sin() * end_lat.cos() * d_lon.cos();

    (y.atan2(x).to_degrees() + 360.0) % 360.0
}

/// Sum of haversine distances along a polyline. Zero for fewer than two points.
pub fn path_length(points: &[Coordinate]) -> f64 {
    points
        .windows(2)
        .map(|pair| haversine_distance(pair[0], pair[1]))
        .sum()
}

/// Point reached after traveling `distance_m` from `origin` along a great circle.
pub fn destination_point(origin: Coordinate, bearing_deg: f64, distance_m: f64) -> Coordinate {
    let delta = distance_m / EARTH_RADIUS_M;
    let theta = bearing_deg.to_radians();
    let phi1 = origin.lat.to_radians();
    let lambda1 = origin.lon.to_radians();

    let phi2 = (phi1.sin() * delta.cos() + phi1.cos() * delta.sin() * theta.cos()).asin();
    let lambda2 = lambda1
        + (theta.sin() * delta.sin() * phi1.cos()).atan2(delta.cos() - phi1.sin() * phi2.sin());

    let lon = (lambda2.to_degrees() + 540.0) % 360.0 - 180.0;
    Coordinate::new(phi2.to_degrees(), lon)
}

/// Points spaced roughly `spacing_m` apart along a polyline, always including both ends.
pub fn sample_along(points: &[Coordinate], spacing_m: f64) -> Vec<Coordinate> {
    let Some(&first) = points.first() else {
        return Vec::new();
    };
    let spacing_m = spacing_m.max(1.0);
    let mut samples = vec![first];
    let mut since_last = 0.0;

    for pair in points.windows(2) {
        let leg = haversine_distance(pair[0], pair[1]);
        let heading = bearing(pair[0], pair[1]);
        let mut travelled = 0.0;
        while since_last + (leg - travelled) >= spacing_m {
            travelled += spacing_m - since_last;
            samples.push(destination_point(pair[0], heading, travelled));
            since_last = 0.0;
        }
        since_last += leg - travelled;
    }

    if let Some(&last) = points.last() {
        if samples.last().is_some_and(|sample| haversine_distance(*sample, last) > 1.0) {
            samples.push(last);
        }
    }
    samples
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_haversine_known_distance() {
        // ~111km between these points (1 degree latitude)
        let dist = haversine_distance(Coordinate::new(0.0, 0.0), Coordinate::new(1.0, 0.0));
        assert!((dist - 111_195.0).abs() < 100.0);
    }

    #[test]
    fn test_haversine_same_point() {
        let point = Coordinate::new(33.6846, -117.8265);
        assert_eq!(haversine_distance(point, point), 0.0);
    }

    #[test]
    fn bearing_points_east_along_equator() {
        let heading = bearing(Coordinate::new(0.0, 0.0), Coordinate::new(0.0, 1.0));
        assert!((heading - 90.0).abs() < 1e-9);
    }

    #[test]
    fn destination_point_round_trips_distance() {
        let origin = Coordinate::new(48.8566, 2.3522);
        let target = destination_point(origin, 135.0, 25_000.0);
        assert!((haversine_distance(origin, target) - 25_000.0).abs() < 1.0);
    }

    #[test]
    fn sample_along_includes_both_ends() {
        let points = [Coordinate::new(0.0, 0.0), Coordinate::new(0.0, 1.0)];
        let samples = sample_along(&points, 30_000.0);
        assert_eq!(samples.first(), Some(&points[0]));
        assert_eq!(samples.last(), Some(&points[1]));
        // 111 km at 30 km spacing: start, 30, 60, 90, end
        assert_eq!(samples.len(), 5);
    }

    #[test]
    fn path_length_of_short_paths_is_zero() {
        assert_eq!(path_length(&[]), 0.0);
        assert_eq!(path_length(&[Coordinate::new(45.0, 5.0)]), 0.0);
    }

    fn valid_coord() -> impl Strategy<Value = Coordinate> {
        (-90.0..=90.0, -180.0..=180.0).prop_map(|(lat, lon)| Coordinate::new(lat, lon))
    }

    proptest! {
        #[test]
        fn prop_haversine_symmetric(a in valid_coord(), b in valid_coord()) {
            prop_assert!((haversine_distance(a, b) - haversine_distance(b, a)).abs() < 1e-6);
        }

        #[test]
        fn prop_haversine_bounded(a in valid_coord(), b in valid_coord()) {
            let dist = haversine_distance(a, b);
            prop_assert!(dist >= 0.0);
            prop_assert!(dist <= std::f64::consts::PI * EARTH_RADIUS_M + 1.0);
        }

        #[test]
        fn prop_path_length_is_additive(
            head in prop::collection::vec(valid_coord(), 2..5),
            tail in prop::collection::vec(valid_coord(), 2..5)
        ) {
            let mut combined = head.clone();
            combined.extend_from_slice(&tail);
            let link = haversine_distance(head[head.len() - 1], tail[0]);
            let expected = path_length(&head) + link + path_length(&tail);
            prop_assert!((path_length(&combined) - expected).abs() < 1e-3);
        }
    }
}
