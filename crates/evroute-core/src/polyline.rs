//! Encoded polyline codec (Google "overview_polyline" format, precision 5).

use crate::error::PlanningError;
use crate::models::Coordinate;

const PRECISION: f64 = 1e5;

pub fn decode(encoded: &str) -> Result<Vec<Coordinate>, PlanningError> {
    let bytes = encoded.trim().as_bytes();
    let mut index = 0usize;
    let mut lat = 0i64;
    let mut lon = 0i64;
    let mut points = Vec::new();

    while index < bytes.len() {
        lat = accumulate(lat, next_value(bytes, &mut index)?, index)?;
        lon = accumulate(lon, next_value(bytes, &mut index)?, index)?;
        points.push(Coordinate::new(lat as f64 / PRECISION, lon as f64 / PRECISION));
    }
    Ok(points)
}

pub fn encode(points: &[Coordinate]) -> String {
    let mut out = String::with_capacity(points.len() * 8);
    let mut prev_lat = 0i64;
    let mut prev_lon = 0i64;
    for point in points {
        let lat = (point.lat * PRECISION).round() as i64;
        let lon = (point.lon * PRECISION).round() as i64;
        encode_value(lat - prev_lat, &mut out);
        encode_value(lon - prev_lon, &mut out);
        prev_lat = lat;
        prev_lon = lon;
    }
    out
}

fn accumulate(total: i64, delta: i64, index: usize) -> Result<i64, PlanningError> {
    total.checked_add(delta).ok_or_else(|| {
        PlanningError::InvalidGeometry(format!("polyline coordinate overflows at byte {}", index))
    })
}

fn next_value(bytes: &[u8], index: &mut usize) -> Result<i64, PlanningError> {
    let mut result = 0i64;
    let mut shift = 0u32;
    loop {
        let byte = *bytes.get(*index).ok_or_else(|| {
            PlanningError::InvalidGeometry(format!("polyline truncated at byte {}", *index))
        })?;
        if !(63..=126).contains(&byte) {
            return Err(PlanningError::InvalidGeometry(format!(
                "invalid polyline character {:?} at byte {}",
                byte as char, *index
            )));
        }
        if shift > 55 {
            return Err(PlanningError::InvalidGeometry(format!(
                "polyline value too long at byte {}",
                *index
            )));
        }
        *index += 1;

        let chunk = i64::from(byte - 63);
        result |= (chunk & 0x1f) << shift;
        shift += 5;
        if chunk < 0x20 {
            break;
        }
    }

    Ok(if result & 1 == 1 {
        !(result >> 1)
    } else {
        result >> 1
    })
}

fn encode_value(value: i64, out: &mut String) {
    let mut value = if value < 0 { !(value << 1) } else { value << 1 };
    while value >= 0x20 {
        out.push(char::from((0x20 | (value & 0x1f)) as u8 + 63));
        value >>= 5;
    }
    out.push(char::from(value as u8 + 63));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_reference_polyline() {
        let points = decode("_p~iF~ps|U_ulLnnqC_mqNvxq`@").unwrap();
        let expected = [(38.5, -120.2), (40.7, -120.95), (43.252, -126.453)];
        assert_eq!(points.len(), expected.len());
        for (point, (lat, lon)) in points.iter().zip(expected) {
            assert!((point.lat - lat).abs() < 1e-9);
            assert!((point.lon - lon).abs() < 1e-9);
        }
    }

    #[test]
    fn encodes_reference_polyline() {
        let points = [
            Coordinate::new(38.5, -120.2),
            Coordinate::new(40.7, -120.95),
            Coordinate::new(43.252, -126.453),
        ];
        assert_eq!(encode(&points), "_p~iF~ps|U_ulLnnqC_mqNvxq`@");
    }

    #[test]
    fn empty_polyline_decodes_to_no_points() {
        assert!(decode("").unwrap().is_empty());
    }

    #[test]
    fn truncated_polyline_is_rejected() {
        // Continuation bit set on the final byte
        let err = decode("_p~iF~ps|").unwrap_err();
        assert!(matches!(err, PlanningError::InvalidGeometry(_)));
    }

    #[test]
    fn overflowing_deltas_are_rejected() {
        // Each 12-byte group decodes to a delta of -2^59; sixteen of them leave i64
        let err = decode(&"~~~~~~~~~~~^".repeat(64)).unwrap_err();
        assert!(matches!(err, PlanningError::InvalidGeometry(_)));
    }

    #[test]
    fn out_of_alphabet_bytes_are_rejected() {
        assert!(decode("_p~iF ~ps|U").is_err());
    }
}
