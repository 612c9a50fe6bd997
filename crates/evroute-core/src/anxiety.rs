//! Range-anxiety index for a finished plan.

use serde::{Deserialize, Serialize};

use crate::models::VehicleState;

/// Five-step scale shown next to the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnxietyLevel {
    VeryCalm,
    Calm,
    SlightlyWorried,
    Anxious,
    VeryAnxious,
}

impl AnxietyLevel {
    pub fn from_index(index: f64) -> Self {
        match index {
            i if i <= 20.0 => Self::VeryCalm,
            i if i <= 40.0 => Self::Calm,
            i if i <= 60.0 => Self::SlightlyWorried,
            i if i <= 80.0 => Self::Anxious,
            _ => Self::VeryAnxious,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::VeryCalm => "very calm",
            Self::Calm => "calm",
            Self::SlightlyWorried => "slightly worried",
            Self::Anxious => "anxious",
            Self::VeryAnxious => "very anxious",
        }
    }
}

/// Anxiety index in [0, 100] given the battery left on arrival.
///
/// Starts from how empty the battery is, then adds 30 when the remaining
/// charge would not cover the trip distance again at nominal range and 40
/// when it is below the safety margin.
pub fn anxiety_index(final_battery_percent: f64, total_distance_m: f64, vehicle: &VehicleState) -> f64 {
    let remaining = final_battery_percent.clamp(0.0, 100.0);
    let mut index = 100.0 * (1.0 - remaining / 100.0);

    let trip_percent = total_distance_m / 1000.0 / vehicle.nominal_range_km * 100.0;
    if remaining < trip_percent {
        index += 30.0;
    }
    if remaining < vehicle.min_safety_percent {
        index += 40.0;
    }
    index.clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_battery_on_short_trip_is_calm() {
        let vehicle = VehicleState::new(100.0, 75.0, 500.0);
        let index = anxiety_index(95.0, 10_000.0, &vehicle);
        assert!((index - 5.0).abs() < 1e-9);
        assert_eq!(AnxietyLevel::from_index(index), AnxietyLevel::VeryCalm);
    }

    #[test]
    fn low_arrival_charge_saturates() {
        let vehicle = VehicleState::new(100.0, 75.0, 500.0);
        let index = anxiety_index(10.0, 300_000.0, &vehicle);
        assert_eq!(index, 100.0);
        assert_eq!(AnxietyLevel::from_index(index), AnxietyLevel::VeryAnxious);
    }

    #[test]
    fn insufficient_reserve_adds_penalty() {
        let vehicle = VehicleState::new(100.0, 75.0, 500.0);
        // 60% left, trip would need 80% again: 40 + 30
        let index = anxiety_index(60.0, 400_000.0, &vehicle);
        assert!((index - 70.0).abs() < 1e-9);
        assert_eq!(AnxietyLevel::from_index(index), AnxietyLevel::Anxious);
    }
}
