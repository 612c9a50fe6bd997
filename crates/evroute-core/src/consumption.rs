//! Weather-adjusted energy and travel-time model.
//!
//! The default model is linear in distance with heuristic weather
//! multipliers. It sits behind [`ConsumptionModel`] so a different model can
//! be plugged into the segmenter without touching the scheduler.

use serde::{Deserialize, Serialize};

use crate::models::{VehicleState, WeatherSample};

/// Energy and time cost of driving one segment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SegmentCost {
    /// Share of a full battery consumed, not clamped
    pub battery_cost_percent: f64,
    pub duration_s: f64,
}

pub trait ConsumptionModel: Send + Sync {
    fn segment_cost(
        &self,
        distance_m: f64,
        weather: &WeatherSample,
        vehicle: &VehicleState,
    ) -> SegmentCost;
}

/// Thresholds and multipliers of the weather heuristic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherFactors {
    pub hot_threshold_c: f64,
    pub hot_multiplier: f64,
    pub cold_threshold_c: f64,
    pub cold_multiplier: f64,
    pub precipitation_multiplier: f64,
    pub wind_threshold_kmh: f64,
    pub wind_multiplier: f64,
    pub base_speed_kmh: f64,
    pub precipitation_speed_factor: f64,
    pub wind_speed_factor: f64,
}

impl Default for WeatherFactors {
    fn default() -> Self {
        Self {
            hot_threshold_c: 30.0,
            hot_multiplier: 1.20,
            cold_threshold_c: 5.0,
            cold_multiplier: 1.30,
            precipitation_multiplier: 1.10,
            wind_threshold_kmh: 20.0,
            wind_multiplier: 1.15,
            base_speed_kmh: 60.0,
            precipitation_speed_factor: 0.80,
            wind_speed_factor: 0.90,
        }
    }
}

/// Which weather thresholds a sample crosses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeatherConditions {
    pub hot: bool,
    pub cold: bool,
    pub wet: bool,
    pub windy: bool,
}

impl WeatherConditions {
    pub fn any(&self) -> bool {
        self.hot || self.cold || self.wet || self.windy
    }

    pub fn merge(self, other: WeatherConditions) -> Self {
        Self {
            hot: self.hot || other.hot,
            cold: self.cold || other.cold,
            wet: self.wet || other.wet,
            windy: self.windy || other.windy,
        }
    }
}

impl WeatherFactors {
    pub fn conditions(&self, weather: &WeatherSample) -> WeatherConditions {
        WeatherConditions {
            hot: weather.temperature_c > self.hot_threshold_c,
            cold: weather.temperature_c < self.cold_threshold_c,
            wet: weather.precipitation_mm > 0.0,
            windy: weather.wind_speed_kmh > self.wind_threshold_kmh,
        }
    }

    /// Compounded energy multiplier for a sample.
    pub fn energy_multiplier(&self, weather: &WeatherSample) -> f64 {
        let conditions = self.conditions(weather);
        let mut multiplier = 1.0;
        if conditions.hot {
            multiplier *= self.hot_multiplier;
        } else if conditions.cold {
            multiplier *= self.cold_multiplier;
        }
        if conditions.wet {
            multiplier *= self.precipitation_multiplier;
        }
        if conditions.windy {
            multiplier *= self.wind_multiplier;
        }
        multiplier
    }

    /// Cruising speed after weather slow-downs.
    pub fn speed_kmh(&self, weather: &WeatherSample) -> f64 {
        let conditions = self.conditions(weather);
        let mut speed = self.base_speed_kmh;
        if conditions.wet {
            speed *= self.precipitation_speed_factor;
        }
        if conditions.windy {
            speed *= self.wind_speed_factor;
        }
        speed
    }
}

/// Distance-linear consumption with compounding weather multipliers.
#[derive(Debug, Clone, Default)]
pub struct LinearWeatherModel {
    factors: WeatherFactors,
}

impl LinearWeatherModel {
    pub fn new(factors: WeatherFactors) -> Self {
        Self { factors }
    }

    pub fn factors(&self) -> &WeatherFactors {
        &self.factors
    }
}

impl ConsumptionModel for LinearWeatherModel {
    fn segment_cost(
        &self,
        distance_m: f64,
        weather: &WeatherSample,
        vehicle: &VehicleState,
    ) -> SegmentCost {
        let distance_km = distance_m / 1000.0;
        let base_cost = distance_km / vehicle.nominal_range_km * 100.0;
        let speed_kmh = self.factors.speed_kmh(weather);

        SegmentCost {
            battery_cost_percent: base_cost * self.factors.energy_multiplier(weather),
            duration_s: distance_km / speed_kmh * 3600.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vehicle() -> VehicleState {
        VehicleState::new(100.0, 75.0, 500.0)
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn neutral_weather_costs_base_rate() {
        let cost = LinearWeatherModel::default().segment_cost(
            100_000.0,
            &WeatherSample::neutral(),
            &vehicle(),
        );
        assert_close(cost.battery_cost_percent, 20.0);
        assert_close(cost.duration_s, 6_000.0);
    }

    #[test]
    fn heat_raises_cost_by_twenty_percent() {
        let cost = LinearWeatherModel::default().segment_cost(
            100_000.0,
            &WeatherSample::new(35.0, 0.0, 0.0),
            &vehicle(),
        );
        assert_close(cost.battery_cost_percent, 24.0);
        assert_close(cost.duration_s, 6_000.0);
    }

    #[test]
    fn multipliers_compound_rather_than_add() {
        let weather = WeatherSample::new(-2.0, 1.5, 35.0);
        let cost = LinearWeatherModel::default().segment_cost(50_000.0, &weather, &vehicle());
        assert_close(cost.battery_cost_percent, 10.0 * 1.30 * 1.10 * 1.15);
        // 60 * 0.8 * 0.9 = 43.2 km/h
        assert_close(cost.duration_s, 50.0 / 43.2 * 3600.0);
    }

    #[test]
    fn thresholds_are_exclusive() {
        let factors = WeatherFactors::default();
        let edge = WeatherSample::new(30.0, 0.0, 20.0);
        assert_eq!(factors.energy_multiplier(&edge), 1.0);
        assert!(!factors.conditions(&edge).any());

        let edge_cold = WeatherSample::new(5.0, 0.0, 0.0);
        assert_eq!(factors.energy_multiplier(&edge_cold), 1.0);
    }

    #[test]
    fn zero_distance_is_free() {
        let cost = LinearWeatherModel::default().segment_cost(
            0.0,
            &WeatherSample::new(40.0, 3.0, 50.0),
            &vehicle(),
        );
        assert_eq!(cost.battery_cost_percent, 0.0);
        assert_eq!(cost.duration_s, 0.0);
    }
}
