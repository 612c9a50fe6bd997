//! Aggregates segments and stops into the final [`TripPlan`].

use chrono::{DateTime, Duration, Utc};

use crate::anxiety::{anxiety_index, AnxietyLevel};
use crate::consumption::{WeatherConditions, WeatherFactors};
use crate::models::{RouteSegment, TripPlan, VehicleState};
use crate::scheduler::Schedule;

const HOT_ADVICE: &str =
    "High temperatures along the route: cabin cooling will draw extra energy.";
const COLD_ADVICE: &str =
    "Low temperatures along the route reduce battery efficiency: plan charging early.";
const WET_ADVICE: &str = "Precipitation expected: roads may be slippery, drive with care.";
const WINDY_ADVICE: &str = "Strong winds expected: stability and range may be affected.";

#[derive(Debug, Clone, Default)]
pub struct TripPlanAssembler {
    factors: WeatherFactors,
    departure_at: Option<DateTime<Utc>>,
}

impl TripPlanAssembler {
    pub fn new(factors: WeatherFactors) -> Self {
        Self {
            factors,
            departure_at: None,
        }
    }

    pub fn with_departure(mut self, departure_at: Option<DateTime<Utc>>) -> Self {
        self.departure_at = departure_at;
        self
    }

    pub fn assemble(
        &self,
        segments: Vec<RouteSegment>,
        schedule: Schedule,
        vehicle: &VehicleState,
    ) -> TripPlan {
        let total_distance_m: f64 = segments.iter().map(|segment| segment.distance_m).sum();
        let travel_duration_s: f64 = segments.iter().map(|segment| segment.duration_s).sum();
        let total_battery_consumed_percent: f64 = segments
            .iter()
            .map(|segment| segment.battery_cost_percent)
            .sum();
        let charging_duration_s: f64 = schedule
            .stops
            .iter()
            .map(|stop| stop.charging_duration_s)
            .sum();
        let total_charging_cost: f64 = schedule.stops.iter().map(|stop| stop.charging_cost).sum();
        let total_duration_s = travel_duration_s + charging_duration_s;

        let anxiety = anxiety_index(schedule.battery_percent, total_distance_m, vehicle);
        let advisory_text = self.advisory_text(&segments);
        let arrival_at = self.departure_at.and_then(|departure| {
            departure.checked_add_signed(Duration::milliseconds(
                (total_duration_s * 1000.0).round() as i64,
            ))
        });

        TripPlan {
            segments,
            stops: schedule.stops,
            total_distance_m,
            travel_duration_s,
            charging_duration_s,
            total_duration_s,
            total_battery_consumed_percent,
            final_battery_percent: schedule.battery_percent,
            total_charging_cost,
            anxiety_index: anxiety,
            anxiety_level: AnxietyLevel::from_index(anxiety),
            advisory_text,
            departure_at: self.departure_at,
            arrival_at,
        }
    }

    /// One sentence per weather extreme seen anywhere on the route; empty when none.
    pub fn advisory_text(&self, segments: &[RouteSegment]) -> String {
        let seen = segments
            .iter()
            .map(|segment| self.factors.conditions(&segment.weather))
            .fold(WeatherConditions::default(), WeatherConditions::merge);

        let mut advice = Vec::new();
        if seen.hot {
            advice.push(HOT_ADVICE);
        }
        if seen.cold {
            advice.push(COLD_ADVICE);
        }
        if seen.wet {
            advice.push(WET_ADVICE);
        }
        if seen.windy {
            advice.push(WINDY_ADVICE);
        }
        advice.join(" ")
    }
}
