//! Charge-stop scheduler.
//!
//! Simulates battery depletion segment by segment and decides where the
//! vehicle has to stop to charge. The simulation is strictly sequential:
//! every step depends on the battery level left by the previous one.
//!
//! ```text
//!             cost applied, battery >= margin
//!            +-------------------------------+
//!            v                               |
//!   --> Traveling ----------------------> Traveling ... --> Complete
//!            |  battery < margin
//!            v
//!       NeedsCharge --station found--> Charging --> Traveling
//!            |
//!            +--no station in radius--> Stalled
//! ```
//!
//! The margin is never checked after the last segment: arriving below it is
//! fine because no travel follows. Running out (battery below zero) is never
//! fine.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{ChargingStop, Coordinate, RouteSegment, VehicleState};
use crate::stations::{StationIndex, StationMatch};

pub const DEFAULT_STATION_SEARCH_RADIUS_M: f64 = 5_000.0;

/// A segment costing more than a full battery cannot be driven at all.
const FULL_CHARGE_PERCENT: f64 = 100.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// How far from the route point a charging station may be
    #[serde(default = "default_station_search_radius_m")]
    pub station_search_radius_m: f64,
}

fn default_station_search_radius_m() -> f64 {
    DEFAULT_STATION_SEARCH_RADIUS_M
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            station_search_radius_m: DEFAULT_STATION_SEARCH_RADIUS_M,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerState {
    Traveling,
    NeedsCharge,
    Charging,
    /// Terminal failure
    Stalled,
    /// Terminal success
    Complete,
}

/// Cooperative cancellation signal, checked between segments.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Battery level at a segment boundary, after any charging there.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundaryLevel {
    pub segment_index: usize,
    pub battery_percent: f64,
    pub charged: bool,
}

/// Outcome of a simulation run, complete or partial.
#[derive(Debug, Clone, PartialEq)]
pub struct Schedule {
    pub state: SchedulerState,
    pub stops: Vec<ChargingStop>,
    pub trace: Vec<BoundaryLevel>,
    pub battery_percent: f64,
    /// Travel plus charging time simulated so far
    pub elapsed_s: f64,
}

/// Why a simulation stopped before reaching `Complete`.
#[derive(Debug, Clone, PartialEq)]
pub enum Halt {
    Unreachable {
        segment_index: usize,
        cost_percent: f64,
    },
    Stalled {
        segment_index: usize,
        at: Coordinate,
        battery_percent: f64,
        radius_m: f64,
        partial: Schedule,
    },
    Cancelled {
        completed_segments: usize,
    },
}

pub struct ChargeStopScheduler<'a> {
    vehicle: &'a VehicleState,
    stations: StationIndex<'a>,
    config: &'a SchedulerConfig,
    departure_at: Option<DateTime<Utc>>,
    cancel: Option<&'a CancelFlag>,
}

struct Simulation {
    state: SchedulerState,
    battery: f64,
    elapsed_s: f64,
    stops: Vec<ChargingStop>,
    trace: Vec<BoundaryLevel>,
}

impl Simulation {
    fn snapshot(&self) -> Schedule {
        Schedule {
            state: self.state,
            stops: self.stops.clone(),
            trace: self.trace.clone(),
            battery_percent: self.battery,
            elapsed_s: self.elapsed_s,
        }
    }

    fn into_schedule(self) -> Schedule {
        Schedule {
            state: self.state,
            stops: self.stops,
            trace: self.trace,
            battery_percent: self.battery,
            elapsed_s: self.elapsed_s,
        }
    }
}

impl<'a> ChargeStopScheduler<'a> {
    pub fn new(
        vehicle: &'a VehicleState,
        stations: StationIndex<'a>,
        config: &'a SchedulerConfig,
    ) -> Self {
        Self {
            vehicle,
            stations,
            config,
            departure_at: None,
            cancel: None,
        }
    }

    pub fn with_departure(mut self, departure_at: Option<DateTime<Utc>>) -> Self {
        self.departure_at = departure_at;
        self
    }

    pub fn with_cancel(mut self, cancel: Option<&'a CancelFlag>) -> Self {
        self.cancel = cancel;
        self
    }

    /// Run the simulation over `segments` in travel order.
    pub fn run(&self, segments: &[RouteSegment]) -> Result<Schedule, Halt> {
        let mut sim = Simulation {
            state: SchedulerState::Traveling,
            battery: self.vehicle.battery_percent,
            elapsed_s: 0.0,
            stops: Vec::new(),
            trace: Vec::with_capacity(segments.len()),
        };
        let last_index = segments.len().saturating_sub(1);

        for (index, segment) in segments.iter().enumerate() {
            if self.cancel.is_some_and(CancelFlag::is_cancelled) {
                return Err(Halt::Cancelled {
                    completed_segments: index,
                });
            }

            // NaN costs fail this check too.
            if !(segment.battery_cost_percent <= FULL_CHARGE_PERCENT) {
                return Err(Halt::Unreachable {
                    segment_index: index,
                    cost_percent: segment.battery_cost_percent,
                });
            }

            sim.battery -= segment.battery_cost_percent;
            sim.elapsed_s += segment.duration_s;

            if sim.battery < 0.0 {
                // Ran empty before reaching the segment end.
                return Err(self.stall(sim, index, segment.end));
            }

            if index == last_index || sim.battery >= self.vehicle.min_safety_percent {
                sim.trace.push(BoundaryLevel {
                    segment_index: index,
                    battery_percent: sim.battery,
                    charged: false,
                });
                continue;
            }

            sim.state = SchedulerState::NeedsCharge;
            let Some(found) = self
                .stations
                .nearest_available(segment.end, self.config.station_search_radius_m)
            else {
                return Err(self.stall(sim, index, segment.end));
            };

            sim.state = SchedulerState::Charging;
            let stop = self.charge_at(found, index, sim.battery, sim.elapsed_s);
            sim.elapsed_s += stop.charging_duration_s;
            sim.battery = stop.departure_battery_percent;
            sim.stops.push(stop);
            sim.trace.push(BoundaryLevel {
                segment_index: index,
                battery_percent: sim.battery,
                charged: true,
            });
            sim.state = SchedulerState::Traveling;
        }

        sim.state = SchedulerState::Complete;
        Ok(sim.into_schedule())
    }

    fn stall(&self, mut sim: Simulation, segment_index: usize, at: Coordinate) -> Halt {
        sim.state = SchedulerState::Stalled;
        Halt::Stalled {
            segment_index,
            at,
            battery_percent: sim.battery,
            radius_m: self.config.station_search_radius_m,
            partial: sim.snapshot(),
        }
    }

    fn charge_at(
        &self,
        found: StationMatch<'_>,
        segment_index: usize,
        arrival_battery: f64,
        arrival_offset_s: f64,
    ) -> ChargingStop {
        let station = found.station;
        let target = self.vehicle.target_charge_percent;
        let energy_added_kwh = (target - arrival_battery) / 100.0 * self.vehicle.battery_capacity_kwh;
        let charging_duration_s = energy_added_kwh / station.power_kw * 3600.0;
        let departure_offset_s = arrival_offset_s + charging_duration_s;

        ChargingStop {
            station_id: station.id.clone(),
            station: station.clone(),
            arrival_order_index: segment_index,
            arrival_battery_percent: arrival_battery,
            departure_battery_percent: target,
            charging_duration_s,
            energy_added_kwh,
            charging_cost: energy_added_kwh * station.price_per_kwh,
            detour_distance_m: found.distance_m,
            arrival_offset_s,
            departure_offset_s,
            arrival_at: self.offset_time(arrival_offset_s),
            departure_at: self.offset_time(departure_offset_s),
        }
    }

    fn offset_time(&self, offset_s: f64) -> Option<DateTime<Utc>> {
        let departure_at = self.departure_at?;
        departure_at.checked_add_signed(Duration::milliseconds((offset_s * 1000.0).round() as i64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ChargingStation, WeatherSample};

    fn segment(start_lon: f64, end_lon: f64, cost: f64) -> RouteSegment {
        RouteSegment {
            start: Coordinate::new(0.0, start_lon),
            end: Coordinate::new(0.0, end_lon),
            distance_m: 1_000.0,
            weather: WeatherSample::neutral(),
            duration_s: 600.0,
            battery_cost_percent: cost,
        }
    }

    fn legs(costs: &[f64]) -> Vec<RouteSegment> {
        costs
            .iter()
            .enumerate()
            .map(|(i, cost)| segment(i as f64, i as f64 + 1.0, *cost))
            .collect()
    }

    #[test]
    fn completes_without_stops_when_battery_suffices() {
        let vehicle = VehicleState::new(100.0, 60.0, 400.0);
        let config = SchedulerConfig::default();
        let schedule = ChargeStopScheduler::new(&vehicle, StationIndex::new(&[]), &config)
            .run(&legs(&[20.0, 20.0, 20.0]))
            .unwrap();
        assert_eq!(schedule.state, SchedulerState::Complete);
        assert!(schedule.stops.is_empty());
        assert!((schedule.battery_percent - 40.0).abs() < 1e-9);
        assert_eq!(schedule.trace.len(), 3);
    }

    #[test]
    fn charges_when_margin_is_crossed() {
        let vehicle = VehicleState::new(50.0, 60.0, 400.0);
        let config = SchedulerConfig::default();
        let stations = vec![ChargingStation::new("s1", Coordinate::new(0.0, 1.0), 120.0)
            .with_price(0.5)];
        let schedule = ChargeStopScheduler::new(&vehicle, StationIndex::new(&stations), &config)
            .run(&legs(&[35.0, 30.0, 30.0]))
            .unwrap();

        assert_eq!(schedule.stops.len(), 1);
        let stop = &schedule.stops[0];
        assert_eq!(stop.station_id, "s1");
        assert_eq!(stop.arrival_order_index, 0);
        assert!((stop.arrival_battery_percent - 15.0).abs() < 1e-9);
        assert_eq!(stop.departure_battery_percent, 80.0);
        // 65% of 60 kWh = 39 kWh at 120 kW = 1170 s
        assert!((stop.energy_added_kwh - 39.0).abs() < 1e-9);
        assert!((stop.charging_duration_s - 1_170.0).abs() < 1e-6);
        assert!((stop.charging_cost - 19.5).abs() < 1e-9);
        assert!((stop.arrival_offset_s - 600.0).abs() < 1e-9);
        assert!((schedule.battery_percent - 20.0).abs() < 1e-9);
        assert!((schedule.elapsed_s - (1_800.0 + 1_170.0)).abs() < 1e-6);
    }

    #[test]
    fn stalls_without_station_in_range() {
        let vehicle = VehicleState::new(50.0, 60.0, 400.0);
        let config = SchedulerConfig::default();
        let stations = vec![ChargingStation::new("far", Coordinate::new(1.0, 1.0), 120.0)];
        let halt = ChargeStopScheduler::new(&vehicle, StationIndex::new(&stations), &config)
            .run(&legs(&[10.0, 25.0, 10.0]))
            .unwrap_err();
        match halt {
            Halt::Stalled {
                segment_index,
                battery_percent,
                partial,
                ..
            } => {
                assert_eq!(segment_index, 1);
                assert!((battery_percent - 15.0).abs() < 1e-9);
                assert_eq!(partial.state, SchedulerState::Stalled);
                assert_eq!(partial.trace.len(), 1);
            }
            other => panic!("expected stall, got {other:?}"),
        }
    }

    #[test]
    fn last_segment_may_arrive_below_margin() {
        let vehicle = VehicleState::new(60.0, 60.0, 400.0);
        let config = SchedulerConfig::default();
        let schedule = ChargeStopScheduler::new(&vehicle, StationIndex::new(&[]), &config)
            .run(&legs(&[20.0, 35.0]))
            .unwrap();
        assert_eq!(schedule.state, SchedulerState::Complete);
        assert!((schedule.battery_percent - 5.0).abs() < 1e-9);
    }

    #[test]
    fn running_empty_on_last_segment_stalls() {
        let vehicle = VehicleState::new(30.0, 60.0, 400.0);
        let config = SchedulerConfig::default();
        let halt = ChargeStopScheduler::new(&vehicle, StationIndex::new(&[]), &config)
            .run(&legs(&[40.0]))
            .unwrap_err();
        assert!(matches!(halt, Halt::Stalled { segment_index: 0, .. }));
    }

    #[test]
    fn oversized_segment_is_unreachable_before_simulation() {
        let vehicle = VehicleState::new(100.0, 60.0, 400.0);
        let config = SchedulerConfig::default();
        let halt = ChargeStopScheduler::new(&vehicle, StationIndex::new(&[]), &config)
            .run(&legs(&[10.0, 100.5]))
            .unwrap_err();
        assert_eq!(
            halt,
            Halt::Unreachable {
                segment_index: 1,
                cost_percent: 100.5
            }
        );
    }

    #[test]
    fn cancellation_is_checked_between_segments() {
        let vehicle = VehicleState::new(100.0, 60.0, 400.0);
        let config = SchedulerConfig::default();
        let cancel = CancelFlag::new();
        cancel.cancel();
        let halt = ChargeStopScheduler::new(&vehicle, StationIndex::new(&[]), &config)
            .with_cancel(Some(&cancel))
            .run(&legs(&[10.0, 10.0]))
            .unwrap_err();
        assert_eq!(halt, Halt::Cancelled { completed_segments: 0 });
    }

    #[test]
    fn stop_times_follow_departure() {
        let vehicle = VehicleState::new(25.0, 50.0, 400.0);
        let config = SchedulerConfig::default();
        let stations = vec![ChargingStation::new("s1", Coordinate::new(0.0, 1.0), 50.0)];
        let departure = DateTime::parse_from_rfc3339("2024-05-01T08:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let schedule = ChargeStopScheduler::new(&vehicle, StationIndex::new(&stations), &config)
            .with_departure(Some(departure))
            .run(&legs(&[10.0, 10.0]))
            .unwrap();
        let stop = &schedule.stops[0];
        // 65% of 50 kWh = 32.5 kWh at 50 kW = 39 minutes
        assert_eq!(stop.arrival_at, Some(departure + Duration::minutes(10)));
        assert_eq!(stop.departure_at, Some(departure + Duration::minutes(49)));
    }
}
