//! `plan_trip`: the single entry point of the planning core.

use crate::assembler::TripPlanAssembler;
use crate::consumption::{ConsumptionModel, LinearWeatherModel, WeatherFactors};
use crate::error::PlanningError;
use crate::models::{TripPlan, TripRequest};
use crate::scheduler::{CancelFlag, ChargeStopScheduler, Halt};
use crate::segmenter::{segment_route, WeatherLookup};
use crate::stations::StationIndex;

/// Plan a trip with the default weather-adjusted linear consumption model.
pub fn plan_trip<W>(
    request: &TripRequest,
    weather: &W,
    cancel: Option<&CancelFlag>,
) -> Result<TripPlan, PlanningError>
where
    W: WeatherLookup + ?Sized,
{
    let model = LinearWeatherModel::default();
    plan_trip_with_model(request, weather, &model, model.factors(), cancel)
}

/// Plan a trip with a custom consumption model.
///
/// `advisory` holds the thresholds used for the weather advice text.
pub fn plan_trip_with_model<W, M>(
    request: &TripRequest,
    weather: &W,
    model: &M,
    advisory: &WeatherFactors,
    cancel: Option<&CancelFlag>,
) -> Result<TripPlan, PlanningError>
where
    W: WeatherLookup + ?Sized,
    M: ConsumptionModel + ?Sized,
{
    let vehicle = &request.vehicle;
    vehicle.validate()?;

    let mut segments = segment_route(request.geometry.points(), weather, model, vehicle)?;

    let assembler =
        TripPlanAssembler::new(advisory.clone()).with_departure(request.departure_at);
    let outcome = ChargeStopScheduler::new(
        vehicle,
        StationIndex::new(&request.stations),
        &request.scheduler,
    )
    .with_departure(request.departure_at)
    .with_cancel(cancel)
    .run(&segments);

    match outcome {
        Ok(schedule) => Ok(assembler.assemble(segments, schedule, vehicle)),
        Err(Halt::Unreachable {
            segment_index,
            cost_percent,
        }) => Err(PlanningError::SegmentUnreachable {
            index: segment_index,
            cost_percent,
        }),
        Err(Halt::Stalled {
            segment_index,
            at,
            battery_percent,
            radius_m,
            partial,
        }) => {
            segments.truncate(segment_index + 1);
            Err(PlanningError::InsufficientChargingInfrastructure {
                at,
                battery_percent,
                radius_m,
                partial_plan: Box::new(assembler.assemble(segments, partial, vehicle)),
            })
        }
        Err(Halt::Cancelled { completed_segments }) => {
            Err(PlanningError::Cancelled { completed_segments })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Coordinate, RouteGeometry, VehicleState, WeatherSample};
    use crate::segmenter::NeutralWeather;

    #[test]
    fn invalid_vehicle_is_rejected_before_segmentation() {
        let geometry =
            RouteGeometry::new(vec![Coordinate::new(0.0, 0.0), Coordinate::new(0.0, 1.0)])
                .unwrap();
        let request = TripRequest::new(geometry, VehicleState::new(50.0, 0.0, 400.0));
        let err = plan_trip(&request, &NeutralWeather, None).unwrap_err();
        assert_eq!(err.code(), "invalid_vehicle");
    }

    #[test]
    fn closure_weather_lookup_drives_costs() {
        let geometry =
            RouteGeometry::new(vec![Coordinate::new(0.0, 0.0), Coordinate::new(0.0, 0.5)])
                .unwrap();
        let request = TripRequest::new(geometry, VehicleState::new(100.0, 60.0, 400.0));
        let hot = |_: Coordinate| WeatherSample::new(38.0, 0.0, 0.0);

        let neutral_plan = plan_trip(&request, &NeutralWeather, None).unwrap();
        let hot_plan = plan_trip(&request, &hot, None).unwrap();
        let ratio =
            hot_plan.total_battery_consumed_percent / neutral_plan.total_battery_consumed_percent;
        assert!((ratio - 1.2).abs() < 1e-9);
        assert!(hot_plan.advisory_text.contains("High temperatures"));
    }
}
