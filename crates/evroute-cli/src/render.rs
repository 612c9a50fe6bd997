//! Plain-text trip summaries for the terminal.

use std::fmt::Write;

use evroute_core::TripPlan;

/// `3h 05m`, `42m`, `0m`.
pub fn format_duration(seconds: f64) -> String {
    let total_minutes = (seconds.max(0.0) / 60.0).round() as u64;
    let hours = total_minutes / 60;
    let minutes = total_minutes % 60;
    if hours > 0 {
        format!("{}h {:02}m", hours, minutes)
    } else {
        format!("{}m", minutes)
    }
}

pub fn format_distance(meters: f64) -> String {
    if meters >= 1_000.0 {
        format!("{:.1} km", meters / 1_000.0)
    } else {
        format!("{:.0} m", meters)
    }
}

pub fn render_plan(plan: &TripPlan) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Trip: {} over {} segments",
        format_distance(plan.total_distance_m),
        plan.segments.len()
    );
    let _ = writeln!(
        out,
        "Time: {} total ({} driving, {} charging)",
        format_duration(plan.total_duration_s),
        format_duration(plan.travel_duration_s),
        format_duration(plan.charging_duration_s)
    );
    if let (Some(departure), Some(arrival)) = (plan.departure_at, plan.arrival_at) {
        let _ = writeln!(
            out,
            "Depart {}  Arrive {}",
            departure.format("%Y-%m-%d %H:%M UTC"),
            arrival.format("%Y-%m-%d %H:%M UTC")
        );
    }
    let _ = writeln!(
        out,
        "Battery: {:.1}% used, {:.1}% on arrival",
        plan.total_battery_consumed_percent, plan.final_battery_percent
    );

    if plan.stops.is_empty() {
        let _ = writeln!(out, "No charging stops needed.");
    } else {
        let _ = writeln!(out, "Charging stops:");
        for (n, stop) in plan.stops.iter().enumerate() {
            let name = stop.station.name.as_deref().unwrap_or(&stop.station_id);
            let _ = write!(
                out,
                "  {}. {} after segment {}: {:.1}% -> {:.1}% in {} ({:.1} kWh",
                n + 1,
                name,
                stop.arrival_order_index + 1,
                stop.arrival_battery_percent,
                stop.departure_battery_percent,
                format_duration(stop.charging_duration_s),
                stop.energy_added_kwh
            );
            if stop.charging_cost > 0.0 {
                let _ = write!(out, ", cost {:.2}", stop.charging_cost);
            }
            let _ = writeln!(out, ")");
        }
    }

    let _ = writeln!(
        out,
        "Range anxiety: {:.0}/100 ({})",
        plan.anxiety_index,
        plan.anxiety_level.label()
    );
    if !plan.advisory_text.is_empty() {
        let _ = writeln!(out, "Advisory: {}", plan.advisory_text);
    }
    out
}
