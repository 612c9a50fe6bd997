//! EV trip planner CLI.
//!
//! Usage:
//!   evroute plan --from "Lyon" --to "Paris" --battery 85 --capacity 77 --range 450
//!   evroute offline --polyline '_p~iF~ps|U_ulLnnqC' --stations stations.json --battery 60 --capacity 60 --range 400

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand};
use evroute_cli::render::render_plan;
use evroute_cli::{PlanOutcome, PlanTripBody, PlannerClient};
use evroute_core::{
    plan_trip, ChargingStation, Coordinate, PlanningError, RouteGeometry, SampledWeather,
    TripPlan, TripRequest, VehicleState, WeatherSample,
};
use serde::de::DeserializeOwned;
use tracing_subscriber::EnvFilter;

/// Weather-aware EV route and charging-stop planner
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Print the plan as JSON instead of a summary
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Plan between two addresses using a running server
    Plan {
        /// Server URL
        #[arg(long, env = "EVROUTE_URL", default_value = "http://localhost:3000")]
        url: String,

        /// Origin address
        #[arg(long)]
        from: String,

        /// Destination address
        #[arg(long)]
        to: String,

        #[command(flatten)]
        vehicle: VehicleArgs,

        /// Departure time (RFC 3339)
        #[arg(long)]
        depart: Option<DateTime<Utc>>,
    },
    /// Plan locally from a route and station list, no network
    Offline {
        /// Encoded route polyline
        #[arg(long, conflicts_with = "geometry")]
        polyline: Option<String>,

        /// JSON file with an array of {lat, lon} points
        #[arg(long)]
        geometry: Option<PathBuf>,

        /// JSON file with an array of charging stations
        #[arg(long)]
        stations: Option<PathBuf>,

        /// JSON file with an array of located weather samples
        #[arg(long)]
        weather: Option<PathBuf>,

        #[command(flatten)]
        vehicle: VehicleArgs,

        /// Departure time (RFC 3339)
        #[arg(long)]
        depart: Option<DateTime<Utc>>,
    },
}

#[derive(Args, Debug)]
struct VehicleArgs {
    /// Current battery level in percent
    #[arg(long, default_value_t = 100.0)]
    battery: f64,

    /// Battery capacity in kWh
    #[arg(long)]
    capacity: f64,

    /// Nominal range on a full battery in km
    #[arg(long)]
    range: f64,

    /// Charge before dropping below this level (percent)
    #[arg(long, default_value_t = 20.0)]
    min_safety: f64,

    /// Charge up to this level at each stop (percent)
    #[arg(long, default_value_t = 80.0)]
    target: f64,
}

impl VehicleArgs {
    fn to_vehicle(&self) -> VehicleState {
        VehicleState::new(self.battery, self.capacity, self.range)
            .with_thresholds(self.min_safety, self.target)
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Failed to parse {}", path.display()))
}

fn print_plan(plan: &TripPlan, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(plan)?);
    } else {
        print!("{}", render_plan(plan));
    }
    Ok(())
}

async fn run_remote(
    url: &str,
    from: &str,
    to: &str,
    vehicle: VehicleState,
    depart: Option<DateTime<Utc>>,
    json: bool,
) -> Result<()> {
    let client = PlannerClient::new(url);
    let mut body = PlanTripBody::between_addresses(from, to, vehicle);
    body.departure_at = depart;

    match client.plan(&body).await? {
        PlanOutcome::Planned(plan) => print_plan(&plan, json),
        PlanOutcome::Rejected { status, error } => {
            eprintln!("Planning failed ({} {}): {}", status, error.error, error.message);
            if let Some(partial) = error.partial_plan {
                eprintln!("Route covered before stalling:");
                print_plan(&partial, json)?;
            }
            bail!("server rejected the plan request")
        }
    }
}

fn run_offline(
    polyline: Option<String>,
    geometry: Option<PathBuf>,
    stations: Option<PathBuf>,
    weather: Option<PathBuf>,
    vehicle: VehicleState,
    depart: Option<DateTime<Utc>>,
    json: bool,
) -> Result<()> {
    let geometry = match (polyline, geometry) {
        (Some(encoded), _) => RouteGeometry::from_polyline(&encoded)?,
        (None, Some(path)) => RouteGeometry::new(read_json::<Vec<Coordinate>>(&path)?)?,
        (None, None) => bail!("either --polyline or --geometry is required"),
    };
    let stations: Vec<ChargingStation> = match stations {
        Some(path) => read_json(&path)?,
        None => Vec::new(),
    };
    let weather = match weather {
        Some(path) => SampledWeather::new(read_json::<Vec<WeatherSample>>(&path)?),
        None => SampledWeather::new(Vec::new()),
    };
    tracing::debug!(
        points = geometry.len(),
        stations = stations.len(),
        weather_samples = weather.len(),
        "Planning offline"
    );

    let mut request = TripRequest::new(geometry, vehicle).with_stations(stations);
    request.departure_at = depart;

    match plan_trip(&request, &weather, None) {
        Ok(plan) => print_plan(&plan, json),
        Err(err) => {
            eprintln!("Planning failed ({}): {}", err.code(), err);
            if let PlanningError::InsufficientChargingInfrastructure { partial_plan, .. } = &err {
                eprintln!("Route covered before stalling:");
                print_plan(partial_plan, json)?;
            }
            Err(err.into())
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Plan {
            url,
            from,
            to,
            vehicle,
            depart,
        } => run_remote(&url, &from, &to, vehicle.to_vehicle(), depart, cli.json).await,
        Command::Offline {
            polyline,
            geometry,
            stations,
            weather,
            vehicle,
            depart,
        } => run_offline(
            polyline,
            geometry,
            stations,
            weather,
            vehicle.to_vehicle(),
            depart,
            cli.json,
        ),
    }
}
