//! Open Charge Map station directory client.

use evroute_core::{ChargingStation, Coordinate};
use reqwest::Client;
use serde::Deserialize;

use crate::error::{ensure_success, ServiceError};
use crate::retry::RetryPolicy;
use crate::StationDirectory;

pub const DEFAULT_STATIONS_BASE_URL: &str = "https://api.openchargemap.io";

const DEFAULT_MAX_RESULTS: usize = 50;

#[derive(Debug, Clone)]
pub struct StationClient {
    client: Client,
    base_url: String,
    api_key: String,
    max_results: usize,
    retry: RetryPolicy,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AddressInfo {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    address_line1: Option<String>,
    #[serde(default)]
    town: Option<String>,
    latitude: f64,
    longitude: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct StatusType {
    #[serde(default)]
    is_operational: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Connection {
    #[serde(rename = "PowerKW", default)]
    power_kw: Option<f64>,
    #[serde(default)]
    status_type: Option<StatusType>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PoiRecord {
    #[serde(rename = "ID")]
    id: i64,
    address_info: AddressInfo,
    #[serde(default)]
    status_type: Option<StatusType>,
    #[serde(rename = "StatusTypeID", default)]
    status_type_id: Option<i64>,
    #[serde(default)]
    usage_cost: Option<String>,
    #[serde(default)]
    connections: Vec<Connection>,
}

impl PoiRecord {
    fn is_operational(&self) -> bool {
        if let Some(flag) = self.status_type.as_ref().and_then(|s| s.is_operational) {
            return flag;
        }
        // Temporarily unavailable, not operational, planned, removed
        !matches!(self.status_type_id, Some(30 | 100 | 150 | 200 | 210))
    }

    /// Fastest connector that is not flagged out of service.
    fn max_power_kw(&self) -> Option<f64> {
        self.connections
            .iter()
            .filter(|c| {
                c.status_type
                    .as_ref()
                    .and_then(|s| s.is_operational)
                    .unwrap_or(true)
            })
            .filter_map(|c| c.power_kw)
            .filter(|kw| kw.is_finite() && *kw > 0.0)
            .max_by(|a, b| a.total_cmp(b))
    }

    fn into_station(self) -> Option<ChargingStation> {
        let location = Coordinate::new(self.address_info.latitude, self.address_info.longitude);
        if !location.is_valid() {
            return None;
        }
        let power_kw = self.max_power_kw()?;
        let available = self.is_operational();
        let price = self
            .usage_cost
            .as_deref()
            .and_then(parse_price_per_kwh)
            .unwrap_or(0.0);

        let mut station = ChargingStation::new(format!("ocm-{}", self.id), location, power_kw)
            .with_price(price);
        station.available = available;
        station.name = self.address_info.title;
        station.address = match (self.address_info.address_line1, self.address_info.town) {
            (Some(line), Some(town)) => Some(format!("{line}, {town}")),
            (Some(line), None) => Some(line),
            (None, town) => town,
        };
        Some(station)
    }
}

/// Pull a per-kWh price out of free-form tariff text such as `"£0.45/kWh"`.
///
/// Anything not quoted per kWh is ignored.
pub fn parse_price_per_kwh(text: &str) -> Option<f64> {
    let lower = text.to_ascii_lowercase();
    let unit_at = lower.find("kwh")?;
    let head = &lower[..unit_at];
    let start = head.find(|c: char| c.is_ascii_digit())?;
    let number: String = head[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .map(|c| if c == ',' { '.' } else { c })
        .collect();
    number.parse::<f64>().ok().filter(|price| price.is_finite() && *price >= 0.0)
}

impl StationClient {
    pub fn new(client: Client, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            max_results: DEFAULT_MAX_RESULTS,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results.max(1);
        self
    }

    async fn fetch(&self, point: Coordinate, radius_m: f64) -> Result<Vec<ChargingStation>, ServiceError> {
        let url = format!("{}/v3/poi", self.base_url);
        let radius_km = format!("{:.3}", (radius_m / 1000.0).max(0.001));
        let lat = point.lat.to_string();
        let lon = point.lon.to_string();
        let max_results = self.max_results.to_string();
        let response = self
            .client
            .get(url)
            .query(&[
                ("latitude", lat.as_str()),
                ("longitude", lon.as_str()),
                ("distance", radius_km.as_str()),
                ("distanceunit", "KM"),
                ("maxresults", max_results.as_str()),
                ("verbose", "false"),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await?;
        let records: Vec<PoiRecord> = ensure_success(response).await?.json().await?;

        let total = records.len();
        let stations: Vec<ChargingStation> =
            records.into_iter().filter_map(PoiRecord::into_station).collect();
        if stations.len() < total {
            tracing::debug!(
                skipped = total - stations.len(),
                "Ignoring stations without usable power or location"
            );
        }
        Ok(stations)
    }
}

impl StationDirectory for StationClient {
    async fn stations_near(
        &self,
        point: Coordinate,
        radius_m: f64,
    ) -> Result<Vec<ChargingStation>, ServiceError> {
        self.retry.run("stations", || self.fetch(point, radius_m)).await
    }
}
