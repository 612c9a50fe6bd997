//! Google Maps geocoding and directions client.

use evroute_core::{Coordinate, RouteGeometry};
use reqwest::Client;
use serde::Deserialize;

use crate::error::{ensure_success, ServiceError};
use crate::retry::RetryPolicy;
use crate::{DirectionsProvider, Geocoder};

pub const DEFAULT_MAPS_BASE_URL: &str = "https://maps.googleapis.com";

/// HTTP client for the geocoding and directions web services.
#[derive(Debug, Clone)]
pub struct MapsClient {
    client: Client,
    base_url: String,
    api_key: String,
    retry: RetryPolicy,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

#[derive(Debug, Deserialize)]
struct GeocodeGeometry {
    location: LatLng,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    geometry: GeocodeGeometry,
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    results: Vec<GeocodeResult>,
}

#[derive(Debug, Deserialize)]
struct OverviewPolyline {
    points: String,
}

#[derive(Debug, Deserialize)]
struct DirectionsRoute {
    overview_polyline: OverviewPolyline,
}

#[derive(Debug, Deserialize)]
struct DirectionsResponse {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    routes: Vec<DirectionsRoute>,
}

/// Map a provider `status` field onto a result.
fn check_status(status: &str, error_message: Option<String>, subject: &str) -> Result<(), ServiceError> {
    match status {
        "OK" => Ok(()),
        "ZERO_RESULTS" | "NOT_FOUND" => Err(ServiceError::NoResults(subject.to_string())),
        "OVER_QUERY_LIMIT" | "OVER_DAILY_LIMIT" => Err(ServiceError::Quota(
            error_message.unwrap_or_else(|| status.to_string()),
        )),
        other => Err(ServiceError::Rejected {
            status: other.to_string(),
            message: error_message.unwrap_or_default(),
        }),
    }
}

impl MapsClient {
    pub fn new(client: Client, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn fetch_geocode(&self, address: &str) -> Result<Coordinate, ServiceError> {
        let url = format!("{}/maps/api/geocode/json", self.base_url);
        let response = self
            .client
            .get(url)
            .query(&[("address", address), ("key", self.api_key.as_str())])
            .send()
            .await?;
        let payload: GeocodeResponse = ensure_success(response).await?.json().await?;
        check_status(&payload.status, payload.error_message, address)?;

        let first = payload
            .results
            .into_iter()
            .next()
            .ok_or_else(|| ServiceError::NoResults(address.to_string()))?;
        let point = Coordinate::new(first.geometry.location.lat, first.geometry.location.lng);
        if !point.is_valid() {
            return Err(ServiceError::InvalidResponse(format!(
                "geocoder returned out-of-range coordinate {point}"
            )));
        }
        Ok(point)
    }

    async fn fetch_directions(
        &self,
        origin: Coordinate,
        destination: Coordinate,
    ) -> Result<RouteGeometry, ServiceError> {
        let url = format!("{}/maps/api/directions/json", self.base_url);
        let origin_param = format!("{},{}", origin.lat, origin.lon);
        let destination_param = format!("{},{}", destination.lat, destination.lon);
        let response = self
            .client
            .get(url)
            .query(&[
                ("origin", origin_param.as_str()),
                ("destination", destination_param.as_str()),
                ("mode", "driving"),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await?;
        let payload: DirectionsResponse = ensure_success(response).await?.json().await?;
        let subject = format!("{origin} -> {destination}");
        check_status(&payload.status, payload.error_message, &subject)?;

        let route = payload
            .routes
            .into_iter()
            .next()
            .ok_or(ServiceError::NoResults(subject))?;
        RouteGeometry::from_polyline(&route.overview_polyline.points)
            .map_err(|err| ServiceError::InvalidResponse(err.to_string()))
    }
}

impl Geocoder for MapsClient {
    async fn geocode(&self, address: &str) -> Result<Coordinate, ServiceError> {
        tracing::debug!(address, "Geocoding address");
        self.retry.run("geocoder", || self.fetch_geocode(address)).await
    }
}

impl DirectionsProvider for MapsClient {
    async fn directions(
        &self,
        origin: Coordinate,
        destination: Coordinate,
    ) -> Result<RouteGeometry, ServiceError> {
        tracing::debug!(%origin, %destination, "Requesting driving directions");
        self.retry
            .run("directions", || self.fetch_directions(origin, destination))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert!(check_status("OK", None, "x").is_ok());
        assert!(matches!(
            check_status("ZERO_RESULTS", None, "Atlantis"),
            Err(ServiceError::NoResults(subject)) if subject == "Atlantis"
        ));
        assert!(matches!(
            check_status("OVER_QUERY_LIMIT", Some("slow down".into()), "x"),
            Err(ServiceError::Quota(message)) if message == "slow down"
        ));
        assert!(matches!(
            check_status("REQUEST_DENIED", Some("bad key".into()), "x"),
            Err(ServiceError::Rejected { status, .. }) if status == "REQUEST_DENIED"
        ));
    }

    #[test]
    fn parses_directions_payload() {
        let body = r#"{
            "status": "OK",
            "routes": [{"overview_polyline": {"points": "_p~iF~ps|U_ulLnnqC_mqNvxq`@"}, "legs": []}]
        }"#;
        let payload: DirectionsResponse = serde_json::from_str(body).unwrap();
        let geometry =
            RouteGeometry::from_polyline(&payload.routes[0].overview_polyline.points).unwrap();
        assert_eq!(geometry.len(), 3);
        assert!(geometry.origin().approx_eq(&Coordinate::new(38.5, -120.2)));
    }
}
