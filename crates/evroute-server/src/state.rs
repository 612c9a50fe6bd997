//! Shared server state: configuration plus one client per collaborator.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use evroute_services::{MapsClient, StationClient, WeatherCache, WeatherClient};

use crate::config::Config;

pub struct AppState {
    config: Config,
    pub maps: MapsClient,
    pub weather: WeatherClient,
    pub stations: StationClient,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout())
            .user_agent(concat!("evroute/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;
        let retry = config.retry_policy();
        let cache = Arc::new(WeatherCache::new(
            Duration::from_secs(config.weather_cache_ttl_s),
            config.weather_cache_max,
        ));

        if config.maps_api_key.is_empty() {
            tracing::warn!("GOOGLE_MAPS_API_KEY not set; address-based planning will fail");
        }
        if config.weather_api_key.is_empty() {
            tracing::warn!("OPENWEATHER_API_KEY not set; weather lookups will fall back to neutral");
        }

        Ok(Self {
            maps: MapsClient::new(http.clone(), &config.maps_base_url, &config.maps_api_key)
                .with_retry(retry.clone()),
            weather: WeatherClient::new(
                http.clone(),
                &config.weather_base_url,
                &config.weather_api_key,
            )
            .with_retry(retry.clone())
            .with_cache(cache),
            stations: StationClient::new(http, &config.stations_base_url, &config.stations_api_key)
                .with_retry(retry),
            config,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}
