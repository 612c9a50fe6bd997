//! OpenWeatherMap current-conditions client.

use std::sync::Arc;

use chrono::DateTime;
use evroute_core::{Coordinate, WeatherSample};
use reqwest::Client;
use serde::Deserialize;

use crate::cache::WeatherCache;
use crate::error::{ensure_success, ServiceError};
use crate::retry::RetryPolicy;
use crate::WeatherProvider;

pub const DEFAULT_WEATHER_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";

const MS_TO_KMH: f64 = 3.6;

#[derive(Debug, Clone)]
pub struct WeatherClient {
    client: Client,
    base_url: String,
    api_key: String,
    retry: RetryPolicy,
    cache: Arc<WeatherCache>,
}

#[derive(Debug, Deserialize)]
struct MainBlock {
    temp: f64,
}

#[derive(Debug, Default, Deserialize)]
struct WindBlock {
    #[serde(default)]
    speed: f64,
}

#[derive(Debug, Default, Deserialize)]
struct PrecipitationBlock {
    #[serde(rename = "1h", default)]
    one_hour: f64,
}

#[derive(Debug, Deserialize)]
struct CurrentWeatherResponse {
    main: MainBlock,
    #[serde(default)]
    wind: WindBlock,
    #[serde(default)]
    rain: Option<PrecipitationBlock>,
    #[serde(default)]
    snow: Option<PrecipitationBlock>,
    #[serde(default)]
    dt: Option<i64>,
}

impl CurrentWeatherResponse {
    fn into_sample(self, point: Coordinate) -> WeatherSample {
        let precipitation_mm = self.rain.map_or(0.0, |r| r.one_hour)
            + self.snow.map_or(0.0, |s| s.one_hour);
        let sample = WeatherSample::new(
            self.main.temp,
            precipitation_mm.max(0.0),
            (self.wind.speed * MS_TO_KMH).max(0.0),
        )
        .at(point);
        match self.dt.and_then(|dt| DateTime::from_timestamp(dt, 0)) {
            Some(observed_at) => sample.observed(observed_at),
            None => sample,
        }
    }
}

impl WeatherClient {
    pub fn new(client: Client, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            retry: RetryPolicy::default(),
            cache: Arc::new(WeatherCache::default()),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Share a cache between clients (and across requests).
    pub fn with_cache(mut self, cache: Arc<WeatherCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn cache(&self) -> &WeatherCache {
        &self.cache
    }

    async fn fetch(&self, point: Coordinate) -> Result<WeatherSample, ServiceError> {
        let url = format!("{}/weather", self.base_url);
        let lat = point.lat.to_string();
        let lon = point.lon.to_string();
        let response = self
            .client
            .get(url)
            .query(&[
                ("lat", lat.as_str()),
                ("lon", lon.as_str()),
                ("units", "metric"),
                ("appid", self.api_key.as_str()),
            ])
            .send()
            .await?;
        let payload: CurrentWeatherResponse = ensure_success(response).await?.json().await?;
        Ok(payload.into_sample(point))
    }
}

impl WeatherProvider for WeatherClient {
    async fn current(&self, point: Coordinate) -> Result<WeatherSample, ServiceError> {
        if let Some(hit) = self.cache.get(point) {
            return Ok(hit.at(point));
        }
        let sample = self.retry.run("weather", || self.fetch(point)).await?;
        self.cache.insert(point, sample.clone());
        Ok(sample)
    }
}
