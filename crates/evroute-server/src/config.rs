//! Server configuration from environment.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use evroute_services::maps::DEFAULT_MAPS_BASE_URL;
use evroute_services::stations::DEFAULT_STATIONS_BASE_URL;
use evroute_services::weather::DEFAULT_WEATHER_BASE_URL;
use evroute_services::RetryPolicy;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_port: u16,
    pub maps_base_url: String,
    pub maps_api_key: String,
    pub weather_base_url: String,
    pub weather_api_key: String,
    pub stations_base_url: String,
    pub stations_api_key: String,
    pub http_timeout_s: u64,
    pub retries: u32,
    pub retry_base_ms: u64,
    /// Wall-clock budget for the charging simulation itself
    pub plan_timeout_ms: u64,
    pub weather_cache_ttl_s: u64,
    pub weather_cache_max: usize,
    /// Default charger search radius around each segment end
    pub station_radius_m: f64,
    /// Distance between directory probes along the route
    pub station_sample_spacing_m: f64,
    pub prefetch_concurrency: usize,
    pub log_json: bool,
}

fn parse_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            server_port: parse_or("EVROUTE_PORT", 3000),
            maps_base_url: env::var("GOOGLE_MAPS_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_MAPS_BASE_URL.to_string()),
            maps_api_key: env::var("GOOGLE_MAPS_API_KEY").unwrap_or_default(),
            weather_base_url: env::var("OPENWEATHER_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_WEATHER_BASE_URL.to_string()),
            weather_api_key: env::var("OPENWEATHER_API_KEY").unwrap_or_default(),
            stations_base_url: env::var("OPENCHARGEMAP_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_STATIONS_BASE_URL.to_string()),
            stations_api_key: env::var("OPENCHARGEMAP_API_KEY").unwrap_or_default(),
            http_timeout_s: parse_or("EVROUTE_HTTP_TIMEOUT_S", 10),
            retries: parse_or("EVROUTE_RETRIES", 2),
            retry_base_ms: parse_or("EVROUTE_RETRY_BASE_MS", 200),
            plan_timeout_ms: parse_or("EVROUTE_PLAN_TIMEOUT_MS", 5_000),
            weather_cache_ttl_s: parse_or("EVROUTE_WEATHER_CACHE_TTL_S", 600),
            weather_cache_max: parse_or("EVROUTE_WEATHER_CACHE_MAX", 4_096),
            station_radius_m: parse_or("EVROUTE_STATION_RADIUS_M", 5_000.0),
            station_sample_spacing_m: parse_or("EVROUTE_STATION_SAMPLE_SPACING_M", 25_000.0),
            prefetch_concurrency: parse_or("EVROUTE_PREFETCH_CONCURRENCY", 8),
            log_json: env::var("EVROUTE_LOG_JSON")
                .map(|v| matches!(v.trim(), "1" | "true" | "yes"))
                .unwrap_or(false),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        let base_delay = Duration::from_millis(self.retry_base_ms.max(1));
        RetryPolicy {
            max_retries: self.retries,
            base_delay,
            max_delay: base_delay.saturating_mul(8),
        }
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_s.max(1))
    }

    pub fn plan_timeout(&self) -> Duration {
        Duration::from_millis(self.plan_timeout_ms.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_policy_scales_from_base() {
        let mut config = Config::from_env();
        config.retries = 1;
        config.retry_base_ms = 50;
        let policy = config.retry_policy();
        assert_eq!(policy.max_retries, 1);
        assert_eq!(policy.base_delay, Duration::from_millis(50));
        assert_eq!(policy.max_delay, Duration::from_millis(400));
    }

    #[test]
    fn zero_timeouts_are_clamped() {
        let mut config = Config::from_env();
        config.http_timeout_s = 0;
        config.plan_timeout_ms = 0;
        assert_eq!(config.http_timeout(), Duration::from_secs(1));
        assert_eq!(config.plan_timeout(), Duration::from_millis(1));
    }
}
