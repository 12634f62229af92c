//! Server configuration types.

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Top-level server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Prediction feed endpoint. Required.
    #[serde(default)]
    pub prediction_url: String,

    /// Shared secret expected in `X-Cron-Secret` on the refresh endpoint.
    /// Empty disables the endpoint.
    #[serde(default)]
    pub refresh_secret: String,

    /// IANA name of the reference timezone used for "today".
    #[serde(default = "default_timezone")]
    pub timezone: String,

    /// HTTP listener settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Weather upstream parameters.
    #[serde(default)]
    pub weather: WeatherConfig,

    /// Tide upstream parameters.
    #[serde(default)]
    pub tide: TideConfig,

    /// Refresh cycle parameters.
    #[serde(default)]
    pub refresh: RefreshConfig,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Socket address to bind (e.g. "0.0.0.0:8080").
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

/// Weather API parameters (Open-Meteo compatible).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    #[serde(default = "default_weather_url")]
    pub base_url: String,
    #[serde(default = "default_latitude")]
    pub latitude: f64,
    #[serde(default = "default_longitude")]
    pub longitude: f64,
    /// Hourly fields requested from the API.
    #[serde(default = "default_hourly_fields")]
    pub hourly_fields: Vec<String>,
    #[serde(default = "default_wind_speed_unit")]
    pub wind_speed_unit: String,
}

/// Tide API parameters (tide736 compatible).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TideConfig {
    #[serde(default = "default_tide_url")]
    pub base_url: String,
    /// Prefecture code (`pc`).
    #[serde(default = "default_prefecture_code")]
    pub prefecture_code: u32,
    /// Harbour code (`hc`).
    #[serde(default = "default_harbor_code")]
    pub harbor_code: u32,
}

/// Refresh cycle configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshConfig {
    /// Days before today included in each cycle.
    #[serde(default = "default_days_back")]
    pub days_back: u32,

    /// Days after today included in each cycle.
    #[serde(default = "default_days_ahead")]
    pub days_ahead: u32,

    /// Delay before each per-day task launch (milliseconds).
    #[serde(default = "default_launch_interval_ms")]
    pub launch_interval_ms: u64,

    /// Scheduled refresh period in seconds. 0 disables the internal timer.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Per-request upstream timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl AppConfig {
    /// Resolve the configured reference timezone.
    pub fn reference_tz(&self) -> Result<Tz, Error> {
        self.timezone
            .trim()
            .parse::<Tz>()
            .map_err(|_| Error::Config(format!("unknown timezone: {}", self.timezone)))
    }
}

// ── Defaults ──────────────────────────────────────────────────────────

fn default_timezone() -> String {
    "Asia/Tokyo".into()
}
fn default_bind_addr() -> String {
    "0.0.0.0:8080".into()
}

fn default_weather_url() -> String {
    "https://api.open-meteo.com/v1/forecast".into()
}
fn default_latitude() -> f64 {
    36.76
}
fn default_longitude() -> f64 {
    137.24
}
fn default_hourly_fields() -> Vec<String> {
    vec![
        "temperature_2m".into(),
        "precipitation".into(),
        "precipitation_probability".into(),
        "weather_code".into(),
        "wind_speed_10m".into(),
        "wind_direction_10m".into(),
    ]
}
fn default_wind_speed_unit() -> String {
    "ms".into()
}

fn default_tide_url() -> String {
    "https://tide736.net/api/get_tide.php".into()
}
fn default_prefecture_code() -> u32 {
    16
}
fn default_harbor_code() -> u32 {
    3
}

fn default_days_back() -> u32 {
    1
}
fn default_days_ahead() -> u32 {
    6
}
fn default_launch_interval_ms() -> u64 {
    250
}
fn default_interval_secs() -> u64 {
    3600
}
fn default_timeout_secs() -> u64 {
    8
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            base_url: default_weather_url(),
            latitude: default_latitude(),
            longitude: default_longitude(),
            hourly_fields: default_hourly_fields(),
            wind_speed_unit: default_wind_speed_unit(),
        }
    }
}

impl Default for TideConfig {
    fn default() -> Self {
        Self {
            base_url: default_tide_url(),
            prefecture_code: default_prefecture_code(),
            harbor_code: default_harbor_code(),
        }
    }
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            days_back: default_days_back(),
            days_ahead: default_days_ahead(),
            launch_interval_ms: default_launch_interval_ms(),
            interval_secs: default_interval_secs(),
            request_timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            prediction_url: String::new(),
            refresh_secret: String::new(),
            timezone: default_timezone(),
            server: ServerConfig::default(),
            weather: WeatherConfig::default(),
            tide: TideConfig::default(),
            refresh: RefreshConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_cover_eight_day_window() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.refresh.days_back + cfg.refresh.days_ahead + 1, 8);
        assert_eq!(cfg.refresh.launch_interval_ms, 250);
        assert_eq!(cfg.tide.prefecture_code, 16);
        assert_eq!(cfg.weather.hourly_fields.len(), 6);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let cfg: AppConfig = from_json(
            r#"{"prediction_url": "https://example.com/predict", "refresh": {"days_ahead": 3}}"#,
        );
        assert_eq!(cfg.prediction_url, "https://example.com/predict");
        assert_eq!(cfg.refresh.days_ahead, 3);
        assert_eq!(cfg.refresh.days_back, 1);
        assert_eq!(cfg.timezone, "Asia/Tokyo");
    }

    #[test]
    fn test_reference_tz() {
        let mut cfg = AppConfig::default();
        assert_eq!(cfg.reference_tz().expect("default tz"), chrono_tz::Asia::Tokyo);

        cfg.timezone = "Mars/Olympus".into();
        assert!(matches!(cfg.reference_tz(), Err(Error::Config(_))));
    }

    fn from_json(json: &str) -> AppConfig {
        serde_json::from_str(json).expect("config should deserialize")
    }
}
