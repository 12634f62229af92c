//! Loads `AppConfig` from defaults, config.toml, .env and the process environment.

use common::config::AppConfig;
use common::Error;
use std::path::Path;

const MAX_WINDOW_DAYS: u32 = 14;
const MAX_TIMEOUT_SECS: u64 = 60;

fn parse_u64(raw: &str, env_name: &str) -> Result<u64, Error> {
    raw.trim()
        .parse::<u64>()
        .map_err(|_| Error::Config(format!("{env_name} must be an integer >= 0")))
}

fn parse_u32(raw: &str, env_name: &str) -> Result<u32, Error> {
    raw.trim()
        .parse::<u32>()
        .map_err(|_| Error::Config(format!("{env_name} must be an integer >= 0")))
}

fn parse_f64(raw: &str, env_name: &str) -> Result<f64, Error> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| Error::Config(format!("{env_name} must be a number")))
}

fn validate_config(config: &AppConfig) -> Result<(), Error> {
    let mut issues: Vec<String> = Vec::new();

    if config.prediction_url.trim().is_empty() {
        issues.push("PREDICTION_API_URL is required (set in .env or environment)".into());
    }
    if let Err(e) = config.reference_tz() {
        issues.push(e.to_string());
    }
    if config.server.bind_addr.trim().is_empty() {
        issues.push("server.bind_addr must not be empty".into());
    }

    if config.weather.base_url.trim().is_empty() {
        issues.push("weather.base_url must not be empty".into());
    }
    if !(-90.0..=90.0).contains(&config.weather.latitude) {
        issues.push("weather.latitude must be in [-90,90]".into());
    }
    if !(-180.0..=180.0).contains(&config.weather.longitude) {
        issues.push("weather.longitude must be in [-180,180]".into());
    }
    if config.weather.hourly_fields.is_empty() {
        issues.push("weather.hourly_fields must contain at least one field".into());
    }
    if config.tide.base_url.trim().is_empty() {
        issues.push("tide.base_url must not be empty".into());
    }

    if config.refresh.days_back > MAX_WINDOW_DAYS {
        issues.push(format!("refresh.days_back must be <= {MAX_WINDOW_DAYS}"));
    }
    if config.refresh.days_ahead > MAX_WINDOW_DAYS {
        issues.push(format!("refresh.days_ahead must be <= {MAX_WINDOW_DAYS}"));
    }
    if config.refresh.request_timeout_secs == 0
        || config.refresh.request_timeout_secs >= MAX_TIMEOUT_SECS
    {
        issues.push(format!(
            "refresh.request_timeout_secs must be in [1,{}]",
            MAX_TIMEOUT_SECS - 1
        ));
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(Error::Config(format!(
            "Invalid config:\n - {}",
            issues.join("\n - ")
        )))
    }
}

/// Apply environment overrides on top of `config`.
fn apply_env(
    config: &mut AppConfig,
    var: impl Fn(&str) -> Option<String>,
) -> Result<(), Error> {
    if let Some(url) = var("PREDICTION_API_URL") {
        config.prediction_url = url.trim().to_string();
    }
    if let Some(secret) = var("CRON_SECRET_KEY") {
        config.refresh_secret = secret;
    }
    if let Some(tz) = var("FORECAST_TIMEZONE") {
        config.timezone = tz.trim().to_string();
    }
    if let Some(addr) = var("BIND_ADDR") {
        config.server.bind_addr = addr.trim().to_string();
    } else if let Some(port) = var("PORT") {
        let port = port
            .trim()
            .parse::<u16>()
            .map_err(|_| Error::Config("PORT must be a valid TCP port".into()))?;
        config.server.bind_addr = format!("0.0.0.0:{port}");
    }
    if let Some(raw) = var("REFRESH_INTERVAL_SECS") {
        config.refresh.interval_secs = parse_u64(&raw, "REFRESH_INTERVAL_SECS")?;
    }
    if let Some(raw) = var("REFRESH_LAUNCH_INTERVAL_MS") {
        config.refresh.launch_interval_ms = parse_u64(&raw, "REFRESH_LAUNCH_INTERVAL_MS")?;
    }
    if let Some(raw) = var("UPSTREAM_TIMEOUT_SECS") {
        config.refresh.request_timeout_secs = parse_u64(&raw, "UPSTREAM_TIMEOUT_SECS")?;
    }
    if let Some(url) = var("WEATHER_API_URL") {
        config.weather.base_url = url.trim().to_string();
    }
    if let Some(raw) = var("WEATHER_LATITUDE") {
        config.weather.latitude = parse_f64(&raw, "WEATHER_LATITUDE")?;
    }
    if let Some(raw) = var("WEATHER_LONGITUDE") {
        config.weather.longitude = parse_f64(&raw, "WEATHER_LONGITUDE")?;
    }
    if let Some(url) = var("TIDE_API_URL") {
        config.tide.base_url = url.trim().to_string();
    }
    if let Some(raw) = var("TIDE_PREFECTURE_CODE") {
        config.tide.prefecture_code = parse_u32(&raw, "TIDE_PREFECTURE_CODE")?;
    }
    if let Some(raw) = var("TIDE_HARBOR_CODE") {
        config.tide.harbor_code = parse_u32(&raw, "TIDE_HARBOR_CODE")?;
    }
    Ok(())
}

/// Load server configuration from environment and optional config file.
pub fn load_config() -> Result<AppConfig, Error> {
    // 1. Load .env file from project root or parent directories.
    if let Err(e) = dotenvy::dotenv() {
        tracing::debug!("No .env file loaded: {}", e);
    }

    // 2. Start with defaults.
    let mut config = AppConfig::default();

    // 3. Try loading config.toml if it exists.
    let config_path = Path::new("config.toml");
    if config_path.exists() {
        let contents = std::fs::read_to_string(config_path)
            .map_err(|e| Error::Config(format!("Failed to read config.toml: {}", e)))?;
        config = toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse config.toml: {}", e)))?;
    }

    // 4. Override with environment variables (highest priority).
    apply_env(&mut config, |key| std::env::var(key).ok())?;

    // 5. Validate.
    validate_config(&config)?;

    if config.refresh_secret.is_empty() {
        tracing::warn!("CRON_SECRET_KEY is not set; the refresh endpoint will reject every call");
    }

    Ok(config)
}
