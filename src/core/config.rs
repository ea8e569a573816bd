//! # Configuration
//!
//! Environment-driven settings for the bot and the reminder scheduler.
//! Call `dotenvy::dotenv()` before `Config::from_env()` to pick up a local `.env`.
//!
//! - **Version**: 2.0.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 2.0.0: Collection catalog, timezone and scheduler intervals
//! - 1.0.0: Initial env loading

use anyhow::{anyhow, Result};
use chrono_tz::Tz;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Public collection-point feed used when `CATALOG_URL` is not set
pub const DEFAULT_CATALOG_URL: &str =
    "https://raw.githubusercontent.com/Yukaii/garbage/data/trash-collection-points.json";

#[derive(Debug, Clone)]
pub struct Config {
    pub channel_access_token: String,
    pub database_path: String,
    pub catalog_url: String,
    pub timezone: Tz,
    pub log_level: String,
    pub dispatch_interval: Duration,
    pub cleanup_interval: Duration,
    /// How far before `now` the dispatch pass still looks for active reminders
    pub dispatch_horizon: chrono::Duration,
    pub default_advance_minutes: i64,
    pub nearby_radius_m: f64,
    pub nearest_limit: usize,
}

impl Config {
    /// Load configuration for the bot process. The push token is required.
    pub fn from_env() -> Result<Self> {
        let channel_access_token = env::var("LINE_CHANNEL_ACCESS_TOKEN")
            .map_err(|_| anyhow!("LINE_CHANNEL_ACCESS_TOKEN must be set"))?;
        if channel_access_token.trim().is_empty() {
            return Err(anyhow!("LINE_CHANNEL_ACCESS_TOKEN must not be empty"));
        }

        let mut config = Self::from_env_without_token()?;
        config.channel_access_token = channel_access_token;
        Ok(config)
    }

    /// Load everything except the push token, for tools that never notify.
    pub fn from_env_without_token() -> Result<Self> {
        let timezone_name = env_or("SERVICE_TIMEZONE", "Asia/Taipei");
        let timezone = Tz::from_str(&timezone_name)
            .map_err(|e| anyhow!("SERVICE_TIMEZONE is not a known zone ({timezone_name}): {e}"))?;

        Ok(Config {
            channel_access_token: String::new(),
            database_path: env_or("DATABASE_PATH", "garbage_bot.db"),
            catalog_url: env_or("CATALOG_URL", DEFAULT_CATALOG_URL),
            timezone,
            log_level: env_or("LOG_LEVEL", "info"),
            dispatch_interval: Duration::from_secs(parse_env("DISPATCH_INTERVAL_SECS", 60u64)?),
            cleanup_interval: Duration::from_secs(parse_env("CLEANUP_INTERVAL_SECS", 3600u64)?),
            dispatch_horizon: chrono::Duration::minutes(parse_env(
                "DISPATCH_HORIZON_MINUTES",
                5i64,
            )?),
            default_advance_minutes: parse_env("DEFAULT_ADVANCE_MINUTES", 10i64)?,
            nearby_radius_m: parse_env("NEARBY_RADIUS_METERS", 2000.0f64)?,
            nearest_limit: parse_env("NEAREST_LIMIT", 5usize)?,
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => value,
        _ => default.to_string(),
    }
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow!("Invalid value for {key} ({value}): {e}")),
        _ => Ok(default),
    }
}
