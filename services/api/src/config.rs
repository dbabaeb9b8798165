//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use attendance_core::leave::LeavePolicy;
use attendance_core::location::{Coordinates, OfficeLocation};
use std::net::SocketAddr;
use std::str::FromStr;
use tracing::Level;

const MAX_RATE_LIMIT_WINDOW_SECS: u64 = 24 * 60 * 60;
const MAX_SESSION_TTL_DAYS: i64 = 365;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Per-client request budget for the expensive endpoints.
#[derive(Clone, Copy, Debug)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub window_secs: u64,
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub log_level: Level,
    pub cors_origin: String,
    pub openai_api_key: Option<String>,
    pub openai_api_base: Option<String>,
    /// Models tried in order until one answers.
    pub chat_models: Vec<String>,
    pub office: Option<OfficeLocation>,
    pub leave_policy: LeavePolicy,
    pub rate_limit: RateLimitConfig,
    pub session_ttl_days: i64,
}

/// Reads an optional variable and parses it, falling back to `default` when unset.
fn parse_var<T>(name: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string())),
        Err(_) => Ok(default),
    }
}

/// Rejects values outside `[min, max]`.
fn in_range<T>(name: &str, value: T, min: T, max: T) -> Result<T, ConfigError>
where
    T: PartialOrd + std::fmt::Display,
{
    if value < min || value > max {
        return Err(ConfigError::InvalidValue(
            name.to_string(),
            format!("{} is outside {}..={}", value, min, max),
        ));
    }
    Ok(value)
}

fn parse_optional_var<T>(name: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string())),
        Err(_) => Ok(None),
    }
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        // --- Load Server and Database Settings ---
        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| ConfigError::MissingVar("DATABASE_URL".to_string()))?;

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let cors_origin = std::env::var("CORS_ORIGIN")
            .unwrap_or_else(|_| "http://localhost:3000".to_string());

        // --- Load AI Gateway Settings (key is optional) ---
        let openai_api_key = std::env::var("OPENAI_API_KEY").ok();
        let openai_api_base = std::env::var("OPENAI_API_BASE").ok();
        let chat_models = parse_model_list(
            &std::env::var("CHAT_MODELS").unwrap_or_else(|_| "gpt-4o-mini,gpt-4o".to_string()),
        )?;

        // --- Load Office Location ---
        let office = match (
            parse_optional_var::<f64>("OFFICE_LATITUDE")?,
            parse_optional_var::<f64>("OFFICE_LONGITUDE")?,
        ) {
            (Some(latitude), Some(longitude)) => {
                let center = Coordinates::new(latitude, longitude).map_err(|e| {
                    ConfigError::InvalidValue("OFFICE_LATITUDE".to_string(), e.to_string())
                })?;
                Some(OfficeLocation {
                    center,
                    radius_meters: parse_var("OFFICE_RADIUS_METERS", 200.0)?,
                })
            }
            (None, None) => None,
            _ => {
                return Err(ConfigError::InvalidValue(
                    "OFFICE_LATITUDE".to_string(),
                    "OFFICE_LATITUDE and OFFICE_LONGITUDE must be set together".to_string(),
                ))
            }
        };

        // --- Load Leave and Rate Limit Settings ---
        let leave_policy = LeavePolicy {
            accrual_per_month: parse_var("LEAVE_ACCRUAL_PER_MONTH", 1.5)?,
            annual_cap: parse_var("LEAVE_ANNUAL_CAP", 18.0)?,
        };
        let rate_limit = RateLimitConfig {
            max_requests: parse_var("RATE_LIMIT_MAX_REQUESTS", 20)?,
            window_secs: in_range(
                "RATE_LIMIT_WINDOW_SECS",
                parse_var("RATE_LIMIT_WINDOW_SECS", 60)?,
                1,
                MAX_RATE_LIMIT_WINDOW_SECS,
            )?,
        };
        let session_ttl_days = in_range(
            "SESSION_TTL_DAYS",
            parse_var("SESSION_TTL_DAYS", 30)?,
            1,
            MAX_SESSION_TTL_DAYS,
        )?;

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            cors_origin,
            openai_api_key,
            openai_api_base,
            chat_models,
            office,
            leave_policy,
            rate_limit,
            session_ttl_days,
        })
    }
}

fn parse_model_list(raw: &str) -> Result<Vec<String>, ConfigError> {
    let models: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
        .collect();
    if models.is_empty() {
        return Err(ConfigError::InvalidValue(
            "CHAT_MODELS".to_string(),
            "at least one model is required".to_string(),
        ));
    }
    Ok(models)
}
