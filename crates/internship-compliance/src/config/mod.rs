use crate::obligations::ObligationPolicy;
use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub obligations: ObligationPolicy,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            obligations: load_obligation_policy()?,
        })
    }
}

/// Read policy overrides from `OBLIGATION_*`, defaulting anything unset.
fn load_obligation_policy() -> Result<ObligationPolicy, ConfigError> {
    let defaults = ObligationPolicy::default();

    let policy = ObligationPolicy {
        min_days_for_inclusion: env_or(
            "OBLIGATION_MIN_DAYS_FOR_INCLUSION",
            defaults.min_days_for_inclusion,
        )?,
        report_due_day_of_next_month: env_or(
            "OBLIGATION_REPORT_DUE_DAY",
            defaults.report_due_day_of_next_month,
        )?,
        report_window_grace_days: env_or(
            "OBLIGATION_REPORT_WINDOW_GRACE_DAYS",
            defaults.report_window_grace_days,
        )?,
        visit_due_at_month_end: env_or(
            "OBLIGATION_VISIT_DUE_AT_MONTH_END",
            defaults.visit_due_at_month_end,
        )?,
        max_segments: env_or("OBLIGATION_MAX_SEGMENTS", defaults.max_segments)?,
        min_interval_weeks: env_or(
            "OBLIGATION_MIN_INTERVAL_WEEKS",
            defaults.min_interval_weeks,
        )?,
    };

    if !(1..=31).contains(&policy.report_due_day_of_next_month) {
        return Err(ConfigError::InvalidPolicyValue {
            key: "OBLIGATION_REPORT_DUE_DAY",
            value: policy.report_due_day_of_next_month.to_string(),
        });
    }
    if policy.max_segments == 0 {
        return Err(ConfigError::InvalidPolicyValue {
            key: "OBLIGATION_MAX_SEGMENTS",
            value: "0".to_string(),
        });
    }

    Ok(policy)
}

fn env_or<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidPolicyValue { key, value: raw }),
        Err(_) => Ok(default),
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidPolicyValue { key: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidPolicyValue { key, value } => {
                write!(f, "{key} has an invalid value '{value}'")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort | ConfigError::InvalidPolicyValue { .. } => None,
            ConfigError::InvalidHost { source } => Some(source),
        }
    }
}
