use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

use chrono::NaiveDate;

use crate::financing::FinancingTerms;

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
    pub financing: FinancingConfig,
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
        let log_format = LogFormat::from_str(
            &env::var("APP_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string()),
        );

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig {
                log_level,
                log_format,
            },
            financing: FinancingConfig::from_env()?,
        })
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

/// Output layout for the fmt subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Pretty,
}

impl LogFormat {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "pretty" => Self::Pretty,
            _ => Self::Compact,
        }
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub log_format: LogFormat,
}

/// Contract terms and calendar settings for the financing module.
#[derive(Debug, Clone)]
pub struct FinancingConfig {
    pub term_months: u32,
    pub annual_rate: f64,
    pub calendar_start: NaiveDate,
    pub carbon_per_dollar: f64,
}

impl Default for FinancingConfig {
    fn default() -> Self {
        Self {
            term_months: 240,
            annual_rate: 0.04,
            calendar_start: NaiveDate::from_ymd_opt(2020, 1, 1)
                .unwrap_or(NaiveDate::MIN),
            carbon_per_dollar: 0.5,
        }
    }
}

impl FinancingConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let term_months = match env::var("FINANCING_TERM_MONTHS") {
            Ok(raw) => match raw.trim().parse::<u32>() {
                Ok(months) if months > 0 => months,
                _ => return Err(ConfigError::invalid("FINANCING_TERM_MONTHS", raw)),
            },
            Err(_) => defaults.term_months,
        };

        let annual_rate = match env::var("FINANCING_ANNUAL_RATE") {
            Ok(raw) => match raw.trim().parse::<f64>() {
                Ok(rate) if rate.is_finite() && rate >= 0.0 => rate,
                _ => return Err(ConfigError::invalid("FINANCING_ANNUAL_RATE", raw)),
            },
            Err(_) => defaults.annual_rate,
        };

        let calendar_start = match env::var("FINANCING_CALENDAR_START") {
            Ok(raw) => NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
                .map_err(|_| ConfigError::invalid("FINANCING_CALENDAR_START", raw))?,
            Err(_) => defaults.calendar_start,
        };

        let carbon_per_dollar = match env::var("FINANCING_CARBON_PER_DOLLAR") {
            Ok(raw) => match raw.trim().parse::<f64>() {
                Ok(factor) if factor.is_finite() && factor >= 0.0 => factor,
                _ => return Err(ConfigError::invalid("FINANCING_CARBON_PER_DOLLAR", raw)),
            },
            Err(_) => defaults.carbon_per_dollar,
        };

        Ok(Self {
            term_months,
            annual_rate,
            calendar_start,
            carbon_per_dollar,
        })
    }

    pub fn terms(&self) -> FinancingTerms {
        FinancingTerms {
            term_months: self.term_months,
            annual_rate: self.annual_rate,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidValue { key: &'static str, value: String },
}

impl ConfigError {
    fn invalid(key: &'static str, value: String) -> Self {
        Self::InvalidValue { key, value }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidValue { key, value } => {
                write!(f, "{key} has an invalid value '{value}'")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort | ConfigError::InvalidValue { .. } => None,
        }
    }
}
