use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::ops::RangeInclusive;
use std::str::FromStr;

use crate::workflows::credit::evaluation::EvaluationConfig;

/// Upper bound for `SESSION_TTL_MINUTES` (30 days).
pub const MAX_SESSION_TTL_MINUTES: i64 = 30 * 24 * 60;

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
    pub session: SessionConfig,
    pub storage: StorageConfig,
    pub evaluation: EvaluationConfig,
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

        let ttl_minutes =
            bounded_var("SESSION_TTL_MINUTES", 480_i64, 1..=MAX_SESSION_TTL_MINUTES)?;

        let bucket = env::var("STORAGE_BUCKET").unwrap_or_else(|_| "motocredito".to_string());
        let public_base_url = env::var("STORAGE_PUBLIC_URL")
            .unwrap_or_else(|_| "https://storage.local".to_string());

        let defaults = EvaluationConfig::default();
        let evaluation = EvaluationConfig {
            approve_threshold: bounded_var(
                "EVAL_APPROVE_THRESHOLD",
                defaults.approve_threshold,
                0.0..=100.0,
            )?,
            conditional_threshold: bounded_var(
                "EVAL_CONDITIONAL_THRESHOLD",
                defaults.conditional_threshold,
                0.0..=100.0,
            )?,
            ..defaults
        };
        if evaluation.conditional_threshold > evaluation.approve_threshold {
            return Err(ConfigError::InvalidThresholds {
                approve: evaluation.approve_threshold,
                conditional: evaluation.conditional_threshold,
            });
        }

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            session: SessionConfig { ttl_minutes },
            storage: StorageConfig {
                bucket,
                public_base_url,
            },
            evaluation,
        })
    }
}

fn numeric_var<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidNumber { key }),
        Err(_) => Ok(default),
    }
}

/// Like [`numeric_var`] but also rejects values outside `range` (and NaN).
fn bounded_var<T>(key: &'static str, default: T, range: RangeInclusive<T>) -> Result<T, ConfigError>
where
    T: FromStr + PartialOrd,
{
    let value = numeric_var(key, default)?;
    if range.contains(&value) {
        Ok(value)
    } else {
        Err(ConfigError::InvalidNumber { key })
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

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Lifetime of cached authentication sessions.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub ttl_minutes: i64,
}

/// Where uploaded documents and product images land.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub bucket: String,
    pub public_base_url: String,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { key: &'static str },
    InvalidThresholds { approve: f64, conditional: f64 },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { source } => {
                write!(f, "APP_HOST must be an IP address or localhost: {source}")
            }
            ConfigError::InvalidNumber { key } => {
                write!(f, "{key} must be a number within its allowed range")
            }
            ConfigError::InvalidThresholds {
                approve,
                conditional,
            } => write!(
                f,
                "EVAL_CONDITIONAL_THRESHOLD ({conditional}) cannot exceed EVAL_APPROVE_THRESHOLD ({approve})"
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort
            | ConfigError::InvalidNumber { .. }
            | ConfigError::InvalidThresholds { .. } => None,
            ConfigError::InvalidHost { source } => Some(source),
        }
    }
}
