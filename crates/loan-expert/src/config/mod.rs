use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use crate::inference::{ChainingMode, ConflictStrategy, EngineConfig};

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
    pub engine: EngineConfig,
    pub dataset: DatasetConfig,
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

        let engine = EngineConfig::from_env()?;
        let dataset = DatasetConfig {
            path: env::var("LOAN_DATASET_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_DATASET_PATH)),
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            engine,
            dataset,
        })
    }
}

pub const DEFAULT_DATASET_PATH: &str = "data/applicants.json";

impl EngineConfig {
    /// Read the `LOAN_*` engine variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = EngineConfig::default();

        let chaining_mode = match env::var("LOAN_CHAINING_MODE") {
            Ok(value) => ChainingMode::parse(&value)
                .ok_or(ConfigError::InvalidChainingMode { value })?,
            Err(_) => defaults.chaining_mode,
        };

        let conflict_strategy = match env::var("LOAN_CONFLICT_STRATEGY") {
            Ok(value) => ConflictStrategy::parse(&value)
                .ok_or(ConfigError::InvalidConflictStrategy { value })?,
            Err(_) => defaults.conflict_strategy,
        };

        let trace_capacity = match env::var("LOAN_TRACE_CAPACITY") {
            Ok(value) => match value.trim().parse::<usize>() {
                Ok(capacity) if capacity > 0 => capacity,
                _ => return Err(ConfigError::InvalidTraceCapacity { value }),
            },
            Err(_) => defaults.trace_capacity,
        };

        let parallel_batch = match env::var("LOAN_PARALLEL_BATCH") {
            Ok(value) => parse_flag(&value).ok_or(ConfigError::InvalidFlag {
                name: "LOAN_PARALLEL_BATCH",
                value,
            })?,
            Err(_) => defaults.parallel_batch,
        };

        Ok(Self {
            chaining_mode,
            conflict_strategy,
            trace_capacity,
            parallel_batch,
        })
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
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

/// Location of the reference applicant list served by the API.
#[derive(Debug, Clone)]
pub struct DatasetConfig {
    pub path: PathBuf,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidChainingMode { value: String },
    InvalidConflictStrategy { value: String },
    InvalidTraceCapacity { value: String },
    InvalidFlag { name: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidChainingMode { value } => write!(
                f,
                "LOAN_CHAINING_MODE must be forward, backward or both (got '{}')",
                value
            ),
            ConfigError::InvalidConflictStrategy { value } => write!(
                f,
                "LOAN_CONFLICT_STRATEGY must be priority_specificity or specificity_priority (got '{}')",
                value
            ),
            ConfigError::InvalidTraceCapacity { value } => write!(
                f,
                "LOAN_TRACE_CAPACITY must be a positive integer (got '{}')",
                value
            ),
            ConfigError::InvalidFlag { name, value } => {
                write!(f, "{} must be true or false (got '{}')", name, value)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            _ => None,
        }
    }
}
