use std::env;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;

use crate::workflows::enrollment::{CohortPolicy, Level, LevelDefaults};

/// Deployment stage, read from `APP_ENV`. Unknown values fall back to development.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Everything the service binary reads from the environment at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub cohorts: CohortConfig,
}

impl AppConfig {
    /// Reads `.env` when present, then the `APP_*` variables.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let server = ServerConfig {
            host: env_or("APP_HOST", "127.0.0.1"),
            port: read_number("APP_PORT", 3000)?,
        };
        let telemetry = TelemetryConfig {
            log_level: env_or("APP_LOG_LEVEL", "info"),
        };

        let defaults = CohortConfig::default();
        let cohorts = CohortConfig {
            sessions_per_cycle: read_number("APP_COHORT_SESSIONS", defaults.sessions_per_cycle)?,
            inicial_capacity: read_number("APP_CAPACITY_INICIAL", defaults.inicial_capacity)?,
            avanzado_capacity: read_number("APP_CAPACITY_AVANZADO", defaults.avanzado_capacity)?,
            programa_lider_capacity: read_number(
                "APP_CAPACITY_PROGRAMA_LIDER",
                defaults.programa_lider_capacity,
            )?,
        };

        Ok(Self {
            environment: AppEnvironment::parse(&env_or("APP_ENV", "development")),
            server,
            telemetry,
            cohorts,
        })
    }
}

fn env_or(var: &str, default: &str) -> String {
    env::var(var)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Parses a strictly positive number, keeping `default` when the variable is unset.
fn read_number<T>(var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr + PartialOrd + From<u8>,
{
    let Ok(raw) = env::var(var) else {
        return Ok(default);
    };
    match raw.trim().parse::<T>() {
        Ok(value) if value > T::from(0) => Ok(value),
        _ => Err(ConfigError::InvalidNumber { var, value: raw }),
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    /// `localhost` is accepted as an alias for the IPv4 loopback.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip = if self.host.eq_ignore_ascii_case("localhost") {
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        } else {
            self.host
                .parse()
                .map_err(|source| ConfigError::InvalidHost {
                    host: self.host.clone(),
                    source,
                })?
        };
        Ok(SocketAddr::new(ip, self.port))
    }
}

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Fallback filter directive when `RUST_LOG` is unset.
    pub log_level: String,
}

/// Level defaults applied when staff open a new cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CohortConfig {
    pub sessions_per_cycle: u16,
    pub inicial_capacity: u32,
    pub avanzado_capacity: u32,
    pub programa_lider_capacity: u32,
}

impl Default for CohortConfig {
    fn default() -> Self {
        Self {
            sessions_per_cycle: 4,
            inicial_capacity: 30,
            avanzado_capacity: 20,
            programa_lider_capacity: 20,
        }
    }
}

impl CohortConfig {
    pub fn policy(&self) -> CohortPolicy {
        let defaults = |capacity| LevelDefaults {
            capacity,
            session_count: self.sessions_per_cycle,
        };
        CohortPolicy::default()
            .with_level(Level::Inicial, defaults(self.inicial_capacity))
            .with_level(Level::Avanzado, defaults(self.avanzado_capacity))
            .with_level(Level::ProgramaLider, defaults(self.programa_lider_capacity))
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidHost {
        host: String,
        source: std::net::AddrParseError,
    },
    InvalidNumber {
        var: &'static str,
        value: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidHost { host, .. } => {
                write!(f, "APP_HOST '{host}' is neither localhost nor an IP address")
            }
            ConfigError::InvalidNumber { var, value } => {
                write!(f, "{var} must be a positive integer (found '{value}')")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source, .. } => Some(source),
            ConfigError::InvalidNumber { .. } => None,
        }
    }
}
