use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use chrono::NaiveDate;

use crate::leads::retention::DEFAULT_RETENTION_MONTHS;
use crate::leads::Platform;
use crate::simulation::PolicyOverrides;

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
    pub simulation: SimulationConfig,
    pub leads: LeadsConfig,
    pub email: EmailConfig,
}

fn var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn var_or(name: &str, default: &str) -> String {
    var(name).unwrap_or_else(|| default.to_string())
}

fn parse_bool(name: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" | "oui" => Ok(true),
        "0" | "false" | "no" | "off" | "non" => Ok(false),
        _ => Err(ConfigError::InvalidBool {
            var: name,
            value: raw.to_string(),
        }),
    }
}

fn parse_date(name: &'static str, raw: &str) -> Result<NaiveDate, ConfigError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|source| ConfigError::InvalidDate {
        var: name,
        value: raw.to_string(),
        source,
    })
}

fn bool_var(name: &'static str) -> Result<Option<bool>, ConfigError> {
    var(name).map(|raw| parse_bool(name, &raw)).transpose()
}

/// Policy overrides taken from the environment, applied on top of the default flags.
fn policy_overrides() -> Result<PolicyOverrides, ConfigError> {
    const DEFICIT: &str = "JEANBRUN_DEFICIT_DOUBLE_UNTIL";

    let deficit_double_jusqu_au = match var(DEFICIT) {
        None => None,
        Some(raw) if raw.eq_ignore_ascii_case("none") => Some(None),
        Some(raw) => Some(Some(parse_date(DEFICIT, &raw)?)),
    };

    Ok(PolicyOverrides {
        exoneration_plus_value_17_ans: bool_var("JEANBRUN_PV_EXEMPTION_17")?,
        deficit_double_jusqu_au,
        reintegration_amortissements: bool_var("JEANBRUN_REINTEGRATION_AMORTISSEMENTS")?,
        dispositif_debut: None,
        dispositif_fin: None,
    })
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(&var_or("APP_ENV", "development"));

        let host = var_or("APP_HOST", "127.0.0.1");
        let port = var_or("APP_PORT", "3000")
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = var_or("APP_LOG_LEVEL", "info");

        let platform = var_or("JEANBRUN_PLATFORM", "jeanbrun")
            .parse::<Platform>()
            .map_err(|_| ConfigError::InvalidPlatform)?;

        let retention_months = match var("JEANBRUN_RETENTION_MONTHS") {
            Some(raw) => raw
                .parse::<u32>()
                .ok()
                .filter(|months| *months > 0)
                .ok_or(ConfigError::InvalidNumber {
                    var: "JEANBRUN_RETENTION_MONTHS",
                    value: raw,
                })?,
            None => DEFAULT_RETENTION_MONTHS,
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig {
                log_level,
                with_target: environment != AppEnvironment::Production,
            },
            simulation: SimulationConfig {
                bareme_path: var("JEANBRUN_BAREME_PATH").map(PathBuf::from),
                policy: policy_overrides()?,
            },
            leads: LeadsConfig {
                platform,
                partners_csv: var("JEANBRUN_PARTNERS_CSV").map(PathBuf::from),
                retention_months,
                public_url: var_or("JEANBRUN_PUBLIC_URL", "https://www.simulateur-loi-jeanbrun.fr"),
            },
            email: EmailConfig {
                sender_email: var_or("JEANBRUN_SENDER_EMAIL", "noreply@simulateur-jeanbrun.fr"),
                sender_name: var_or("JEANBRUN_SENDER_NAME", "Simulateur Jeanbrun"),
                brevo_api_key: var("BREVO_API_KEY"),
            },
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

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub with_target: bool,
}

/// Fiscal table source and policy overrides.
#[derive(Debug, Clone, Default)]
pub struct SimulationConfig {
    pub bareme_path: Option<PathBuf>,
    pub policy: PolicyOverrides,
}

#[derive(Debug, Clone)]
pub struct LeadsConfig {
    pub platform: Platform,
    pub partners_csv: Option<PathBuf>,
    pub retention_months: u32,
    pub public_url: String,
}

/// Sender identity; emails are only logged when no Brevo key is set.
#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub sender_email: String,
    pub sender_name: String,
    pub brevo_api_key: Option<String>,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost {
        source: std::net::AddrParseError,
    },
    InvalidPlatform,
    InvalidBool {
        var: &'static str,
        value: String,
    },
    InvalidDate {
        var: &'static str,
        value: String,
        source: chrono::ParseError,
    },
    InvalidNumber {
        var: &'static str,
        value: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidPlatform => {
                write!(f, "JEANBRUN_PLATFORM must be 'jeanbrun' or 'stop-loyer'")
            }
            ConfigError::InvalidBool { var, value } => {
                write!(f, "{var} must be a boolean, got '{value}'")
            }
            ConfigError::InvalidDate { var, value, .. } => {
                write!(f, "{var} must be a YYYY-MM-DD date or 'none', got '{value}'")
            }
            ConfigError::InvalidNumber { var, value } => {
                write!(f, "{var} must be a positive integer, got '{value}'")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidDate { source, .. } => Some(source),
            _ => None,
        }
    }
}
