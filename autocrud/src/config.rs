//! Runtime configuration read from the environment.
//!
//! | variable | default |
//! |---|---|
//! | `AUTOCRUD_ADDRESS` | `0.0.0.0:8080` |
//! | `AUTOCRUD_REQUEST_TIMEOUT_MS` | unset, no deadline (`0` also disables it) |
//! | `DATABASE_URL` | unset, no storage is opened |
//! | `AUTOCRUD_TRACE` | `true` |

use std::time::Duration;

use thiserror::Error;

pub const ADDRESS_VAR: &str = "AUTOCRUD_ADDRESS";
pub const REQUEST_TIMEOUT_VAR: &str = "AUTOCRUD_REQUEST_TIMEOUT_MS";
pub const DATABASE_URL_VAR: &str = "DATABASE_URL";
pub const TRACE_VAR: &str = "AUTOCRUD_TRACE";

const DEFAULT_ADDRESS: &str = "0.0.0.0:8080";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}: {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// `host:port` the server binds to.
    pub address: String,
    /// Deadline applied to every request's [`Context`](crate::Context).
    pub request_timeout: Option<Duration>,
    pub database_url: Option<String>,
    /// Whether `into_router` adds a request trace layer.
    pub trace_requests: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS.to_string(),
            request_timeout: None,
            database_url: None,
            trace_requests: true,
        }
    }
}

impl AppConfig {
    /// Reads the process environment.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidValue`] for a malformed variable.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through `lookup`; unset or blank variables keep
    /// their defaults.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidValue`] for a malformed variable.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let mut config = Self::default();

        if let Some(address) = get(ADDRESS_VAR) {
            config.address = parse_address(address)?;
        }
        if let Some(raw) = get(REQUEST_TIMEOUT_VAR) {
            let millis: u64 = raw.parse().map_err(|_| ConfigError::InvalidValue {
                key: REQUEST_TIMEOUT_VAR,
                value: raw.clone(),
                reason: "expected a number of milliseconds",
            })?;
            config.request_timeout = (millis > 0).then(|| Duration::from_millis(millis));
        }
        config.database_url = get(DATABASE_URL_VAR);
        if let Some(raw) = get(TRACE_VAR) {
            config.trace_requests = parse_flag(TRACE_VAR, raw)?;
        }

        Ok(config)
    }
}

fn parse_address(address: String) -> Result<String, ConfigError> {
    let valid = address
        .rsplit_once(':')
        .is_some_and(|(host, port)| !host.is_empty() && port.parse::<u16>().is_ok());
    if valid {
        Ok(address)
    } else {
        Err(ConfigError::InvalidValue {
            key: ADDRESS_VAR,
            value: address,
            reason: "expected host:port",
        })
    }
}

fn parse_flag(key: &'static str, raw: String) -> Result<bool, ConfigError> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key,
            value: raw,
            reason: "expected a boolean",
        }),
    }
}
