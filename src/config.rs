use std::{net::SocketAddr, str::FromStr};

use thiserror::Error;

const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_BATCH_SIZE: usize = 10;
const DEFAULT_MAX_DELIVERIES: u32 = 5;
const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
}

/// Process-wide settings, read once at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Destination of registration events; publishing fails without it
    pub registration_topic: Option<String>,
    /// Table holding user records; durable writes fail without it
    pub users_table: Option<String>,
    /// Users are kept in memory when unset
    pub database_url: Option<String>,
    pub listen_addr: SocketAddr,
    pub max_batch_size: usize,
    pub max_deliveries: u32,
    pub log_level: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| dotenvy::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let listen_addr = parse_or(get("LISTEN_ADDR"), "LISTEN_ADDR", || {
            DEFAULT_LISTEN_ADDR.parse().ok()
        })?;
        let max_batch_size = positive(
            parse_or(get("CONSUMER_BATCH_SIZE"), "CONSUMER_BATCH_SIZE", || {
                Some(DEFAULT_BATCH_SIZE)
            })?,
            "CONSUMER_BATCH_SIZE",
        )?;
        let max_deliveries = positive(
            parse_or(get("CONSUMER_MAX_DELIVERIES"), "CONSUMER_MAX_DELIVERIES", || {
                Some(DEFAULT_MAX_DELIVERIES)
            })?,
            "CONSUMER_MAX_DELIVERIES",
        )?;

        Ok(Self {
            registration_topic: get("USER_REGISTRATION_TOPIC"),
            users_table: get("USERS_TABLE"),
            database_url: get("DATABASE_URL"),
            listen_addr,
            max_batch_size,
            max_deliveries,
            log_level: get("LOG_LEVEL").unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
        })
    }
}

fn parse_or<T: FromStr>(
    value: Option<String>,
    key: &'static str,
    default: impl FnOnce() -> Option<T>,
) -> Result<T, ConfigError> {
    match value {
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::InvalidValue { key, value }),
        None => default().ok_or(ConfigError::InvalidValue {
            key,
            value: String::new(),
        }),
    }
}

fn positive<T: Default + PartialOrd + ToString>(
    value: T,
    key: &'static str,
) -> Result<T, ConfigError> {
    if value > T::default() {
        Ok(value)
    } else {
        Err(ConfigError::InvalidValue {
            key,
            value: value.to_string(),
        })
    }
}
