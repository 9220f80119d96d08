//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::game::host::{HostConfig, DEFAULT_HOST_ID_SUFFIX};
use crate::game::world::{WorldConfig, DEFAULT_IDEAL_BOAT_COUNT};
use crate::util::rate_limit::DEFAULT_INPUT_RATE_LIMIT;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Allowed client origins for CORS, comma separated; `*` allows any
    pub client_origin: String,

    pub tick_interval: Duration,
    pub sync_interval: Duration,
    /// NPC boats populated at start and kept alive
    pub ideal_boat_count: usize,
    pub wireframes: bool,
    /// Full ripple resync period; `None` never sends ripple data
    pub ripple_resync: Option<Duration>,
    pub host_id_suffix: String,
    /// World RNG seed; random when unset
    pub world_seed: Option<u64>,
    /// Max inbound messages per second per connection
    pub input_rate_limit: u32,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup`, which returns the raw value of a key
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        // PORT wins over SERVER_ADDR
        let server_addr = match lookup("PORT") {
            Some(port) => format!("0.0.0.0:{}", port),
            None => lookup("SERVER_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string()),
        };
        let ripple_resync_ms: u64 = parse_or(&lookup, "RIPPLE_RESYNC_MS", 0)?;

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::Invalid("SERVER_ADDR", server_addr.clone()))?,
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            client_origin: lookup("CLIENT_ORIGIN").unwrap_or_else(|| "*".to_string()),

            tick_interval: Duration::from_millis(parse_or(&lookup, "TICK_INTERVAL_MS", 16u64)?.max(1)),
            sync_interval: Duration::from_millis(parse_or(&lookup, "SYNC_INTERVAL_MS", 10u64)?.max(1)),
            ideal_boat_count: parse_or(&lookup, "IDEAL_BOAT_COUNT", DEFAULT_IDEAL_BOAT_COUNT)?,
            wireframes: parse_or(&lookup, "WIREFRAMES", false)?,
            ripple_resync: (ripple_resync_ms > 0).then(|| Duration::from_millis(ripple_resync_ms)),
            host_id_suffix: lookup("HOST_ID_SUFFIX")
                .unwrap_or_else(|| DEFAULT_HOST_ID_SUFFIX.to_string()),
            world_seed: lookup("WORLD_SEED")
                .map(|raw| parse_value("WORLD_SEED", &raw))
                .transpose()?,
            input_rate_limit: parse_or(&lookup, "INPUT_RATE_LIMIT", DEFAULT_INPUT_RATE_LIMIT)?,
        })
    }

    pub fn to_host_config(&self) -> HostConfig {
        HostConfig {
            tick_interval: self.tick_interval,
            sync_interval: self.sync_interval,
            wireframes: self.wireframes,
            ripple_resync: self.ripple_resync,
            host_id_suffix: self.host_id_suffix.clone(),
        }
    }

    pub fn to_world_config(&self) -> WorldConfig {
        WorldConfig {
            ideal_boat_count: self.ideal_boat_count,
            seed: self.world_seed.unwrap_or_else(rand::random),
            ..WorldConfig::default()
        }
    }
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(key) {
        Some(raw) => parse_value(key, &raw),
        None => Ok(default),
    }
}

fn parse_value<T: FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::Invalid(key, raw.to_string()))
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1:?}")]
    Invalid(&'static str, String),
}
