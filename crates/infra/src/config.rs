//! Configuration loading and representation.
//!
//! The service reads a single YAML file:
//!
//! ```yaml
//! listen:
//!   bind_ip: 0.0.0.0
//!   port: 8080
//! storage:
//!   host: localhost
//!   port: 5432
//!   user: catalog
//!   password: secret
//!   database: catalog
//!   schema: public
//!   max_conns: 10
//!   min_conns: 1
//!   max_conn_lifetime: 1h
//!   max_conn_idle_time: 30m
//!   health_check_period: 1m
//!   max_conn_lifetime_jitter: 5m
//!   max_attempts: 5
//!   attempt_delay: 2s
//! is_debug: false
//! ```
//!
//! Every key is optional; missing keys take the defaults below.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Deserializer};
use sqlx::postgres::PgConnectOptions;
use thiserror::Error;

pub const DEFAULT_CONFIG_PATH: &str = "./config.yml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub listen: ListenConfig,
    pub storage: StorageConfig,
    pub is_debug: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ListenConfig {
    pub bind_ip: IpAddr,
    pub port: u16,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            bind_ip: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 8080,
        }
    }
}

impl ListenConfig {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_ip, self.port)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    /// Applied as the connection `search_path`; empty keeps the server default.
    pub schema: String,

    pub max_conns: u32,
    pub min_conns: u32,
    #[serde(deserialize_with = "humantime_duration")]
    pub max_conn_lifetime: Duration,
    #[serde(deserialize_with = "humantime_duration")]
    pub max_conn_idle_time: Duration,
    #[serde(deserialize_with = "humantime_duration")]
    pub health_check_period: Duration,
    #[serde(deserialize_with = "humantime_duration")]
    pub max_conn_lifetime_jitter: Duration,

    /// Connection attempts made at startup before giving up.
    pub max_attempts: u32,
    /// Fixed delay between startup connection attempts.
    #[serde(deserialize_with = "humantime_duration")]
    pub attempt_delay: Duration,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            user: "postgres".to_string(),
            password: String::new(),
            database: "catalog".to_string(),
            schema: String::new(),
            max_conns: 10,
            min_conns: 0,
            max_conn_lifetime: Duration::from_secs(60 * 60),
            max_conn_idle_time: Duration::from_secs(30 * 60),
            health_check_period: Duration::from_secs(60),
            max_conn_lifetime_jitter: Duration::ZERO,
            max_attempts: 5,
            attempt_delay: Duration::from_secs(2),
        }
    }
}

impl StorageConfig {
    pub fn connect_options(&self) -> PgConnectOptions {
        let opts = PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(&self.password)
            .database(&self.database)
            .application_name("catalog-api");

        if self.schema.is_empty() {
            opts
        } else {
            opts.options([("search_path", self.schema.as_str())])
        }
    }
}

impl Config {
    /// Read, parse and validate the YAML file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_yaml_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self, serde_yaml::Error> {
        // An empty document means "all defaults".
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let s = &self.storage;
        if self.listen.port == 0 {
            return Err(ConfigError::Invalid("listen.port must be non-zero".into()));
        }
        if s.host.trim().is_empty() {
            return Err(ConfigError::Invalid("storage.host must not be empty".into()));
        }
        if s.database.trim().is_empty() {
            return Err(ConfigError::Invalid("storage.database must not be empty".into()));
        }
        if s.max_conns == 0 {
            return Err(ConfigError::Invalid("storage.max_conns must be at least 1".into()));
        }
        if s.min_conns > s.max_conns {
            return Err(ConfigError::Invalid(format!(
                "storage.min_conns ({}) exceeds storage.max_conns ({})",
                s.min_conns, s.max_conns
            )));
        }
        if s.max_attempts == 0 {
            return Err(ConfigError::Invalid("storage.max_attempts must be at least 1".into()));
        }
        if !s
            .schema
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(ConfigError::Invalid(format!(
                "storage.schema {:?} may only contain letters, digits and '_'",
                s.schema
            )));
        }
        Ok(())
    }
}

fn humantime_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    humantime::parse_duration(raw.trim()).map_err(serde::de::Error::custom)
}
