//! Runtime configuration read from the environment.
//!
//! | Variable | Default |
//! |---|---|
//! | `HOST` | `0.0.0.0` |
//! | `PORT` | `3000` |
//! | `STORAGE_MODE` | `memory` (`memory` or `redis`) |
//! | `REDIS_URL` | `redis://127.0.0.1:6379` |
//! | `DEFAULT_PAGE_SIZE` | `10` |
//! | `MAX_PAGE_SIZE` | `100` |

use std::env;
use std::str::FromStr;

use thiserror::Error;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid STORAGE_MODE '{0}', expected 'memory' or 'redis'")]
    InvalidStorageMode(String),

    #[error("invalid value '{value}' for {name}")]
    InvalidNumber { name: &'static str, value: String },

    #[error("DEFAULT_PAGE_SIZE ({default}) must be between 1 and MAX_PAGE_SIZE ({max})")]
    InvalidPageSizes { default: u32, max: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageMode {
    #[default]
    Memory,
    Redis,
}

impl FromStr for StorageMode {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "memory" | "in_memory" => Ok(Self::Memory),
            "redis" => Ok(Self::Redis),
            _ => Err(ConfigError::InvalidStorageMode(value.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PagingConfig {
    pub default_size: u32,
    pub max_size: u32,
}

impl Default for PagingConfig {
    fn default() -> Self {
        Self {
            default_size: 10,
            max_size: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub storage_mode: StorageMode,
    pub redis_url: String,
    pub paging: PagingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            storage_mode: StorageMode::default(),
            redis_url: DEFAULT_REDIS_URL.to_string(),
            paging: PagingConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let storage_mode = match lookup("STORAGE_MODE") {
            Some(value) => value.parse()?,
            None => defaults.storage_mode,
        };
        let paging = PagingConfig {
            default_size: parse_number(&lookup, "DEFAULT_PAGE_SIZE")?
                .unwrap_or(defaults.paging.default_size),
            max_size: parse_number(&lookup, "MAX_PAGE_SIZE")?.unwrap_or(defaults.paging.max_size),
        };
        if paging.default_size == 0 || paging.default_size > paging.max_size {
            return Err(ConfigError::InvalidPageSizes {
                default: paging.default_size,
                max: paging.max_size,
            });
        }

        Ok(Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parse_number(&lookup, "PORT")?.unwrap_or(defaults.port),
            storage_mode,
            redis_url: lookup("REDIS_URL").unwrap_or(defaults.redis_url),
            paging,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_number<F, N>(lookup: &F, name: &'static str) -> Result<Option<N>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    N: FromStr,
{
    lookup(name)
        .map(|value| {
            value.trim().parse().map_err(|_| ConfigError::InvalidNumber {
                name,
                value: value.clone(),
            })
        })
        .transpose()
}
