use std::{env, net::SocketAddr};

use thiserror::Error;

const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8000";
const DEFAULT_POOL_SIZE: u32 = 10;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} is invalid: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub secret_key: String,
    pub listen_addr: SocketAddr,
    pub pool_size: u32,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let required = |name: &'static str| {
            lookup(name)
                .filter(|v| !v.is_empty())
                .ok_or(ConfigError::Missing(name))
        };
        let listen_addr = lookup("LISTEN_ADDR").unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string());
        let pool_size = match lookup("DATABASE_POOL_SIZE") {
            Some(value) => match value.parse::<u32>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ConfigError::Invalid {
                        name: "DATABASE_POOL_SIZE",
                        value,
                    });
                }
            },
            None => DEFAULT_POOL_SIZE,
        };

        Ok(Config {
            database_url: required("DATABASE_URL")?,
            secret_key: required("SECRET_KEY")?,
            listen_addr: listen_addr.parse().map_err(|_| ConfigError::Invalid {
                name: "LISTEN_ADDR",
                value: listen_addr.clone(),
            })?,
            pool_size,
        })
    }
}

/// Only the database is needed for `migrate` and `create-user`.
pub fn database_url() -> Result<String, ConfigError> {
    env::var("DATABASE_URL")
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::Missing("DATABASE_URL"))
}
