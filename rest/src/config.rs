use std::env;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has an invalid value {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// Service settings, read from the environment after `.env` is loaded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settings {
    pub database_url: String,
    pub bind_addr: String,
    pub port: u16,
    pub pool_size: u32,
    /// Where unauthenticated visitors are sent, with `?next=` appended.
    pub login_url: String,
    /// Header carrying the username authenticated by the fronting proxy.
    pub user_header: String,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let or = |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.to_owned());
        Ok(Self {
            database_url: lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?,
            bind_addr: or("CATALOG_BIND_ADDR", "127.0.0.1"),
            port: parse("CATALOG_PORT", or("CATALOG_PORT", "8080"))?,
            pool_size: parse("CATALOG_POOL_SIZE", or("CATALOG_POOL_SIZE", "10"))?,
            login_url: or("CATALOG_LOGIN_URL", "/accounts/login/"),
            user_header: or("CATALOG_USER_HEADER", "Remote-User"),
        })
    }
}

fn parse<T: std::str::FromStr>(name: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .parse()
        .map_err(|_| ConfigError::Invalid { name, value })
}
