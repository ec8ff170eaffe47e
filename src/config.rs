use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use thiserror::Error;

const DEFAULT_PORT: u16 = 5000;
const DEFAULT_DB_CONNECTION_STRING: &str = "postgres://localhost/gear-tracker";
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;

/// Enumerates errors encountered while reading the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not parse {name} ({value:?}): {message}")]
    Unparseable {
        name: &'static str,
        value: String,
        message: String,
    },
}

/// Settings read once at startup and shared by every request.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub port: u16,
    pub bind_address: IpAddr,
    pub db_connection_string: String,
    pub db_max_connections: u32,
}

impl Config {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_source(|name| env::var(name).ok())
    }

    /// Reads the configuration from an arbitrary lookup function, falling
    /// back to the defaults for anything it doesn't provide.
    pub fn from_source(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        Ok(Config {
            port: parse_variable(&lookup, "BACKEND_PORT", DEFAULT_PORT)?,
            bind_address: parse_variable(
                &lookup,
                "BACKEND_BIND_ADDRESS",
                IpAddr::from([0, 0, 0, 0]),
            )?,
            db_connection_string: lookup("BACKEND_DB_CONNECTION_STRING")
                .unwrap_or_else(|| DEFAULT_DB_CONNECTION_STRING.to_owned()),
            db_max_connections: parse_variable(
                &lookup,
                "BACKEND_DB_MAX_CONNECTIONS",
                DEFAULT_DB_MAX_CONNECTIONS,
            )?,
        })
    }

    pub fn socket_address(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            port: DEFAULT_PORT,
            bind_address: IpAddr::from([0, 0, 0, 0]),
            db_connection_string: DEFAULT_DB_CONNECTION_STRING.to_owned(),
            db_max_connections: DEFAULT_DB_MAX_CONNECTIONS,
        }
    }
}

/// Returns the value of the named environment variable or the given default.
pub fn get_variable_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_owned())
}

fn parse_variable<T>(
    lookup: impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::Unparseable {
            name,
            message: e.to_string(),
            value,
        }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::{Config, ConfigError};

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        Config::from_source(|name| map.get(name).cloned())
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = config_from(&[]).expect("read empty configuration");

        assert_eq!(config, Config::default());
        assert_eq!(config.socket_address().to_string(), "0.0.0.0:5000");
    }

    #[test]
    fn variables_override_defaults() {
        let config = config_from(&[
            ("BACKEND_PORT", "8080"),
            ("BACKEND_BIND_ADDRESS", "127.0.0.1"),
            ("BACKEND_DB_CONNECTION_STRING", "memory"),
            ("BACKEND_DB_MAX_CONNECTIONS", "2"),
        ])
        .expect("read configuration");

        assert_eq!(config.socket_address().to_string(), "127.0.0.1:8080");
        assert_eq!(config.db_connection_string, "memory");
        assert_eq!(config.db_max_connections, 2);
    }

    #[test]
    fn bad_port_is_reported() {
        let error = config_from(&[("BACKEND_PORT", "eighty")]).unwrap_err();

        match error {
            ConfigError::Unparseable { name, value, .. } => {
                assert_eq!(name, "BACKEND_PORT");
                assert_eq!(value, "eighty");
            }
        }
    }
}
