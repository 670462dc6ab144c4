use std::env;
use std::net::SocketAddr;

use thiserror::Error;

use crate::policy::ReviewListPolicy;

pub mod cors;
pub mod security;

pub use cors::create_cors_layer;
pub use security::create_security_headers_layer;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3001";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} has an invalid value '{value}'")]
    InvalidValue { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Without a database URL the server keeps everything in memory.
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub bind_addr: SocketAddr,
    pub allowed_origins: Option<String>,
    pub production: bool,
    pub review_list_policy: ReviewListPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: None,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3001)),
            allowed_origins: None,
            production: false,
            review_list_policy: ReviewListPolicy::Open,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let raw_addr = lookup("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr: SocketAddr = raw_addr.parse().map_err(|_| ConfigError::InvalidValue {
            name: "BIND_ADDR",
            value: raw_addr.clone(),
        })?;

        let max_connections = match lookup("DATABASE_MAX_CONNECTIONS") {
            Some(raw) => raw.parse::<u32>().map_err(|_| ConfigError::InvalidValue {
                name: "DATABASE_MAX_CONNECTIONS",
                value: raw.clone(),
            })?,
            None => DEFAULT_MAX_CONNECTIONS,
        };

        let gate_review_list = match lookup("REVIEW_LIST_REQUIRES_VISIBILITY") {
            Some(raw) => parse_flag(&raw).ok_or(ConfigError::InvalidValue {
                name: "REVIEW_LIST_REQUIRES_VISIBILITY",
                value: raw,
            })?,
            None => false,
        };
        let review_list_policy = if gate_review_list {
            ReviewListPolicy::EventVisibility
        } else {
            ReviewListPolicy::Open
        };

        Ok(Self {
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            max_connections,
            bind_addr,
            allowed_origins: lookup("CORS_ALLOWED_ORIGINS"),
            production: lookup("RUST_ENV")
                .map(|v| v.to_lowercase() == "production")
                .unwrap_or(false),
            review_list_policy,
        })
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert!(config.database_url.is_none());
        assert_eq!(config.max_connections, 5);
        assert_eq!(config.bind_addr.port(), 3001);
        assert!(!config.production);
        assert_eq!(config.review_list_policy, ReviewListPolicy::Open);
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("DATABASE_URL", "postgres://localhost/events"),
            ("DATABASE_MAX_CONNECTIONS", "12"),
            ("BIND_ADDR", "127.0.0.1:8080"),
            ("RUST_ENV", "Production"),
            ("REVIEW_LIST_REQUIRES_VISIBILITY", "true"),
        ])
        .unwrap();

        assert_eq!(config.database_url.as_deref(), Some("postgres://localhost/events"));
        assert_eq!(config.max_connections, 12);
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:8080");
        assert!(config.production);
        assert_eq!(config.review_list_policy, ReviewListPolicy::EventVisibility);
    }

    #[test]
    fn test_invalid_values_are_reported() {
        assert!(matches!(
            config_from(&[("BIND_ADDR", "nowhere")]),
            Err(ConfigError::InvalidValue { name: "BIND_ADDR", .. })
        ));
        assert!(matches!(
            config_from(&[("REVIEW_LIST_REQUIRES_VISIBILITY", "maybe")]),
            Err(ConfigError::InvalidValue { .. })
        ));
    }
}
