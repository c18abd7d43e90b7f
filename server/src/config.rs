//! Configuration management for the server.

use std::env;

/// Resource served when `RESOURCES` is unset.
pub const DEFAULT_RESOURCE: &str = "accounts";

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host address
    pub host: String,
    /// Server port
    pub port: u16,
    /// Resource collections served under `/api/{resource}`
    pub resources: Vec<String>,
    /// Bearer token every request must carry, if set
    pub auth_token: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            resources: vec![DEFAULT_RESOURCE.to_string()],
            auth_token: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let host = lookup("HOST").unwrap_or(defaults.host);

        let port = match lookup("PORT") {
            Some(port) => port.trim().parse().map_err(|_| ConfigError::InvalidPort)?,
            None => defaults.port,
        };

        let resources = match lookup("RESOURCES") {
            Some(list) => {
                let resources: Vec<String> = list
                    .split(',')
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .map(String::from)
                    .collect();
                if resources.is_empty() {
                    return Err(ConfigError::NoResources);
                }
                resources
            }
            None => defaults.resources,
        };

        let auth_token = lookup("AUTH_TOKEN").filter(|token| !token.is_empty());

        Ok(Self {
            host,
            port,
            resources,
            auth_token,
        })
    }

    /// The socket address to bind.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid PORT value")]
    InvalidPort,

    #[error("RESOURCES must name at least one resource")]
    NoResources,
}
