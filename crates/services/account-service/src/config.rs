//! Account service configuration.

use std::env;

use common::{DatabaseConfig, DEFAULT_DATABASE_URL};

/// Account service configuration.
#[derive(Debug, Clone, Default)]
pub struct AccountServiceConfig {
    /// Database connection and pool settings
    pub database: DatabaseConfig,
}

impl AccountServiceConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = DatabaseConfig::default();

        Self {
            database: DatabaseConfig {
                url: env::var("ACCOUNT_SERVICE_DATABASE_URL")
                    .or_else(|_| env::var("DATABASE_URL"))
                    .unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string()),
                max_connections: parse_var("DATABASE_MAX_CONNECTIONS")
                    .unwrap_or(defaults.max_connections),
                min_connections: parse_var("DATABASE_MIN_CONNECTIONS")
                    .unwrap_or(defaults.min_connections),
                connect_timeout_secs: parse_var("DATABASE_CONNECT_TIMEOUT_SECS")
                    .unwrap_or(defaults.connect_timeout_secs),
            },
        }
    }

    /// Replace the database URL (e.g. from a CLI flag).
    pub fn with_database_url(mut self, url: Option<String>) -> Self {
        if let Some(url) = url {
            self.database.url = url;
        }
        self
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}
