//! Connection pool settings

use serde::Deserialize;
use std::time::Duration;

/// Settings used to open a driver pool
///
/// # Examples
/// ```
/// use quarry_core::DatabaseConfig;
///
/// let config: DatabaseConfig =
///     serde_json::from_str(r#"{"url": "postgres://localhost/app", "max_connections": 4}"#).unwrap();
/// assert_eq!(config.max_connections, 4);
/// assert_eq!(config.acquire_timeout_secs, 30);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default)]
    pub min_connections: u32,
    #[serde(default = "default_acquire_timeout_secs")]
    pub acquire_timeout_secs: u64,
}

fn default_max_connections() -> u32 {
    10
}

fn default_acquire_timeout_secs() -> u64 {
    30
}

impl DatabaseConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: default_max_connections(),
            min_connections: 0,
            acquire_timeout_secs: default_acquire_timeout_secs(),
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout_secs = timeout.as_secs();
        self
    }

    pub fn acquire_timeout_duration(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DatabaseConfig::new("mysql://localhost/app");
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.min_connections, 0);
        assert_eq!(config.acquire_timeout_duration(), Duration::from_secs(30));
    }

    #[test]
    fn test_setters() {
        let config = DatabaseConfig::new("postgres://localhost/app")
            .max_connections(2)
            .min_connections(1)
            .acquire_timeout(Duration::from_secs(5));
        assert_eq!(config.max_connections, 2);
        assert_eq!(config.min_connections, 1);
        assert_eq!(config.acquire_timeout_secs, 5);
    }

    #[test]
    fn test_missing_url_is_rejected() {
        let result: Result<DatabaseConfig, _> = serde_json::from_str(r#"{"max_connections": 4}"#);
        assert!(result.is_err());
    }
}
