//! Process configuration read from the environment.

use std::time::Duration;

/// Default listening port when `PORT` is unset.
pub const DEFAULT_PORT: u16 = 3001;

/// Default listening address when `HOST` is unset.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default keepalive period when `PING_INTERVAL_SECS` is unset.
pub const DEFAULT_PING_INTERVAL: Duration = Duration::from_secs(25);

/// Errors raised while reading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A variable was set to a value that can't be used.
    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Settings for one relay process.
///
/// | Variable | Default |
/// |---|---|
/// | `PORT` | `3001` |
/// | `HOST` | `0.0.0.0` |
/// | `PING_INTERVAL_SECS` | `25` |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayConfig {
    pub host: String,
    pub port: u16,
    /// How often each connection is pinged to detect dead peers.
    pub ping_interval: Duration,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            ping_interval: DEFAULT_PING_INTERVAL,
        }
    }
}

impl RelayConfig {
    /// Reads the configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`. Unset or empty values fall
    /// back to the defaults.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(host) = get("HOST") {
            config.host = host.trim().to_string();
        }

        if let Some(raw) = get("PORT") {
            config.port = raw.trim().parse().map_err(|e| ConfigError::Invalid {
                key: "PORT",
                value: raw.clone(),
                reason: format!("{e}"),
            })?;
        }

        if let Some(raw) = get("PING_INTERVAL_SECS") {
            let secs: u64 = raw.trim().parse().map_err(|e| ConfigError::Invalid {
                key: "PING_INTERVAL_SECS",
                value: raw.clone(),
                reason: format!("{e}"),
            })?;
            if secs == 0 {
                return Err(ConfigError::Invalid {
                    key: "PING_INTERVAL_SECS",
                    value: raw,
                    reason: "must be at least 1".into(),
                });
            }
            config.ping_interval = Duration::from_secs(secs);
        }

        Ok(config)
    }

    /// Returns the `host:port` string to bind to.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
