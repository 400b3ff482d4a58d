use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::core::error::{Result, StoreError};

/// URL scheme for the remote endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scheme {
    #[default]
    Http,
    Https,
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http => write!(f, "http"),
            Self::Https => write!(f, "https"),
        }
    }
}

impl FromStr for Scheme {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "http" => Ok(Self::Http),
            "https" => Ok(Self::Https),
            other => Err(StoreError::Configuration(format!(
                "scheme must be http or https, got '{}'",
                other
            ))),
        }
    }
}

/// Remote endpoint configuration.
///
/// Read once at client construction; the resulting transport is opaque to
/// the runtime afterwards. Keys are matched case-insensitively when parsed
/// from a settings map: `Scheme`, `Host`, `Port`, `ApiKey` (any casing).
/// The host is taken verbatim — hostname or IP, no validation.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    pub scheme: Scheme,
    pub host: String,
    pub port: u16,
    pub api_key: Option<String>,
}

impl ConnectionConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            scheme: Scheme::Http,
            host: host.to_string(),
            port,
            api_key: None,
        }
    }

    pub fn scheme(mut self, scheme: Scheme) -> Self {
        self.scheme = scheme;
        self
    }

    pub fn api_key(mut self, key: &str) -> Self {
        self.api_key = Some(key.to_string());
        self
    }

    /// Parse from a loosely typed settings map, matching keys
    /// case-insensitively. Unknown keys are ignored.
    ///
    /// # Examples
    ///
    /// ```
    /// use graphstore::connection::ConnectionConfig;
    /// use std::collections::HashMap;
    ///
    /// let mut settings = HashMap::new();
    /// settings.insert("SCHEME".to_string(), "https".to_string());
    /// settings.insert("host".to_string(), "stash.local".to_string());
    /// settings.insert("PoRt".to_string(), "9999".to_string());
    /// settings.insert("apikey".to_string(), "secret".to_string());
    ///
    /// let config = ConnectionConfig::from_map(&settings).unwrap();
    /// assert_eq!(config.url(), "https://stash.local:9999");
    /// ```
    pub fn from_map(settings: &HashMap<String, String>) -> Result<Self> {
        let mut config = Self::default();
        for (key, value) in settings {
            match key.to_ascii_lowercase().as_str() {
                "scheme" => config.scheme = value.parse()?,
                "host" => config.host = value.clone(),
                "port" => {
                    config.port = value.parse().map_err(|_| {
                        StoreError::Configuration(format!(
                            "port must be an integer in 0..=65535, got '{}'",
                            value
                        ))
                    })?;
                }
                "apikey" | "api_key" => {
                    if !value.is_empty() {
                        config.api_key = Some(value.clone());
                    }
                }
                // Loggers are process-global here, not per-connection.
                _ => {}
            }
        }
        Ok(config)
    }

    /// Endpoint URL without credentials.
    pub fn url(&self) -> String {
        format!("{}://{}:{}", self.scheme, self.host, self.port)
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self::new("localhost", 9999)
    }
}
