//! Gateway configuration types.
//!
//! The connection string is either given whole or assembled from a username,
//! password and cluster host.

use std::time::Duration;

use aldous_store::MongoOptions;
use serde::Deserialize;

use crate::error::{GatewayError, Result};

/// Configuration for connecting the gateway to the document database.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Full connection string. Takes precedence over the credential fields.
    #[serde(default)]
    pub uri: Option<String>,

    /// Database user, used when no URI is given.
    #[serde(default)]
    pub username: Option<String>,

    /// Database password, used when no URI is given.
    #[serde(default)]
    pub password: Option<String>,

    /// Cluster host (e.g., "cluster0.example.mongodb.net"), used when no URI
    /// is given.
    #[serde(default)]
    pub host: Option<String>,

    /// Database holding the five collections.
    #[serde(default = "GatewayConfig::default_database")]
    pub database: String,

    /// Application name reported to the server.
    #[serde(default = "GatewayConfig::default_app_name")]
    pub app_name: String,

    /// Connect and server-selection timeout in seconds.
    #[serde(default = "GatewayConfig::default_connect_timeout")]
    pub connect_timeout_seconds: u64,
}

impl GatewayConfig {
    fn default_database() -> String {
        "aldous_db".to_string()
    }

    fn default_app_name() -> String {
        "aldous".to_string()
    }

    const fn default_connect_timeout() -> u64 {
        10
    }

    /// Get the connect timeout as a `Duration`.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }

    /// The connection string to use.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::Config` if no URI is set and any of username,
    /// password or host is missing.
    pub fn connection_uri(&self) -> Result<String> {
        if let Some(uri) = non_empty(self.uri.as_deref()) {
            return Ok(uri.to_string());
        }

        let mut missing = Vec::new();
        let username = non_empty(self.username.as_deref());
        let password = non_empty(self.password.as_deref());
        let host = non_empty(self.host.as_deref());
        if username.is_none() {
            missing.push("username");
        }
        if password.is_none() {
            missing.push("password");
        }
        if host.is_none() {
            missing.push("host");
        }

        match (username, password, host) {
            (Some(username), Some(password), Some(host)) => Ok(format!(
                "mongodb+srv://{}:{}@{}/",
                urlencoding::encode(username),
                urlencoding::encode(password),
                host.trim_end_matches('/')
            )),
            _ => Err(GatewayError::Config(format!(
                "set a connection URI or database credentials (missing: {})",
                missing.join(", ")
            ))),
        }
    }

    /// Store options derived from this configuration.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::Config` if the connection string cannot be built.
    pub fn mongo_options(&self) -> Result<MongoOptions> {
        Ok(MongoOptions {
            uri: self.connection_uri()?,
            database: self.database.clone(),
            app_name: Some(self.app_name.clone()),
            connect_timeout: self.connect_timeout(),
        })
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            uri: None,
            username: None,
            password: None,
            host: None,
            database: Self::default_database(),
            app_name: Self::default_app_name(),
            connect_timeout_seconds: Self::default_connect_timeout(),
        }
    }
}
