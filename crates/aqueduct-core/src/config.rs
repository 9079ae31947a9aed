//! Client configuration with defaults

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::{Error, Result};

/// How TLS is negotiated for a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TlsMode {
    /// Plain TCP, no TLS
    #[default]
    Disabled,
    /// TLS required, server certificate not verified against hostname
    Required,
    /// TLS required with full certificate and hostname verification
    VerifyIdentity,
}

/// Configuration for a database client
///
/// Defaults are applied here, by the facade, not by the pool. The pool
/// itself only consumes `pool_size` and `lazy_initialization`; the rest
/// is carried for the connection layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Host address
    pub host: String,
    /// Port number (None uses the driver's default)
    pub port: Option<u16>,
    /// Unix socket path, used instead of host/port when set
    pub socket_path: Option<PathBuf>,
    /// Database name
    pub database: Option<String>,
    /// Username
    pub username: Option<String>,
    /// Password
    pub password: Option<String>,
    /// Number of connections the pool provisions
    pub pool_size: usize,
    /// Defer opening connections until first use
    pub lazy_initialization: bool,
    /// Idle timeout in milliseconds for the connection layer
    pub idle_timeout_ms: Option<u64>,
    /// Read timeout in milliseconds for the connection layer
    pub read_timeout_ms: Option<u64>,
    /// TLS negotiation mode
    pub tls: TlsMode,
}

impl Default for ClientConfig {
    /// Defaults: localhost, pool of 4, eager initialization, no TLS.
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: None,
            socket_path: None,
            database: None,
            username: None,
            password: None,
            pool_size: 4,
            lazy_initialization: false,
            idle_timeout_ms: None,
            read_timeout_ms: None,
            tls: TlsMode::Disabled,
        }
    }
}

impl ClientConfig {
    /// Create a configuration for the given host
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Default::default()
        }
    }

    /// Set the port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Connect through a unix socket instead of TCP
    pub fn with_socket_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.socket_path = Some(path.into());
        self
    }

    /// Set the database name
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Set the username
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Set the password
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Set the pool size
    pub fn with_pool_size(mut self, size: usize) -> Self {
        self.pool_size = size;
        self
    }

    /// Enable or disable lazy initialization
    pub fn with_lazy_initialization(mut self, lazy: bool) -> Self {
        self.lazy_initialization = lazy;
        self
    }

    /// Set the idle timeout in milliseconds
    pub fn with_idle_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.idle_timeout_ms = Some(timeout_ms);
        self
    }

    /// Set the read timeout in milliseconds
    pub fn with_read_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.read_timeout_ms = Some(timeout_ms);
        self
    }

    /// Set the TLS mode
    pub fn with_tls(mut self, tls: TlsMode) -> Self {
        self.tls = tls;
        self
    }

    /// Get the idle timeout as a Duration if set
    pub fn idle_timeout(&self) -> Option<Duration> {
        self.idle_timeout_ms.map(Duration::from_millis)
    }

    /// Get the read timeout as a Duration if set
    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout_ms.map(Duration::from_millis)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.pool_size == 0 {
            return Err(Error::Configuration(
                "pool_size must be greater than 0".into(),
            ));
        }
        if self.socket_path.is_some() && self.port.is_some() {
            return Err(Error::Configuration(
                "socket_path and port are mutually exclusive".into(),
            ));
        }
        Ok(())
    }
}
