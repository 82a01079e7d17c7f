//! Client configuration
//!
//! A [`ClientConfig`] is built once by the controller (usually from the
//! cluster's TOML settings) and handed to the fan-out client's constructor.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default port of the node daemon
pub const DEFAULT_PORT: u16 = 1811;

/// Default cap on concurrently running node exchanges
pub const DEFAULT_MAX_CONCURRENCY: usize = 64;

/// Default upper bound for a declared response length (100MB)
pub const DEFAULT_MAX_RESPONSE_BYTES: usize = 100 * 1024 * 1024;

/// Settings shared by every call a client issues
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Cluster-wide node daemon port
    pub port: u16,
    /// Bound on establishing one node connection
    pub connect_timeout_ms: Option<u64>,
    /// Bound on writing one request
    pub send_timeout_ms: Option<u64>,
    /// Bound on reading one response
    pub receive_timeout_ms: Option<u64>,
    /// Deadline for a whole fan-out call
    pub call_timeout_ms: Option<u64>,
    /// Worker-pool bound for very large clusters
    pub max_concurrency: usize,
    /// Responses declaring more bytes than this are rejected
    pub max_response_bytes: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            connect_timeout_ms: Some(10_000),
            send_timeout_ms: Some(10_000),
            receive_timeout_ms: None,
            call_timeout_ms: None,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            max_response_bytes: DEFAULT_MAX_RESPONSE_BYTES,
        }
    }
}

impl ClientConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(input: &str) -> Result<Self> {
        let config: Self = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(Error::invalid("port must be non-zero"));
        }
        if self.max_concurrency == 0 {
            return Err(Error::invalid("max_concurrency must be at least 1"));
        }
        Ok(())
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout_ms = Some(duration_ms(timeout));
        self
    }

    pub fn with_receive_timeout(mut self, timeout: Duration) -> Self {
        self.receive_timeout_ms = Some(duration_ms(timeout));
        self
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout_ms = Some(duration_ms(timeout));
        self
    }

    pub fn with_max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = max;
        self
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_ms.map(Duration::from_millis)
    }

    pub fn send_timeout(&self) -> Option<Duration> {
        self.send_timeout_ms.map(Duration::from_millis)
    }

    pub fn receive_timeout(&self) -> Option<Duration> {
        self.receive_timeout_ms.map(Duration::from_millis)
    }

    pub fn call_timeout(&self) -> Option<Duration> {
        self.call_timeout_ms.map(Duration::from_millis)
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
