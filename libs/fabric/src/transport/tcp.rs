use std::net::SocketAddr;
use std::time::Duration;

use muster_core::{ClientConfig, NodeAddress};
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::debug;

use crate::error::{Error, Result};
use crate::request::Procedure;
use crate::transport::frame::{self, Response};
use crate::transport::{Connector, Transport};

/// TCP transport speaking the request/response framing
pub struct TcpTransport {
    stream: BufReader<TcpStream>,
    host: String,
    send_timeout: Option<Duration>,
    receive_timeout: Option<Duration>,
    max_response_bytes: usize,
}

impl TcpTransport {
    /// Connect to a remote TCP address with no timeouts
    pub async fn connect(addr: SocketAddr) -> Result<Self> {
        Self::builder().address(addr).connect().await
    }

    /// Create a builder for configuring the transport
    pub fn builder() -> TcpTransportBuilder {
        TcpTransportBuilder::new()
    }

    /// Get the remote address of this connection
    pub fn peer_addr(&self) -> Result<SocketAddr> {
        self.stream.get_ref().peer_addr().map_err(Into::into)
    }
}

#[async_trait::async_trait]
impl Transport for TcpTransport {
    async fn send(&mut self, procedure: &Procedure) -> Result<()> {
        let send_op = frame::write_request(&mut self.stream, &self.host, procedure);

        if let Some(timeout) = self.send_timeout {
            tokio::time::timeout(timeout, send_op)
                .await
                .map_err(|_| Error::Timeout("Send"))?
        } else {
            send_op.await
        }
    }

    async fn receive(&mut self) -> Result<Response> {
        let receive_op = frame::read_response(&mut self.stream, self.max_response_bytes);

        if let Some(timeout) = self.receive_timeout {
            tokio::time::timeout(timeout, receive_op)
                .await
                .map_err(|_| Error::Timeout("Receive"))?
        } else {
            receive_op.await
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.stream.get_mut().shutdown().await?;
        Ok(())
    }
}

/// Builder for configuring TCP transport
#[derive(Default)]
pub struct TcpTransportBuilder {
    address: Option<SocketAddr>,
    host: Option<String>,
    connect_timeout: Option<Duration>,
    send_timeout: Option<Duration>,
    receive_timeout: Option<Duration>,
    max_response_bytes: Option<usize>,
}

impl TcpTransportBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the address to connect to
    pub fn address(mut self, addr: SocketAddr) -> Self {
        self.address = Some(addr);
        self
    }

    /// Set the host name sent with each request (defaults to the IP)
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Set the connection timeout
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Set the send timeout
    pub fn send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = Some(timeout);
        self
    }

    /// Set the receive timeout
    pub fn receive_timeout(mut self, timeout: Duration) -> Self {
        self.receive_timeout = Some(timeout);
        self
    }

    /// Set the largest response body accepted
    pub fn max_response_bytes(mut self, max: usize) -> Self {
        self.max_response_bytes = Some(max);
        self
    }

    fn apply_config(self, config: &ClientConfig) -> Self {
        let mut builder = self.max_response_bytes(config.max_response_bytes);
        builder.connect_timeout = config.connect_timeout();
        builder.send_timeout = config.send_timeout();
        builder.receive_timeout = config.receive_timeout();
        builder
    }

    /// Connect with the configured settings
    pub async fn connect(self) -> Result<TcpTransport> {
        let addr = self
            .address
            .ok_or_else(|| Error::Custom("Address not set".to_string()))?;

        let connect_op = TcpStream::connect(addr);

        let stream = if let Some(timeout) = self.connect_timeout {
            tokio::time::timeout(timeout, connect_op)
                .await
                .map_err(|_| Error::Timeout("Connect"))??
        } else {
            connect_op.await?
        };

        Ok(TcpTransport {
            stream: BufReader::new(stream),
            host: self.host.unwrap_or_else(|| addr.ip().to_string()),
            send_timeout: self.send_timeout,
            receive_timeout: self.receive_timeout,
            max_response_bytes: self
                .max_response_bytes
                .unwrap_or(muster_core::config::DEFAULT_MAX_RESPONSE_BYTES),
        })
    }
}

/// Connector that reaches nodes over TCP on the cluster-wide port
#[derive(Debug, Clone)]
pub struct TcpConnector {
    config: ClientConfig,
}

impl TcpConnector {
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }
}

#[async_trait::async_trait]
impl Connector for TcpConnector {
    async fn connect(&self, node: &NodeAddress) -> Result<Box<dyn Transport>> {
        let lookup = tokio::net::lookup_host((node.as_str(), self.config.port));
        let addrs: Vec<SocketAddr> = match self.config.connect_timeout() {
            Some(timeout) => tokio::time::timeout(timeout, lookup)
                .await
                .map_err(|_| Error::Timeout("Resolve"))??
                .collect(),
            None => lookup.await?.collect(),
        };

        let mut last_error = None;
        for addr in addrs {
            debug!(node = %node, %addr, "connecting");
            let attempt = TcpTransport::builder()
                .apply_config(&self.config)
                .address(addr)
                .host(node.as_str())
                .connect()
                .await;
            match attempt {
                Ok(transport) => return Ok(Box::new(transport)),
                Err(e) => last_error = Some(e),
            }
        }

        Err(last_error.unwrap_or_else(|| {
            Error::Custom(format!("No addresses resolved for node {}", node))
        }))
    }
}
