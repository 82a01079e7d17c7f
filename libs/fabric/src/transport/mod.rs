use muster_core::NodeAddress;

use crate::error::Result;
use crate::request::Procedure;

pub mod frame;
pub mod tcp;

pub use self::frame::Response;
pub use self::tcp::{TcpConnector, TcpTransport, TcpTransportBuilder};

/// Transport trait for one request/response exchange with a node
///
/// Each transport instance represents a single connection and carries
/// exactly one request; connections are never reused across calls.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Send the procedure's request over the transport
    async fn send(&mut self, procedure: &Procedure) -> Result<()>;

    /// Receive the response to the request
    async fn receive(&mut self) -> Result<Response>;

    /// Close the transport connection
    async fn close(&mut self) -> Result<()>;
}

/// Opens transports to nodes
///
/// The fan-out client only talks to nodes through this seam, so tests and
/// alternative transports can be swapped in without touching call logic.
#[async_trait::async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Establish a fresh connection to `node`
    async fn connect(&self, node: &NodeAddress) -> Result<Box<dyn Transport>>;
}
