//! One request/response exchange with one node

use std::sync::Arc;

use muster_core::NodeAddress;
use tracing::{debug, error, warn};

use crate::codec::JsonCodec;
use crate::outcome::{Outcome, TransportFailure};
use crate::request::Procedure;
use crate::transport::{Connector, Transport};

enum State {
    Connected(Box<dyn Transport>),
    Failed(String),
}

/// Observable state of an opened call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeCallStatus {
    /// Request sent, response not yet read
    Connected,
    /// Connecting or sending failed; awaiting will not touch the network
    Failed,
}

/// Handle for a request that has been sent to a node
///
/// Opening never fails: connection and send errors are captured in the
/// handle and reported by [`NodeCall::await_response`]. Awaiting consumes
/// the handle, so each call is read exactly once and its connection is
/// closed afterwards.
pub struct NodeCall {
    address: NodeAddress,
    procedure: Arc<Procedure>,
    state: State,
}

impl NodeCall {
    /// Connect to `address` and send the request
    pub async fn open<K>(connector: &K, address: NodeAddress, procedure: Arc<Procedure>) -> Self
    where
        K: Connector + ?Sized,
    {
        debug!(node = %address, procedure = procedure.name(), "opening node call");

        let state = match connector.connect(&address).await {
            Ok(mut transport) => match transport.send(&procedure).await {
                Ok(()) => State::Connected(transport),
                Err(e) => {
                    warn!(node = %address, error = %e, "failed to send request");
                    if let Err(close_err) = transport.close().await {
                        debug!(node = %address, error = %close_err, "error closing connection");
                    }
                    State::Failed(e.to_string())
                }
            },
            Err(e) => {
                warn!(node = %address, error = %e, "error connecting to node");
                State::Failed(e.to_string())
            }
        };

        Self {
            address,
            procedure,
            state,
        }
    }

    pub fn address(&self) -> &NodeAddress {
        &self.address
    }

    pub fn procedure(&self) -> &Procedure {
        &self.procedure
    }

    pub fn status(&self) -> NodeCallStatus {
        match self.state {
            State::Connected(_) => NodeCallStatus::Connected,
            State::Failed(_) => NodeCallStatus::Failed,
        }
    }

    /// Read and classify the node's response
    pub async fn await_response(self, codec: &JsonCodec) -> Outcome {
        let mut transport = match self.state {
            State::Connected(transport) => transport,
            State::Failed(reason) => return Outcome::ConnectFailure(reason),
        };

        let received = transport.receive().await;
        if let Err(e) = transport.close().await {
            debug!(node = %self.address, error = %e, "error closing connection");
        }

        let response = match received {
            Ok(response) => response,
            Err(e) => {
                warn!(node = %self.address, error = %e, "failed to read response");
                return Outcome::TransportFailure(e.into());
            }
        };

        if !response.is_success() {
            warn!(node = %self.address, status = response.status, "node returned error status");
            return Outcome::TransportFailure(TransportFailure::BadStatus(response.status));
        }

        if response.body.is_empty() {
            error!(node = %self.address, "zero-length reply from node");
            return Outcome::TransportFailure(TransportFailure::EmptyResponse);
        }

        match codec.decode_value(&response.body) {
            Ok(value) => {
                debug!(
                    node = %self.address,
                    procedure = self.procedure.name(),
                    "node call succeeded"
                );
                Outcome::Success(value)
            }
            Err(e) => {
                warn!(node = %self.address, error = %e, "malformed payload from node");
                Outcome::DecodeFailure(e.to_string())
            }
        }
    }
}
