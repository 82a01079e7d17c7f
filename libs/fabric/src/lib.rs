//! Muster Fabric - multi-node call transport
//!
//! Provides the wire codec, the request/response framing over TCP, the
//! single-node call lifecycle and the fan-out client that runs one procedure
//! against many nodes and returns a per-node [`Outcome`].
//!
//! # Example
//!
//! ```no_run
//! use muster_core::ClientConfig;
//! use muster_fabric::{FanOutClient, Outcome};
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = FanOutClient::new(ClientConfig::default())?;
//!
//! let results = client.call("vg_list", &[], ["node1", "node2"]).await?;
//! for (node, outcome) in results.iter() {
//!     match outcome {
//!         Outcome::Success(value) => println!("{node}: {value}"),
//!         failure => println!("{node}: {failure}"),
//!     }
//! }
//!
//! // Single-node reduction
//! let exists = client
//!     .call_single("bridges_exist", &[json!(["br0"])], "node1", Outcome::Success(json!(false)))
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod codec;
pub mod error;
pub mod node_call;
pub mod outcome;
pub mod request;
pub mod transport;

// Re-exports for convenience
pub use client::{FanOutClient, ResultMap};
pub use error::{Error, Result};
pub use node_call::{NodeCall, NodeCallStatus};
pub use outcome::{Outcome, TransportFailure};
pub use request::Procedure;
pub use serde_json::Value;
