//! Muster Core - shared types for the cluster control-plane client
//!
//! Holds the node addressing type and the injected client configuration
//! that the fabric and catalog crates are parameterized over.

pub mod address;
pub mod config;
pub mod error;

pub use address::NodeAddress;
pub use config::ClientConfig;
pub use error::{Error, Result};
