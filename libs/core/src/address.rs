use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity of a cluster node: its host name or IP address
///
/// The port is cluster-wide and lives in [`ClientConfig`](crate::ClientConfig),
/// so two addresses are equal exactly when their host strings are.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeAddress(String);

impl NodeAddress {
    pub fn new(host: impl Into<String>) -> Self {
        Self(host.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for NodeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeAddress {
    fn from(host: &str) -> Self {
        Self::new(host)
    }
}

impl From<String> for NodeAddress {
    fn from(host: String) -> Self {
        Self(host)
    }
}

impl From<&NodeAddress> for NodeAddress {
    fn from(node: &NodeAddress) -> Self {
        node.clone()
    }
}

impl AsRef<str> for NodeAddress {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
