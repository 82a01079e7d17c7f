use std::sync::Arc;

use serde_json::Value;

use crate::codec::JsonCodec;
use crate::error::Result;

/// A named remote operation with its encoded argument payload
///
/// The payload is encoded once and shared behind an `Arc`, so every node in
/// one fan-out call receives byte-identical request bodies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Procedure {
    name: String,
    body: Arc<[u8]>,
}

impl Procedure {
    /// Encode `args` and pair them with the procedure name
    pub fn new(name: impl Into<String>, args: &[Value], codec: &JsonCodec) -> Result<Self> {
        let body = codec.encode_args(args)?;
        Ok(Self::from_encoded(name, body))
    }

    /// Wrap an already encoded payload
    pub fn from_encoded(name: impl Into<String>, body: impl Into<Arc<[u8]>>) -> Self {
        Self {
            name: name.into(),
            body: body.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }
}
