use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::codec::Codec;
use crate::error::{Error, Result};

/// JSON codec for the plain-data argument and result payloads
///
/// Object keys are emitted in sorted order, so encoding is byte-stable.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>> {
        serde_json::to_vec(value).map_err(|e| Error::Codec(e.to_string()))
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T> {
        serde_json::from_slice(bytes).map_err(|e| Error::Codec(e.to_string()))
    }
}

impl JsonCodec {
    /// Encode an ordered argument list as a JSON array
    pub fn encode_args(&self, args: &[Value]) -> Result<Vec<u8>> {
        self.encode(&args)
    }

    /// Decode a payload into the plain-data value model
    pub fn decode_value(&self, bytes: &[u8]) -> Result<Value> {
        self.decode(bytes)
    }
}
