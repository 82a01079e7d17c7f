use serde::Serialize;
use serde_json::Value;

use crate::error::Result;

/// Conversion of a domain object into the plain-data value model
///
/// Everything handed to the fan-out client has gone through this boundary,
/// so the transport never sees domain types.
pub trait Flatten {
    fn flatten(&self) -> Result<Value>;
}

impl<T: Serialize + ?Sized> Flatten for T {
    fn flatten(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}
