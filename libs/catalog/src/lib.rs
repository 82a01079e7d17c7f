//! Muster Catalog - named procedures over the fan-out client
//!
//! Each wrapper picks a procedure name, flattens its arguments into plain
//! data and applies that procedure's convention for failed nodes.

pub mod catalog;
pub mod error;
pub mod flatten;
pub mod procedures;
pub mod retry;

pub use catalog::{single_or_default, Catalog, NODE_INFO_DEFAULTS};
pub use error::{Error, Result};
pub use flatten::Flatten;
pub use procedures::{spec_for, ProcedureSpec, Scope, PROCEDURES};
pub use retry::RetryPolicy;
