//! Per-node call outcomes

use std::fmt;

use serde_json::Value;

use crate::error::Error;

/// Result of one node's part in a fan-out call
///
/// A successful call carries whatever the node answered, including a
/// legitimate `false`; every failure kind is a separate variant.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The node answered with a decoded value
    Success(Value),
    /// The node could not be reached or the request could not be sent
    ConnectFailure(String),
    /// The response was missing, rejected or incomplete
    TransportFailure(TransportFailure),
    /// The response body was not a valid payload
    DecodeFailure(String),
}

/// Why a response could not be accepted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportFailure {
    BadStatus(u16),
    BadLengthHeader,
    EmptyResponse,
    Truncated { declared: usize, received: usize },
    Timeout,
    ConnectionClosed,
    InvalidFrame(String),
    Io(String),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    pub fn is_failure(&self) -> bool {
        !self.is_success()
    }

    /// The decoded value, if the call succeeded
    pub fn success(&self) -> Option<&Value> {
        match self {
            Outcome::Success(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_success(self) -> Option<Value> {
        match self {
            Outcome::Success(value) => Some(value),
            _ => None,
        }
    }

    /// Split into the value or the failed outcome
    pub fn into_result(self) -> std::result::Result<Value, Outcome> {
        match self {
            Outcome::Success(value) => Ok(value),
            failure => Err(failure),
        }
    }

    /// True for failures that happened before or while talking to the node,
    /// as opposed to a node that answered with garbage
    pub fn is_network_failure(&self) -> bool {
        matches!(
            self,
            Outcome::ConnectFailure(_) | Outcome::TransportFailure(_)
        )
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Success(value) => write!(f, "success: {}", value),
            Outcome::ConnectFailure(reason) => write!(f, "connect failure: {}", reason),
            Outcome::TransportFailure(failure) => write!(f, "transport failure: {}", failure),
            Outcome::DecodeFailure(reason) => write!(f, "malformed payload: {}", reason),
        }
    }
}

impl fmt::Display for TransportFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportFailure::BadStatus(code) => write!(f, "bad status {}", code),
            TransportFailure::BadLengthHeader => f.write_str("bad length header"),
            TransportFailure::EmptyResponse => f.write_str("empty response"),
            TransportFailure::Truncated { declared, received } => write!(
                f,
                "truncated response ({} of {} bytes)",
                received, declared
            ),
            TransportFailure::Timeout => f.write_str("timeout"),
            TransportFailure::ConnectionClosed => f.write_str("connection closed"),
            TransportFailure::InvalidFrame(msg) => write!(f, "invalid frame: {}", msg),
            TransportFailure::Io(msg) => write!(f, "io: {}", msg),
        }
    }
}

impl From<Error> for TransportFailure {
    fn from(err: Error) -> Self {
        match err {
            Error::InvalidLength(_) => TransportFailure::BadLengthHeader,
            Error::Truncated { declared, received } => {
                TransportFailure::Truncated { declared, received }
            }
            Error::Timeout(_) => TransportFailure::Timeout,
            Error::ConnectionClosed => TransportFailure::ConnectionClosed,
            Error::InvalidFrame(msg) => TransportFailure::InvalidFrame(msg),
            Error::Io(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                TransportFailure::ConnectionClosed
            }
            other => TransportFailure::Io(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn success_false_is_not_a_failure() {
        let outcome = Outcome::Success(json!(false));
        assert!(outcome.is_success());
        assert_eq!(outcome.success(), Some(&json!(false)));
        assert_ne!(
            outcome,
            Outcome::TransportFailure(TransportFailure::EmptyResponse)
        );
    }

    #[test]
    fn into_result_splits_failures() {
        let failure = Outcome::ConnectFailure("refused".into());
        assert_eq!(failure.clone().into_result(), Err(failure));
        assert_eq!(Outcome::Success(json!(1)).into_result(), Ok(json!(1)));
    }

    #[test]
    fn decode_failure_is_not_a_network_failure() {
        assert!(!Outcome::DecodeFailure("eof".into()).is_network_failure());
        assert!(Outcome::TransportFailure(TransportFailure::Timeout).is_network_failure());
    }

    #[test]
    fn transport_errors_are_classified() {
        assert_eq!(
            TransportFailure::from(Error::InvalidLength("x".into())),
            TransportFailure::BadLengthHeader
        );
        assert_eq!(
            TransportFailure::from(Error::Timeout("Receive")),
            TransportFailure::Timeout
        );
        assert_eq!(
            TransportFailure::from(Error::Truncated {
                declared: 10,
                received: 3
            }),
            TransportFailure::Truncated {
                declared: 10,
                received: 3
            }
        );
    }

    #[test]
    fn display_uses_reason_text() {
        let outcome = Outcome::TransportFailure(TransportFailure::BadStatus(500));
        assert_eq!(outcome.to_string(), "transport failure: bad status 500");
        assert_eq!(TransportFailure::EmptyResponse.to_string(), "empty response");
    }
}
