// Failure taxonomy for the three update sources
use thiserror::Error;

/// A REST call that did not produce usable data.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("request to {endpoint} timed out")]
    Timeout { endpoint: String },

    #[error("request to {endpoint} failed: {message}")]
    Transport { endpoint: String, message: String },

    #[error("{endpoint} responded with status {status}")]
    Status { endpoint: String, status: u16 },

    #[error("{endpoint} returned an unexpected payload: {message}")]
    Decode { endpoint: String, message: String },
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PushError {
    #[error("malformed push payload: {reason}")]
    MalformedPayload { reason: String },

    #[error("push channel handshake timed out")]
    HandshakeTimeout,

    #[error("push channel failed: {0}")]
    Channel(String),

    #[error("push channel closed by peer")]
    Closed,
}
