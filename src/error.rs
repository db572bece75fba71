//! Error types for rovercom.

use std::time::Duration;

use thiserror::Error;

use crate::protocol::ErrorCode;

/// Main error type for all rovercom operations.
#[derive(Debug, Error)]
pub enum RovercomError {
    /// I/O error during transport operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The device answered with a non-success error code.
    #[error("device reported {0}")]
    Device(ErrorCode),

    /// A response frame arrived without an outcome code.
    #[error("response carries no outcome code")]
    MissingErrorCode,

    /// No response arrived before the call deadline.
    #[error("no response within {0:?}")]
    ResponseTimeout(Duration),

    /// A call requested a response but supplied no interpreter for it.
    #[error("response requested without an interpreter")]
    MissingInterpreter,

    /// A call requested an error response but supplied no timeout.
    #[error("error response requested without a timeout")]
    MissingTimeout,

    /// All 255 sequence numbers are tied up in outstanding calls.
    #[error("sequence numbers exhausted")]
    SequencesExhausted,

    /// A worker is already registered under the given key.
    #[error("worker already registered for {0}")]
    DuplicateWorker(String),

    /// A field value does not fit in its declared byte width.
    #[error("field '{name}' value {value} exceeds {size}-byte width")]
    FieldOverflow {
        name: &'static str,
        value: u64,
        size: usize,
    },

    /// A payload ended before all declared fields were decoded.
    #[error("payload too short: expected {expected} bytes, got {actual}")]
    ShortPayload { expected: usize, actual: usize },

    /// A decoded field map has no entry under the given name.
    #[error("missing field '{0}'")]
    MissingField(&'static str),

    /// A field descriptor declares an unsupported byte width.
    #[error("unsupported field width: {0} bytes")]
    InvalidFieldSize(usize),

    /// A response frame carries a byte outside the error-code enumeration.
    #[error("unknown error code byte: {0:#04x}")]
    InvalidErrorCode(u8),

    /// Transport closed while a message or response was in flight.
    #[error("connection closed")]
    ConnectionClosed,
}

/// Result type alias using RovercomError.
pub type Result<T> = std::result::Result<T, RovercomError>;
