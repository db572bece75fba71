//! Error codes carried by response frames.
//!
//! Every response message carries one byte describing the outcome of the
//! command on the device. `Success` is the "no error" sentinel; everything
//! else explains why the command was rejected or failed.

use std::fmt;

use crate::error::{Result, RovercomError};

/// Outcome of a command, as reported by the responding node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ErrorCode {
    /// Command executed; any output payload is valid.
    Success = 0x00,
    /// No service with the requested device ID.
    BadDeviceId = 0x01,
    /// Service exists but has no such command ID.
    BadCommandId = 0x02,
    /// Command is known but not implemented on this node.
    NotYetImplemented = 0x03,
    /// Command refused in the current access mode.
    Restricted = 0x04,
    /// Input payload length does not match the command signature.
    BadDataLength = 0x05,
    /// Command understood but execution failed.
    CommandFailed = 0x06,
    /// A parameter value is outside its accepted range.
    BadParameterValue = 0x07,
    /// Node cannot take the command right now.
    Busy = 0x08,
    /// Addressed target ID is not valid.
    BadTargetId = 0x09,
    /// Target is valid but unreachable.
    TargetUnavailable = 0x0A,
}

impl ErrorCode {
    /// Raw protocol byte for this code.
    #[inline]
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Decode a protocol byte.
    ///
    /// The enumeration is closed: bytes above `0x0A` are rejected with
    /// [`RovercomError::InvalidErrorCode`] rather than mapped to a
    /// catch-all.
    pub fn from_u8(byte: u8) -> Result<Self> {
        match byte {
            0x00 => Ok(ErrorCode::Success),
            0x01 => Ok(ErrorCode::BadDeviceId),
            0x02 => Ok(ErrorCode::BadCommandId),
            0x03 => Ok(ErrorCode::NotYetImplemented),
            0x04 => Ok(ErrorCode::Restricted),
            0x05 => Ok(ErrorCode::BadDataLength),
            0x06 => Ok(ErrorCode::CommandFailed),
            0x07 => Ok(ErrorCode::BadParameterValue),
            0x08 => Ok(ErrorCode::Busy),
            0x09 => Ok(ErrorCode::BadTargetId),
            0x0A => Ok(ErrorCode::TargetUnavailable),
            other => Err(RovercomError::InvalidErrorCode(other)),
        }
    }

    /// True for the `Success` sentinel.
    #[inline]
    pub fn is_success(self) -> bool {
        self == ErrorCode::Success
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorCode::Success => "success",
            ErrorCode::BadDeviceId => "bad device id",
            ErrorCode::BadCommandId => "bad command id",
            ErrorCode::NotYetImplemented => "not yet implemented",
            ErrorCode::Restricted => "restricted",
            ErrorCode::BadDataLength => "bad data length",
            ErrorCode::CommandFailed => "command failed",
            ErrorCode::BadParameterValue => "bad parameter value",
            ErrorCode::Busy => "busy",
            ErrorCode::BadTargetId => "bad target id",
            ErrorCode::TargetUnavailable => "target unavailable",
        };
        write!(f, "{} ({:#04x})", name, self.as_u8())
    }
}

impl From<ErrorCode> for u8 {
    #[inline]
    fn from(code: ErrorCode) -> u8 {
        code.as_u8()
    }
}

impl TryFrom<u8> for ErrorCode {
    type Error = RovercomError;

    fn try_from(byte: u8) -> Result<Self> {
        ErrorCode::from_u8(byte)
    }
}
