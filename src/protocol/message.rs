//! Message struct - one addressed protocol frame.
//!
//! A message names a command by `(device_id, command_id)`, addresses it with
//! optional source/target nodes, and carries a sequence number plus three
//! behavior flags. Responses additionally carry an [`ErrorCode`].
//! Uses `bytes::Bytes` for zero-copy payload sharing.
//!
//! # Example
//!
//! ```
//! use rovercom::protocol::Message;
//!
//! let msg = Message::command(0x16, 0x07)
//!     .with_target(1)
//!     .pack_bytes(vec![0x40, 0x00, 0x5A, 0x00]);
//!
//! assert_eq!(msg.device_id, 0x16);
//! assert!(!msg.requests_any_response());
//! ```

use bytes::Bytes;

use super::error_code::ErrorCode;

/// Sequence value of a message not (yet) tied to an outstanding call.
/// Live sequence numbers are `1..=255`.
pub const SEQ_UNASSIGNED: u8 = 0;

/// One protocol frame, either a command or a response.
#[derive(Debug, Clone)]
pub struct Message {
    /// Service the command belongs to.
    pub device_id: u8,
    /// Command within the service.
    pub command_id: u8,
    /// Node that produced the frame (`None` = unspecified).
    pub source_node: Option<u8>,
    /// Node the frame is addressed to (`None` = unspecified).
    pub target_node: Option<u8>,
    /// Correlation token, `1..=255` while a call is outstanding.
    pub seq: u8,
    /// True for responses, false for commands.
    pub is_response: bool,
    /// Command asks the receiver to always answer.
    pub requests_response: bool,
    /// Command asks the receiver to answer only on failure.
    pub requests_error_response: bool,
    /// Outcome code; meaningful only on responses.
    pub err: Option<ErrorCode>,
    /// Payload bytes (zero-copy via `bytes::Bytes`).
    pub payload: Bytes,
}

impl Message {
    /// Create a command message with no addressing, no flags, no payload.
    pub fn command(device_id: u8, command_id: u8) -> Self {
        Self {
            device_id,
            command_id,
            source_node: None,
            target_node: None,
            seq: SEQ_UNASSIGNED,
            is_response: false,
            requests_response: false,
            requests_error_response: false,
            err: None,
            payload: Bytes::new(),
        }
    }

    /// Build the skeleton of a response to `request`: same command
    /// addressing with source and target swapped, response flag set.
    /// The sequence number is left unassigned; dispatch stamps it from
    /// the request when the response is sent.
    pub fn from_command_message(request: &Message) -> Self {
        Self {
            device_id: request.device_id,
            command_id: request.command_id,
            source_node: request.target_node,
            target_node: request.source_node,
            seq: SEQ_UNASSIGNED,
            is_response: true,
            requests_response: false,
            requests_error_response: false,
            err: None,
            payload: Bytes::new(),
        }
    }

    /// Address the message to a specific node.
    pub fn with_target(mut self, node: u8) -> Self {
        self.target_node = Some(node);
        self
    }

    /// Mark the message as originating from a specific node.
    pub fn with_source(mut self, node: u8) -> Self {
        self.source_node = Some(node);
        self
    }

    /// Ask the receiver to answer regardless of outcome.
    pub fn request_response(mut self) -> Self {
        self.requests_response = true;
        self
    }

    /// Ask the receiver to answer only when the command fails.
    pub fn request_error_response(mut self) -> Self {
        self.requests_error_response = true;
        self
    }

    /// Attach an already-encoded payload.
    pub fn pack_bytes(mut self, payload: impl Into<Bytes>) -> Self {
        self.payload = payload.into();
        self
    }

    /// True when the sender expects any frame back (always or error-only).
    #[inline]
    pub fn requests_any_response(&self) -> bool {
        self.requests_response || self.requests_error_response
    }

    /// Get a reference to the payload bytes.
    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }
}
