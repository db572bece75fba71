//! In-process port over a tokio channel.
//!
//! Useful wherever the other end of the link lives in the same process:
//! the test suite, the examples, or an embedding that does its own framing
//! on a separate task.

use tokio::sync::mpsc;

use super::Port;
use crate::error::{Result, RovercomError};
use crate::protocol::Message;

/// A [`Port`] whose transmit side is an mpsc sender.
///
/// Cheaply cloneable; all clones feed the same receiver.
#[derive(Clone)]
pub struct ChannelPort {
    tx: mpsc::UnboundedSender<Message>,
}

impl ChannelPort {
    /// Create a port plus the receiver its traffic arrives on.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Message>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Port for ChannelPort {
    fn send(&self, msg: Message) -> Result<()> {
        self.tx
            .send(msg)
            .map_err(|_| RovercomError::ConnectionClosed)
    }
}
