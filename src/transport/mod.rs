//! Transport seam - the port abstraction and inbound delivery.
//!
//! The handler core never sees bytes on a wire. Outbound it hands finished
//! [`Message`]s to a [`Port`]; inbound it is fed through
//! [`spawn_inbound_task`], which drains a transport's queue of parsed
//! frames and malformed buffers into the handler's dispatch entry points,
//! one at a time, in delivery order.

mod channel;

pub use channel::ChannelPort;

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::Result;
use crate::handler::Handler;
use crate::protocol::Message;

/// Outbound seam between the handler and a transport.
pub trait Port: Send + Sync + 'static {
    /// Queue one message for transmission. Fire-and-forget at this layer;
    /// framing and wire I/O are the transport's business.
    fn send(&self, msg: Message) -> Result<()>;
}

/// One unit of inbound traffic from a transport.
#[derive(Debug)]
pub enum Inbound {
    /// A fully parsed frame.
    Frame(Message),
    /// Bytes that never became a frame.
    Malformed(Bytes),
}

/// Spawn the task that drains a transport's inbound queue into the handler.
///
/// The task ends when the sending side of the channel is dropped.
pub fn spawn_inbound_task<P: Port>(
    handler: Handler<P>,
    mut rx: mpsc::UnboundedReceiver<Inbound>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(inbound) = rx.recv().await {
            match inbound {
                Inbound::Frame(msg) => handler.dispatch(msg).await,
                Inbound::Malformed(buf) => handler.handle_malformed(&buf),
            }
        }
        tracing::debug!("Inbound channel closed, stopping dispatch");
    })
}
