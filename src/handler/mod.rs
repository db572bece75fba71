//! Protocol handler - sequence lifecycle, dispatch, and call correlation.
//!
//! The [`Handler`] owns the sequence-number pool and the two worker tables:
//! command workers serving inbound commands, response correlators completing
//! outbound calls. It consumes a transport [`Port`] for sending and exposes
//! the inbound entry points the transport feeds: [`Handler::dispatch`] for
//! parsed messages and [`Handler::handle_malformed`] for buffers that never
//! became one.
//!
//! Outbound call lifecycle:
//! 1. Allocate a sequence number and stamp it on the message
//! 2. Register a correlator under `(device_id, command_id, seq)`
//! 3. Send the frame through the port
//! 4. Suspend on a one-shot completion handle, bounded by the timeout
//! 5. Remove the correlator and release the sequence number on every exit
//!    path - success, device error, interpreter error, or timeout
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use rovercom::{Handler, Message};
//! use rovercom::protocol::{decode_fields, FieldSpec};
//! use rovercom::transport::ChannelPort;
//!
//! let (port, outbound) = ChannelPort::new();
//! let handler = Handler::new(port);
//! // Wire `outbound` to the device and pump device frames back in via
//! // transport::spawn_inbound_task, then:
//! let major = handler
//!     .call(
//!         Message::command(0x10, 0x00).request_response(),
//!         Some(|response: &Message| {
//!             let map = decode_fields(
//!                 &[FieldSpec::uint8("majorVersion", 0)],
//!                 response.payload(),
//!             )?;
//!             map.require("majorVersion")
//!         }),
//!         Some(Duration::from_secs(1)),
//!     )
//!     .await?;
//! ```

mod registry;
mod sequence;

pub use registry::{
    BoxFuture, CommandKey, CommandOutcome, CommandWorker, ResponseKey, ResponseWorker, WorkerTable,
};
pub use sequence::SequencePool;

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::error::{Result, RovercomError};
use crate::protocol::{ErrorCode, Message};
use crate::transport::Port;

/// Interpreter placeholder for calls that expect no decoded result.
///
/// A bare `None` leaves the interpreter type parameter unconstrained; pass
/// this constant for fire-and-forget and error-only calls.
pub const NO_INTERPRETER: Option<fn(&Message) -> Result<()>> = None;

struct HandlerInner<P> {
    port: P,
    sequences: Mutex<SequencePool>,
    command_workers: WorkerTable<CommandKey, dyn CommandWorker>,
    response_workers: WorkerTable<ResponseKey, dyn ResponseWorker>,
}

/// Protocol handler for one transport connection.
///
/// Cheap to clone; clones share the pool, the worker tables, and the port.
pub struct Handler<P> {
    inner: Arc<HandlerInner<P>>,
}

impl<P> Clone for Handler<P> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

/// Removes the correlator and frees the sequence number when a call ends.
struct CallGuard<'a, P> {
    inner: &'a HandlerInner<P>,
    key: ResponseKey,
}

impl<P> Drop for CallGuard<'_, P> {
    fn drop(&mut self) {
        self.inner.response_workers.unregister(self.key);
        self.inner.sequences.lock().release(self.key.seq);
    }
}

impl<P: Port> Handler<P> {
    /// Create a handler over a transport port, with a full sequence pool
    /// and empty worker tables.
    pub fn new(port: P) -> Self {
        Self {
            inner: Arc::new(HandlerInner {
                port,
                sequences: Mutex::new(SequencePool::new()),
                command_workers: WorkerTable::new(),
                response_workers: WorkerTable::new(),
            }),
        }
    }

    /// Register a worker for inbound `(device_id, command_id)` commands.
    ///
    /// `target_node` names the remote node this worker serves; inbound
    /// commands are matched by their source node, falling back to the
    /// `None` wildcard registration when no exact match exists. Fails if
    /// the key is already bound.
    pub fn add_command_worker<W>(
        &self,
        device_id: u8,
        command_id: u8,
        target_node: Option<u8>,
        worker: W,
    ) -> Result<()>
    where
        W: CommandWorker,
    {
        self.inner.command_workers.register(
            CommandKey::new(device_id, command_id, target_node),
            Arc::new(worker),
        )
    }

    /// Remove a command worker registration. No-op if absent.
    pub fn remove_command_worker(&self, device_id: u8, command_id: u8, target_node: Option<u8>) {
        self.inner
            .command_workers
            .unregister(CommandKey::new(device_id, command_id, target_node));
    }

    /// Register a correlator for the response to an outstanding call.
    ///
    /// [`Handler::call`] does this on its own; register manually only when
    /// correlating responses outside the call primitive. Fails if the key
    /// is already bound.
    pub fn add_response_worker<W>(
        &self,
        device_id: u8,
        command_id: u8,
        seq: u8,
        worker: W,
    ) -> Result<()>
    where
        W: ResponseWorker,
    {
        self.inner.response_workers.register(
            ResponseKey::new(device_id, command_id, seq),
            Arc::new(worker),
        )
    }

    /// Remove a response correlator registration. No-op if absent.
    pub fn remove_response_worker(&self, device_id: u8, command_id: u8, seq: u8) {
        self.inner
            .response_workers
            .unregister(ResponseKey::new(device_id, command_id, seq));
    }

    /// Send a command, optionally awaiting and interpreting its response.
    ///
    /// A message that requests no response at all is sent immediately and
    /// the call returns `Ok(None)` without touching the sequence pool.
    /// Otherwise a sequence number is allocated, a correlator registered,
    /// and the caller suspended until the matching response arrives or
    /// `timeout` elapses. The interpreter runs only on responses carrying
    /// `Success`; a non-success code fails the call with
    /// [`RovercomError::Device`], and a response missing its code (every
    /// conforming response carries exactly one) fails with
    /// [`RovercomError::MissingErrorCode`].
    ///
    /// # Errors
    ///
    /// Fails before any I/O when the message requests a response without an
    /// interpreter, requests an error response without a timeout, or the
    /// sequence pool is exhausted.
    pub async fn call<T, F>(
        &self,
        mut msg: Message,
        interpreter: Option<F>,
        timeout: Option<Duration>,
    ) -> Result<Option<T>>
    where
        F: FnOnce(&Message) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        if msg.requests_response && interpreter.is_none() {
            return Err(RovercomError::MissingInterpreter);
        }
        if msg.requests_error_response && timeout.is_none() {
            return Err(RovercomError::MissingTimeout);
        }

        if !msg.requests_any_response() {
            self.inner.port.send(msg)?;
            return Ok(None);
        }

        let seq = self.inner.sequences.lock().allocate()?;
        msg.seq = seq;
        let key = ResponseKey::new(msg.device_id, msg.command_id, seq);

        let (tx, rx) = oneshot::channel::<Result<Option<T>>>();
        let slot = Arc::new(Mutex::new(Some((tx, interpreter))));
        let correlator = move |response: Message| {
            let slot = slot.clone();
            async move {
                // Take-once: a duplicate invocation finds nothing.
                let taken = slot.lock().take();
                if let Some((tx, interpreter)) = taken {
                    let outcome = match response.err {
                        Some(code) if !code.is_success() => Err(RovercomError::Device(code)),
                        Some(_) => match interpreter {
                            Some(interpret) => interpret(&response).map(Some),
                            None => Ok(None),
                        },
                        None => Err(RovercomError::MissingErrorCode),
                    };
                    let _ = tx.send(outcome);
                }
            }
        };

        if let Err(e) = self
            .inner
            .response_workers
            .register(key, Arc::new(correlator))
        {
            self.inner.sequences.lock().release(seq);
            return Err(e);
        }
        let _guard = CallGuard {
            inner: self.inner.as_ref(),
            key,
        };

        self.inner.port.send(msg)?;

        match timeout {
            Some(limit) => match tokio::time::timeout(limit, rx).await {
                Ok(Ok(outcome)) => outcome,
                Ok(Err(_)) => Err(RovercomError::ConnectionClosed),
                Err(_) => Err(RovercomError::ResponseTimeout(limit)),
            },
            None => match rx.await {
                Ok(outcome) => outcome,
                Err(_) => Err(RovercomError::ConnectionClosed),
            },
        }
    }

    /// Inbound entry point: classify and process one parsed message.
    ///
    /// Responses complete their pending call inline; a response with no
    /// pending call is logged and dropped. Commands run in a spawned task
    /// so a suspended worker never holds up subsequent frames.
    pub async fn dispatch(&self, msg: Message) {
        if msg.is_response {
            self.handle_response(msg).await;
        } else {
            let handler = self.clone();
            tokio::spawn(async move {
                handler.run_command(msg).await;
            });
        }
    }

    /// Inbound entry point for buffers the transport could not parse.
    pub fn handle_malformed(&self, buf: &[u8]) {
        tracing::warn!("Dropping malformed frame of {} bytes", buf.len());
    }

    /// Sequence numbers currently free.
    pub fn available_sequences(&self) -> usize {
        self.inner.sequences.lock().available()
    }

    /// Correlators currently waiting on a response.
    pub fn pending_responses(&self) -> usize {
        self.inner.response_workers.len()
    }

    async fn handle_response(&self, msg: Message) {
        let key = ResponseKey::new(msg.device_id, msg.command_id, msg.seq);
        match self.inner.response_workers.lookup(key) {
            Some(correlator) => correlator.call(msg).await,
            None => {
                tracing::warn!("No pending call for response ({})", key);
            }
        }
    }

    async fn run_command(&self, request: Message) {
        let key = CommandKey::new(request.device_id, request.command_id, request.source_node);
        let worker = self.inner.command_workers.lookup(key).or_else(|| {
            self.inner
                .command_workers
                .lookup(CommandKey::new(request.device_id, request.command_id, None))
        });

        let (err, body) = match worker {
            Some(worker) => match worker.call(request.clone()).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::error!("Command worker failed for {}: {}", key, e);
                    return;
                }
            },
            None => (ErrorCode::NotYetImplemented, Bytes::new()),
        };

        if !request.requests_response {
            return;
        }
        if request.requests_error_response && err.is_success() {
            return;
        }

        let mut response = Message::from_command_message(&request);
        response.seq = request.seq;
        response.err = Some(err);
        let response = response.pack_bytes(body);

        if let Err(e) = self.inner.port.send(response) {
            tracing::error!("Failed to send response for {}: {}", key, e);
        }
    }
}
