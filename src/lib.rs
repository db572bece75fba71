//! # rovercom
//!
//! Async command/response engine for the Sphero RVR API protocol.
//!
//! The rover and its controller exchange addressed frames: each frame names
//! a device (`did`), a command on that device (`cid`), source and target
//! nodes, a correlation sequence, and a packed big-endian payload. This
//! crate runs both sides of that conversation.
//!
//! ## Architecture
//!
//! - **Handler**: allocates sequences, correlates responses to in-flight
//!   calls, and dispatches inbound commands to registered workers
//! - **Protocol**: message struct, error codes, and the ordinal-indexed
//!   field codec
//! - **Commands**: typed wrappers for the api_and_shell, power, and drive
//!   devices
//!
//! ## Example
//!
//! ```ignore
//! use std::time::Duration;
//! use rovercom::{ChannelPort, Handler};
//!
//! #[tokio::main]
//! async fn main() {
//!     let (port, _outbound) = ChannelPort::new();
//!     let handler = Handler::new(port);
//!
//!     let version = handler
//!         .get_api_protocol_version(1, Duration::from_secs(2))
//!         .await
//!         .unwrap();
//!     println!("rover speaks {}.{}", version.major, version.minor);
//! }
//! ```

pub mod commands;
pub mod error;
pub mod handler;
pub mod protocol;
pub mod transport;

pub use commands::{devices, ApiVersion, RawMotorMode};
pub use error::RovercomError;
pub use handler::{Handler, NO_INTERPRETER};
pub use protocol::{ErrorCode, FieldSpec, Message};
pub use transport::{ChannelPort, Inbound, Port};
