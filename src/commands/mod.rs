//! Device-command glue.
//!
//! Thin typed wrappers over [`Handler::call`], one module per device
//! service: build the field descriptors, encode inputs, address the
//! message, decode outputs. The catalog here covers the commands this
//! crate's consumers drive today, not the device's full command table;
//! new commands follow the same pattern via [`Handler::typed_command`]
//! and [`Handler::typed_notify`].

mod api_shell;
mod drive;
mod power;

pub use api_shell::ApiVersion;
pub use drive::{drive_flags, RawMotorMode};

use std::time::Duration;

use crate::error::Result;
use crate::handler::{Handler, NO_INTERPRETER};
use crate::protocol::{decode_fields, encode_fields, FieldMap, FieldSpec, FieldValue, Message};
use crate::transport::Port;

/// Device IDs for the services addressed by this crate.
pub mod devices {
    /// API and shell service.
    pub const API_AND_SHELL: u8 = 0x10;
    /// Power management service.
    pub const POWER: u8 = 0x13;
    /// Drive service.
    pub const DRIVE: u8 = 0x16;
}

impl<P: Port> Handler<P> {
    /// Issue one descriptor-driven command and decode its response.
    ///
    /// Encodes `inputs` into the payload, requests a response, and decodes
    /// the reply against `outputs`. Building block for the typed command
    /// wrappers in this module tree.
    pub async fn typed_command(
        &self,
        device_id: u8,
        command_id: u8,
        target: u8,
        timeout: Duration,
        inputs: &[FieldValue],
        outputs: &'static [FieldSpec],
    ) -> Result<FieldMap> {
        let payload = encode_fields(inputs)?;
        let msg = Message::command(device_id, command_id)
            .with_target(target)
            .request_response()
            .pack_bytes(payload);
        let decoded = self
            .call(
                msg,
                Some(move |response: &Message| decode_fields(outputs, response.payload())),
                Some(timeout),
            )
            .await?;
        Ok(decoded.unwrap_or_default())
    }

    /// Issue one descriptor-driven command with nothing expected back.
    pub async fn typed_notify(
        &self,
        device_id: u8,
        command_id: u8,
        target: u8,
        inputs: &[FieldValue],
    ) -> Result<()> {
        let payload = encode_fields(inputs)?;
        let msg = Message::command(device_id, command_id)
            .with_target(target)
            .pack_bytes(payload);
        self.call(msg, NO_INTERPRETER, None).await?;
        Ok(())
    }
}
