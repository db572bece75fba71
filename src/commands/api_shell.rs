//! API and shell commands (device `0x10`).

use std::time::Duration;

use super::devices;
use crate::error::Result;
use crate::handler::Handler;
use crate::protocol::FieldSpec;
use crate::transport::Port;

const GET_API_PROTOCOL_VERSION: u8 = 0x00;
const ECHO: u8 = 0x02;

/// Protocol version advertised by a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApiVersion {
    pub major: u8,
    pub minor: u8,
}

impl<P: Port> Handler<P> {
    /// Query the API protocol version spoken by `target`.
    pub async fn get_api_protocol_version(
        &self,
        target: u8,
        timeout: Duration,
    ) -> Result<ApiVersion> {
        const OUTPUTS: &[FieldSpec] = &[
            FieldSpec::uint8("majorVersion", 0),
            FieldSpec::uint8("minorVersion", 1),
        ];
        let map = self
            .typed_command(
                devices::API_AND_SHELL,
                GET_API_PROTOCOL_VERSION,
                target,
                timeout,
                &[],
                OUTPUTS,
            )
            .await?;
        Ok(ApiVersion {
            major: map.require("majorVersion")? as u8,
            minor: map.require("minorVersion")? as u8,
        })
    }

    /// Round-trip a value through `target`; a healthy link returns the
    /// same value.
    pub async fn echo(&self, target: u8, data: u32, timeout: Duration) -> Result<u32> {
        const OUTPUTS: &[FieldSpec] = &[FieldSpec::uint32("data", 0)];
        let map = self
            .typed_command(
                devices::API_AND_SHELL,
                ECHO,
                target,
                timeout,
                &[FieldSpec::uint32("data", 0).with_value(data.into())],
                OUTPUTS,
            )
            .await?;
        Ok(map.require("data")? as u32)
    }
}
