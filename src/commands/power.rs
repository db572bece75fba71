//! Power commands (device `0x13`).

use std::time::Duration;

use super::devices;
use crate::error::Result;
use crate::handler::Handler;
use crate::protocol::FieldSpec;
use crate::transport::Port;

const SLEEP: u8 = 0x01;
const WAKE: u8 = 0x0D;
const GET_BATTERY_PERCENTAGE: u8 = 0x10;

impl<P: Port> Handler<P> {
    /// Wake the rover from soft sleep. Takes effect after a short delay, so
    /// callers typically pause before issuing further commands.
    pub async fn wake(&self, target: u8) -> Result<()> {
        self.typed_notify(devices::POWER, WAKE, target, &[]).await
    }

    /// Put the rover into soft sleep.
    pub async fn sleep(&self, target: u8) -> Result<()> {
        self.typed_notify(devices::POWER, SLEEP, target, &[]).await
    }

    /// Query the battery charge as a percentage (`0..=100`).
    pub async fn get_battery_percentage(&self, target: u8, timeout: Duration) -> Result<u8> {
        const OUTPUTS: &[FieldSpec] = &[FieldSpec::uint8("percentage", 0)];

        let fields = self
            .typed_command(devices::POWER, GET_BATTERY_PERCENTAGE, target, timeout, &[], OUTPUTS)
            .await?;
        Ok(fields.require("percentage")? as u8)
    }
}
