//! Drive commands (device `0x16`).
//!
//! All drive commands are fire-and-forget: the rover does not acknowledge
//! them, and a teleoperation loop reissues them continuously anyway.

use super::devices;
use crate::error::Result;
use crate::handler::Handler;
use crate::protocol::FieldSpec;
use crate::transport::Port;

const RAW_MOTORS: u8 = 0x01;
const RESET_YAW: u8 = 0x06;
const DRIVE_WITH_HEADING: u8 = 0x07;

/// Drive mode of one motor in a [`Handler::raw_motors`] command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RawMotorMode {
    Off = 0,
    Forward = 1,
    Reverse = 2,
}

/// Bit flags modifying [`Handler::drive_with_heading`].
pub mod drive_flags {
    pub const DRIVE_REVERSE: u8 = 0x01;
    pub const BOOST: u8 = 0x02;
    pub const FAST_TURN: u8 = 0x04;
    pub const LEFT_DIRECTION: u8 = 0x08;
    pub const RIGHT_DIRECTION: u8 = 0x10;
    pub const ENABLE_DRIFT: u8 = 0x20;
}

impl<P: Port> Handler<P> {
    /// Drive toward `heading` (degrees, `0..=359`) at `speed`, modified by
    /// [`drive_flags`] bits.
    pub async fn drive_with_heading(
        &self,
        target: u8,
        speed: u8,
        heading: u16,
        flags: u8,
    ) -> Result<()> {
        self.typed_notify(
            devices::DRIVE,
            DRIVE_WITH_HEADING,
            target,
            &[
                FieldSpec::uint8("speed", 0).with_value(speed.into()),
                FieldSpec::uint16("heading", 1).with_value(heading.into()),
                FieldSpec::uint8("flags", 2).with_value(flags.into()),
            ],
        )
        .await
    }

    /// Zero the rover's yaw so the current facing becomes heading 0.
    pub async fn reset_yaw(&self, target: u8) -> Result<()> {
        self.typed_notify(devices::DRIVE, RESET_YAW, target, &[]).await
    }

    /// Command the two motors directly, bypassing the drive controller.
    pub async fn raw_motors(
        &self,
        target: u8,
        left_mode: RawMotorMode,
        left_speed: u8,
        right_mode: RawMotorMode,
        right_speed: u8,
    ) -> Result<()> {
        self.typed_notify(
            devices::DRIVE,
            RAW_MOTORS,
            target,
            &[
                FieldSpec::uint8("left_mode", 0).with_value((left_mode as u8).into()),
                FieldSpec::uint8("left_speed", 1).with_value(left_speed.into()),
                FieldSpec::uint8("right_mode", 2).with_value((right_mode as u8).into()),
                FieldSpec::uint8("right_speed", 3).with_value(right_speed.into()),
            ],
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::ChannelPort;
    use tokio::sync::mpsc::UnboundedReceiver;
    use crate::protocol::Message;

    fn harness() -> (Handler<ChannelPort>, UnboundedReceiver<Message>) {
        let (port, outbound) = ChannelPort::new();
        (Handler::new(port), outbound)
    }

    #[tokio::test]
    async fn test_drive_with_heading_frame_shape() {
        let (handler, mut outbound) = harness();

        handler
            .drive_with_heading(1, 0x40, 0x015E, drive_flags::DRIVE_REVERSE)
            .await
            .unwrap();

        let sent = outbound.recv().await.unwrap();
        assert_eq!(sent.device_id, 0x16);
        assert_eq!(sent.command_id, 0x07);
        assert_eq!(sent.target_node, Some(1));
        assert!(!sent.requests_any_response());
        assert_eq!(sent.seq, 0);
        // speed, heading (big-endian), flags
        assert_eq!(sent.payload(), &[0x40, 0x01, 0x5E, 0x01]);
        assert_eq!(handler.available_sequences(), 255);
    }

    #[tokio::test]
    async fn test_reset_yaw_has_empty_payload() {
        let (handler, mut outbound) = harness();

        handler.reset_yaw(1).await.unwrap();

        let sent = outbound.recv().await.unwrap();
        assert_eq!(sent.device_id, 0x16);
        assert_eq!(sent.command_id, 0x06);
        assert!(sent.payload().is_empty());
    }

    #[tokio::test]
    async fn test_raw_motors_orders_mode_speed_pairs() {
        let (handler, mut outbound) = harness();

        handler
            .raw_motors(1, RawMotorMode::Forward, 0x80, RawMotorMode::Reverse, 0x20)
            .await
            .unwrap();

        let sent = outbound.recv().await.unwrap();
        assert_eq!(sent.command_id, 0x01);
        assert_eq!(sent.payload(), &[0x01, 0x80, 0x02, 0x20]);
    }
}
