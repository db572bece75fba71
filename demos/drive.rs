//! Teleoperation-style drive sequence against a simulated rover.
//!
//! This example demonstrates:
//! - Fire-and-forget commands (wake, reset_yaw, drive_with_heading, sleep)
//! - The rover side observing drive frames with a wildcard worker
//! - The wake -> drive -> sleep pattern a teleop loop follows
//!
//! # Running
//!
//! ```sh
//! cargo run --example drive
//! ```

use std::time::Duration;

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::time::sleep;

use rovercom::protocol::{decode_fields, FieldSpec};
use rovercom::transport::spawn_inbound_task;
use rovercom::{devices, ChannelPort, ErrorCode, Handler, Inbound, Message};

const NODE_ROVER: u8 = 0x02;

const DRIVE_WITH_HEADING: u8 = 0x07;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let (controller, rover) = linked_pair();

    // The simulated rover prints every drive frame it receives.
    rover.add_command_worker(
        devices::DRIVE,
        DRIVE_WITH_HEADING,
        None,
        |msg: Message| async move {
            let fields = decode_fields(
                &[
                    FieldSpec::uint8("speed", 0),
                    FieldSpec::uint16("heading", 1),
                    FieldSpec::uint8("flags", 2),
                ],
                msg.payload(),
            )?;
            println!(
                "rover: drive speed={} heading={} flags={:#04x}",
                fields.require("speed")?,
                fields.require("heading")?,
                fields.require("flags")?,
            );
            Ok((ErrorCode::Success, Bytes::new()))
        },
    )?;

    controller.wake(NODE_ROVER).await?;
    // The rover needs a moment to come out of soft sleep.
    sleep(Duration::from_millis(100)).await;

    controller.reset_yaw(NODE_ROVER).await?;

    // Drive a square: four headings, a beat on each leg.
    for heading in [0u16, 90, 180, 270] {
        controller
            .drive_with_heading(NODE_ROVER, 0x40, heading, 0)
            .await?;
        sleep(Duration::from_millis(250)).await;
    }

    // Stop and put the rover back to sleep.
    controller.drive_with_heading(NODE_ROVER, 0, 270, 0).await?;
    controller.sleep(NODE_ROVER).await?;

    // Give the last frames time to cross before the runtime shuts down.
    sleep(Duration::from_millis(100)).await;

    Ok(())
}

/// Wire two handlers so each one's outbound frames become the other's
/// inbound frames.
fn linked_pair() -> (Handler<ChannelPort>, Handler<ChannelPort>) {
    let (controller_port, controller_out) = ChannelPort::new();
    let (rover_port, rover_out) = ChannelPort::new();
    let controller = Handler::new(controller_port);
    let rover = Handler::new(rover_port);

    let (to_rover, rover_in) = mpsc::unbounded_channel();
    let (to_controller, controller_in) = mpsc::unbounded_channel();
    spawn_inbound_task(rover.clone(), rover_in);
    spawn_inbound_task(controller.clone(), controller_in);
    tokio::spawn(pump(controller_out, to_rover));
    tokio::spawn(pump(rover_out, to_controller));

    (controller, rover)
}

async fn pump(mut rx: mpsc::UnboundedReceiver<Message>, tx: mpsc::UnboundedSender<Inbound>) {
    while let Some(msg) = rx.recv().await {
        if tx.send(Inbound::Frame(msg)).is_err() {
            break;
        }
    }
}
