//! Version and battery queries against a simulated rover.
//!
//! This example demonstrates:
//! - Wiring two handlers back-to-back over in-process channels
//! - Serving commands on the rover side with registered workers
//! - Typed queries from the controller side
//!
//! # Running
//!
//! ```sh
//! cargo run --example version
//! ```

use std::time::Duration;

use tokio::sync::mpsc;

use rovercom::protocol::{encode_fields, FieldSpec};
use rovercom::transport::spawn_inbound_task;
use rovercom::{devices, ChannelPort, ErrorCode, Handler, Inbound, Message};

const NODE_ROVER: u8 = 0x02;

const GET_API_PROTOCOL_VERSION: u8 = 0x00;
const GET_BATTERY_PERCENTAGE: u8 = 0x10;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let (controller, rover) = linked_pair();

    // The simulated rover answers two queries.
    rover.add_command_worker(
        devices::API_AND_SHELL,
        GET_API_PROTOCOL_VERSION,
        None,
        |_msg: Message| async {
            let body = encode_fields(&[
                FieldSpec::uint8("majorVersion", 0).with_value(1),
                FieldSpec::uint8("minorVersion", 1).with_value(17),
            ])?;
            Ok((ErrorCode::Success, body))
        },
    )?;
    rover.add_command_worker(
        devices::POWER,
        GET_BATTERY_PERCENTAGE,
        None,
        |_msg: Message| async {
            let body = encode_fields(&[FieldSpec::uint8("percentage", 0).with_value(82)])?;
            Ok((ErrorCode::Success, body))
        },
    )?;

    let timeout = Duration::from_secs(2);

    let version = controller
        .get_api_protocol_version(NODE_ROVER, timeout)
        .await?;
    println!("API protocol version: {}.{}", version.major, version.minor);

    let pct = controller
        .get_battery_percentage(NODE_ROVER, timeout)
        .await?;
    println!("Battery: {}%", pct);

    let echoed = controller.echo(NODE_ROVER, 0xCAFE_F00D, timeout).await;
    // The simulated rover registered no echo worker, so this reports
    // `NotYetImplemented` rather than hanging.
    println!("Echo attempt: {:?}", echoed);

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
