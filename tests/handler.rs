//! End-to-end tests over two handlers wired back-to-back.
//!
//! Each side owns a [`ChannelPort`]; pump tasks forward whatever one side
//! sends into the other side's inbound queue, so frames travel exactly as
//! a transport would deliver them, minus the wire.

use std::collections::HashSet;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::time::timeout;

use rovercom::protocol::{decode_fields, encode_fields, FieldSpec};
use rovercom::transport::spawn_inbound_task;
use rovercom::{
    devices, ChannelPort, ErrorCode, Handler, Inbound, Message, RawMotorMode, RovercomError,
};

const NODE_CONTROLLER: u8 = 0x01;
const NODE_ROVER: u8 = 0x02;

const DEADLINE: Duration = Duration::from_secs(2);

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

/// A version query travels to the rover, gets served by a registered
/// worker, and its reply is decoded back into fields.
#[tokio::test]
async fn test_version_query_round_trip() {
    let (controller, rover) = linked_pair();

    rover
        .add_command_worker(devices::API_AND_SHELL, 0x00, None, |_msg: Message| async {
            Ok((ErrorCode::Success, Bytes::from_static(&[1, 2])))
        })
        .unwrap();

    let version = controller
        .get_api_protocol_version(NODE_ROVER, DEADLINE)
        .await
        .unwrap();
    assert_eq!(version.major, 1);
    assert_eq!(version.minor, 2);

    assert_eq!(controller.available_sequences(), 255);
    assert_eq!(controller.pending_responses(), 0);
}

/// Concurrent calls each get their own sequence number and their own
/// reply; the pool is whole again once every call completes.
#[tokio::test]
async fn test_concurrent_echo_calls_stay_correlated() {
    let (controller, rover) = linked_pair();

    rover
        .add_command_worker(devices::API_AND_SHELL, 0x02, None, |msg: Message| async move {
            Ok((ErrorCode::Success, msg.payload.clone()))
        })
        .unwrap();

    let mut calls = Vec::new();
    for i in 0..16u32 {
        let controller = controller.clone();
        calls.push(tokio::spawn(async move {
            let data = 0xBEEF_0000 | i;
            let back = controller.echo(NODE_ROVER, data, DEADLINE).await.unwrap();
            (data, back)
        }));
    }

    for call in calls {
        let (data, back) = call.await.unwrap();
        assert_eq!(back, data);
    }

    assert_eq!(controller.available_sequences(), 255);
    assert_eq!(controller.pending_responses(), 0);
}

/// Fire-and-forget commands reach the remote worker with sequence 0 and
/// never produce a reply or consume a sequence number.
#[tokio::test]
async fn test_drive_command_is_fire_and_forget() {
    let (controller, rover) = linked_pair();

    let (seen_tx, mut seen_rx) = mpsc::unbounded_channel();
    rover
        .add_command_worker(devices::DRIVE, 0x07, None, move |msg: Message| {
            let seen_tx = seen_tx.clone();
            async move {
                let _ = seen_tx.send(msg);
                Ok((ErrorCode::Success, Bytes::new()))
            }
        })
        .unwrap();

    controller
        .drive_with_heading(NODE_ROVER, 0x40, 90, 0)
        .await
        .unwrap();

    let seen = timeout(DEADLINE, seen_rx.recv()).await.unwrap().unwrap();
    assert_eq!(seen.seq, 0);
    assert!(!seen.requests_any_response());
    assert_eq!(seen.payload(), &[0x40, 0x00, 0x5A, 0x00]);

    assert_eq!(controller.available_sequences(), 255);
    assert_eq!(controller.pending_responses(), 0);
}

/// A non-success outcome code from the remote worker fails the call.
#[tokio::test]
async fn test_device_error_code_fails_call() {
    let (controller, rover) = linked_pair();

    rover
        .add_command_worker(devices::POWER, 0x10, None, |_msg: Message| async {
            Ok((ErrorCode::BadParameterValue, Bytes::new()))
        })
        .unwrap();

    let err = controller
        .get_battery_percentage(NODE_ROVER, DEADLINE)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RovercomError::Device(ErrorCode::BadParameterValue)
    ));
    assert_eq!(controller.available_sequences(), 255);
}

/// A command nobody registered for is answered with `NotYetImplemented`.
#[tokio::test]
async fn test_unregistered_command_reports_not_yet_implemented() {
    let (controller, _rover) = linked_pair();

    let err = controller
        .get_battery_percentage(NODE_ROVER, DEADLINE)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RovercomError::Device(ErrorCode::NotYetImplemented)
    ));
}

/// A worker that fails produces no reply frame at all; the caller runs
/// into its timeout and the sequence number still comes back.
#[tokio::test]
async fn test_failing_worker_leaves_caller_to_time_out() {
    let (controller, rover) = linked_pair();

    rover
        .add_command_worker(devices::POWER, 0x10, None, |_msg: Message| async {
            Err(RovercomError::MissingField("percentage"))
        })
        .unwrap();

    let err = controller
        .get_battery_percentage(NODE_ROVER, Duration::from_millis(100))
        .await
        .unwrap_err();
    assert!(matches!(err, RovercomError::ResponseTimeout(_)));
    assert_eq!(controller.available_sequences(), 255);
    assert_eq!(controller.pending_responses(), 0);
}

/// A dead port fails the call at send time; the sequence number and the
/// correlator registration both come back.
#[tokio::test]
async fn test_send_failure_releases_resources() {
    let (port, outbound) = ChannelPort::new();
    let handler = Handler::new(port);
    drop(outbound);

    let err = handler
        .call(
            Message::command(devices::POWER, 0x10).request_response(),
            Some(|response: &Message| Ok(response.payload.clone())),
            Some(DEADLINE),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, RovercomError::ConnectionClosed));
    assert_eq!(handler.available_sequences(), 255);
    assert_eq!(handler.pending_responses(), 0);
}

/// An interpreter that rejects the reply fails the call with its own
/// error; the sequence number and correlator are still cleaned up.
#[tokio::test]
async fn test_interpreter_error_releases_resources() {
    let (controller, rover) = linked_pair();

    rover
        .add_command_worker(devices::POWER, 0x10, None, |_msg: Message| async {
            Ok((ErrorCode::Success, Bytes::from_static(&[7])))
        })
        .unwrap();

    let msg = Message::command(devices::POWER, 0x10)
        .with_target(NODE_ROVER)
        .request_response();
    let err = controller
        .call(
            msg,
            // Demands four bytes from a one-byte reply.
            Some(|response: &Message| {
                decode_fields(&[FieldSpec::uint32("level", 0)], response.payload())
            }),
            Some(DEADLINE),
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RovercomError::ShortPayload {
            expected: 4,
            actual: 1,
        }
    ));
    assert_eq!(controller.available_sequences(), 255);
    assert_eq!(controller.pending_responses(), 0);
}

/// An error-only request is answered only on failure: success stays
/// silent and the caller's timeout is the all-clear signal.
#[tokio::test]
async fn test_error_only_request_silent_on_success() {
    let (controller, rover) = linked_pair();

    rover
        .add_command_worker(devices::POWER, 0x0D, None, |_msg: Message| async {
            Ok((ErrorCode::Success, Bytes::new()))
        })
        .unwrap();

    let msg = Message::command(devices::POWER, 0x0D)
        .with_target(NODE_ROVER)
        .request_response()
        .request_error_response();
    let err = controller
        .call(
            msg,
            Some(|_response: &Message| Ok(())),
            Some(Duration::from_millis(100)),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, RovercomError::ResponseTimeout(_)));
}

/// The same error-only request does come back when the worker fails.
#[tokio::test]
async fn test_error_only_request_reports_failure() {
    let (controller, rover) = linked_pair();

    rover
        .add_command_worker(devices::POWER, 0x0D, None, |_msg: Message| async {
            Ok((ErrorCode::Busy, Bytes::new()))
        })
        .unwrap();

    let msg = Message::command(devices::POWER, 0x0D)
        .with_target(NODE_ROVER)
        .request_response()
        .request_error_response();
    let err = controller
        .call(msg, Some(|_response: &Message| Ok(())), Some(DEADLINE))
        .await
        .unwrap_err();
    assert!(matches!(err, RovercomError::Device(ErrorCode::Busy)));
}

/// A worker bound to the requester's node wins over the wildcard; once
/// removed, the wildcard takes over.
#[tokio::test]
async fn test_exact_node_worker_beats_wildcard() {
    let (controller, rover) = linked_pair();

    rover
        .add_command_worker(
            devices::API_AND_SHELL,
            0x02,
            Some(NODE_CONTROLLER),
            |_msg: Message| async { Ok((ErrorCode::Success, Bytes::from_static(&[0xEE]))) },
        )
        .unwrap();
    rover
        .add_command_worker(devices::API_AND_SHELL, 0x02, None, |_msg: Message| async {
            Ok((ErrorCode::Success, Bytes::from_static(&[0x77])))
        })
        .unwrap();

    let query = |controller: Handler<ChannelPort>| async move {
        let msg = Message::command(devices::API_AND_SHELL, 0x02)
            .with_source(NODE_CONTROLLER)
            .with_target(NODE_ROVER)
            .request_response();
        controller
            .call(
                msg,
                Some(|response: &Message| Ok(response.payload[0])),
                Some(DEADLINE),
            )
            .await
    };

    let first = query(controller.clone()).await.unwrap();
    assert_eq!(first, Some(0xEE));

    rover.remove_command_worker(devices::API_AND_SHELL, 0x02, Some(NODE_CONTROLLER));
    let second = query(controller).await.unwrap();
    assert_eq!(second, Some(0x77));
}

/// A second worker for the same key is rejected; removing the first
/// frees the key for a new registration.
#[tokio::test]
async fn test_duplicate_worker_registration_rejected() {
    let (_controller, rover) = linked_pair();

    rover
        .add_command_worker(devices::DRIVE, 0x06, None, |_msg: Message| async {
            Ok((ErrorCode::Success, Bytes::new()))
        })
        .unwrap();
    let err = rover
        .add_command_worker(devices::DRIVE, 0x06, None, |_msg: Message| async {
            Ok((ErrorCode::Success, Bytes::new()))
        })
        .unwrap_err();
    assert!(matches!(err, RovercomError::DuplicateWorker(_)));

    rover.remove_command_worker(devices::DRIVE, 0x06, None);
    rover
        .add_command_worker(devices::DRIVE, 0x06, None, |_msg: Message| async {
            Ok((ErrorCode::Success, Bytes::new()))
        })
        .unwrap();
}

/// Raw motor frames carry the mode/speed pairs in declaration order.
#[tokio::test]
async fn test_raw_motors_payload_layout() {
    let (controller, rover) = linked_pair();

    let (seen_tx, mut seen_rx) = mpsc::unbounded_channel();
    rover
        .add_command_worker(devices::DRIVE, 0x01, None, move |msg: Message| {
            let seen_tx = seen_tx.clone();
            async move {
                let _ = seen_tx.send(msg);
                Ok((ErrorCode::Success, Bytes::new()))
            }
        })
        .unwrap();

    controller
        .raw_motors(NODE_ROVER, RawMotorMode::Forward, 0x80, RawMotorMode::Reverse, 0x20)
        .await
        .unwrap();

    let seen = timeout(DEADLINE, seen_rx.recv()).await.unwrap().unwrap();
    assert_eq!(seen.payload(), &[0x01, 0x80, 0x02, 0x20]);
}

/// 255 outstanding calls exhaust the pool; the 256th fails cleanly, and
/// answering the backlog refills the pool completely.
#[tokio::test]
async fn test_sequence_pool_exhaustion_and_recovery() {
    let (port, mut outbound) = ChannelPort::new();
    let handler = Handler::new(port);

    let mut calls = Vec::new();
    for _ in 0..255 {
        let handler = handler.clone();
        calls.push(tokio::spawn(async move {
            handler
                .call(
                    Message::command(devices::API_AND_SHELL, 0x02).request_response(),
                    Some(|response: &Message| Ok(response.payload.clone())),
                    None,
                )
                .await
        }));
    }

    let mut sent = Vec::new();
    for _ in 0..255 {
        let frame = timeout(DEADLINE, outbound.recv()).await.unwrap().unwrap();
        sent.push(frame);
    }
    let seqs: HashSet<u8> = sent.iter().map(|msg| msg.seq).collect();
    assert_eq!(seqs.len(), 255);
    assert!(!seqs.contains(&0));
    assert_eq!(handler.available_sequences(), 0);

    let err = handler
        .call(
            Message::command(devices::API_AND_SHELL, 0x02).request_response(),
            Some(|response: &Message| Ok(response.payload.clone())),
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, RovercomError::SequencesExhausted));

    for msg in &sent {
        let mut reply = Message::from_command_message(msg);
        reply.seq = msg.seq;
        reply.err = Some(ErrorCode::Success);
        handler.dispatch(reply).await;
    }
    for call in calls {
        call.await.unwrap().unwrap();
    }
    assert_eq!(handler.available_sequences(), 255);
    assert_eq!(handler.pending_responses(), 0);
}

/// Malformed buffers are logged and dropped without disturbing the call
/// waiting behind them in the inbound queue.
#[tokio::test]
async fn test_malformed_inbound_does_not_disturb_calls() {
    let (port, mut outbound) = ChannelPort::new();
    let handler = Handler::new(port);
    let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
    spawn_inbound_task(handler.clone(), inbound_rx);

    let call = tokio::spawn({
        let handler = handler.clone();
        async move {
            handler
                .call(
                    Message::command(devices::POWER, 0x10).request_response(),
                    Some(|response: &Message| Ok(response.payload.clone())),
                    Some(DEADLINE),
                )
                .await
        }
    });

    let sent = timeout(DEADLINE, outbound.recv()).await.unwrap().unwrap();

    inbound_tx
        .send(Inbound::Malformed(Bytes::from_static(&[0xFF, 0x00, 0xFF])))
        .unwrap();
    let mut reply = Message::from_command_message(&sent);
    reply.seq = sent.seq;
    reply.err = Some(ErrorCode::Success);
    let reply = reply.pack_bytes(vec![55]);
    inbound_tx.send(Inbound::Frame(reply)).unwrap();

    let body = call.await.unwrap().unwrap().unwrap();
    assert_eq!(&body[..], &[55]);
}

/// A response that arrives after its call has given up is dropped; the
/// next call is unaffected.
#[tokio::test]
async fn test_late_response_is_dropped() {
    let (port, mut outbound) = ChannelPort::new();
    let handler = Handler::new(port);

    let err = handler
        .call(
            Message::command(devices::POWER, 0x10).request_response(),
            Some(|response: &Message| Ok(response.payload.clone())),
            Some(Duration::from_millis(50)),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, RovercomError::ResponseTimeout(_)));

    // The reply shows up anyway. Nobody is waiting; it must vanish.
    let sent = timeout(DEADLINE, outbound.recv()).await.unwrap().unwrap();
    let mut reply = Message::from_command_message(&sent);
    reply.seq = sent.seq;
    reply.err = Some(ErrorCode::Success);
    handler.dispatch(reply).await;

    assert_eq!(handler.available_sequences(), 255);
    assert_eq!(handler.pending_responses(), 0);
}

/// Workers can build reply bodies with the field codec; the caller's
/// typed wrapper decodes them transparently.
#[tokio::test]
async fn test_worker_encodes_fields_for_typed_caller() {
    let (controller, rover) = linked_pair();

    rover
        .add_command_worker(devices::POWER, 0x10, None, |_msg: Message| async {
            let body = encode_fields(&[FieldSpec::uint8("percentage", 0).with_value(93)])?;
            Ok((ErrorCode::Success, body))
        })
        .unwrap();

    let pct = controller
        .get_battery_percentage(NODE_ROVER, DEADLINE)
        .await
        .unwrap();
    assert_eq!(pct, 93);
}
