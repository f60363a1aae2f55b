//! Snapshot tests for NXT command packets.

use insta::assert_snapshot;
use nxt_throttle_protocol as nxt;

#[test]
fn test_snapshot_query_throttle_port() {
    let out = nxt::build_query_motor_position(0);
    assert_snapshot!(format!("{:?}", out), @"[3, 0, 0, 6, 0]");
}

#[test]
fn test_snapshot_query_yaw_port() {
    let out = nxt::Command::QueryMotorPosition { port: 2 }.encode();
    assert_snapshot!(format!("{:?}", out), @"[3, 0, 0, 6, 2]");
}

#[test]
fn test_snapshot_reset_motor_position() {
    let out = nxt::build_reset_motor_position(1);
    assert_snapshot!(format!("{:?}", out), @"[4, 0, 128, 10, 1, 0]");
}

#[test]
fn test_snapshot_play_tone() {
    let out = nxt::build_play_tone(1000, 200);
    assert_snapshot!(format!("{:?}", out), @"[6, 0, 128, 3, 232, 3, 200, 0]");
}

#[test]
fn test_snapshot_keep_alive() {
    let out = nxt::Command::KeepAlive.encode();
    assert_snapshot!(format!("{:?}", out), @"[2, 0, 128, 13]");
}

#[test]
fn test_decode_reply_through_public_api() -> Result<(), Box<dyn std::error::Error>> {
    let mut body = vec![0u8; nxt::MOTOR_STATE_REPLY_LEN];
    body[0] = nxt::REPLY_TELEGRAM;
    body[1] = nxt::DirectCommand::GetOutputState.to_u8();
    body[3] = 1;
    body[21..25].copy_from_slice(&500i32.to_le_bytes());
    let frame = nxt::frame(&body);

    let mut asm = nxt::FrameAssembler::new(nxt::ResponseLayout::LengthPrefixed);
    for piece in frame.chunks(4) {
        asm.push(piece);
    }
    let assembled = asm.finish()?;
    let reply = nxt::parse_motor_position(nxt::ResponseLayout::LengthPrefixed, &assembled)?;
    assert_eq!(reply.port, 1);
    assert_eq!(reply.rotation_count, 500);
    Ok(())
}
