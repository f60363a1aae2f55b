//! Outgoing packet builders.
//!
//! Each builder returns the complete wire packet, length prefix included, as a
//! fixed-size array so the hot polling path never allocates.

#![deny(unsafe_op_in_unsafe_fn)]
#![deny(static_mut_refs)]

use crate::commands::{DIRECT_COMMAND_NO_REPLY, DIRECT_COMMAND_REPLY, DirectCommand};

pub const LENGTH_PREFIX_LEN: usize = 2;
pub const QUERY_MOTOR_POSITION_LEN: usize = 5;
pub const RESET_MOTOR_POSITION_LEN: usize = 6;
pub const PLAY_TONE_LEN: usize = 8;
pub const KEEP_ALIVE_LEN: usize = 4;
/// Body length of a `GETOUTPUTSTATE` reply, excluding the length prefix.
pub const MOTOR_STATE_REPLY_LEN: usize = 25;

/// Prefix an arbitrary telegram body with its little-endian length.
///
/// Bodies longer than `u16::MAX` cannot be expressed on the wire; the brick
/// caps telegrams at 64 bytes, so callers never get near the limit.
pub fn frame(body: &[u8]) -> Vec<u8> {
    let len = u16::try_from(body.len()).unwrap_or(u16::MAX);
    let mut out = Vec::with_capacity(body.len() + LENGTH_PREFIX_LEN);
    out.extend_from_slice(&len.to_le_bytes());
    out.extend_from_slice(body);
    out
}

#[inline]
const fn prefix(total_len: usize) -> [u8; 2] {
    let body = (total_len - LENGTH_PREFIX_LEN) as u16;
    body.to_le_bytes()
}

pub fn build_query_motor_position(port: u8) -> [u8; QUERY_MOTOR_POSITION_LEN] {
    let [lo, hi] = prefix(QUERY_MOTOR_POSITION_LEN);
    [
        lo,
        hi,
        DIRECT_COMMAND_REPLY,
        DirectCommand::GetOutputState.to_u8(),
        port,
    ]
}

/// Reset the absolute motor position (`relative = false`), no reply requested.
pub fn build_reset_motor_position(port: u8) -> [u8; RESET_MOTOR_POSITION_LEN] {
    let [lo, hi] = prefix(RESET_MOTOR_POSITION_LEN);
    [
        lo,
        hi,
        DIRECT_COMMAND_NO_REPLY,
        DirectCommand::ResetMotorPosition.to_u8(),
        port,
        0x00,
    ]
}

pub fn build_play_tone(frequency_hz: u16, duration_ms: u16) -> [u8; PLAY_TONE_LEN] {
    let [lo, hi] = prefix(PLAY_TONE_LEN);
    let [f_lo, f_hi] = frequency_hz.to_le_bytes();
    let [d_lo, d_hi] = duration_ms.to_le_bytes();
    [
        lo,
        hi,
        DIRECT_COMMAND_NO_REPLY,
        DirectCommand::PlayTone.to_u8(),
        f_lo,
        f_hi,
        d_lo,
        d_hi,
    ]
}

pub fn build_keep_alive() -> [u8; KEEP_ALIVE_LEN] {
    let [lo, hi] = prefix(KEEP_ALIVE_LEN);
    [
        lo,
        hi,
        DIRECT_COMMAND_NO_REPLY,
        DirectCommand::KeepAlive.to_u8(),
    ]
}
