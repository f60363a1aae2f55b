//! LEGO NXT direct-command protocol, restricted to the motor and keep-alive
//! commands the throttle bridge needs.
//!
//! This crate is intentionally I/O-free. It provides pure functions and types
//! that can be tested and fuzzed without a brick attached; reading frames off
//! a live channel lives in `nxt-throttle-transport`.
//!
//! # Key Features
//! - Length-prefixed command encoding (`[lenLo][lenHi][opcode...]`)
//! - Incremental frame assembly across short reads
//! - Motor position reply decoding for both stream and endpoint layouts

#![deny(unsafe_op_in_unsafe_fn)]
#![deny(static_mut_refs)]

pub mod commands;
pub mod error;
pub mod input;
pub mod output;

pub use commands::{
    Command, DIRECT_COMMAND_NO_REPLY, DIRECT_COMMAND_REPLY, DirectCommand, REPLY_TELEGRAM,
    ReplyStatus,
};
pub use error::{ProtocolError, ProtocolResult};
pub use input::{
    ENDPOINT_TRANSFER_LEN, FrameAssembler, FrameProgress, MotorPositionReply, ResponseLayout,
    ResponsePacket, decode_response, encode_motor_state_reply, parse_motor_position,
};
pub use output::{
    KEEP_ALIVE_LEN, LENGTH_PREFIX_LEN, MOTOR_STATE_REPLY_LEN, PLAY_TONE_LEN,
    QUERY_MOTOR_POSITION_LEN, RESET_MOTOR_POSITION_LEN, build_keep_alive, build_play_tone,
    build_query_motor_position, build_reset_motor_position, frame,
};
