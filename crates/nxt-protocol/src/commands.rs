//! NXT direct-command opcodes and the command set used by the bridge.
//!
//! Every telegram starts with a telegram-type byte followed by an opcode:
//! - `0x00`: direct command, reply requested
//! - `0x80`: direct command, no reply
//! - `0x02`: reply telegram (device to host)
//!
//! On the wire each telegram is preceded by a little-endian `u16` holding the
//! telegram length, excluding the two length bytes themselves.

#![deny(unsafe_op_in_unsafe_fn)]
#![deny(static_mut_refs)]

use crate::output::{
    build_keep_alive, build_play_tone, build_query_motor_position, build_reset_motor_position,
};

/// Telegram type: direct command, reply requested.
pub const DIRECT_COMMAND_REPLY: u8 = 0x00;
/// Telegram type: direct command, no reply.
pub const DIRECT_COMMAND_NO_REPLY: u8 = 0x80;
/// Telegram type: reply from the brick.
pub const REPLY_TELEGRAM: u8 = 0x02;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectCommand {
    PlayTone,
    GetOutputState,
    ResetMotorPosition,
    KeepAlive,
}

impl DirectCommand {
    pub fn from_u8(val: u8) -> Option<Self> {
        match val {
            0x03 => Some(Self::PlayTone),
            0x06 => Some(Self::GetOutputState),
            0x0A => Some(Self::ResetMotorPosition),
            0x0D => Some(Self::KeepAlive),
            _ => None,
        }
    }

    pub fn to_u8(self) -> u8 {
        match self {
            Self::PlayTone => 0x03,
            Self::GetOutputState => 0x06,
            Self::ResetMotorPosition => 0x0A,
            Self::KeepAlive => 0x0D,
        }
    }
}

/// Status byte carried by every reply telegram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplyStatus {
    Success,
    PendingCommunication,
    RequestFailed,
    UnknownOpcode,
    InsanePacket,
    OutOfRange,
    BadArguments,
    #[default]
    Unknown,
}

impl ReplyStatus {
    pub fn from_u8(val: u8) -> Self {
        match val {
            0x00 => Self::Success,
            0x20 => Self::PendingCommunication,
            0xBD => Self::RequestFailed,
            0xBE => Self::UnknownOpcode,
            0xBF => Self::InsanePacket,
            0xC0 => Self::OutOfRange,
            0xFF => Self::BadArguments,
            _ => Self::Unknown,
        }
    }

    pub fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}

/// Commands the bridge sends to the brick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// `GETOUTPUTSTATE` for one motor port; the reply carries the rotation count.
    QueryMotorPosition { port: u8 },
    /// `RESETMOTORPOSITION` with `relative = false`, sent without reply.
    ResetMotorPosition { port: u8 },
    /// `PLAYTONE`, sent without reply.
    PlayTone { frequency_hz: u16, duration_ms: u16 },
    /// `KEEPALIVE`, sent without reply. Resets the brick's sleep timer.
    KeepAlive,
}

impl Command {
    pub fn direct_command(&self) -> DirectCommand {
        match self {
            Self::QueryMotorPosition { .. } => DirectCommand::GetOutputState,
            Self::ResetMotorPosition { .. } => DirectCommand::ResetMotorPosition,
            Self::PlayTone { .. } => DirectCommand::PlayTone,
            Self::KeepAlive => DirectCommand::KeepAlive,
        }
    }

    pub fn expects_reply(&self) -> bool {
        matches!(self, Self::QueryMotorPosition { .. })
    }

    /// Encode the command into a length-prefixed wire packet.
    pub fn encode(&self) -> Vec<u8> {
        match *self {
            Self::QueryMotorPosition { port } => build_query_motor_position(port).to_vec(),
            Self::ResetMotorPosition { port } => build_reset_motor_position(port).to_vec(),
            Self::PlayTone {
                frequency_hz,
                duration_ms,
            } => build_play_tone(frequency_hz, duration_ms).to_vec(),
            Self::KeepAlive => build_keep_alive().to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direct_command_roundtrip() {
        let commands = [
            DirectCommand::PlayTone,
            DirectCommand::GetOutputState,
            DirectCommand::ResetMotorPosition,
            DirectCommand::KeepAlive,
        ];

        for cmd in commands {
            assert_eq!(DirectCommand::from_u8(cmd.to_u8()), Some(cmd));
        }
        assert_eq!(DirectCommand::from_u8(0x0B), None);
    }

    #[test]
    fn test_encode_query_motor_position() {
        let bytes = Command::QueryMotorPosition { port: 1 }.encode();
        assert_eq!(bytes, vec![0x03, 0x00, 0x00, 0x06, 0x01]);
    }

    #[test]
    fn test_encode_reset_motor_position() {
        let bytes = Command::ResetMotorPosition { port: 2 }.encode();
        assert_eq!(bytes, vec![0x04, 0x00, 0x80, 0x0A, 0x02, 0x00]);
    }

    #[test]
    fn test_encode_play_tone() {
        let bytes = Command::PlayTone {
            frequency_hz: 440,
            duration_ms: 500,
        }
        .encode();
        assert_eq!(bytes, vec![0x06, 0x00, 0x80, 0x03, 0xB8, 0x01, 0xF4, 0x01]);
    }

    #[test]
    fn test_encode_keep_alive() {
        assert_eq!(Command::KeepAlive.encode(), vec![0x02, 0x00, 0x80, 0x0D]);
    }

    #[test]
    fn test_only_query_expects_reply() {
        assert!(Command::QueryMotorPosition { port: 0 }.expects_reply());
        assert!(!Command::ResetMotorPosition { port: 0 }.expects_reply());
        assert!(!Command::KeepAlive.expects_reply());
        assert!(
            !Command::PlayTone {
                frequency_hz: 1000,
                duration_ms: 100
            }
            .expects_reply()
        );
    }

    #[test]
    fn test_reply_status_from_u8() {
        assert_eq!(ReplyStatus::from_u8(0x00), ReplyStatus::Success);
        assert_eq!(ReplyStatus::from_u8(0xC0), ReplyStatus::OutOfRange);
        assert_eq!(ReplyStatus::from_u8(0x42), ReplyStatus::Unknown);
        assert!(ReplyStatus::Success.is_success());
        assert!(!ReplyStatus::RequestFailed.is_success());
    }
}
