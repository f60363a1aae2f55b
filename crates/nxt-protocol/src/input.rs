//! Reply telegram assembly and decoding.
//!
//! A `GETOUTPUTSTATE` reply body is 25 bytes:
//! - Byte 0: telegram type (`0x02`)
//! - Byte 1: opcode (`0x06`)
//! - Byte 2: status
//! - Byte 3: output port
//! - Bytes 4-8: power, mode, regulation, turn ratio, run state
//! - Bytes 9-12: tacho limit (u32)
//! - Bytes 13-16: tacho count (i32)
//! - Bytes 17-20: block tacho count (i32)
//! - Bytes 21-24: rotation count (i32)
//!
//! Stream transports prepend the two length bytes, so the rotation count sits
//! at offset 23 of the received buffer. Endpoint transports deliver the bare
//! body and the rotation count sits at offset 21.

#![deny(unsafe_op_in_unsafe_fn)]
#![deny(static_mut_refs)]

use crate::commands::{DirectCommand, REPLY_TELEGRAM, ReplyStatus};
use crate::error::{ProtocolError, ProtocolResult};
use crate::output::{LENGTH_PREFIX_LEN, MOTOR_STATE_REPLY_LEN};

const REPLY_HEADER_LEN: usize = 3;
const PORT_OFFSET: usize = 3;
const TACHO_COUNT_OFFSET: usize = 13;
const ROTATION_COUNT_OFFSET: usize = 21;
const SUCCESS_STATUS: u8 = 0x00;

/// Largest transfer an endpoint transport hands over in one read.
pub const ENDPOINT_TRANSFER_LEN: usize = 64;

/// How reply telegrams are laid out in the buffers a transport delivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseLayout {
    /// Stream transports (serial, Bluetooth SPP): `[lenLo][lenHi][body...]`.
    #[default]
    LengthPrefixed,
    /// Endpoint transports (USB bulk): one transfer holds one bare body.
    Endpoint,
}

impl ResponseLayout {
    pub const STREAM_ROTATION_OFFSET: usize = LENGTH_PREFIX_LEN + ROTATION_COUNT_OFFSET;
    pub const ENDPOINT_ROTATION_OFFSET: usize = ROTATION_COUNT_OFFSET;

    /// Select the layout whose rotation count lives at `offset`.
    pub fn from_rotation_offset(offset: usize) -> ProtocolResult<Self> {
        match offset {
            Self::STREAM_ROTATION_OFFSET => Ok(Self::LengthPrefixed),
            Self::ENDPOINT_ROTATION_OFFSET => Ok(Self::Endpoint),
            other => Err(ProtocolError::UnsupportedOffset(other)),
        }
    }

    pub fn header_len(self) -> usize {
        match self {
            Self::LengthPrefixed => LENGTH_PREFIX_LEN,
            Self::Endpoint => 0,
        }
    }

    /// Offset of the rotation count from the start of the received buffer.
    pub fn rotation_offset(self) -> usize {
        self.header_len() + ROTATION_COUNT_OFFSET
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameProgress {
    NeedMore(usize),
    Complete,
}

/// Accumulates one reply telegram across however many short reads it takes.
#[derive(Debug, Clone)]
pub struct FrameAssembler {
    layout: ResponseLayout,
    buf: Vec<u8>,
    received_transfer: bool,
}

impl FrameAssembler {
    pub fn new(layout: ResponseLayout) -> Self {
        Self {
            layout,
            buf: Vec::with_capacity(LENGTH_PREFIX_LEN + ENDPOINT_TRANSFER_LEN),
            received_transfer: false,
        }
    }

    pub fn layout(&self) -> ResponseLayout {
        self.layout
    }

    /// Total frame length once the length prefix has been seen.
    pub fn expected_len(&self) -> Option<usize> {
        match self.layout {
            ResponseLayout::LengthPrefixed => match self.buf.get(..LENGTH_PREFIX_LEN) {
                Some([lo, hi]) => {
                    Some(LENGTH_PREFIX_LEN + usize::from(u16::from_le_bytes([*lo, *hi])))
                }
                _ => None,
            },
            ResponseLayout::Endpoint => self.received_transfer.then_some(self.buf.len()),
        }
    }

    /// Number of bytes to request from the channel next.
    pub fn remaining(&self) -> usize {
        match self.layout {
            ResponseLayout::LengthPrefixed => match self.expected_len() {
                Some(total) => total.saturating_sub(self.buf.len()),
                None => LENGTH_PREFIX_LEN - self.buf.len(),
            },
            ResponseLayout::Endpoint if self.received_transfer => 0,
            ResponseLayout::Endpoint => ENDPOINT_TRANSFER_LEN,
        }
    }

    pub fn is_complete(&self) -> bool {
        match self.layout {
            ResponseLayout::LengthPrefixed => {
                self.expected_len().is_some() && self.remaining() == 0
            }
            ResponseLayout::Endpoint => self.received_transfer,
        }
    }

    /// Feed bytes from one read. Bytes beyond the current frame are ignored.
    pub fn push(&mut self, bytes: &[u8]) -> FrameProgress {
        match self.layout {
            ResponseLayout::LengthPrefixed => {
                let mut rest = bytes;
                while !rest.is_empty() && !self.is_complete() {
                    let take = self.remaining().min(rest.len());
                    let (head, tail) = rest.split_at(take);
                    self.buf.extend_from_slice(head);
                    rest = tail;
                }
            }
            ResponseLayout::Endpoint => {
                if !self.received_transfer && !bytes.is_empty() {
                    self.buf.extend_from_slice(bytes);
                    self.received_transfer = true;
                }
            }
        }

        if self.is_complete() {
            FrameProgress::Complete
        } else {
            FrameProgress::NeedMore(self.remaining())
        }
    }

    /// Hand over the assembled frame, or report how short it came up.
    pub fn finish(self) -> ProtocolResult<Vec<u8>> {
        if self.is_complete() {
            return Ok(self.buf);
        }
        let expected = self
            .expected_len()
            .unwrap_or(self.layout.header_len().max(1));
        Err(ProtocolError::Truncated {
            expected,
            actual: self.buf.len(),
        })
    }
}

/// A reply telegram with its header split out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponsePacket {
    /// Number of bytes following the length prefix.
    pub length: u16,
    pub kind: u8,
    pub command: u8,
    pub status: u8,
    pub payload: Vec<u8>,
}

impl ResponsePacket {
    pub fn reply_status(&self) -> ReplyStatus {
        ReplyStatus::from_u8(self.status)
    }

    pub fn direct_command(&self) -> Option<DirectCommand> {
        DirectCommand::from_u8(self.command)
    }
}

/// Split a complete frame into its header fields.
pub fn decode_response(layout: ResponseLayout, frame: &[u8]) -> ProtocolResult<ResponsePacket> {
    let body = match layout {
        ResponseLayout::LengthPrefixed => {
            let (prefix, body) = match frame.split_first_chunk::<LENGTH_PREFIX_LEN>() {
                Some(parts) => parts,
                None => {
                    return Err(ProtocolError::Truncated {
                        expected: LENGTH_PREFIX_LEN,
                        actual: frame.len(),
                    });
                }
            };
            let declared = usize::from(u16::from_le_bytes(*prefix));
            if body.len() < declared {
                return Err(ProtocolError::Truncated {
                    expected: LENGTH_PREFIX_LEN + declared,
                    actual: frame.len(),
                });
            }
            if body.len() > declared {
                return Err(ProtocolError::Malformed(format!(
                    "length prefix declares {declared} bytes but {} follow",
                    body.len()
                )));
            }
            body
        }
        ResponseLayout::Endpoint => frame,
    };

    let Some(([kind, command, status], payload)) = body.split_first_chunk::<REPLY_HEADER_LEN>()
    else {
        return Err(ProtocolError::Truncated {
            expected: layout.header_len() + REPLY_HEADER_LEN,
            actual: frame.len(),
        });
    };

    if *kind != REPLY_TELEGRAM {
        return Err(ProtocolError::Malformed(format!(
            "telegram type {kind:#04x} is not a reply"
        )));
    }

    Ok(ResponsePacket {
        length: u16::try_from(body.len()).unwrap_or(u16::MAX),
        kind: *kind,
        command: *command,
        status: *status,
        payload: payload.to_vec(),
    })
}

/// Motor state fields the bridge consumes from a `GETOUTPUTSTATE` reply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MotorPositionReply {
    pub port: u8,
    pub tacho_count: i32,
    pub rotation_count: i32,
}

fn read_i32(frame: &[u8], offset: usize) -> ProtocolResult<i32> {
    let end = offset.saturating_add(4);
    match frame.get(offset..end) {
        Some(&[a, b, c, d]) => Ok(i32::from_le_bytes([a, b, c, d])),
        _ => Err(ProtocolError::Truncated {
            expected: end,
            actual: frame.len(),
        }),
    }
}

/// Decode a motor position reply, reading the rotation count at the layout's
/// fixed offset from the start of `frame`.
pub fn parse_motor_position(
    layout: ResponseLayout,
    frame: &[u8],
) -> ProtocolResult<MotorPositionReply> {
    let packet = decode_response(layout, frame)?;

    if packet.direct_command() != Some(DirectCommand::GetOutputState) {
        return Err(ProtocolError::Malformed(format!(
            "reply opcode {:#04x} is not a motor state reply",
            packet.command
        )));
    }
    if !packet.reply_status().is_success() {
        return Err(ProtocolError::DeviceStatus(packet.status));
    }

    let header = layout.header_len();
    let port = frame
        .get(header + PORT_OFFSET)
        .copied()
        .ok_or(ProtocolError::Truncated {
            expected: header + PORT_OFFSET + 1,
            actual: frame.len(),
        })?;
    let tacho_count = read_i32(frame, header + TACHO_COUNT_OFFSET)?;
    let rotation_count = read_i32(frame, layout.rotation_offset())?;

    tracing::trace!(port, rotation_count, tacho_count, "decoded motor state reply");

    Ok(MotorPositionReply {
        port,
        tacho_count,
        rotation_count,
    })
}

/// Encode a `GETOUTPUTSTATE` reply the way the brick sends it.
///
/// Simulated bricks use this to answer position queries; the block tacho
/// count mirrors the tacho count.
pub fn encode_motor_state_reply(layout: ResponseLayout, reply: &MotorPositionReply) -> Vec<u8> {
    let mut body = Vec::with_capacity(MOTOR_STATE_REPLY_LEN);
    body.extend_from_slice(&[
        REPLY_TELEGRAM,
        DirectCommand::GetOutputState.to_u8(),
        SUCCESS_STATUS,
        reply.port,
    ]);
    // power, mode, regulation, turn ratio, run state, tacho limit
    body.extend_from_slice(&[0u8; 9]);
    body.extend_from_slice(&reply.tacho_count.to_le_bytes());
    body.extend_from_slice(&reply.tacho_count.to_le_bytes());
    body.extend_from_slice(&reply.rotation_count.to_le_bytes());
    match layout {
        ResponseLayout::LengthPrefixed => crate::output::frame(&body),
        ResponseLayout::Endpoint => body,
    }
}



#[cfg(test)]
mod property_tests {
    use super::fixtures::motor_state_reply;
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(500))]

        #[test]
        fn prop_decode_arbitrary_data_never_panics(ref data in any::<Vec<u8>>()) {
            let _ = parse_motor_position(ResponseLayout::LengthPrefixed, data);
            let _ = parse_motor_position(ResponseLayout::Endpoint, data);
        }

        #[test]
        fn prop_rotation_recovered(rotation in any::<i32>(), port in 0u8..=2) {
            for layout in [ResponseLayout::LengthPrefixed, ResponseLayout::Endpoint] {
                let frame = motor_state_reply(layout, port, rotation);
                let reply = parse_motor_position(layout, &frame);
                prop_assert_eq!(reply.map(|r| (r.port, r.rotation_count)), Ok((port, rotation)));
            }
        }

        #[test]
        fn prop_assembler_any_chunking(rotation in any::<i32>(), chunk in 1usize..8) {
            let frame = motor_state_reply(ResponseLayout::LengthPrefixed, 0, rotation);
            let mut asm = FrameAssembler::new(ResponseLayout::LengthPrefixed);
            for piece in frame.chunks(chunk) {
                asm.push(piece);
            }
            prop_assert_eq!(asm.finish(), Ok(frame));
        }
    }
}
