//! Blocking frame reads for stream channels

use crate::{Channel, TransportResult};
use nxt_throttle_protocol::{FrameAssembler, FrameProgress, ResponseLayout};
use tracing::trace;

/// Read exactly one reply frame, issuing as many reads as the channel needs.
///
/// A read that returns no bytes before the frame is complete ends the frame
/// early and surfaces as [`ProtocolError::Truncated`].
///
/// [`ProtocolError::Truncated`]: nxt_throttle_protocol::ProtocolError::Truncated
pub fn read_frame(channel: &dyn Channel, layout: ResponseLayout) -> TransportResult<Vec<u8>> {
    let mut assembler = FrameAssembler::new(layout);
    let mut want = assembler.remaining();

    loop {
        let chunk = channel.read(want)?;
        if chunk.is_empty() {
            break;
        }
        trace!(len = chunk.len(), "frame chunk");
        match assembler.push(&chunk) {
            FrameProgress::Complete => break,
            FrameProgress::NeedMore(next) => want = next,
        }
    }

    Ok(assembler.finish()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TransportError;
    use crate::mock::MockChannel;
    use nxt_throttle_protocol::{MotorPositionReply, ProtocolError, encode_motor_state_reply};

    fn reply(layout: ResponseLayout, rotation: i32) -> Vec<u8> {
        encode_motor_state_reply(
            layout,
            &MotorPositionReply {
                port: 0,
                tacho_count: rotation,
                rotation_count: rotation,
            },
        )
    }

    #[test]
    fn test_read_frame_whole() -> Result<(), Box<dyn std::error::Error>> {
        let channel = MockChannel::stream();
        let bytes = reply(ResponseLayout::LengthPrefixed, 42);
        channel.queue_read(bytes.clone());

        let frame = read_frame(&channel, ResponseLayout::LengthPrefixed)?;
        assert_eq!(frame, bytes);
        Ok(())
    }

    #[test]
    fn test_read_frame_short_reads() -> Result<(), Box<dyn std::error::Error>> {
        let channel = MockChannel::stream().with_max_chunk(3);
        let bytes = reply(ResponseLayout::LengthPrefixed, -350);
        channel.queue_read(bytes.clone());

        let frame = read_frame(&channel, ResponseLayout::LengthPrefixed)?;
        assert_eq!(frame, bytes);
        Ok(())
    }

    #[test]
    fn test_read_frame_leaves_next_frame_queued() -> Result<(), Box<dyn std::error::Error>> {
        let channel = MockChannel::stream();
        let first = reply(ResponseLayout::LengthPrefixed, 1);
        let second = reply(ResponseLayout::LengthPrefixed, 2);
        let mut joined = first.clone();
        joined.extend_from_slice(&second);
        channel.queue_read(joined);

        assert_eq!(read_frame(&channel, ResponseLayout::LengthPrefixed)?, first);
        assert_eq!(read_frame(&channel, ResponseLayout::LengthPrefixed)?, second);
        Ok(())
    }

    #[test]
    fn test_read_frame_timeout_is_truncated() {
        let channel = MockChannel::stream();
        let bytes = reply(ResponseLayout::LengthPrefixed, 5);
        channel.queue_read(bytes.get(..10).map(<[u8]>::to_vec).unwrap_or_default());

        let result = read_frame(&channel, ResponseLayout::LengthPrefixed);
        assert!(matches!(
            result,
            Err(TransportError::Protocol(ProtocolError::Truncated {
                expected: 27,
                actual: 10
            }))
        ));
    }

    #[test]
    fn test_read_frame_nothing_received() {
        let channel = MockChannel::stream();
        let result = read_frame(&channel, ResponseLayout::LengthPrefixed);
        assert!(matches!(
            result,
            Err(TransportError::Protocol(ProtocolError::Truncated { actual: 0, .. }))
        ));
    }

    #[test]
    fn test_read_frame_disconnected() {
        let channel = MockChannel::stream();
        channel.disconnect();
        let result = read_frame(&channel, ResponseLayout::LengthPrefixed);
        assert!(matches!(result, Err(TransportError::Disconnected)));
    }
}
