//! NXT protocol error types.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("Truncated packet: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    #[error("Malformed packet: {0}")]
    Malformed(String),

    #[error("Device rejected command with status {0:#04x}")]
    DeviceStatus(u8),

    #[error("Unsupported rotation count offset {0} (expected 21 or 23)")]
    UnsupportedOffset(usize),
}

pub type ProtocolResult<T> = Result<T, ProtocolError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ProtocolError::Truncated {
            expected: 27,
            actual: 12,
        };
        assert_eq!(err.to_string(), "Truncated packet: expected 27 bytes, got 12");

        let err = ProtocolError::DeviceStatus(0xEC);
        assert_eq!(err.to_string(), "Device rejected command with status 0xec");
    }

    #[test]
    fn test_unsupported_offset_display() {
        let err = ProtocolError::UnsupportedOffset(22);
        assert_eq!(
            err.to_string(),
            "Unsupported rotation count offset 22 (expected 21 or 23)"
        );
    }
}
