//! Axis calibration for motor-encoder flight controls
//!
//! Turns raw, sign-ambiguous encoder extremes into a usable direction and
//! travel range per axis, decodes raw ticks into percentages, and tracks the
//! setup sequence that decides which calibration step is legal next.

#![deny(unsafe_op_in_unsafe_fn)]
#![deny(clippy::unwrap_used)]

pub mod decoder;
pub mod state;
pub mod types;

pub use decoder::*;
pub use state::*;
pub use types::*;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    #[error("Cannot {step} while {from}")]
    IllegalTransition {
        from: SessionState,
        step: CalibrationStep,
    },
}

pub type CalibrationResult<T> = Result<T, StateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_types() {
        let err = StateError::IllegalTransition {
            from: SessionState::Idle,
            step: CalibrationStep::CalibrateForward,
        };
        assert_eq!(format!("{}", err), "Cannot calibrate forward while idle");
    }
}
