//! Setup sequence shared by every axis

use crate::{CalibrationResult, StateError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where the user is in the connect/calibrate cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    #[default]
    Idle,
    AwaitingBackwardCalibration,
    AwaitingForwardCalibration,
    Ready,
}

/// User-triggered step of the setup sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationStep {
    BeginSetup,
    CalibrateBackward,
    CalibrateForward,
}

impl SessionState {
    /// State reached by applying `step`, or the reason it is not allowed now.
    pub fn transition(self, step: CalibrationStep) -> CalibrationResult<SessionState> {
        use CalibrationStep::*;
        use SessionState::*;

        match (self, step) {
            (Idle | Ready, BeginSetup) => Ok(AwaitingBackwardCalibration),
            (AwaitingBackwardCalibration, CalibrateBackward) => Ok(AwaitingForwardCalibration),
            (AwaitingForwardCalibration, CalibrateForward) => Ok(Ready),
            (from, step) => Err(StateError::IllegalTransition { from, step }),
        }
    }

    /// The one step that is legal from this state.
    pub fn next_step(self) -> CalibrationStep {
        match self {
            Self::Idle | Self::Ready => CalibrationStep::BeginSetup,
            Self::AwaitingBackwardCalibration => CalibrationStep::CalibrateBackward,
            Self::AwaitingForwardCalibration => CalibrationStep::CalibrateForward,
        }
    }

    /// Instruction shown to the user while in this state.
    pub fn prompt(self) -> &'static str {
        match self {
            Self::Idle => "Press to connect and start calibration.",
            Self::AwaitingBackwardCalibration => "Move every axis fully backwards, then press again.",
            Self::AwaitingForwardCalibration => "Move every axis fully forwards, then press again.",
            Self::Ready => "Calibration done. Press again to recalibrate.",
        }
    }

    pub fn is_ready(self) -> bool {
        self == Self::Ready
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::AwaitingBackwardCalibration => "awaiting backward calibration",
            Self::AwaitingForwardCalibration => "awaiting forward calibration",
            Self::Ready => "ready",
        })
    }
}

impl fmt::Display for CalibrationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::BeginSetup => "begin setup",
            Self::CalibrateBackward => "calibrate backward",
            Self::CalibrateForward => "calibrate forward",
        })
    }
}
