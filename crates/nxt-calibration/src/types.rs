//! Calibration type definitions

use serde::{Deserialize, Serialize};
use std::fmt;

/// Default leeway, in encoder ticks, subtracted from the forward extreme.
pub const DEFAULT_LEEWAY_TICKS: i32 = 3;

/// Travel assumed for an axis that has never been calibrated.
pub const DEFAULT_MAX_ROTATION: i32 = 100;

/// One of the three motor-driven control axes.
///
/// Each axis is wired to a fixed NXT output port.
///
/// # Examples
///
/// ```
/// use nxt_throttle_calibration::AxisId;
///
/// assert_eq!(AxisId::Pitch.port(), 1);
/// assert_eq!(AxisId::from_port(2), Some(AxisId::Yaw));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AxisId {
    Throttle,
    Pitch,
    Yaw,
}

impl AxisId {
    pub const ALL: [AxisId; 3] = [AxisId::Throttle, AxisId::Pitch, AxisId::Yaw];

    /// NXT output port (A = 0, B = 1, C = 2).
    pub fn port(self) -> u8 {
        match self {
            Self::Throttle => 0,
            Self::Pitch => 1,
            Self::Yaw => 2,
        }
    }

    pub fn from_port(port: u8) -> Option<Self> {
        match port {
            0 => Some(Self::Throttle),
            1 => Some(Self::Pitch),
            2 => Some(Self::Yaw),
            _ => None,
        }
    }

    pub fn index(self) -> usize {
        usize::from(self.port())
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Throttle => "throttle",
            Self::Pitch => "pitch",
            Self::Yaw => "yaw",
        }
    }
}

impl fmt::Display for AxisId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sign correction that maps raw ticks onto a forward-positive convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    #[default]
    Forward,
    Reverse,
}

impl Direction {
    pub fn sign(self) -> i32 {
        match self {
            Self::Forward => 1,
            Self::Reverse => -1,
        }
    }
}

/// Axis calibration data
///
/// Produced by the forward calibration step from the encoder reading at the
/// axis' forward extreme, after the backward extreme has been zeroed.
///
/// # Examples
///
/// ```
/// use nxt_throttle_calibration::{AxisCalibration, Direction};
///
/// let calib = AxisCalibration::infer(-350, 2);
/// assert_eq!(calib.direction, Direction::Reverse);
/// assert_eq!(calib.max_rotation, 348);
/// assert!(calib.calibrated);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisCalibration {
    pub direction: Direction,
    /// Ticks between the zeroed backward extreme and full forward travel. Always `>= 1`.
    pub max_rotation: i32,
    pub calibrated: bool,
}

impl Default for AxisCalibration {
    fn default() -> Self {
        Self {
            direction: Direction::Forward,
            max_rotation: DEFAULT_MAX_ROTATION,
            calibrated: false,
        }
    }
}

impl AxisCalibration {
    /// Infer direction and travel from the raw forward-extreme reading.
    ///
    /// A negative reading means the motor turns backwards when the lever moves
    /// forwards. `leeway` ticks are taken off the extreme so a lever resting
    /// slightly short of the stop still reads as full travel.
    pub fn infer(raw_forward: i32, leeway: i32) -> Self {
        let direction = if raw_forward < 0 {
            Direction::Reverse
        } else {
            Direction::Forward
        };
        let magnitude = i64::from(raw_forward).abs();
        let travel = magnitude.saturating_sub(i64::from(leeway.max(0)));
        let max_rotation = i32::try_from(travel).unwrap_or(i32::MAX).max(1);

        Self {
            direction,
            max_rotation,
            calibrated: true,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Last observed reading for one axis.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AxisRuntimeState {
    /// Most recent rotation count, sign as received from the brick.
    pub raw_ticks: Option<i32>,
    /// Last percentage handed to the downstream sink.
    pub last_emitted_percent: Option<f64>,
}

impl AxisRuntimeState {
    pub fn record(&mut self, raw_ticks: i32) {
        self.raw_ticks = Some(raw_ticks);
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Remember `percent` as emitted. Returns `false` when it equals the last
    /// emitted value, so the caller can skip a redundant downstream write.
    pub fn mark_emitted(&mut self, percent: f64) -> bool {
        let changed = match self.last_emitted_percent {
            Some(previous) => (previous - percent).abs() > f64::EPSILON,
            None => true,
        };
        if changed {
            self.last_emitted_percent = Some(percent);
        }
        changed
    }
}
