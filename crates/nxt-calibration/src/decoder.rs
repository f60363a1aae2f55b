//! Raw tick to percentage decoding

use crate::{AxisCalibration, AxisId};

/// Throttle readings below this percentage report as zero.
pub const DEFAULT_THROTTLE_DEAD_ZONE: f64 = 7.0;

/// Value reported for an axis with no calibrated reading.
pub const UNAVAILABLE_PERCENT: f64 = -1.0;

const FULL_SCALE: f64 = 100.0;

/// Decodes raw encoder ticks into axis percentages.
///
/// Throttle and yaw report the magnitude of travel, clamped to `[0, 100]`.
/// Pitch is inverted relative to the other axes and keeps its sign, so the
/// lower half of its travel reads negative; only the upper bound is clamped.
///
/// # Examples
///
/// ```
/// use nxt_throttle_calibration::{AxisCalibration, AxisDecoder, AxisId};
///
/// let decoder = AxisDecoder::default();
/// let calib = AxisCalibration::infer(-350, 2);
/// let percent = decoder.percent(AxisId::Throttle, -174, &calib);
/// assert!((percent - 50.0).abs() < 1e-9);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisDecoder {
    throttle_dead_zone: f64,
}

impl Default for AxisDecoder {
    fn default() -> Self {
        Self {
            throttle_dead_zone: DEFAULT_THROTTLE_DEAD_ZONE,
        }
    }
}

impl AxisDecoder {
    pub fn new(throttle_dead_zone: f64) -> Self {
        Self { throttle_dead_zone }
    }

    pub fn throttle_dead_zone(&self) -> f64 {
        self.throttle_dead_zone
    }

    /// Decode `raw_ticks` for `axis`. `calib` must be calibrated.
    pub fn percent(&self, axis: AxisId, raw_ticks: i32, calib: &AxisCalibration) -> f64 {
        let mut signed = i64::from(raw_ticks) * i64::from(calib.direction.sign());
        if axis == AxisId::Pitch {
            signed = -signed;
        }
        let max_rotation = f64::from(calib.max_rotation.max(1));

        match axis {
            AxisId::Pitch => (signed as f64 / max_rotation * FULL_SCALE).min(FULL_SCALE),
            AxisId::Throttle | AxisId::Yaw => {
                let p = (signed.abs() as f64 / max_rotation * FULL_SCALE).clamp(0.0, FULL_SCALE);
                if axis == AxisId::Throttle && p < self.throttle_dead_zone {
                    0.0
                } else {
                    p
                }
            }
        }
    }

    /// Decode when possible, otherwise report [`UNAVAILABLE_PERCENT`].
    pub fn reported_percent(
        &self,
        axis: AxisId,
        raw_ticks: Option<i32>,
        calib: &AxisCalibration,
    ) -> f64 {
        match raw_ticks {
            Some(raw) if calib.calibrated => self.percent(axis, raw, calib),
            _ => UNAVAILABLE_PERCENT,
        }
    }
}

/// Decode with the default throttle dead zone.
pub fn percent(axis: AxisId, raw_ticks: i32, calib: &AxisCalibration) -> f64 {
    AxisDecoder::default().percent(axis, raw_ticks, calib)
}
