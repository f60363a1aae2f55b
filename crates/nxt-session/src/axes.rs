//! Per-axis shared records
//!
//! Each axis has its own lock so the requester, the receive callback and
//! readers of `axis_percent` only contend on the axis they touch.

use nxt_throttle_calibration::{
    AxisCalibration, AxisDecoder, AxisId, AxisRuntimeState, UNAVAILABLE_PERCENT,
};
use parking_lot::Mutex;
use tracing::info;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AxisRecord {
    pub calibration: AxisCalibration,
    pub runtime: AxisRuntimeState,
    /// Forward calibration waits for the next reply on this axis.
    pub pending_forward: bool,
}

#[derive(Debug, Default)]
pub struct AxisTable {
    throttle: Mutex<AxisRecord>,
    pitch: Mutex<AxisRecord>,
    yaw: Mutex<AxisRecord>,
}

impl AxisTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, axis: AxisId) -> &Mutex<AxisRecord> {
        match axis {
            AxisId::Throttle => &self.throttle,
            AxisId::Pitch => &self.pitch,
            AxisId::Yaw => &self.yaw,
        }
    }

    pub fn snapshot(&self, axis: AxisId) -> AxisRecord {
        *self.record(axis).lock()
    }

    /// Forget calibration and readings for every axis.
    pub fn reset_all(&self) {
        for axis in AxisId::ALL {
            *self.record(axis).lock() = AxisRecord::default();
        }
    }

    pub fn clear_runtime(&self, axis: AxisId) {
        let mut record = self.record(axis).lock();
        record.runtime.clear();
    }

    pub fn set_pending_forward(&self, axis: AxisId, pending: bool) {
        self.record(axis).lock().pending_forward = pending;
    }

    /// Install calibration inferred from a forward-extreme reading.
    pub fn apply_forward(&self, axis: AxisId, raw_forward: i32, leeway: i32) -> AxisCalibration {
        let calibration = AxisCalibration::infer(raw_forward, leeway);
        {
            let mut record = self.record(axis).lock();
            record.calibration = calibration;
            record.pending_forward = false;
            record.runtime.record(raw_forward);
            record.runtime.last_emitted_percent = None;
        }
        info!(
            axis = %axis,
            raw_forward,
            direction = ?calibration.direction,
            max_rotation = calibration.max_rotation,
            "axis calibrated"
        );
        calibration
    }

    /// Record a fresh reading, completing a pending forward calibration.
    pub fn observe(&self, axis: AxisId, raw_ticks: i32, leeway: i32) {
        let pending = {
            let mut record = self.record(axis).lock();
            if !record.pending_forward {
                record.runtime.record(raw_ticks);
            }
            record.pending_forward
        };
        if pending {
            self.apply_forward(axis, raw_ticks, leeway);
        }
    }

    pub fn raw_ticks(&self, axis: AxisId) -> Option<i32> {
        self.record(axis).lock().runtime.raw_ticks
    }

    /// Current percentage, or `None` while uncalibrated or before any reading.
    pub fn percent(&self, axis: AxisId, decoder: &AxisDecoder) -> Option<f64> {
        let record = self.record(axis).lock();
        match record.runtime.raw_ticks {
            Some(raw) if record.calibration.calibrated => {
                Some(decoder.percent(axis, raw, &record.calibration))
            }
            _ => None,
        }
    }

    pub fn reported_percent(&self, axis: AxisId, decoder: &AxisDecoder) -> f64 {
        self.percent(axis, decoder).unwrap_or(UNAVAILABLE_PERCENT)
    }

    /// Decode the axis and mark the value emitted when it differs from the
    /// last one handed downstream.
    pub fn take_change(&self, axis: AxisId, decoder: &AxisDecoder) -> Option<(i32, f64)> {
        let mut record = self.record(axis).lock();
        let raw = record.runtime.raw_ticks?;
        if !record.calibration.calibrated {
            return None;
        }
        let percent = decoder.percent(axis, raw, &record.calibration);
        record.runtime.mark_emitted(percent).then_some((raw, percent))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nxt_throttle_calibration::Direction;

    #[test]
    fn test_uncalibrated_reports_sentinel() {
        let table = AxisTable::new();
        let decoder = AxisDecoder::default();
        table.observe(AxisId::Throttle, 40, 3);

        assert_eq!(table.raw_ticks(AxisId::Throttle), Some(40));
        assert_eq!(table.percent(AxisId::Throttle, &decoder), None);
        assert!((table.reported_percent(AxisId::Throttle, &decoder) + 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_forward_then_half_travel() {
        let table = AxisTable::new();
        let decoder = AxisDecoder::default();
        let calib = table.apply_forward(AxisId::Yaw, -350, 2);
        assert_eq!(calib.direction, Direction::Reverse);
        assert_eq!(calib.max_rotation, 348);

        table.observe(AxisId::Yaw, -174, 2);
        assert!(table
            .percent(AxisId::Yaw, &decoder)
            .is_some_and(|p| (p - 50.0).abs() < 1e-9));
    }

    #[test]
    fn test_pending_forward_consumes_next_reading() {
        let table = AxisTable::new();
        table.set_pending_forward(AxisId::Pitch, true);
        table.observe(AxisId::Pitch, 200, 3);

        let record = table.snapshot(AxisId::Pitch);
        assert!(!record.pending_forward);
        assert!(record.calibration.calibrated);
        assert_eq!(record.calibration.max_rotation, 197);
    }

    #[test]
    fn test_take_change_only_on_difference() {
        let table = AxisTable::new();
        let decoder = AxisDecoder::default();
        table.apply_forward(AxisId::Yaw, 100, 0);

        assert_eq!(table.take_change(AxisId::Yaw, &decoder), Some((100, 100.0)));
        assert_eq!(table.take_change(AxisId::Yaw, &decoder), None);

        table.observe(AxisId::Yaw, 25, 0);
        assert_eq!(table.take_change(AxisId::Yaw, &decoder), Some((25, 25.0)));
    }

    #[test]
    fn test_reset_all_clears_calibration() {
        let table = AxisTable::new();
        table.apply_forward(AxisId::Throttle, 300, 3);
        table.reset_all();

        let record = table.snapshot(AxisId::Throttle);
        assert_eq!(record, AxisRecord::default());
    }
}
