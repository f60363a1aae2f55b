//! Property-based tests for calibration: polarity inference and decoding bounds.

#[cfg(test)]
mod proptest_calibration {
    use nxt_throttle_calibration::{
        AxisCalibration, AxisDecoder, AxisId, DEFAULT_THROTTLE_DEAD_ZONE, Direction, percent,
    };
    use proptest::prelude::*;

    fn any_direction() -> impl Strategy<Value = Direction> {
        prop_oneof![Just(Direction::Forward), Just(Direction::Reverse)]
    }

    fn calibrated(direction: Direction, max_rotation: i32) -> AxisCalibration {
        AxisCalibration {
            direction,
            max_rotation,
            calibrated: true,
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(500))]

        // --- Yaw follows min(100, |r*d| / m * 100) exactly ---

        #[test]
        fn yaw_matches_reference_formula(
            raw in -100_000i32..100_000,
            direction in any_direction(),
            max_rotation in 1i32..50_000,
        ) {
            let calib = calibrated(direction, max_rotation);
            let expected = ((i64::from(raw) * i64::from(direction.sign())).abs() as f64
                / f64::from(max_rotation) * 100.0).min(100.0);
            let output = percent(AxisId::Yaw, raw, &calib);
            prop_assert!((output - expected).abs() < 1e-9,
                "yaw({}) = {}, expected {}", raw, output, expected);
        }

        // --- Throttle stays in [0, 100] and never reports inside the dead zone ---

        #[test]
        fn throttle_bounded_outside_dead_zone(
            raw in any::<i32>(),
            direction in any_direction(),
            max_rotation in 1i32..=i32::MAX,
        ) {
            let calib = calibrated(direction, max_rotation);
            let output = percent(AxisId::Throttle, raw, &calib);
            prop_assert!((0.0..=100.0).contains(&output), "throttle {} out of range", output);
            prop_assert!(output == 0.0 || output >= DEFAULT_THROTTLE_DEAD_ZONE,
                "throttle {} inside dead zone", output);
        }

        // --- Pitch never exceeds full scale ---

        #[test]
        fn pitch_upper_bound(
            raw in any::<i32>(),
            direction in any_direction(),
            max_rotation in 1i32..=i32::MAX,
        ) {
            let calib = calibrated(direction, max_rotation);
            let output = AxisDecoder::default().percent(AxisId::Pitch, raw, &calib);
            prop_assert!(output <= 100.0);
            prop_assert!(output.is_finite());
        }

        // --- Inference: direction follows the sign, travel is never below one ---

        #[test]
        fn inference_sign_and_floor(raw in any::<i32>(), leeway in 0i32..=3) {
            let calib = AxisCalibration::infer(raw, leeway);
            prop_assert!(calib.calibrated);
            prop_assert!(calib.max_rotation >= 1);
            let expected_direction = if raw < 0 { Direction::Reverse } else { Direction::Forward };
            prop_assert_eq!(calib.direction, expected_direction);
        }

        // --- The calibrated extreme reads as full travel ---

        #[test]
        fn forward_extreme_reads_full(raw in 10i32..100_000, negative in any::<bool>(), leeway in 0i32..=3) {
            let raw = if negative { -raw } else { raw };
            let calib = AxisCalibration::infer(raw, leeway);
            for axis in [AxisId::Throttle, AxisId::Yaw] {
                let output = percent(axis, raw, &calib);
                prop_assert!((output - 100.0).abs() < 1e-9, "{} at extreme = {}", axis, output);
            }
        }
    }
}
