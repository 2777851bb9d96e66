//! Duct velocity and volumetric flow from a pitot velocity pressure.

use std::f64::consts::PI;

use crate::core::units::{fahrenheit_to_rankine, STANDARD_PRESSURE_INHG, STANDARD_TEMPERATURE_F};

/// Pitot constant relating velocity pressure (inWc) and density (lb/ft³) to fpm.
pub const PITOT_CONSTANT: f64 = 1096.5;

/// Air velocity in ft/min.
///
/// The magnitude of the differential pressure is used, so sensor offset noise
/// around zero flow reads as a small velocity instead of a NaN.
pub fn velocity(diff_pressure_inwc: f64, density: f64) -> f64 {
    PITOT_CONSTANT * (diff_pressure_inwc / density).abs().sqrt()
}

/// Cross-sectional area in ft² of a round duct given its inside diameter in inches.
pub fn duct_area(diameter_in: f64) -> f64 {
    let radius_ft = diameter_in / 2.0 / 12.0;
    PI * radius_ft.powi(2)
}

/// Actual volumetric flow in acfm.
pub fn actual_flow(velocity_fpm: f64, diameter_in: f64) -> f64 {
    velocity_fpm * duct_area(diameter_in)
}

/// Flow corrected to 30 inHg and 60 °F, in scfm.
pub fn standard_flow(actual_flow: f64, barometric_inhg: f64, temp_f: f64) -> f64 {
    actual_flow
        * (barometric_inhg / STANDARD_PRESSURE_INHG)
        * (fahrenheit_to_rankine(STANDARD_TEMPERATURE_F) / fahrenheit_to_rankine(temp_f))
}

#[cfg(test)]
mod test {
    use super::*;
    use proptest::prelude::*;

    const CLOSE: f64 = 1e-6;
    fn assert_close(value: f64, expected: f64) {
        assert!(
            (value - expected).abs() < CLOSE,
            "value={value} expected={expected}"
        )
    }

    #[test]
    fn area_of_sixteen_inch_duct() {
        // 8 in radius = 2/3 ft
        assert_close(duct_area(16.0), PI * 4.0 / 9.0);
    }

    #[test]
    fn zero_pressure_is_still_air() {
        assert_eq!(velocity(0.0, 0.075), 0.0);
    }

    #[test]
    fn colder_air_corrects_upwards() {
        assert!(standard_flow(100.0, 30.0, 40.0) > 100.0);
        assert!(standard_flow(100.0, 30.0, 90.0) < 100.0);
        assert!(standard_flow(100.0, 29.0, 60.0) < 100.0);
    }

    proptest! {
        #[test]
        fn velocity_ignores_sign_of_pressure(dp in 0.0f64..5.0, rho in 0.05f64..0.09) {
            prop_assert_eq!(velocity(dp, rho), velocity(-dp, rho));
        }

        #[test]
        fn standard_conditions_leave_flow_unchanged(
            dp in 0.0f64..2.0,
            rho in 0.05f64..0.09,
            diameter in 1.0f64..48.0,
        ) {
            let actual = actual_flow(velocity(dp, rho), diameter);
            prop_assert_eq!(standard_flow(actual, 30.0, 60.0), actual);
        }
    }
}
