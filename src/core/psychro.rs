//! Moist-air properties after ASHRAE Fundamentals ch. 1.
//!
//! Every function here is pure and unguarded: inputs outside the physical
//! range produce numerically meaningless (possibly non-finite) outputs rather
//! than errors. Guarding happens in [`crate::core::cycle`].

use crate::core::units::{
    fahrenheit_to_rankine, DENSITY_RANKINE_OFFSET, DRY_AIR_GAS_CONSTANT, MBAR_TO_PSF,
    PSIA_TO_INHG, VAPOR_AIR_MASS_RATIO,
};

/// Coefficients of the saturation correlation over liquid water, in °R and psia.
const SATURATION_COEFFICIENTS: [f64; 6] = [
    -1.0440397e4,
    -1.1294650e1,
    -2.7022355e-2,
    1.2890360e-5,
    -2.4780681e-9,
    6.5459673,
];

/// Saturation vapor pressure in inHg at the given temperature in °F.
///
/// Evaluated at the dew point this is the partial pressure of the water vapor
/// actually present; evaluated at the dry bulb it is the saturation pressure.
pub fn saturation_pressure(temp_f: f64) -> f64 {
    let t = fahrenheit_to_rankine(temp_f);
    let [c1, c2, c3, c4, c5, c6] = SATURATION_COEFFICIENTS;

    let ln_p = c1 / t + c2 + c3 * t + c4 * t.powi(2) + c5 * t.powi(3) + c6 * t.ln();
    ln_p.exp() * PSIA_TO_INHG
}

/// Mass of water vapor per mass of dry air. Both pressures in the same unit.
///
/// Diverges as `vapor_pressure` approaches `barometric_pressure`.
pub fn humidity_ratio(barometric_pressure: f64, vapor_pressure: f64) -> f64 {
    VAPOR_AIR_MASS_RATIO * vapor_pressure / (barometric_pressure - vapor_pressure)
}

/// Relative humidity in percent.
pub fn relative_humidity(vapor_pressure: f64, saturation_pressure: f64) -> f64 {
    100.0 * vapor_pressure / saturation_pressure
}

/// Moist-air density in lb/ft³ from barometric pressure in mbar, dry bulb in °F
/// and humidity ratio.
pub fn moist_air_density(barometric_mbar: f64, temp_f: f64, humidity_ratio: f64) -> f64 {
    let t = temp_f + DENSITY_RANKINE_OFFSET;
    let p = barometric_mbar * MBAR_TO_PSF;
    let w = humidity_ratio;

    (p * (1.0 + w)) / (DRY_AIR_GAS_CONSTANT * t * (1.0 + 1.6078 * w))
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
    fn saturation_reference_points() {
        // Freezing, boiling at one atmosphere, and a typical room dew point.
        assert_close(saturation_pressure(32.0), 0.180490928);
        assert_close(saturation_pressure(212.0), 29.948904160);
        assert_close(saturation_pressure(56.5), 0.460300855);
    }

    #[test]
    fn humidity_ratio_at_room_conditions() {
        let pp = saturation_pressure(56.5);
        assert_close(humidity_ratio(29.60, pp), 0.009824460);
    }

    #[test]
    fn humidity_ratio_degenerates_at_equal_pressures() {
        assert!(!humidity_ratio(1.0, 1.0).is_finite());
    }

    #[test]
    fn density_at_room_conditions() {
        let w = humidity_ratio(29.60, saturation_pressure(56.5));
        assert_close(moist_air_density(29.60 * 33.864, 75.9, w), 0.072833149);
    }

    #[test]
    fn dry_air_density() {
        // 1013.25 mbar, 59 °F, bone dry.
        let rho = moist_air_density(1013.25, 59.0, 0.0);
        assert!((rho - 0.0765).abs() < 1e-3, "rho={rho}");
    }

    proptest! {
        #[test]
        fn saturated_air_is_fully_humid(temp in -40.0f64..200.0) {
            let p = saturation_pressure(temp);
            prop_assert!((relative_humidity(p, p) - 100.0).abs() < 1e-9);
        }

        #[test]
        fn humidity_ratio_increases_with_vapor_pressure(
            barometric in 20.0f64..32.0,
            low in 0.0f64..1.0,
            step in 1e-4f64..1.0,
        ) {
            prop_assert!(humidity_ratio(barometric, low + step) > humidity_ratio(barometric, low));
        }

        #[test]
        fn saturation_increases_with_temperature(temp in -40.0f64..200.0) {
            prop_assert!(saturation_pressure(temp + 1.0) > saturation_pressure(temp));
        }
    }
}
