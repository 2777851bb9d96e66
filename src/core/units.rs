//! Physical constants and unit-conversion factors shared by the calculators.
//!
//! Imperial units throughout: pressures in inHg / inWc / mbar, temperatures in
//! degrees Fahrenheit (absolute work in degrees Rankine), flows in ft³/min.

pub const CUBIC_METER_TO_CUBIC_FOOT: f64 = 35.3146667;
pub const KILOGRAM_TO_POUND: f64 = 2.20462;
pub const KILOWATT_HOUR_TO_KBTU: f64 = 3.41214;

pub const MBAR_TO_INHG: f64 = 0.02953;
pub const MBAR_TO_PSF: f64 = 2.08854;
pub const MBAR_TO_PSI: f64 = 0.0145038;
pub const INWC_TO_INHG: f64 = 0.0736912;

/// Used when a barometer reports in mbar and the inHg figure is derived from it.
pub const INHG_TO_MBAR: f64 = 33.864;

/// psia to inHg, applied to the saturation correlation output.
pub const PSIA_TO_INHG: f64 = 2.03602;

/// °F to °R.
pub const RANKINE_OFFSET: f64 = 459.67;

/// The moist-air density correlation was fitted with this absolute offset.
pub const DENSITY_RANKINE_OFFSET: f64 = 459.69;

/// Molecular weight ratio of water vapor to dry air.
pub const VAPOR_AIR_MASS_RATIO: f64 = 0.621945;

/// Gas constant of dry air, ft·lbf/(lb·°R).
pub const DRY_AIR_GAS_CONSTANT: f64 = 53.352;

/// Standard reference conditions for corrected flow.
pub const STANDARD_PRESSURE_INHG: f64 = 30.0;
pub const STANDARD_TEMPERATURE_F: f64 = 60.0;

#[inline]
pub fn fahrenheit_to_rankine(temp_f: f64) -> f64 {
    temp_f + RANKINE_OFFSET
}

#[inline]
pub fn celsius_to_fahrenheit(temp_c: f64) -> f64 {
    temp_c * 1.8 + 32.0
}

#[inline]
pub fn kelvin_to_fahrenheit(temp_k: f64) -> f64 {
    celsius_to_fahrenheit(temp_k - 273.15)
}

/// Rounds to a fixed number of decimal places, for record presentation only.
#[inline]
pub fn round_to(value: f64, places: i32) -> f64 {
    let scale = 10f64.powi(places);
    (value * scale).round() / scale
}

/// A barometric reading carried in both units the calculators consume.
///
/// Live readings come off the transducer in mbar, batch inputs are recorded
/// in inHg. Each constructor derives the other unit with the factor that source
/// has always used, so the two are not exact inverses of each other.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BarometricPressure {
    pub mbar: f64,
    pub inhg: f64,
}

impl BarometricPressure {
    pub fn from_mbar(mbar: f64) -> BarometricPressure {
        BarometricPressure {
            mbar,
            inhg: mbar / INHG_TO_MBAR,
        }
    }

    pub fn from_inhg(inhg: f64) -> BarometricPressure {
        BarometricPressure {
            mbar: inhg / MBAR_TO_INHG,
            inhg,
        }
    }
}
