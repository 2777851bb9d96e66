//! Bench check of the calculators against a known set of conditions.

use std::fmt::{Display, Formatter};

use crate::core::airflow::{actual_flow, velocity};
use crate::core::conversion::pressure_transfer;
use crate::core::psychro::{humidity_ratio, moist_air_density, saturation_pressure};
use crate::core::units::{round_to, INHG_TO_MBAR};

const BAROMETRIC_INHG: f64 = 29.60;
const DEW_POINT_F: f64 = 56.5;
const DRY_BULB_F: f64 = 75.9;
const DUCT_DIAMETER_IN: f64 = 16.0;
const LOOP_CURRENT_MA: f64 = 8.05;
const TRANSMITTER_RANGE_INWC: (f64, f64) = (0.0, 0.5);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelfTest {
    pub vapor_pressure: f64,
    pub humidity_ratio: f64,
    pub density: f64,
    pub velocity: f64,
    /// acfm
    pub flow: f64,
    /// Velocity pressure the reference transmitter reports at 8.05 mA.
    pub transmitter_pressure: f64,
}

impl SelfTest {
    /// Runs the calculators at the fixed bench conditions with an operator
    /// measured velocity pressure in inWc.
    pub fn run(velocity_pressure_inwc: f64) -> SelfTest {
        let vapor_pressure = saturation_pressure(DEW_POINT_F);
        let w = humidity_ratio(BAROMETRIC_INHG, vapor_pressure);
        let density = moist_air_density(BAROMETRIC_INHG * INHG_TO_MBAR, DRY_BULB_F, w);
        let v = velocity(velocity_pressure_inwc, density);
        let (lo, hi) = TRANSMITTER_RANGE_INWC;

        SelfTest {
            vapor_pressure,
            humidity_ratio: w,
            density,
            velocity: v,
            flow: actual_flow(v, DUCT_DIAMETER_IN),
            transmitter_pressure: pressure_transfer(LOOP_CURRENT_MA, lo, hi),
        }
    }
}

impl Display for SelfTest {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Calculated flow rate: {} cfm", round_to(self.flow, 2))?;
        write!(f, "{}", self.transmitter_pressure)
    }
}
