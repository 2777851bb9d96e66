//! The calculation pipeline of one cycle: raw channel values through the
//! transfer functions and the calculators into a [`Measured`] row.
//!
//! Nothing here carries state from one cycle to the next; the output is a
//! function of the readings and the configured calibrations alone.

use thiserror::Error;

use crate::core::airflow::{actual_flow, standard_flow, velocity};
use crate::core::config::{AcquisitionConfig, ChannelMap, DewPointSource};
use crate::core::conversion::{
    BarometricTransducer, CurrentShunt, DewPointTransmitter, Offset, PressureTransmitter, Transfer,
};
use crate::core::heat_gain::HeatGain;
use crate::core::psychro::{humidity_ratio, moist_air_density, relative_humidity, saturation_pressure};
use crate::core::record::Measured;
use crate::core::units::BarometricPressure;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ComputeError {
    #[error("{quantity} is degenerate: {reason}")]
    Degenerate {
        quantity: &'static str,
        reason: String,
    },
    #[error("{quantity} is not finite ({value})")]
    NonFinite { quantity: &'static str, value: f64 },
}

fn finite(quantity: &'static str, value: f64) -> Result<f64, ComputeError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ComputeError::NonFinite { quantity, value })
    }
}

/// Moist-air state of one airstream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Psychrometrics {
    /// Partial pressure of the water vapor present, inHg.
    pub vapor_pressure: f64,
    /// Saturation pressure at the dry bulb, inHg.
    pub saturation_pressure: f64,
    pub humidity_ratio: f64,
    /// lb/ft³
    pub density: f64,
    /// %
    pub relative_humidity: f64,
}

impl Psychrometrics {
    pub fn compute(
        dry_bulb_f: f64,
        dew_point_f: f64,
        barometric: BarometricPressure,
    ) -> Result<Psychrometrics, ComputeError> {
        let vapor_pressure = finite("vapor pressure", saturation_pressure(dew_point_f))?;
        let saturation = finite("saturation pressure", saturation_pressure(dry_bulb_f))?;

        if vapor_pressure >= barometric.inhg {
            return Err(ComputeError::Degenerate {
                quantity: "humidity ratio",
                reason: format!(
                    "vapor pressure {vapor_pressure:.3} inHg at or above barometric {:.3} inHg",
                    barometric.inhg
                ),
            });
        }

        let w = finite("humidity ratio", humidity_ratio(barometric.inhg, vapor_pressure))?;
        let density = finite("density", moist_air_density(barometric.mbar, dry_bulb_f, w))?;
        let rh = finite("relative humidity", relative_humidity(vapor_pressure, saturation))?;

        Ok(Psychrometrics {
            vapor_pressure,
            saturation_pressure: saturation,
            humidity_ratio: w,
            density,
            relative_humidity: rh,
        })
    }
}

/// Flow through a round duct.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DuctFlow {
    /// fpm
    pub velocity: f64,
    /// acfm
    pub actual: f64,
    /// scfm
    pub standard: f64,
}

impl DuctFlow {
    pub fn compute(
        velocity_pressure_inwc: f64,
        density: f64,
        diameter_in: f64,
        barometric_inhg: f64,
        temp_f: f64,
    ) -> Result<DuctFlow, ComputeError> {
        if density <= 0.0 {
            return Err(ComputeError::Degenerate {
                quantity: "velocity",
                reason: format!("air density {density} is not positive"),
            });
        }

        let v = finite("velocity", velocity(velocity_pressure_inwc, density))?;
        let actual = finite("actual flow", actual_flow(v, diameter_in))?;
        let standard = finite(
            "standard flow",
            standard_flow(actual, barometric_inhg, temp_f),
        )?;

        Ok(DuctFlow {
            velocity: v,
            actual,
            standard,
        })
    }
}

/// Channel values of one cycle as read off the device.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawReadings {
    /// Linearised thermocouples, °F before field offsets.
    pub t_lab: f64,
    pub t_room: f64,
    pub t_exh: f64,
    /// Shunt voltage of the room dew point transmitter, when one is wired.
    pub room_dew_point_v: Option<f64>,
    pub exhaust_dew_point_v: f64,
    pub barometer_v: f64,
    pub velocity_pressure_v: f64,
}

/// Physical readings of one cycle, after the transfer functions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Conditions {
    pub t_lab: f64,
    pub t_room: f64,
    pub t_exh: f64,
    pub tdew_room: f64,
    pub tdew_exh: f64,
    pub barometric: BarometricPressure,
    pub velocity_pressure: f64,
}

/// Turns one cycle's raw readings into its measured row, using a resolved
/// configuration.
#[derive(Debug, Clone, Copy)]
pub struct Pipeline<'a> {
    pub acquisition: &'a AcquisitionConfig,
    pub channels: &'a ChannelMap,
}

impl<'a> Pipeline<'a> {
    pub fn new(acquisition: &'a AcquisitionConfig, channels: &'a ChannelMap) -> Pipeline<'a> {
        Pipeline {
            acquisition,
            channels,
        }
    }

    /// Applies offsets and 4-20 mA calibrations.
    pub fn convert(&self, raw: &RawReadings) -> Result<Conditions, ComputeError> {
        let channels = self.channels;

        let tdew_room = match (&self.acquisition.room_dew_point, raw.room_dew_point_v) {
            (DewPointSource::Fixed { dew_point_f }, _) => *dew_point_f,
            (DewPointSource::Channel(channel), Some(volts)) => CurrentShunt
                .then(DewPointTransmitter(channel.calibration))
                .to_physical(volts),
            (DewPointSource::Channel(_), None) => {
                return Err(ComputeError::Degenerate {
                    quantity: "room dew point",
                    reason: "transmitter configured but not read".to_string(),
                })
            }
        };

        let tdew_exh = CurrentShunt
            .then(DewPointTransmitter(channels.exhaust_dew_point.calibration))
            .to_physical(raw.exhaust_dew_point_v);

        let barometer: BarometricTransducer = channels.barometer.transducer;
        let barometric = BarometricPressure::from_mbar(barometer.to_physical(raw.barometer_v));

        let velocity_pressure = CurrentShunt
            .then(PressureTransmitter(channels.velocity_pressure.calibration))
            .then(Offset(self.acquisition.velocity_pressure_offset_inwc))
            .to_physical(raw.velocity_pressure_v);

        Ok(Conditions {
            t_lab: Offset(channels.lab.offset_f).to_physical(raw.t_lab),
            t_room: Offset(channels.room.offset_f).to_physical(raw.t_room),
            t_exh: Offset(channels.exhaust.offset_f).to_physical(raw.t_exh),
            tdew_room,
            tdew_exh,
            barometric,
            velocity_pressure,
        })
    }

    /// Runs the calculators in dependency order.
    pub fn derive(&self, c: &Conditions) -> Result<Measured, ComputeError> {
        let room = Psychrometrics::compute(c.t_room, c.tdew_room, c.barometric)?;
        let exhaust = Psychrometrics::compute(c.t_exh, c.tdew_exh, c.barometric)?;

        let flow = DuctFlow::compute(
            c.velocity_pressure,
            exhaust.density,
            self.acquisition.duct_diameter_in,
            c.barometric.inhg,
            c.t_exh,
        )?;

        let gain = HeatGain::compute(
            flow.standard,
            (c.t_room, c.t_exh),
            (room.humidity_ratio, exhaust.humidity_ratio),
        );

        Ok(Measured {
            t_lab: c.t_lab,
            t_room: c.t_room,
            t_exh: c.t_exh,
            tdew_room: c.tdew_room,
            tdew_exh: c.tdew_exh,
            pbar_inhg: c.barometric.inhg,
            pdiff_exh: c.velocity_pressure,
            pp_water_room: room.vapor_pressure,
            pp_sat_room: room.saturation_pressure,
            pp_water_exh: exhaust.vapor_pressure,
            pp_sat_exh: exhaust.saturation_pressure,
            w_room: room.humidity_ratio,
            w_exh: exhaust.humidity_ratio,
            rho_room: room.density,
            rho_exh: exhaust.density,
            rh_room: room.relative_humidity,
            rh_exh: exhaust.relative_humidity,
            v_exh: flow.velocity,
            q_acfm: flow.actual,
            q_scfm: flow.standard,
            q_sensible: gain.sensible,
            q_latent: gain.latent,
            q_total: gain.total,
        })
    }

    pub fn compute(&self, raw: &RawReadings) -> Result<Measured, ComputeError> {
        let conditions = self.convert(raw)?;
        self.derive(&conditions)
    }
}
