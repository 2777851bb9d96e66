use serde::{Deserialize, Serialize};

/// Current at the bottom of a 4-20 mA loop.
pub const LOOP_FLOOR_MA: f64 = 4.0;

/// Span of a 4-20 mA loop.
pub const LOOP_SPAN_MA: f64 = 16.0;

/// mA per V across the current-shunt conditioner, I = V / (20 × 5.9 Ω).
pub const SHUNT_GAIN_MA_PER_V: f64 = 8.4746;

/// Maps a raw transducer signal into the physical quantity it represents.
///
/// Implementations are immutable once configured; a reading never mutates
/// its mapping.
pub trait Transfer {
    fn to_physical(&self, raw: f64) -> f64;

    /// Feeds the output of this mapping into `next`.
    fn then<N>(self, next: N) -> Chained<Self, N>
    where
        Self: Sized,
        N: Transfer,
    {
        Chained(self, next)
    }
}

// Pass-through (raw value already physical)
impl Transfer for () {
    fn to_physical(&self, raw: f64) -> f64 {
        raw
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Chained<A, B>(A, B);

impl<A: Transfer, B: Transfer> Transfer for Chained<A, B> {
    fn to_physical(&self, raw: f64) -> f64 {
        self.1.to_physical(self.0.to_physical(raw))
    }
}

/// Pressure-style 4-20 mA transfer: `slope × raw − 4 × slope`.
///
/// `lo` enters only through the slope, so the output is zero at 4 mA
/// whatever the low end of the range.
pub fn pressure_transfer(current_ma: f64, lo: f64, hi: f64) -> f64 {
    let slope = (hi - lo) / LOOP_SPAN_MA;
    let intercept = LOOP_FLOOR_MA * slope;
    slope * current_ma - intercept
}

/// Dew-point-style 4-20 mA transfer, in °F from a range given in °C.
///
/// The intercept subtracts `lo` before scaling to °F, so 4 mA maps onto `lo`.
pub fn dew_point_transfer(current_ma: f64, lo_c: f64, hi_c: f64) -> f64 {
    let slope = (hi_c - lo_c) / LOOP_SPAN_MA;
    let intercept = LOOP_FLOOR_MA * slope - lo_c;
    let temp_c = slope * current_ma - intercept;
    temp_c * 1.8 + 32.0
}

/// Loop current in mA from the voltage across a current shunt.
pub fn current_from_shunt(voltage: f64) -> f64 {
    voltage * SHUNT_GAIN_MA_PER_V
}

/// Calibrated range of a 4-20 mA transmitter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurrentLoop {
    pub lo: f64,
    pub hi: f64,
}

impl CurrentLoop {
    pub const fn new(lo: f64, hi: f64) -> CurrentLoop {
        CurrentLoop { lo, hi }
    }

    pub fn slope(&self) -> f64 {
        (self.hi - self.lo) / LOOP_SPAN_MA
    }
}

/// Differential pressure transmitter (inWc), pressure-style intercept.
#[derive(Debug, Clone, Copy)]
pub struct PressureTransmitter(pub CurrentLoop);

impl Transfer for PressureTransmitter {
    #[inline]
    fn to_physical(&self, raw: f64) -> f64 {
        pressure_transfer(raw, self.0.lo, self.0.hi)
    }
}

/// Dew point transmitter, range in °C and output in °F.
#[derive(Debug, Clone, Copy)]
pub struct DewPointTransmitter(pub CurrentLoop);

impl Transfer for DewPointTransmitter {
    #[inline]
    fn to_physical(&self, raw: f64) -> f64 {
        dew_point_transfer(raw, self.0.lo, self.0.hi)
    }
}

/// Shunt conditioner turning a loop current into a voltage; maps it back to mA.
#[derive(Debug, Clone, Copy, Default)]
pub struct CurrentShunt;

impl Transfer for CurrentShunt {
    #[inline]
    fn to_physical(&self, raw: f64) -> f64 {
        current_from_shunt(raw)
    }
}

/// Voltage-output barometric transducer, mbar = slope × V + intercept.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BarometricTransducer {
    pub slope: f64,
    pub intercept: f64,
}

impl Default for BarometricTransducer {
    fn default() -> Self {
        BarometricTransducer {
            slope: 80.0,
            intercept: 798.95,
        }
    }
}

impl Transfer for BarometricTransducer {
    #[inline]
    fn to_physical(&self, raw: f64) -> f64 {
        self.slope * raw + self.intercept
    }
}

/// Additive field correction.
#[derive(Debug, Clone, Copy)]
pub struct Offset(pub f64);

impl Transfer for Offset {
    #[inline]
    fn to_physical(&self, raw: f64) -> f64 {
        raw + self.0
    }
}
