//! Airstream heat gain in Btu/h at standard air.

/// 60 min/h × 0.075 lb/ft³ × 0.24 Btu/(lb·°F)
pub const SENSIBLE_FACTOR: f64 = 1.08;

/// 60 min/h × 0.075 lb/ft³ × 1076 Btu/lb
pub const LATENT_FACTOR: f64 = 4840.0;

/// Gain from a temperature rise between supply and return.
pub fn sensible_heat_gain(standard_flow: f64, temp_supply: f64, temp_return: f64) -> f64 {
    SENSIBLE_FACTOR * standard_flow * (temp_return - temp_supply)
}

/// Gain from a humidity ratio rise between supply and return.
pub fn latent_heat_gain(standard_flow: f64, humidity_supply: f64, humidity_return: f64) -> f64 {
    LATENT_FACTOR * standard_flow * (humidity_return - humidity_supply)
}

pub fn total_heat_gain(sensible: f64, latent: f64) -> f64 {
    sensible + latent
}

/// The three gains for one airstream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeatGain {
    pub sensible: f64,
    pub latent: f64,
    pub total: f64,
}

impl HeatGain {
    pub fn compute(
        standard_flow: f64,
        (temp_supply, temp_return): (f64, f64),
        (humidity_supply, humidity_return): (f64, f64),
    ) -> HeatGain {
        let sensible = sensible_heat_gain(standard_flow, temp_supply, temp_return);
        let latent = latent_heat_gain(standard_flow, humidity_supply, humidity_return);

        HeatGain {
            sensible,
            latent,
            total: total_heat_gain(sensible, latent),
        }
    }
}
