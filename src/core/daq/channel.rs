use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Negative terminal value selecting a single-ended (ground referenced) input.
pub const GROUND: u8 = 199;

/// Thermocouple types the extended-feature firmware linearises on-device.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ThermocoupleType {
    J,
    K,
    R,
    T,
}

impl ThermocoupleType {
    /// The `AIN#_EF_INDEX` value selecting this type.
    pub const fn ef_index(&self) -> u32 {
        match self {
            ThermocoupleType::J => 21,
            ThermocoupleType::K => 22,
            ThermocoupleType::R => 23,
            ThermocoupleType::T => 24,
        }
    }
}

/// Unit code for `AIN#_EF_CONFIG_A`; thermocouples report in °F.
const EF_UNITS_FAHRENHEIT: f64 = 2.0;

/// Physical wiring of one acquisition channel.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChannelSpec {
    /// Linearised thermocouple, reads in °F.
    Thermocouple {
        positive: u8,
        negative: u8,
        thermocouple: ThermocoupleType,
    },
    /// Plain analog input, reads in V.
    Voltage { positive: u8, negative: u8, range: f64 },
    /// 4-20 mA loop through a current shunt, reads the shunt voltage.
    CurrentShunt { positive: u8, range: f64 },
}

/// One named register write making up a channel configuration.
pub type ConfigFrame = (String, f64);

impl ChannelSpec {
    pub fn positive(&self) -> u8 {
        match *self {
            ChannelSpec::Thermocouple { positive, .. }
            | ChannelSpec::Voltage { positive, .. }
            | ChannelSpec::CurrentShunt { positive, .. } => positive,
        }
    }

    /// Register holding the reading for this channel.
    pub fn register(&self) -> String {
        match self {
            ChannelSpec::Thermocouple { positive, .. } => format!("AIN{positive}_EF_READ_A"),
            ChannelSpec::Voltage { positive, .. } | ChannelSpec::CurrentShunt { positive, .. } => {
                format!("AIN{positive}")
            }
        }
    }

    /// Register writes that put the channel into this mode.
    pub fn frames(&self) -> Vec<ConfigFrame> {
        match *self {
            ChannelSpec::Thermocouple {
                positive: p,
                negative,
                thermocouple,
            } => vec![
                (format!("AIN{p}_EF_INDEX"), thermocouple.ef_index() as f64),
                (format!("AIN{p}_EF_CONFIG_A"), EF_UNITS_FAHRENHEIT),
                (format!("AIN{p}_NEGATIVE_CH"), negative as f64),
            ],
            ChannelSpec::Voltage {
                positive: p,
                negative,
                range,
            } => analog_frames(p, negative, range),
            ChannelSpec::CurrentShunt { positive: p, range } => analog_frames(p, GROUND, range),
        }
    }
}

fn analog_frames(p: u8, negative: u8, range: f64) -> Vec<ConfigFrame> {
    // Default resolution index and automatic settling.
    vec![
        (format!("AIN{p}_NEGATIVE_CH"), negative as f64),
        (format!("AIN{p}_RANGE"), range),
        (format!("AIN{p}_RESOLUTION_INDEX"), 0.0),
        (format!("AIN{p}_SETTLING_US"), 0.0),
    ]
}

impl Display for ChannelSpec {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ChannelSpec::Thermocouple {
                positive,
                negative,
                thermocouple,
            } => write!(f, "TC[{thermocouple:?}] AIN{positive}/{negative}"),
            ChannelSpec::Voltage {
                positive,
                negative,
                range,
            } => write!(f, "AIN{positive}/{negative} ±{range}V"),
            ChannelSpec::CurrentShunt { positive, range } => {
                write!(f, "AIN{positive} shunt ±{range}V")
            }
        }
    }
}
