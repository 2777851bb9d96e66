use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::core::batch::BatchColumns;
use crate::core::conversion::{BarometricTransducer, CurrentLoop};
use crate::core::daq::{ChannelSpec, ThermocoupleType, GROUND};

/// Voltage range of a current shunt's output, 0.472 to 2.36 V over 4-20 mA.
pub const SHUNT_RANGE_V: f64 = 2.36;

/// Everything the acquisition loop needs, resolved before it starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub acquisition: AcquisitionConfig,
    #[serde(default)]
    pub channels: ChannelMap,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Input column names for batch recalculation.
    #[serde(default)]
    pub batch: BatchColumns,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcquisitionConfig {
    /// Nominal cadence of the loop; also the step of the logical test clock.
    pub tick_interval_secs: f64,
    /// Inside diameter of the exhaust duct.
    pub duct_diameter_in: f64,
    /// Zero correction added to the velocity pressure after its transfer.
    pub velocity_pressure_offset_inwc: f64,
    pub room_dew_point: DewPointSource,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        AcquisitionConfig {
            tick_interval_secs: 5.0,
            duct_diameter_in: 7.87,
            velocity_pressure_offset_inwc: 0.003,
            room_dew_point: DewPointSource::Fixed { dew_point_f: 51.8 },
        }
    }
}

impl AcquisitionConfig {
    /// The loop cadence. Out-of-range values that `Config::validate` rejects
    /// saturate instead of panicking.
    pub fn tick_interval(&self) -> Duration {
        Duration::try_from_secs_f64(self.tick_interval_secs.max(0.0)).unwrap_or(Duration::MAX)
    }
}

/// Where the supply/room dew point comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum DewPointSource {
    /// A value entered by the operator from a separate instrument, in °F.
    Fixed { dew_point_f: f64 },
    /// A dew point transmitter on a current loop.
    Channel(CurrentLoopChannel),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThermocoupleChannel {
    pub positive: u8,
    pub negative: u8,
    pub thermocouple: ThermocoupleType,
    /// Field correction in °F added to the linearised reading.
    #[serde(default)]
    pub offset_f: f64,
}

impl ThermocoupleChannel {
    pub fn spec(&self) -> ChannelSpec {
        ChannelSpec::Thermocouple {
            positive: self.positive,
            negative: self.negative,
            thermocouple: self.thermocouple,
        }
    }
}

/// A 4-20 mA transmitter read through a current shunt.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurrentLoopChannel {
    pub positive: u8,
    #[serde(default = "default_shunt_range")]
    pub range: f64,
    pub calibration: CurrentLoop,
}

fn default_shunt_range() -> f64 {
    SHUNT_RANGE_V
}

impl CurrentLoopChannel {
    pub fn spec(&self) -> ChannelSpec {
        ChannelSpec::CurrentShunt {
            positive: self.positive,
            range: self.range,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BarometerChannel {
    pub positive: u8,
    pub negative: u8,
    pub range: f64,
    #[serde(default)]
    pub transducer: BarometricTransducer,
}

impl BarometerChannel {
    pub fn spec(&self) -> ChannelSpec {
        ChannelSpec::Voltage {
            positive: self.positive,
            negative: self.negative,
            range: self.range,
        }
    }
}

/// Wiring of every sensor on the rig.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelMap {
    pub lab: ThermocoupleChannel,
    pub room: ThermocoupleChannel,
    pub exhaust: ThermocoupleChannel,
    pub exhaust_dew_point: CurrentLoopChannel,
    pub barometer: BarometerChannel,
    pub velocity_pressure: CurrentLoopChannel,
}

impl Default for ChannelMap {
    fn default() -> Self {
        ChannelMap {
            lab: ThermocoupleChannel {
                positive: 0,
                negative: 1,
                thermocouple: ThermocoupleType::K,
                offset_f: 0.0,
            },
            room: ThermocoupleChannel {
                positive: 6,
                negative: 7,
                thermocouple: ThermocoupleType::T,
                offset_f: -3.0,
            },
            exhaust: ThermocoupleChannel {
                positive: 2,
                negative: 3,
                thermocouple: ThermocoupleType::K,
                offset_f: 1.0,
            },
            exhaust_dew_point: CurrentLoopChannel {
                positive: 11,
                range: SHUNT_RANGE_V,
                calibration: CurrentLoop::new(-40.0, 60.0),
            },
            barometer: BarometerChannel {
                positive: 12,
                negative: GROUND,
                range: 5.0,
                transducer: BarometricTransducer::default(),
            },
            velocity_pressure: CurrentLoopChannel {
                positive: 10,
                range: SHUNT_RANGE_V,
                calibration: CurrentLoop::new(0.0, 0.5),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Directory new record files are created in.
    pub data_dir: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            data_dir: PathBuf::from("Data"),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            acquisition: AcquisitionConfig::default(),
            channels: ChannelMap::default(),
            logging: LoggingConfig::default(),
            batch: BatchColumns::default(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config i/o: {0}")]
    Io(#[from] std::io::Error),
    #[error("config parse: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("config serialize: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("invalid `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl Config {
    /// Reads and validates the TOML file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `path`, writing the defaults there first if it does not exist.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            Config::load(path)
        } else {
            let config = Config::default();
            config.save(path)?;
            Ok(config)
        }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let acquisition = &self.acquisition;

        positive("acquisition.tick_interval_secs", acquisition.tick_interval_secs)?;
        if let Err(err) = Duration::try_from_secs_f64(acquisition.tick_interval_secs) {
            return Err(ConfigError::Invalid {
                field: "acquisition.tick_interval_secs",
                reason: err.to_string(),
            });
        }
        positive("acquisition.duct_diameter_in", acquisition.duct_diameter_in)?;

        let mut loops = vec![
            ("channels.exhaust_dew_point", &self.channels.exhaust_dew_point),
            ("channels.velocity_pressure", &self.channels.velocity_pressure),
        ];
        if let DewPointSource::Channel(channel) = &acquisition.room_dew_point {
            loops.push(("acquisition.room_dew_point", channel));
        }

        for (field, channel) in loops {
            if channel.calibration.hi == channel.calibration.lo {
                return Err(ConfigError::Invalid {
                    field,
                    reason: "calibration range is empty".to_string(),
                });
            }
        }

        Ok(())
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: format!("must be positive, got {value}"),
        })
    }
}
