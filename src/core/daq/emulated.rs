use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::debug;
use tokio::time::Instant;

use super::{ChannelSpec, ConfigFrame, Device, DeviceError};
use crate::core::config::{ChannelMap, DewPointSource};
use crate::core::conversion::SHUNT_GAIN_MA_PER_V;

/// The value an emulated channel produces, as a function of time since the
/// device was created.
#[derive(Clone, Copy)]
pub struct EmulatedValue {
    base: f64,
    function: fn(f64, Duration) -> f64,
}

impl EmulatedValue {
    pub fn constant(base: f64) -> EmulatedValue {
        EmulatedValue {
            base,
            function: |a, _| a,
        }
    }

    pub fn varying(base: f64, function: fn(f64, Duration) -> f64) -> EmulatedValue {
        EmulatedValue { base, function }
    }

    fn floating() -> EmulatedValue {
        EmulatedValue::constant(0.0)
    }

    fn at(&self, elapsed: Duration) -> f64 {
        (self.function)(self.base, elapsed)
    }
}

/// Shared handle on the emulated cable, used to pull and reinsert it while
/// the device is owned by the acquisition loop.
#[derive(Clone, Debug)]
pub struct Plug(Arc<AtomicBool>);

impl Plug {
    pub fn disconnect(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    pub fn reconnect(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_connected(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A device without hardware behind it, for demos and tests.
///
/// Unassigned channels float at zero. Reads of channels that have not been
/// configured since the last disconnect are rejected, as the hardware loses
/// its channel configuration when it drops off.
pub struct Emulated {
    channels: HashMap<u8, EmulatedValue>,
    configured: HashMap<u8, Vec<ConfigFrame>>,
    started: Instant,
    plug: Plug,
}

impl Default for Emulated {
    fn default() -> Self {
        Emulated::new()
    }
}

impl Emulated {
    pub fn new() -> Emulated {
        Emulated {
            channels: HashMap::new(),
            configured: HashMap::new(),
            started: Instant::now(),
            plug: Plug(Arc::new(AtomicBool::new(true))),
        }
    }

    /// Assigns the value produced on positive terminal `channel`.
    pub fn with(mut self, channel: u8, value: EmulatedValue) -> Emulated {
        self.channels.insert(channel, value);
        self
    }

    pub fn plug(&self) -> Plug {
        self.plug.clone()
    }

    /// The configuration last written to `channel`, if any.
    pub fn configuration(&self, channel: u8) -> Option<&[ConfigFrame]> {
        self.configured.get(&channel).map(Vec::as_slice)
    }

    /// A bench rig wired per `channels`, holding a warm, slightly dry exhaust
    /// against a 72 °F room at 998.95 mbar.
    pub fn field_rig(channels: &ChannelMap, room_dew_point: &DewPointSource) -> Emulated {
        let shunt_volts = |milliamps: f64| milliamps / SHUNT_GAIN_MA_PER_V;

        let rig = Emulated::new()
            .with(channels.lab.positive, EmulatedValue::constant(70.0))
            .with(channels.room.positive, EmulatedValue::constant(75.0))
            .with(channels.exhaust.positive, EmulatedValue::constant(84.0))
            .with(
                channels.exhaust_dew_point.positive,
                EmulatedValue::constant(shunt_volts(12.0)),
            )
            .with(channels.barometer.positive, EmulatedValue::constant(2.5))
            .with(channels.velocity_pressure.positive, EmulatedValue::constant(1.0));

        match room_dew_point {
            DewPointSource::Fixed { .. } => rig,
            DewPointSource::Channel(channel) => {
                rig.with(channel.positive, EmulatedValue::constant(shunt_volts(10.0)))
            }
        }
    }

    fn ensure_connected(&mut self) -> Result<(), DeviceError> {
        if self.plug.is_connected() {
            Ok(())
        } else {
            if !self.configured.is_empty() {
                debug!("Emulated device dropped; clearing channel configuration");
                self.configured.clear();
            }
            Err(DeviceError::Disconnected)
        }
    }
}

impl Device for Emulated {
    async fn configure(&mut self, channel: &ChannelSpec) -> Result<(), DeviceError> {
        self.ensure_connected()?;
        self.configured.insert(channel.positive(), channel.frames());
        Ok(())
    }

    async fn read(&mut self, channel: &ChannelSpec) -> Result<f64, DeviceError> {
        self.ensure_connected()?;

        let positive = channel.positive();
        if !self.configured.contains_key(&positive) {
            return Err(DeviceError::Unconfigured { channel: positive });
        }

        let value = self
            .channels
            .get(&positive)
            .copied()
            .unwrap_or_else(EmulatedValue::floating);

        Ok(value.at(self.started.elapsed()))
    }
}
