//! The device-I/O seam between the acquisition loop and the DAQ hardware.
//!
//! Reads are blocking from the loop's point of view: a hung device holds the
//! whole loop; no timeout is applied.

pub mod channel;
pub mod emulated;
pub mod error;

pub use channel::*;
pub use emulated::*;
pub use error::*;

use log::trace;

/// A data-acquisition device that produces one scalar per channel read.
#[allow(async_fn_in_trait)]
pub trait Device {
    /// Applies the register writes for `channel`.
    async fn configure(&mut self, channel: &ChannelSpec) -> Result<(), DeviceError>;

    /// Reads the current value of a configured channel.
    async fn read(&mut self, channel: &ChannelSpec) -> Result<f64, DeviceError>;

    /// Configures then reads `channel`, rejecting non-finite values.
    ///
    /// Channels are reconfigured on every read so a device that was power
    /// cycled between cycles comes back in the right mode.
    async fn read_channel(&mut self, channel: &ChannelSpec) -> Result<f64, DeviceError> {
        self.configure(channel).await?;
        let value = self.read(channel).await?;
        trace!("{} => {}", channel, value);

        if value.is_finite() {
            Ok(value)
        } else {
            Err(DeviceError::InvalidReading {
                channel: channel.positive(),
            })
        }
    }
}
