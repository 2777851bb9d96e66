use thiserror::Error;

/// Failures surfaced by a [`Device`](super::Device).
///
/// Only [`DeviceError::Disconnected`] is treated as the expected, recoverable
/// hardware loss; everything else fails the cycle like any other computation
/// failure.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DeviceError {
    #[error("device disconnected")]
    Disconnected,
    #[error("AIN{channel} was read before it was configured")]
    Unconfigured { channel: u8 },
    #[error("AIN{channel} returned a non-finite reading")]
    InvalidReading { channel: u8 },
}

impl DeviceError {
    pub fn is_disconnect(&self) -> bool {
        matches!(self, DeviceError::Disconnected)
    }
}
