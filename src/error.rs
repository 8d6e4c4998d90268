// Tiltwatch - Error Types

use thiserror::Error;

/// Failures reported by the accelerometer and LED-matrix collaborators.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("I2C transfer failed: {0}")]
    #[cfg(target_os = "espidf")]
    Bus(#[from] esp_idf_sys::EspError),

    #[error("shared I2C bus lock poisoned")]
    BusPoisoned,

    #[error("{device} not detected (WHO_AM_I = {found:#04x}, expected {expected:#04x})")]
    NotDetected {
        device: &'static str,
        found: u8,
        expected: u8,
    },

    #[error("{0} is not responding")]
    Unresponsive(&'static str),
}
