// Tiltwatch - Collaborator Drivers
//
// The pipeline talks to hardware through two traits. Firmware builds back
// them with register-level drivers on the shared I2C bus; host builds use the
// simulated sources in `sim`.

pub mod frame;
pub mod sim;

#[cfg(target_os = "espidf")]
pub mod ht16k33;
#[cfg(target_os = "espidf")]
pub mod lsm303;

use crate::error::DriverError;
use crate::events::{Pattern, Reading};

/// Thread-safe handle to a shared I2C bus.
#[cfg(target_os = "espidf")]
pub type SharedBus = &'static std::sync::Mutex<esp_idf_hal::i2c::I2cDriver<'static>>;

/// 3-axis accelerometer.
pub trait AccelSource: Send {
    /// One-time startup check; an error here is fatal.
    fn probe(&mut self) -> Result<(), DriverError>;

    /// Read one (X, Y, Z) sample.
    fn read_accel(&mut self) -> Result<Reading, DriverError>;
}

/// LED matrix that shows one pattern at a time.
pub trait IndicatorSink: Send {
    /// One-time startup check; an error here is fatal.
    fn probe(&mut self) -> Result<(), DriverError>;

    fn put_pattern(&mut self, pattern: Pattern) -> Result<(), DriverError>;

    fn all_off(&mut self) -> Result<(), DriverError>;
}
