// Tiltwatch - LSM303AGR Accelerometer Driver
//
// Register-level driver over the shared I2C bus, accelerometer half only.
// High-resolution mode at +/-2 g: 12-bit samples, ~1 mg/LSB.

use crate::config::*;
use crate::drivers::{AccelSource, SharedBus};
use crate::error::DriverError;
use crate::events::Reading;

// LSM303AGR accelerometer register addresses
const REG_WHO_AM_I_A: u8 = 0x0F;
const REG_CTRL_REG1_A: u8 = 0x20;
const REG_CTRL_REG4_A: u8 = 0x23;
const REG_OUT_X_L_A: u8 = 0x28; // Start of 6-byte XYZ burst
const AUTO_INCREMENT: u8 = 0x80;
const WHO_AM_I_EXPECTED: u8 = 0x33;

// CTRL_REG1_A: ODR 100 Hz, normal power, X/Y/Z enabled
const CTRL1_100HZ_XYZ: u8 = 0x57;
// CTRL_REG4_A: block data update, +/-2 g, high resolution
const CTRL4_BDU_2G_HR: u8 = 0x88;

pub struct Lsm303 {
    bus: SharedBus,
}

impl Lsm303 {
    pub fn new(bus: SharedBus) -> Self {
        Self { bus }
    }

    fn who_am_i(&self) -> Result<u8, DriverError> {
        let mut bus = self.bus.lock().map_err(|_| DriverError::BusPoisoned)?;
        let mut buf = [0u8; 1];
        bus.write_read(I2C_ADDR_LSM303_ACCEL, &[REG_WHO_AM_I_A], &mut buf, I2C_TIMEOUT_TICKS)?;
        Ok(buf[0])
    }

    fn init(&self) -> Result<(), DriverError> {
        let mut bus = self.bus.lock().map_err(|_| DriverError::BusPoisoned)?;

        bus.write(I2C_ADDR_LSM303_ACCEL, &[REG_CTRL_REG1_A, CTRL1_100HZ_XYZ], I2C_TIMEOUT_TICKS)?;
        bus.write(I2C_ADDR_LSM303_ACCEL, &[REG_CTRL_REG4_A, CTRL4_BDU_2G_HR], I2C_TIMEOUT_TICKS)?;

        log::info!("LSM303AGR initialised (100Hz, ±2g, high resolution)");
        Ok(())
    }
}

impl AccelSource for Lsm303 {
    fn probe(&mut self) -> Result<(), DriverError> {
        let found = self.who_am_i()?;
        if found != WHO_AM_I_EXPECTED {
            return Err(DriverError::NotDetected {
                device: "LSM303AGR",
                found,
                expected: WHO_AM_I_EXPECTED,
            });
        }
        self.init()
    }

    fn read_accel(&mut self) -> Result<Reading, DriverError> {
        let mut bus = self.bus.lock().map_err(|_| DriverError::BusPoisoned)?;
        let mut raw = [0u8; 6];
        bus.write_read(
            I2C_ADDR_LSM303_ACCEL,
            &[REG_OUT_X_L_A | AUTO_INCREMENT],
            &mut raw,
            I2C_TIMEOUT_TICKS,
        )?;

        // Left-justified 12-bit two's complement, little endian.
        Ok(Reading {
            x: (i16::from_le_bytes([raw[0], raw[1]]) >> 4) as i32,
            y: (i16::from_le_bytes([raw[2], raw[3]]) >> 4) as i32,
            z: (i16::from_le_bytes([raw[4], raw[5]]) >> 4) as i32,
        })
    }
}
