// Tiltwatch - HT16K33 LED Matrix Driver
//
// The 5x5 pattern space occupies the top-left corner of an 8x8 panel sharing
// the accelerometer's I2C bus.

use crate::config::*;
use crate::drivers::frame::MatrixFrame;
use crate::drivers::{IndicatorSink, SharedBus};
use crate::error::DriverError;
use crate::events::Pattern;

const CMD_OSCILLATOR_ON: u8 = 0x21;
const CMD_DISPLAY_ON: u8 = 0x81; // display on, blink off
const CMD_BRIGHTNESS: u8 = 0xE0;
const DISPLAY_RAM: u8 = 0x00;
const PANEL_ROWS: usize = 8;

pub struct Ht16k33 {
    bus: SharedBus,
}

impl Ht16k33 {
    pub fn new(bus: SharedBus) -> Self {
        Self { bus }
    }

    fn command(&self, cmd: u8) -> Result<(), DriverError> {
        let mut bus = self.bus.lock().map_err(|_| DriverError::BusPoisoned)?;
        bus.write(I2C_ADDR_HT16K33, &[cmd], I2C_TIMEOUT_TICKS)?;
        Ok(())
    }

    /// Write a whole frame to display RAM (two bytes per panel row).
    fn write_frame(&self, frame: &MatrixFrame) -> Result<(), DriverError> {
        let mut buf = [0u8; 1 + PANEL_ROWS * 2];
        buf[0] = DISPLAY_RAM;
        for (row, bits) in frame.rows().iter().enumerate() {
            buf[1 + row * 2] = *bits;
        }

        let mut bus = self.bus.lock().map_err(|_| DriverError::BusPoisoned)?;
        bus.write(I2C_ADDR_HT16K33, &buf, I2C_TIMEOUT_TICKS)?;
        Ok(())
    }
}

impl IndicatorSink for Ht16k33 {
    fn probe(&mut self) -> Result<(), DriverError> {
        self.command(CMD_OSCILLATOR_ON)?;
        self.command(CMD_DISPLAY_ON)?;
        self.command(CMD_BRIGHTNESS | MATRIX_BRIGHTNESS)?;
        self.write_frame(&MatrixFrame::blank())?;

        log::info!("HT16K33 initialised (brightness {}/15)", MATRIX_BRIGHTNESS);
        Ok(())
    }

    fn put_pattern(&mut self, pattern: Pattern) -> Result<(), DriverError> {
        self.write_frame(&MatrixFrame::from(pattern))
    }

    fn all_off(&mut self) -> Result<(), DriverError> {
        self.write_frame(&MatrixFrame::blank())
    }
}
