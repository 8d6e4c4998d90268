// Tiltwatch - Hardware & System Configuration
// Target: Seeed Studio Xiao ESP32-C3 (RISC-V), LSM303AGR + HT16K33 on one I2C bus

use std::time::Duration;

// ---------------------------------------------------------------------------
// GPIO Pin Definitions (Xiao ESP32-C3 pinout)
// ---------------------------------------------------------------------------
pub const PIN_I2C_SDA: i32 = 6; // D4 - I2C data line
pub const PIN_I2C_SCL: i32 = 7; // D5 - I2C clock line

// ---------------------------------------------------------------------------
// I2C Bus
// ---------------------------------------------------------------------------
pub const I2C_BAUDRATE_KHZ: u32 = 400;
pub const I2C_ADDR_LSM303_ACCEL: u8 = 0x19;
pub const I2C_ADDR_HT16K33: u8 = 0x70;
pub const I2C_TIMEOUT_TICKS: u32 = 1000; // FreeRTOS ticks

// ---------------------------------------------------------------------------
// LED Matrix
// ---------------------------------------------------------------------------
pub const MATRIX_SIZE: u32 = 5; // 5x5 pattern space, top-left corner of an 8x8 HT16K33 panel
pub const MATRIX_BRIGHTNESS: u8 = 0x0F; // 0..=15

// ---------------------------------------------------------------------------
// Task Stack Sizes (bytes) & Priorities (FreeRTOS, higher runs first)
// ---------------------------------------------------------------------------
pub const STACK_SAMPLER: usize = 4096;
pub const STACK_EVALUATOR: usize = 4096;
pub const PRIORITY_SAMPLER: u8 = 6;
pub const PRIORITY_EVALUATOR: u8 = 5;

// ---------------------------------------------------------------------------
// Timing (milliseconds)
// ---------------------------------------------------------------------------
pub const SAMPLE_INTERVAL_MS: u64 = 9;
pub const EVAL_INTERVAL_MS: u64 = 10;
pub const ESCALATION_DEADLINE_MS: u64 = 5000;

// ---------------------------------------------------------------------------
// Classification & Indicator
// ---------------------------------------------------------------------------
pub const TILT_THRESHOLD: u32 = 500; // |X| or |Y| strictly above this is a tilt
pub const INDICATOR_PHASES: u8 = 3;

/// Tunables of the sampling pipeline, gathered so tests can shrink the
/// periods and deadline without touching the logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorConfig {
    pub sample_interval: Duration,
    pub eval_interval: Duration,
    pub escalation_deadline: Duration,
    pub tilt_threshold: u32,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            sample_interval: Duration::from_millis(SAMPLE_INTERVAL_MS),
            eval_interval: Duration::from_millis(EVAL_INTERVAL_MS),
            escalation_deadline: Duration::from_millis(ESCALATION_DEADLINE_MS),
            tilt_threshold: TILT_THRESHOLD,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_firmware_constants() {
        let config = MonitorConfig::default();
        assert_eq!(config.sample_interval, Duration::from_millis(9));
        assert_eq!(config.eval_interval, Duration::from_millis(10));
        assert_eq!(config.escalation_deadline, Duration::from_secs(5));
        assert_eq!(config.tilt_threshold, 500);
    }
}
