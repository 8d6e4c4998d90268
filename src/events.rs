// Tiltwatch - Pipeline Data Types

// ---------------------------------------------------------------------------
// Sensor Data (raw 3-axis accelerometer reading, ~1 mg/LSB)
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Reading {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Reading {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Tilted when X or Y exceeds `threshold` in magnitude. Z is sampled but
    /// never part of the decision: this is two-axis tilt detection.
    pub fn classify(&self, threshold: u32) -> TiltStatus {
        if self.x.unsigned_abs() > threshold || self.y.unsigned_abs() > threshold {
            TiltStatus::Tilted
        } else {
            TiltStatus::Level
        }
    }
}

// ---------------------------------------------------------------------------
// Tilt Classification
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TiltStatus {
    #[default]
    Level,
    Tilted,
}

impl TiltStatus {
    pub fn is_tilted(self) -> bool {
        self == Self::Tilted
    }
}

// ---------------------------------------------------------------------------
// Indicator Patterns
// ---------------------------------------------------------------------------

/// A pattern code pair for the 5x5 LED matrix.
///
/// `rows` selects rows (bit `r` lights row `r`), `cols` masks columns out
/// (a set bit `c` keeps column `c` dark). The codes are what the evaluator
/// exchanges with the indicator sink; drivers decide how to light them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pattern {
    pub rows: u8,
    pub cols: u8,
}

impl Pattern {
    /// Every LED on: critical tilt latched.
    pub const ALARM: Self = Self::new(31, 0);
    /// Centre LED: the device is tilted right now.
    pub const CURRENT_TILT: Self = Self::new(4, 27);
    /// Top and bottom rows: a tilt episode is open.
    pub const WARNING_EDGES: Self = Self::new(17, 0);
    /// Left and right edges of the middle rows: a tilt episode is open.
    pub const WARNING_SIDES: Self = Self::new(14, 14);

    pub const fn new(rows: u8, cols: u8) -> Self {
        Self { rows, cols }
    }

    pub fn is_lit(&self, row: u32, col: u32) -> bool {
        row < 8 && col < 8 && self.rows & (1 << row) != 0 && self.cols & (1 << col) == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const THRESHOLD: u32 = 500;

    #[test]
    fn boundary_is_level() {
        assert_eq!(Reading::new(500, 0, 0).classify(THRESHOLD), TiltStatus::Level);
        assert_eq!(Reading::new(-500, 500, 0).classify(THRESHOLD), TiltStatus::Level);
        assert_eq!(Reading::new(0, -500, 0).classify(THRESHOLD), TiltStatus::Level);
    }

    #[test]
    fn one_past_boundary_is_tilted() {
        assert_eq!(Reading::new(501, 0, 0).classify(THRESHOLD), TiltStatus::Tilted);
        assert_eq!(Reading::new(-501, 0, 0).classify(THRESHOLD), TiltStatus::Tilted);
        assert_eq!(Reading::new(0, 501, 0).classify(THRESHOLD), TiltStatus::Tilted);
        assert_eq!(Reading::new(0, -501, 0).classify(THRESHOLD), TiltStatus::Tilted);
    }

    #[test]
    fn extreme_values_do_not_overflow() {
        assert_eq!(Reading::new(i32::MIN, 0, 0).classify(THRESHOLD), TiltStatus::Tilted);
        assert_eq!(Reading::new(0, 0, i32::MIN).classify(THRESHOLD), TiltStatus::Level);
    }

    #[test]
    fn alarm_lights_every_led() {
        for row in 0..5 {
            for col in 0..5 {
                assert!(Pattern::ALARM.is_lit(row, col));
            }
        }
    }

    #[test]
    fn current_tilt_is_the_centre_led() {
        let lit: Vec<_> = (0..5)
            .flat_map(|r| (0..5).map(move |c| (r, c)))
            .filter(|&(r, c)| Pattern::CURRENT_TILT.is_lit(r, c))
            .collect();
        assert_eq!(lit, vec![(2, 2)]);
    }

    #[test]
    fn warning_patterns_form_a_border() {
        for row in 0..5 {
            for col in 0..5 {
                let border = row == 0 || row == 4 || col == 0 || col == 4;
                let lit = Pattern::WARNING_EDGES.is_lit(row, col)
                    || Pattern::WARNING_SIDES.is_lit(row, col);
                assert_eq!(lit, border, "row {row} col {col}");
            }
        }
    }

    proptest! {
        #[test]
        fn within_threshold_is_level_for_any_z(
            x in -500i32..=500,
            y in -500i32..=500,
            z in any::<i32>(),
        ) {
            prop_assert_eq!(Reading::new(x, y, z).classify(THRESHOLD), TiltStatus::Level);
        }

        #[test]
        fn x_beyond_threshold_is_tilted_for_any_y_z(
            x in prop_oneof![i32::MIN..=-501, 501..=i32::MAX],
            y in any::<i32>(),
            z in any::<i32>(),
        ) {
            prop_assert_eq!(Reading::new(x, y, z).classify(THRESHOLD), TiltStatus::Tilted);
        }

        #[test]
        fn y_beyond_threshold_is_tilted_for_any_x_z(
            x in any::<i32>(),
            y in prop_oneof![i32::MIN..=-501, 501..=i32::MAX],
            z in any::<i32>(),
        ) {
            prop_assert_eq!(Reading::new(x, y, z).classify(THRESHOLD), TiltStatus::Tilted);
        }
    }
}
