// Tiltwatch - LED Matrix Frame Buffer
//
// One bit per LED, row-major. Patterns are drawn into a frame through
// embedded-graphics, and drivers push the finished rows to the panel.

use core::convert::Infallible;

use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;

use crate::config::MATRIX_SIZE;
use crate::events::Pattern;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatrixFrame {
    rows: [u8; MATRIX_SIZE as usize],
}

impl MatrixFrame {
    pub fn blank() -> Self {
        Self::default()
    }

    /// Bit `c` of row `r` is set when LED (r, c) is lit.
    pub fn rows(&self) -> &[u8; MATRIX_SIZE as usize] {
        &self.rows
    }

    pub fn is_lit(&self, row: u32, col: u32) -> bool {
        row < MATRIX_SIZE && col < MATRIX_SIZE && self.rows[row as usize] & (1 << col) != 0
    }

    pub fn is_blank(&self) -> bool {
        self.rows.iter().all(|&r| r == 0)
    }

    /// ASCII rendering, one line per row, `#` for lit LEDs.
    pub fn to_ascii(&self) -> String {
        let mut out = String::with_capacity((MATRIX_SIZE as usize + 1) * MATRIX_SIZE as usize);
        for row in 0..MATRIX_SIZE {
            if row > 0 {
                out.push('\n');
            }
            for col in 0..MATRIX_SIZE {
                out.push(if self.is_lit(row, col) { '#' } else { '.' });
            }
        }
        out
    }
}

impl From<Pattern> for MatrixFrame {
    fn from(pattern: Pattern) -> Self {
        let mut frame = Self::blank();
        // Drawing into the frame cannot fail.
        let _ = pattern.draw(&mut frame);
        frame
    }
}

impl OriginDimensions for MatrixFrame {
    fn size(&self) -> Size {
        Size::new(MATRIX_SIZE, MATRIX_SIZE)
    }
}

impl DrawTarget for MatrixFrame {
    type Color = BinaryColor;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            let (Ok(col), Ok(row)) = (u32::try_from(point.x), u32::try_from(point.y)) else {
                continue;
            };
            if row >= MATRIX_SIZE || col >= MATRIX_SIZE {
                continue;
            }
            let bit = 1u8 << col;
            match color {
                BinaryColor::On => self.rows[row as usize] |= bit,
                BinaryColor::Off => self.rows[row as usize] &= !bit,
            }
        }
        Ok(())
    }
}

impl Pattern {
    /// Light this pattern's LEDs on `target`, leaving the others untouched.
    pub fn draw<D>(&self, target: &mut D) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = BinaryColor>,
    {
        let lit = (0..MATRIX_SIZE).flat_map(|row| {
            (0..MATRIX_SIZE)
                .filter(move |&col| self.is_lit(row, col))
                .map(move |col| Pixel(Point::new(col as i32, row as i32), BinaryColor::On))
        });
        target.draw_iter(lit)
    }
}
