// Tiltwatch - Simulated Collaborators
//
// Stand-ins for the accelerometer and the LED matrix when running on a host:
// a scripted sensor that replays timed segments of readings, and a matrix
// that logs what it would show.

use std::time::{Duration, Instant};

use crate::drivers::frame::MatrixFrame;
use crate::drivers::{AccelSource, IndicatorSink};
use crate::error::DriverError;
use crate::events::{Pattern, Reading};

/// One step of a scripted motion: hold `reading` for `hold`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub reading: Reading,
    pub hold: Duration,
}

impl Segment {
    pub const fn new(reading: Reading, hold: Duration) -> Self {
        Self { reading, hold }
    }
}

/// Replays segments against wall-clock time since the first read. The last
/// segment is held forever.
#[derive(Debug, Clone)]
pub struct ScriptedAccel {
    segments: Vec<Segment>,
    started: Option<Instant>,
    reads: u64,
}

impl ScriptedAccel {
    pub fn new(segments: Vec<Segment>) -> Self {
        Self {
            segments,
            started: None,
            reads: 0,
        }
    }

    /// The same reading forever.
    pub fn constant(reading: Reading) -> Self {
        Self::new(vec![Segment::new(reading, Duration::ZERO)])
    }

    pub fn reads(&self) -> u64 {
        self.reads
    }

    /// Reading scheduled at `elapsed` into the script.
    pub fn reading_at(&self, elapsed: Duration) -> Option<Reading> {
        let mut boundary = Duration::ZERO;
        for segment in &self.segments {
            boundary += segment.hold;
            if elapsed < boundary {
                return Some(segment.reading);
            }
        }
        self.segments.last().map(|s| s.reading)
    }
}

impl AccelSource for ScriptedAccel {
    fn probe(&mut self) -> Result<(), DriverError> {
        if self.segments.is_empty() {
            return Err(DriverError::Unresponsive("scripted accelerometer"));
        }
        log::info!("Scripted accelerometer ready ({} segments)", self.segments.len());
        Ok(())
    }

    fn read_accel(&mut self) -> Result<Reading, DriverError> {
        let started = *self.started.get_or_insert_with(Instant::now);
        let reading = self
            .reading_at(started.elapsed())
            .ok_or(DriverError::Unresponsive("scripted accelerometer"))?;
        self.reads += 1;
        Ok(reading)
    }
}

/// LED matrix that logs each change of the displayed frame.
#[derive(Debug, Default)]
pub struct LogMatrix {
    shown: MatrixFrame,
}

impl LogMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shown(&self) -> &MatrixFrame {
        &self.shown
    }

    fn show(&mut self, frame: MatrixFrame) {
        if frame != self.shown {
            log::debug!("LED matrix:\n{}", frame.to_ascii());
        }
        self.shown = frame;
    }
}

impl IndicatorSink for LogMatrix {
    fn probe(&mut self) -> Result<(), DriverError> {
        self.show(MatrixFrame::blank());
        Ok(())
    }

    fn put_pattern(&mut self, pattern: Pattern) -> Result<(), DriverError> {
        if pattern == Pattern::ALARM {
            log::warn!("LED matrix: ALARM");
        }
        self.show(MatrixFrame::from(pattern));
        Ok(())
    }

    fn all_off(&mut self) -> Result<(), DriverError> {
        self.show(MatrixFrame::blank());
        Ok(())
    }
}
