//! Circular delay line with fractional reads.
//!
//! The pitch shifter and chorus stages read this line at continuously moving
//! positions, so reads interpolate between stored frames.

#[cfg(not(feature = "std"))]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std as alloc;

use alloc::vec;
use alloc::vec::Vec;

/// Interpolation used for fractional reads.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Interpolation {
    /// Truncate to the nearest older frame
    None,
    /// Two-point linear
    #[default]
    Linear,
    /// Four-point cubic Lagrange
    Cubic,
}

/// Heap-allocated delay line. Allocates once at construction.
///
/// # Example
///
/// ```rust
/// use resonar_core::DelayLine;
///
/// let mut line = DelayLine::new(64);
/// line.write(1.0);
/// assert_eq!(line.read(0.0), 1.0);
/// ```
#[derive(Debug, Clone)]
pub struct DelayLine {
    frames: Vec<f32>,
    write_pos: usize,
    interpolation: Interpolation,
}

impl DelayLine {
    /// Creates a line able to delay up to `capacity - 1` frames.
    ///
    /// A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        Self {
            frames: vec![0.0; capacity.max(1)],
            write_pos: 0,
            interpolation: Interpolation::Linear,
        }
    }

    /// Creates a line holding `max_seconds` at `sample_rate`.
    pub fn from_time(sample_rate: f32, max_seconds: f32) -> Self {
        Self::new((sample_rate * max_seconds).max(0.0) as usize + 4)
    }

    /// Sets the read interpolation.
    pub fn set_interpolation(&mut self, interpolation: Interpolation) {
        self.interpolation = interpolation;
    }

    /// Capacity in frames.
    pub fn capacity(&self) -> usize {
        self.frames.len()
    }

    /// Frame written `back` writes ago (`0` is the most recent).
    #[inline]
    fn tap(&self, back: usize) -> f32 {
        let len = self.frames.len();
        self.frames[(self.write_pos + len - 1 - back % len) % len]
    }

    /// Reads the frame `delay` frames behind the most recent write.
    ///
    /// Delays outside `[0, capacity - 1]` are clamped.
    #[inline]
    pub fn read(&self, delay: f32) -> f32 {
        let max = (self.frames.len() - 1) as f32;
        let delay = if delay.is_nan() { 0.0 } else { delay.clamp(0.0, max) };
        let whole = delay as usize;
        let frac = delay - whole as f32;

        match self.interpolation {
            Interpolation::None => self.tap(whole),
            Interpolation::Linear => {
                let a = self.tap(whole);
                let b = self.tap((whole + 1).min(self.frames.len() - 1));
                a + (b - a) * frac
            }
            Interpolation::Cubic => {
                let last = self.frames.len() - 1;
                let y0 = self.tap(whole.saturating_sub(1));
                let y1 = self.tap(whole);
                let y2 = self.tap((whole + 1).min(last));
                let y3 = self.tap((whole + 2).min(last));

                let c0 = y3 - y2 - y0 + y1;
                let c1 = y0 - y1 - c0;
                let c2 = y2 - y0;
                ((c0 * frac + c1) * frac + c2) * frac + y1
            }
        }
    }

    /// Appends one frame.
    #[inline]
    pub fn write(&mut self, sample: f32) {
        self.frames[self.write_pos] = sample;
        self.write_pos = (self.write_pos + 1) % self.frames.len();
    }

    /// Zeroes the history.
    pub fn clear(&mut self) {
        self.frames.fill(0.0);
        self.write_pos = 0;
    }
}
