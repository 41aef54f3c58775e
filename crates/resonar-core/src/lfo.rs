//! Low Frequency Oscillator for modulation stages.
//!
//! Drives vibrato, oscillator FM and the chorus sweep. The phase is kept in
//! cycles as `f64` and can be re-aligned to an absolute frame, so a voice
//! that skips ticks resumes at the phase it would have reached.

use crate::math::{guard_frequency, wrap_unit};
use crate::waveform::Waveform;

/// Low Frequency Oscillator generating values in `[-1, 1]`.
///
/// # Example
///
/// ```rust
/// use resonar_core::{Lfo, Waveform};
///
/// let mut lfo = Lfo::new(44100.0, 2.0);
/// lfo.set_waveform(Waveform::Triangle);
///
/// let value = lfo.next();
/// assert!((-1.0..=1.0).contains(&value));
/// ```
#[derive(Debug, Clone)]
pub struct Lfo {
    /// Current phase in cycles, `[0, 1)`
    phase: f64,
    /// Frequency in Hz
    frequency: f64,
    /// Sample rate in Hz
    sample_rate: f64,
    waveform: Waveform,
}

impl Default for Lfo {
    fn default() -> Self {
        Self::new(44100.0, 1.0)
    }
}

impl Lfo {
    /// Create a new sine LFO with the given sample rate and frequency.
    pub fn new(sample_rate: f64, frequency: f64) -> Self {
        Self {
            phase: 0.0,
            frequency: frequency.max(0.0),
            sample_rate: guard_frequency(sample_rate),
            waveform: Waveform::Sine,
        }
    }

    /// Set frequency in Hz. Negative values stop the LFO.
    pub fn set_frequency(&mut self, frequency: f64) {
        self.frequency = frequency.max(0.0);
    }

    /// Frequency in Hz.
    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    /// Set waveform.
    pub fn set_waveform(&mut self, waveform: Waveform) {
        self.waveform = waveform;
    }

    /// Current waveform.
    pub fn waveform(&self) -> Waveform {
        self.waveform
    }

    /// Set sample rate, keeping the frequency in Hz.
    pub fn set_sample_rate(&mut self, sample_rate: f64) {
        self.sample_rate = guard_frequency(sample_rate);
    }

    /// Sample rate in Hz.
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Reset phase to 0.
    pub fn reset(&mut self) {
        self.phase = 0.0;
    }

    /// Current phase in cycles.
    pub fn phase(&self) -> f64 {
        self.phase
    }

    /// Places the phase where a free-running LFO started at frame 0 would be
    /// at `frame`.
    pub fn align_to_frame(&mut self, frame: u64) {
        self.phase = wrap_unit(frame as f64 * self.frequency / self.sample_rate);
    }

    /// Value at an absolute frame without touching the running phase.
    #[inline]
    pub fn value_at(&self, frame: f64) -> f64 {
        self.waveform.factor(frame, self.frequency, self.sample_rate)
    }

    /// Next LFO value, then advance one sample.
    #[inline]
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> f64 {
        let output = self.waveform.at(self.phase);
        self.phase = wrap_unit(self.phase + self.frequency / self.sample_rate);
        output
    }
}
