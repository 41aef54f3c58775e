//! Delay-line pitch shifter.
//!
//! Two taps sweep through a short delay window at a rate set by the pitch
//! ratio, half a window apart. Each tap fades out as it wraps, and the
//! `sin²`/`cos²` crossfade keeps the summed level constant.

use std::f32::consts::PI;

use resonar_core::{BlockContext, DelayLine, Stage, cents_to_ratio};

/// Length of the sweep window in seconds.
const WINDOW_SECONDS: f32 = 0.04;

/// Pitch shift by a fixed number of cents.
///
/// # Example
///
/// ```rust
/// use resonar_synth::stages::PitchShift;
///
/// let mut shift = PitchShift::new(44100.0);
/// shift.set_cents(1200.0);
/// let y = shift.process(0.5);
/// assert!(y.is_finite());
/// ```
#[derive(Debug, Clone)]
pub struct PitchShift {
    line: DelayLine,
    window: f32,
    /// Sweep position in `[0, 1)`
    phase: f32,
    step: f32,
    cents: f64,
    samplerate: f64,
}

impl PitchShift {
    /// Creates an unshifted stage for `samplerate`.
    pub fn new(samplerate: f64) -> Self {
        let window = (samplerate as f32 * WINDOW_SECONDS).max(4.0);
        Self {
            line: DelayLine::new(window as usize + 4),
            window,
            phase: 0.0,
            step: 0.0,
            cents: 0.0,
            samplerate,
        }
    }

    /// Reallocates the window when the sample rate changed.
    pub fn set_samplerate(&mut self, samplerate: f64) {
        if samplerate != self.samplerate {
            let cents = self.cents;
            *self = Self::new(samplerate);
            self.set_cents(cents);
        }
    }

    /// Sets the shift in cents.
    pub fn set_cents(&mut self, cents: f64) {
        self.cents = cents;
        let ratio = cents_to_ratio(cents) as f32;
        self.step = (1.0 - ratio) / self.window;
    }

    /// Shift in cents.
    pub fn cents(&self) -> f64 {
        self.cents
    }

    /// Shifts one sample.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        self.line.write(input);

        let a = self.phase;
        let b = (self.phase + 0.5).fract();
        let fade = (PI * a).sin();
        let gain_a = fade * fade;
        let gain_b = 1.0 - gain_a;

        let out = self.line.read(a * self.window) * gain_a + self.line.read(b * self.window) * gain_b;

        self.phase += self.step;
        self.phase -= self.phase.floor();
        out
    }
}

impl Stage for PitchShift {
    fn process_block(&mut self, block: &mut [f32], _ctx: &BlockContext) {
        for sample in block.iter_mut() {
            *sample = self.process(*sample);
        }
    }

    fn is_active(&self) -> bool {
        self.cents != 0.0
    }

    fn reset(&mut self) {
        self.line.clear();
        self.phase = 0.0;
    }

    fn latency_frames(&self) -> usize {
        (self.window / 2.0) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zero_crossings(block: &[f32]) -> usize {
        block
            .windows(2)
            .filter(|w| w[0] <= 0.0 && w[1] > 0.0)
            .count()
    }

    #[test]
    fn test_zero_cents_is_inactive() {
        let shift = PitchShift::new(44100.0);
        assert!(!shift.is_active());
    }

    #[test]
    fn test_octave_up_doubles_crossings() {
        let sr = 44100.0;
        let mut shift = PitchShift::new(sr);
        shift.set_cents(1200.0);
        let ctx = BlockContext::new(sr, 0, 220.0);

        let mut block: Vec<f32> = (0..44100)
            .map(|i| (2.0 * std::f64::consts::PI * 220.0 * i as f64 / sr).sin() as f32)
            .collect();
        shift.process_block(&mut block, &ctx);
        let crossings = zero_crossings(&block[4410..]);
        // 220 Hz over 0.9 s is ~198 crossings, one octave up ~396
        assert!((340..=460).contains(&crossings), "crossings: {crossings}");
    }

    #[test]
    fn test_output_bounded() {
        let mut shift = PitchShift::new(48000.0);
        shift.set_cents(-700.0);
        for i in 0..20_000 {
            let x = if i % 100 < 50 { 1.0 } else { -1.0 };
            assert!(shift.process(x).abs() <= 1.0 + 1e-5);
        }
    }

    #[test]
    fn test_samplerate_change_keeps_cents() {
        let mut shift = PitchShift::new(44100.0);
        shift.set_cents(300.0);
        shift.set_samplerate(96000.0);
        assert_eq!(shift.cents(), 300.0);
        assert!(shift.window > 3000.0);
    }
}
