//! Second-order IIR section used by the low-pass, amplifier and noise stages.
//!
//! Coefficients follow the RBJ Audio EQ Cookbook. Design frequencies are
//! clamped below Nyquist and Q is floored so port values can never produce
//! an unstable section.

use core::f32::consts::PI;
use libm::{cosf, powf, sinf};

/// Highest design frequency as a fraction of the sample rate.
const MAX_NORMALIZED_FREQUENCY: f32 = 0.49;
/// Lowest accepted Q.
const MIN_Q: f32 = 0.05;

/// Normalized biquad coefficients (`a0 == 1`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coefficients {
    /// Feedforward
    pub b0: f32,
    /// Feedforward
    pub b1: f32,
    /// Feedforward
    pub b2: f32,
    /// Feedback
    pub a1: f32,
    /// Feedback
    pub a2: f32,
}

impl Coefficients {
    /// Passthrough: `y[n] = x[n]`.
    pub const IDENTITY: Coefficients = Coefficients {
        b0: 1.0,
        b1: 0.0,
        b2: 0.0,
        a1: 0.0,
        a2: 0.0,
    };

    fn normalized(b0: f32, b1: f32, b2: f32, a0: f32, a1: f32, a2: f32) -> Self {
        let a0_inv = 1.0 / a0;
        Self {
            b0: b0 * a0_inv,
            b1: b1 * a0_inv,
            b2: b2 * a0_inv,
            a1: a1 * a0_inv,
            a2: a2 * a0_inv,
        }
    }

    /// Low-pass at `frequency` Hz with resonance `q`.
    pub fn lowpass(frequency: f32, q: f32, sample_rate: f32) -> Self {
        let (cos_omega, alpha) = omega_terms(frequency, q, sample_rate);

        let b1 = 1.0 - cos_omega;
        Self::normalized(
            b1 / 2.0,
            b1,
            b1 / 2.0,
            1.0 + alpha,
            -2.0 * cos_omega,
            1.0 - alpha,
        )
    }

    /// Band-pass around `frequency` Hz with 0 dB peak gain.
    pub fn bandpass(frequency: f32, q: f32, sample_rate: f32) -> Self {
        let (cos_omega, alpha) = omega_terms(frequency, q, sample_rate);

        Self::normalized(
            alpha,
            0.0,
            -alpha,
            1.0 + alpha,
            -2.0 * cos_omega,
            1.0 - alpha,
        )
    }

    /// Peaking bell at `frequency` Hz, `gain_db` boost or cut.
    pub fn peaking(frequency: f32, q: f32, gain_db: f32, sample_rate: f32) -> Self {
        let a = powf(10.0, gain_db / 40.0);
        let (cos_omega, alpha) = omega_terms(frequency, q, sample_rate);

        Self::normalized(
            1.0 + alpha * a,
            -2.0 * cos_omega,
            1.0 - alpha * a,
            1.0 + alpha / a,
            -2.0 * cos_omega,
            1.0 - alpha / a,
        )
    }
}

impl Default for Coefficients {
    fn default() -> Self {
        Self::IDENTITY
    }
}

fn omega_terms(frequency: f32, q: f32, sample_rate: f32) -> (f32, f32) {
    let sample_rate = sample_rate.max(1.0);
    let frequency = frequency.clamp(1.0, sample_rate * MAX_NORMALIZED_FREQUENCY);
    let omega = 2.0 * PI * frequency / sample_rate;
    (cosf(omega), sinf(omega) / (2.0 * q.max(MIN_Q)))
}

/// Direct Form I biquad section.
///
/// ```text
/// y[n] = b0*x[n] + b1*x[n-1] + b2*x[n-2] - a1*y[n-1] - a2*y[n-2]
/// ```
///
/// # Example
///
/// ```rust
/// use resonar_core::{Biquad, Coefficients};
///
/// let mut lp = Biquad::new();
/// lp.set_coefficients(Coefficients::lowpass(1000.0, 0.707, 44100.0));
/// let y = lp.process(1.0);
/// assert!(y.is_finite());
/// ```
#[derive(Debug, Clone, Default)]
pub struct Biquad {
    coefficients: Coefficients,
    x1: f32,
    x2: f32,
    y1: f32,
    y2: f32,
}

impl Biquad {
    /// Passthrough section with cleared state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the coefficients, keeping the delay state.
    pub fn set_coefficients(&mut self, coefficients: Coefficients) {
        self.coefficients = coefficients;
    }

    /// Current coefficients.
    pub fn coefficients(&self) -> Coefficients {
        self.coefficients
    }

    /// Processes one sample.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let c = &self.coefficients;
        let output = c.b0 * input + c.b1 * self.x1 + c.b2 * self.x2
            - c.a1 * self.y1
            - c.a2 * self.y2;

        self.x2 = self.x1;
        self.x1 = input;
        self.y2 = self.y1;
        // flush denormals so a decaying tail does not stall the callback
        self.y1 = if output.abs() < 1e-20 { 0.0 } else { output };

        self.y1
    }

    /// Processes a block in place.
    pub fn process_block(&mut self, block: &mut [f32]) {
        for sample in block.iter_mut() {
            *sample = self.process(*sample);
        }
    }

    /// Clears the delay state.
    pub fn clear(&mut self) {
        self.x1 = 0.0;
        self.x2 = 0.0;
        self.y1 = 0.0;
        self.y2 = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settle(biquad: &mut Biquad, input: f32, n: usize) -> f32 {
        let mut out = 0.0;
        for _ in 0..n {
            out = biquad.process(input);
        }
        out
    }

    #[test]
    fn test_biquad_passthrough() {
        let mut biquad = Biquad::new();
        for i in 0..10 {
            let input = i as f32 * 0.1;
            assert!((biquad.process(input) - input).abs() < 1e-6);
        }
    }

    #[test]
    fn test_biquad_clear() {
        let mut biquad = Biquad::new();
        biquad.set_coefficients(Coefficients::lowpass(500.0, 0.707, 44100.0));
        settle(&mut biquad, 1.0, 10);
        biquad.clear();
        assert_eq!(biquad.x1, 0.0);
        assert_eq!(biquad.y2, 0.0);
    }

    #[test]
    fn test_lowpass_passes_dc() {
        let mut biquad = Biquad::new();
        biquad.set_coefficients(Coefficients::lowpass(1000.0, 0.707, 44100.0));
        let out = settle(&mut biquad, 1.0, 2000);
        assert!((out - 1.0).abs() < 0.01, "DC through low-pass: {out}");
    }

    #[test]
    fn test_lowpass_attenuates_nyquist() {
        let mut biquad = Biquad::new();
        biquad.set_coefficients(Coefficients::lowpass(500.0, 0.707, 44100.0));
        let mut peak = 0.0_f32;
        for i in 0..4000 {
            let x = if i % 2 == 0 { 1.0 } else { -1.0 };
            let y = biquad.process(x);
            if i > 2000 {
                peak = peak.max(y.abs());
            }
        }
        assert!(peak < 0.01, "Nyquist leaked through: {peak}");
    }

    #[test]
    fn test_out_of_range_design_stays_finite() {
        let c = Coefficients::lowpass(1.0e6, 0.0, 44100.0);
        for v in [c.b0, c.b1, c.b2, c.a1, c.a2] {
            assert!(v.is_finite());
        }
    }

    #[test]
    fn test_bandpass_blocks_dc() {
        let mut biquad = Biquad::new();
        biquad.set_coefficients(Coefficients::bandpass(1000.0, 1.0, 44100.0));
        let out = settle(&mut biquad, 1.0, 4000);
        assert!(out.abs() < 0.01, "DC through band-pass: {out}");
    }

    #[test]
    fn test_peaking_unity_at_zero_gain() {
        let mut biquad = Biquad::new();
        biquad.set_coefficients(Coefficients::peaking(1000.0, 1.0, 0.0, 44100.0));
        let out = settle(&mut biquad, 1.0, 1000);
        assert!((out - 1.0).abs() < 0.01, "DC should pass at 0dB gain, got {}", out);
    }

    #[test]
    fn test_block_matches_per_sample() {
        let c = Coefficients::peaking(2000.0, 0.7, 6.0, 48000.0);
        let mut a = Biquad::new();
        let mut b = Biquad::new();
        a.set_coefficients(c);
        b.set_coefficients(c);

        let mut block: Vec<f32> = (0..64).map(|i| (i as f32 * 0.3).sin()).collect();
        let expected: Vec<f32> = block.iter().map(|x| a.process(*x)).collect();
        b.process_block(&mut block);
        assert_eq!(block, expected);
    }
}
