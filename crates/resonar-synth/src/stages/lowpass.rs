//! Resonant low-pass stage.

use resonar_core::{Biquad, BlockContext, Coefficients, Stage, db_to_linear};

use crate::ports::LowPassParams;

/// Lowest cut-off the stage designs for.
const MIN_CUTOFF: f32 = 20.0;

/// Biquad low-pass followed by a make-up gain.
///
/// Coefficients are only redesigned when the cut-off, Q or sample rate
/// changed since the last tick.
#[derive(Debug, Clone, Default)]
pub struct LowPass {
    biquad: Biquad,
    params: LowPassParams,
    samplerate: f64,
    gain: f32,
}

impl LowPass {
    /// Creates a pass-through stage; [`LowPass::configure`] designs the filter.
    pub fn new() -> Self {
        Self {
            gain: 1.0,
            ..Default::default()
        }
    }

    /// Applies this tick's parameters.
    pub fn configure(&mut self, params: &LowPassParams, samplerate: f64) {
        let cutoff = params.cutoff.max(MIN_CUTOFF);
        if cutoff != self.params.cutoff || params.q != self.params.q || samplerate != self.samplerate
        {
            self.biquad
                .set_coefficients(Coefficients::lowpass(cutoff, params.q, samplerate as f32));
            self.samplerate = samplerate;
        }
        self.params = LowPassParams { cutoff, ..*params };
        self.gain = db_to_linear(params.filter_gain);
    }
}

impl Stage for LowPass {
    fn process_block(&mut self, block: &mut [f32], _ctx: &BlockContext) {
        for sample in block.iter_mut() {
            *sample = self.biquad.process(*sample) * self.gain;
        }
    }

    fn reset(&mut self) {
        self.biquad.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(cutoff: f32) -> LowPassParams {
        LowPassParams {
            cutoff,
            q: 0.707,
            filter_gain: 0.0,
        }
    }

    #[test]
    fn test_passes_dc() {
        let mut lp = LowPass::new();
        lp.configure(&params(1000.0), 44100.0);
        let ctx = BlockContext::new(44100.0, 0, 440.0);
        let mut block = vec![1.0_f32; 2048];
        lp.process_block(&mut block, &ctx);
        assert!((block[2047] - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_cutoff_is_floored() {
        let mut lp = LowPass::new();
        lp.configure(&params(0.0), 44100.0);
        assert_eq!(lp.params.cutoff, MIN_CUTOFF);
    }

    #[test]
    fn test_filter_gain_scales_output() {
        let mut lp = LowPass::new();
        lp.configure(
            &LowPassParams {
                filter_gain: -6.0206,
                ..params(2000.0)
            },
            44100.0,
        );
        let ctx = BlockContext::new(44100.0, 0, 440.0);
        let mut block = vec![1.0_f32; 4096];
        lp.process_block(&mut block, &ctx);
        assert!((block[4095] - 0.5).abs() < 0.01, "got {}", block[4095]);
    }

    #[test]
    fn test_reset_clears_history() {
        let mut lp = LowPass::new();
        lp.configure(&params(200.0), 44100.0);
        let ctx = BlockContext::new(44100.0, 0, 440.0);
        let mut block = vec![1.0_f32; 64];
        lp.process_block(&mut block, &ctx);
        lp.reset();
        let mut silence = vec![0.0_f32; 8];
        lp.process_block(&mut silence, &ctx);
        assert!(silence.iter().all(|s| *s == 0.0));
    }
}
