//! Additive noise band-limited around the note frequency.

use resonar_core::{Biquad, BlockContext, Coefficients, Stage};

/// Q of the band-pass shaping the noise.
const NOISE_Q: f32 = 0.8;

const DEFAULT_SEED: u32 = 0x9E37_79B9;

/// White noise through a band-pass centered on the note, added onto the
/// block. Bypassed at zero gain.
#[derive(Debug, Clone)]
pub struct Noise {
    state: u32,
    seed: u32,
    gain: f32,
    filter: Biquad,
    center: f64,
    samplerate: f64,
}

impl Default for Noise {
    fn default() -> Self {
        Self::new(DEFAULT_SEED)
    }
}

impl Noise {
    /// Creates a silent noise stage. A zero seed is replaced by a fixed one.
    pub fn new(seed: u32) -> Self {
        let seed = if seed == 0 { DEFAULT_SEED } else { seed };
        Self {
            state: seed,
            seed,
            gain: 0.0,
            filter: Biquad::new(),
            center: 0.0,
            samplerate: 0.0,
        }
    }

    /// Applies this tick's gain and re-centers the band on `frequency`.
    pub fn configure(&mut self, gain: f32, frequency: f64, samplerate: f64) {
        self.gain = gain;
        if frequency != self.center || samplerate != self.samplerate {
            self.filter.set_coefficients(Coefficients::bandpass(
                frequency as f32,
                NOISE_Q,
                samplerate as f32,
            ));
            self.center = frequency;
            self.samplerate = samplerate;
        }
    }

    /// xorshift32, mapped to `[-1, 1)`.
    #[inline]
    fn white(&mut self) -> f32 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.state = x;
        (x as f32 / u32::MAX as f32) * 2.0 - 1.0
    }
}

impl Stage for Noise {
    fn process_block(&mut self, block: &mut [f32], _ctx: &BlockContext) {
        for sample in block.iter_mut() {
            let white = self.white();
            *sample += self.gain * self.filter.process(white);
        }
    }

    fn is_active(&self) -> bool {
        self.gain != 0.0
    }

    fn reset(&mut self) {
        self.state = self.seed;
        self.filter.clear();
    }
}
