//! Four-band peaking amplifier.
//!
//! Each band is a peaking bell whose width is given in octaves. The stage
//! is bypassed while every band and the output gain sit at 0 dB.

use resonar_core::{Biquad, BlockContext, Coefficients, Stage, db_to_linear};

use crate::ports::{AMPLIFIER_BANDS, AmplifierParams, BandParams};

/// Q of a peaking band `octaves` wide.
fn bandwidth_to_q(octaves: f32) -> f32 {
    let ratio = 2f32.powf(octaves.max(0.01));
    ratio.sqrt() / (ratio - 1.0)
}

/// Peaking equalizer stage.
#[derive(Debug, Clone, Default)]
pub struct Amplifier {
    bands: [Biquad; AMPLIFIER_BANDS],
    designed: [BandParams; AMPLIFIER_BANDS],
    samplerate: f64,
    gain: f32,
    active: bool,
}

impl Amplifier {
    /// Creates a bypassed stage.
    pub fn new() -> Self {
        Self {
            gain: 1.0,
            ..Default::default()
        }
    }

    /// Applies this tick's parameters.
    pub fn configure(&mut self, params: &AmplifierParams, samplerate: f64) {
        let rate_changed = samplerate != self.samplerate;
        for ((biquad, designed), band) in self
            .bands
            .iter_mut()
            .zip(self.designed.iter_mut())
            .zip(&params.bands)
        {
            if rate_changed || designed != band {
                biquad.set_coefficients(Coefficients::peaking(
                    band.frequency,
                    bandwidth_to_q(band.bandwidth),
                    band.gain,
                    samplerate as f32,
                ));
                *designed = *band;
            }
        }
        self.samplerate = samplerate;
        self.gain = db_to_linear(params.filter_gain);
        self.active =
            params.filter_gain != 0.0 || params.bands.iter().any(|band| band.gain != 0.0);
    }
}

impl Stage for Amplifier {
    fn process_block(&mut self, block: &mut [f32], _ctx: &BlockContext) {
        for sample in block.iter_mut() {
            let mut y = *sample;
            for band in &mut self.bands {
                y = band.process(y);
            }
            *sample = y * self.gain;
        }
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn reset(&mut self) {
        self.bands.iter_mut().for_each(Biquad::clear);
    }
}
