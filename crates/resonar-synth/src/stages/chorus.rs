//! Detuning chorus.
//!
//! The wet path is the input detuned by `depth * 0.25` semitones and read
//! from a delay line whose tap the chorus LFO sweeps. The stage needs a
//! lookback history, so it renders into a side buffer, clears the block and
//! copies the mix back.

use resonar_core::{BlockContext, DelayLine, Lfo, Stage};

use super::pitch::PitchShift;
use crate::ports::ChorusParams;

/// Fixed part of the wet delay in seconds.
const BASE_DELAY_SECONDS: f32 = 0.010;
/// Sweep width at `delay == 1.0`, in seconds.
const MAX_SWEEP_SECONDS: f32 = 0.020;
/// Detune at `depth == 1.0`, in cents.
const DEPTH_CENTS: f64 = 25.0;

/// Chorus stage.
#[derive(Debug, Clone)]
pub struct Chorus {
    line: DelayLine,
    detune: PitchShift,
    lfo: Lfo,
    side: Vec<f32>,
    params: ChorusParams,
    samplerate: f64,
}

impl Chorus {
    /// Creates a bypassed chorus for `samplerate`.
    pub fn new(samplerate: f64) -> Self {
        Self {
            line: DelayLine::from_time(samplerate as f32, BASE_DELAY_SECONDS + MAX_SWEEP_SECONDS),
            detune: PitchShift::new(samplerate),
            lfo: Lfo::new(samplerate, 0.0),
            side: Vec::new(),
            params: ChorusParams::default(),
            samplerate,
        }
    }

    /// Applies this tick's parameters.
    pub fn configure(&mut self, params: &ChorusParams, samplerate: f64) {
        if samplerate != self.samplerate {
            *self = Self::new(samplerate);
        }
        self.params = *params;
        self.detune.set_cents(f64::from(params.depth) * DEPTH_CENTS);
        self.lfo.set_waveform(params.lfo_waveform);
        self.lfo.set_frequency(params.lfo_frequency);
    }
}

impl Stage for Chorus {
    fn process_block(&mut self, block: &mut [f32], ctx: &BlockContext) {
        let p = self.params;
        let sr = self.samplerate as f32;
        let base = BASE_DELAY_SECONDS * sr;
        let sweep = p.delay * MAX_SWEEP_SECONDS * sr;

        if self.side.len() < block.len() {
            self.side.resize(block.len(), 0.0);
        }
        let side = &mut self.side[..block.len()];

        for (i, (out, input)) in side.iter_mut().zip(block.iter()).enumerate() {
            let dry = input * p.input_volume;
            self.line.write(self.detune.process(dry));

            let lfo = self.lfo.value_at((ctx.frame + i as u64) as f64) as f32;
            let wet = self.line.read(base + sweep * 0.5 * (lfo + 1.0));
            *out = p.output_volume * ((1.0 - p.mix) * dry + p.mix * wet);
        }

        block.fill(0.0);
        block.copy_from_slice(side);
    }

    fn is_active(&self) -> bool {
        self.params.enabled && self.params.depth != 0.0
    }

    fn reset(&mut self) {
        self.line.clear();
        Stage::reset(&mut self.detune);
        self.side.fill(0.0);
    }

    fn latency_frames(&self) -> usize {
        (BASE_DELAY_SECONDS * self.samplerate as f32) as usize
    }
}
