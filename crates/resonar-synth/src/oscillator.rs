//! Phase-accumulating oscillator with LFO frequency modulation and vibrato.
//!
//! The phase is kept in cycles as `f64`. Oscillators render additively so
//! both oscillators of a voice sum into the same scratch block.

use std::f64::consts::TAU;

use resonar_core::{Lfo, cents_to_ratio, guard_frequency, key_to_frequency, wrap_unit};

use crate::ports::{OscillatorParams, VibratoParams};

/// MIDI note sounding at the reference pitch when octave and key are zero.
const REFERENCE_NOTE: f64 = 48.0;

/// Cents per unit of LFO depth.
const DEPTH_CENTS: f64 = 100.0;

/// Base frequency of an oscillator for `midi`:
/// `440 * 2^((octave*12 + key + midi - 48) / 12)`.
///
/// # Example
///
/// ```rust
/// use resonar_synth::oscillator::note_frequency;
///
/// assert!((note_frequency(0.0, 0.0, 48) - 440.0).abs() < 1e-9);
/// assert!((note_frequency(1.0, 0.0, 48) - 880.0).abs() < 1e-9);
/// ```
pub fn note_frequency(octave: f64, key: f64, midi: u8) -> f64 {
    guard_frequency(key_to_frequency(
        octave * 12.0 + key + f64::from(midi) - REFERENCE_NOTE,
    ))
}

/// Vibrato shared by both oscillators of a voice.
#[derive(Debug, Clone)]
pub struct Vibrato {
    lfo: Lfo,
    params: VibratoParams,
}

impl Vibrato {
    /// Creates a disabled vibrato at `samplerate`.
    pub fn new(samplerate: f64) -> Self {
        Self {
            lfo: Lfo::new(samplerate, 0.0),
            params: VibratoParams::default(),
        }
    }

    /// Applies this tick's parameters.
    pub fn configure(&mut self, params: &VibratoParams, samplerate: f64) {
        self.params = *params;
        self.lfo.set_sample_rate(samplerate);
        self.lfo.set_frequency(params.lfo_frequency);
    }

    /// Detune in cents at absolute frame `frame`; `0` when disabled.
    #[inline]
    pub fn cents(&self, frame: f64) -> f64 {
        if !self.params.enabled {
            return 0.0;
        }
        self.params.tuning
            + self.params.gain * self.params.lfo_depth * DEPTH_CENTS * self.lfo.value_at(frame)
    }
}

/// One oscillator of a voice.
///
/// # Example
///
/// ```rust
/// use resonar_synth::oscillator::{Oscillator, Vibrato};
/// use resonar_synth::ports::OscillatorParams;
///
/// let params = OscillatorParams { volume: 1.0, ..Default::default() };
/// let vibrato = Vibrato::new(44100.0);
/// let mut osc = Oscillator::new(44100.0);
/// osc.reset(0.0);
///
/// let mut block = [0.0_f32; 64];
/// osc.render(&mut block, 0, &params, &vibrato, 440.0);
/// assert!(block.iter().any(|s| *s != 0.0));
/// ```
#[derive(Debug, Clone)]
pub struct Oscillator {
    cycles: f64,
    samplerate: f64,
    fm: Lfo,
}

impl Oscillator {
    /// Creates an oscillator at phase zero.
    pub fn new(samplerate: f64) -> Self {
        Self {
            cycles: 0.0,
            samplerate: guard_frequency(samplerate),
            fm: Lfo::new(samplerate, 0.0),
        }
    }

    /// Sets the sample rate.
    pub fn set_samplerate(&mut self, samplerate: f64) {
        self.samplerate = guard_frequency(samplerate);
        self.fm.set_sample_rate(samplerate);
    }

    /// Restarts at `phase` radians.
    pub fn reset(&mut self, phase: f64) {
        self.set_cycles(phase / TAU);
    }

    /// Restarts at `cycles`.
    pub fn set_cycles(&mut self, cycles: f64) {
        self.cycles = wrap_unit(cycles);
    }

    /// Current phase in cycles.
    pub fn cycles(&self) -> f64 {
        self.cycles
    }

    /// Advances the phase over `frames` unrendered frames at `frequency`.
    pub fn skip(&mut self, frames: u64, frequency: f64) {
        self.cycles = wrap_unit(self.cycles + frames as f64 * frequency / self.samplerate);
    }

    /// Adds the oscillator onto `block`, whose first sample sits at absolute
    /// frame `start`.
    pub fn render(
        &mut self,
        block: &mut [f32],
        start: u64,
        params: &OscillatorParams,
        vibrato: &Vibrato,
        frequency: f64,
    ) {
        self.fm.set_waveform(params.lfo_waveform);
        self.fm.set_frequency(params.lfo_frequency);
        let modulated = params.lfo_depth != 0.0;

        for (i, sample) in block.iter_mut().enumerate() {
            let frame = (start + i as u64) as f64;
            let mut cents = params.lfo_tuning + vibrato.cents(frame);
            if modulated {
                cents += params.lfo_depth * DEPTH_CENTS * self.fm.value_at(frame);
            }
            let increment = frequency * cents_to_ratio(cents) / self.samplerate;

            *sample += params.volume * params.waveform.at(self.cycles) as f32;
            self.cycles = wrap_unit(self.cycles + increment);
        }
    }
}
