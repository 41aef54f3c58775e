//! Voices and the voice table.
//!
//! A [`Voice`] is the DSP state of one MIDI note on one audio channel in one
//! scope. Voices are created lazily on first use and then kept: a note-on
//! resets them in place so nothing is reallocated between notes.

use std::collections::HashMap;

use resonar_core::stage;
use resonar_core::{BlockContext, Stage};
use resonar_signal::Scope;

use crate::oscillator::{Oscillator, Vibrato, note_frequency};
use crate::ports::{STAGE_PAIRS, SynthParams};
use crate::stages::{Amplifier, Chorus, LowPass, Noise, PitchShift};
use crate::sync::{SyncSchedule, SyncTiming};

/// Number of MIDI notes per channel.
pub const MIDI_NOTES: usize = 128;

/// DSP state of one sounding slot.
#[derive(Debug, Clone)]
pub struct Voice {
    key_on: u32,
    midi: u8,
    samplerate: f64,
    rendered_until: u64,
    oscillators: [Oscillator; STAGE_PAIRS],
    sync: [SyncSchedule; STAGE_PAIRS],
    vibrato: Vibrato,
    low_pass: [LowPass; STAGE_PAIRS],
    amplifiers: [Amplifier; STAGE_PAIRS],
    noise: Noise,
    pitch: PitchShift,
    chorus: Chorus,
    scratch: Vec<f32>,
}

impl Voice {
    /// Creates an idle voice for `midi`.
    pub fn new(midi: u8, samplerate: f64) -> Self {
        Self {
            key_on: 0,
            midi,
            samplerate,
            rendered_until: 0,
            oscillators: std::array::from_fn(|_| Oscillator::new(samplerate)),
            sync: Default::default(),
            vibrato: Vibrato::new(samplerate),
            low_pass: std::array::from_fn(|_| LowPass::new()),
            amplifiers: std::array::from_fn(|_| Amplifier::new()),
            noise: Noise::new(u32::from(midi) + 1),
            pitch: PitchShift::new(samplerate),
            chorus: Chorus::new(samplerate),
            scratch: Vec::new(),
        }
    }

    /// MIDI note of this slot.
    pub fn midi(&self) -> u8 {
        self.midi
    }

    /// Number of notes currently holding the voice.
    pub fn key_on(&self) -> u32 {
        self.key_on
    }

    /// Whether at least one note holds the voice.
    pub fn is_sounding(&self) -> bool {
        self.key_on > 0
    }

    /// Last frame rendered, exclusive.
    pub fn rendered_until(&self) -> u64 {
        self.rendered_until
    }

    fn set_samplerate(&mut self, samplerate: f64) {
        if samplerate == self.samplerate {
            return;
        }
        self.samplerate = samplerate;
        for osc in &mut self.oscillators {
            osc.set_samplerate(samplerate);
        }
        self.pitch.set_samplerate(samplerate);
    }

    fn timing(&self, params: &SynthParams, n: usize) -> SyncTiming {
        let osc = &params.oscillators[n];
        SyncTiming {
            midi: self.midi,
            frequency: note_frequency(osc.octave, osc.key, self.midi),
            samplerate: self.samplerate,
        }
    }

    /// Starts a note: counts the hold and restarts phases, sync schedules
    /// and stage history.
    pub fn note_on(&mut self, params: &SynthParams, samplerate: f64) {
        self.key_on += 1;
        self.set_samplerate(samplerate);
        self.rendered_until = 0;

        for n in 0..STAGE_PAIRS {
            let timing = self.timing(params, n);
            self.oscillators[n].reset(params.oscillators[n].phase);
            self.sync[n].restart(&params.oscillators[n].sync, &timing);
        }
        for lp in &mut self.low_pass {
            Stage::reset(lp);
        }
        for amp in &mut self.amplifiers {
            Stage::reset(amp);
        }
        Stage::reset(&mut self.noise);
        Stage::reset(&mut self.pitch);
        Stage::reset(&mut self.chorus);
    }

    /// Releases one hold. Returns the remaining count.
    ///
    /// Stage state is kept for the next note on this slot.
    pub fn release(&mut self) -> u32 {
        debug_assert!(self.key_on > 0, "voice {} released more often than started", self.midi);
        self.key_on = self.key_on.saturating_sub(1);
        self.key_on
    }

    /// Drops every hold at once, returning how many there were.
    pub fn release_all(&mut self) -> u32 {
        std::mem::take(&mut self.key_on)
    }

    /// Renders `len` frames starting at absolute frame `offset` through the
    /// whole chain and returns them.
    pub fn render(
        &mut self,
        params: &SynthParams,
        offset: u64,
        len: usize,
        buffer_size: usize,
        samplerate: f64,
    ) -> &[f32] {
        self.set_samplerate(samplerate);
        if self.scratch.len() < len {
            self.scratch.resize(len, 0.0);
        }
        self.scratch[..len].fill(0.0);
        self.vibrato.configure(&params.vibrato, samplerate);

        for n in 0..STAGE_PAIRS {
            let osc_params = &params.oscillators[n];
            let timing = self.timing(params, n);
            let oscillator = &mut self.oscillators[n];
            if offset > self.rendered_until {
                oscillator.skip(offset - self.rendered_until, timing.frequency);
            }

            for segment in self.sync[n].segments(&osc_params.sync, timing, offset, len, buffer_size) {
                if let Some(cycles) = segment.reset {
                    oscillator.set_cycles(cycles);
                }
                let from = (segment.start - offset) as usize;
                oscillator.render(
                    &mut self.scratch[from..from + segment.len],
                    segment.start,
                    osc_params,
                    &self.vibrato,
                    timing.frequency,
                );
            }
        }
        self.rendered_until = offset + len as u64;

        let frequency = self.timing(params, 0).frequency;
        let ctx = BlockContext::new(samplerate, offset, frequency);
        let block = &mut self.scratch[..len];

        for (lp, p) in self.low_pass.iter_mut().zip(&params.low_pass) {
            lp.configure(p, samplerate);
            stage::run(lp, block, &ctx);
        }
        for (amp, p) in self.amplifiers.iter_mut().zip(&params.amplifiers) {
            amp.configure(p, samplerate);
            stage::run(amp, block, &ctx);
        }
        self.noise.configure(params.noise_gain, frequency, samplerate);
        stage::run(&mut self.noise, block, &ctx);
        self.pitch.set_cents(params.pitch_tuning);
        stage::run(&mut self.pitch, block, &ctx);
        self.chorus.configure(&params.chorus, samplerate);
        stage::run(&mut self.chorus, block, &ctx);

        &self.scratch[..len]
    }
}

/// Voice table key: one render scope on one audio channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VoiceKey {
    /// Render pass
    pub scope: Scope,
    /// Pad-local channel index
    pub audio_channel: usize,
}

impl VoiceKey {
    /// Creates a key.
    pub fn new(scope: Scope, audio_channel: usize) -> Self {
        Self {
            scope,
            audio_channel,
        }
    }
}

/// A voice that was still held when its scope was cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Released {
    /// Where the voice lived
    pub key: VoiceKey,
    /// MIDI note
    pub midi: u8,
    /// Holds that were dropped
    pub holds: u32,
}

/// Lazily populated voices, 128 per (scope, channel).
#[derive(Debug, Default)]
pub struct VoiceTable {
    channels: HashMap<VoiceKey, Vec<Option<Box<Voice>>>>,
}

impl VoiceTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Voice of `midi` under `key`, creating it on first use.
    pub fn voice_mut(&mut self, key: VoiceKey, midi: u8, samplerate: f64) -> &mut Voice {
        let slots = self
            .channels
            .entry(key)
            .or_insert_with(|| (0..MIDI_NOTES).map(|_| None).collect());
        slots[usize::from(midi) % MIDI_NOTES]
            .get_or_insert_with(|| Box::new(Voice::new(midi, samplerate)))
    }

    /// Voice of `midi` under `key`, if it was ever used.
    pub fn get(&self, key: VoiceKey, midi: u8) -> Option<&Voice> {
        self.channels
            .get(&key)
            .and_then(|slots| slots.get(usize::from(midi)))
            .and_then(|slot| slot.as_deref())
    }

    /// Mutable variant of [`VoiceTable::get`].
    pub fn get_mut(&mut self, key: VoiceKey, midi: u8) -> Option<&mut Voice> {
        self.channels
            .get_mut(&key)
            .and_then(|slots| slots.get_mut(usize::from(midi)))
            .and_then(|slot| slot.as_deref_mut())
    }

    /// Number of (scope, channel) entries.
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    /// Whether no voice was ever created.
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Total holds across every voice.
    pub fn total_key_on(&self) -> u64 {
        self.channels
            .values()
            .flatten()
            .flatten()
            .map(|voice| u64::from(voice.key_on()))
            .sum()
    }

    /// Drops every voice of channels at or above `channels`, for every scope.
    pub fn truncate_channels(&mut self, channels: usize) {
        self.channels.retain(|key, _| key.audio_channel < channels);
    }

    /// Removes every voice of `scope`, reporting the ones still held.
    pub fn remove_scope(&mut self, scope: Scope) -> Vec<Released> {
        let keys: Vec<VoiceKey> = self
            .channels
            .keys()
            .filter(|key| key.scope == scope)
            .copied()
            .collect();

        let mut released = Vec::new();
        for key in keys {
            let Some(slots) = self.channels.remove(&key) else {
                continue;
            };
            for mut voice in slots.into_iter().flatten() {
                let holds = voice.release_all();
                if holds > 0 {
                    released.push(Released {
                        key,
                        midi: voice.midi(),
                        holds,
                    });
                }
            }
        }
        released
    }
}
