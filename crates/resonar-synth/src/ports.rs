//! Lock-free parameter ports.
//!
//! Every live control of the synth is a named `f32` port. The UI or an
//! automation lane writes ports from any thread; the render thread reads a
//! [`SynthParams`] snapshot once per tick. Values are stored as `f32` bits in
//! atomics, so neither side ever blocks.
//!
//! Port names follow `<group>-<param>`:
//!
//! | Group | Ports |
//! |-------|-------|
//! | `synth-0-*`, `synth-1-*` | oscillator, octave, key, phase, volume, LFO, sync |
//! | `low-pass-0-*`, `low-pass-1-*` | cut-off-frequency, q, filter-gain |
//! | `amplifier-0-*`, `amplifier-1-*` | four peaking bands, filter-gain |
//! | `noise-gain`, `pitch-tuning` | single values |
//! | `chorus-*`, `vibrato-*` | modulation effects |

use std::collections::HashMap;
use std::f32::consts::TAU;
use std::sync::atomic::{AtomicU32, Ordering};

use resonar_core::Waveform;
use serde::Serialize;
use thiserror::Error;

/// Number of oscillators, low-pass and amplifier stages per voice.
pub const STAGE_PAIRS: usize = 2;
/// Attack/phase slots of one sync schedule.
pub const SYNC_SLOTS: usize = 4;
/// Peaking bands of one amplifier.
pub const AMPLIFIER_BANDS: usize = 4;

const AMPLIFIER_BAND_FREQUENCIES: [f32; AMPLIFIER_BANDS] = [110.0, 440.0, 1760.0, 7040.0];

/// Errors raised when writing ports.
#[derive(Debug, Error, PartialEq)]
pub enum PortError {
    /// No port carries this name
    #[error("unknown port '{name}'")]
    UnknownPort {
        /// Name that was looked up.
        name: String,
    },

    /// The value is NaN or infinite
    #[error("port '{name}' rejects non-finite value {value}")]
    NotFinite {
        /// Port name.
        name: String,
        /// Rejected value.
        value: f32,
    },
}

impl PortError {
    /// Create an unknown port error.
    pub fn unknown(name: impl Into<String>) -> Self {
        PortError::UnknownPort { name: name.into() }
    }
}

/// Metadata of one port.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortDescriptor {
    /// Port name, e.g. `synth-0-octave`
    pub name: String,
    /// Lowest accepted value
    pub min: f32,
    /// Highest accepted value
    pub max: f32,
    /// Value after construction and [`Ports::reset`]
    pub default: f32,
    /// Whether only whole numbers are meaningful (switches, waveform indices)
    pub stepped: bool,
}

impl PortDescriptor {
    /// Clamps `value` into the port's range, rounding stepped ports.
    pub fn clamp(&self, value: f32) -> f32 {
        let value = if self.stepped { value.round() } else { value };
        value.clamp(self.min, self.max)
    }
}

#[derive(Debug, Clone, Copy)]
struct SyncPorts {
    enabled: usize,
    relative_attack_factor: usize,
    attack: [usize; SYNC_SLOTS],
    phase: [usize; SYNC_SLOTS],
    lfo_oscillator: usize,
    lfo_frequency: usize,
}

#[derive(Debug, Clone, Copy)]
struct OscillatorPorts {
    oscillator: usize,
    octave: usize,
    key: usize,
    phase: usize,
    volume: usize,
    lfo_oscillator: usize,
    lfo_frequency: usize,
    lfo_depth: usize,
    lfo_tuning: usize,
    sync: SyncPorts,
}

#[derive(Debug, Clone, Copy)]
struct LowPassPorts {
    cutoff: usize,
    q: usize,
    filter_gain: usize,
}

#[derive(Debug, Clone, Copy)]
struct BandPorts {
    frequency: usize,
    bandwidth: usize,
    gain: usize,
}

#[derive(Debug, Clone, Copy)]
struct AmplifierPorts {
    bands: [BandPorts; AMPLIFIER_BANDS],
    filter_gain: usize,
}

#[derive(Debug, Clone, Copy)]
struct ChorusPorts {
    enabled: usize,
    input_volume: usize,
    output_volume: usize,
    lfo_oscillator: usize,
    lfo_frequency: usize,
    depth: usize,
    mix: usize,
    delay: usize,
}

#[derive(Debug, Clone, Copy)]
struct VibratoPorts {
    enabled: usize,
    gain: usize,
    lfo_depth: usize,
    lfo_frequency: usize,
    tuning: usize,
}

#[derive(Debug, Clone, Copy)]
struct Layout {
    oscillators: [OscillatorPorts; STAGE_PAIRS],
    low_pass: [LowPassPorts; STAGE_PAIRS],
    amplifiers: [AmplifierPorts; STAGE_PAIRS],
    noise_gain: usize,
    pitch_tuning: usize,
    chorus: ChorusPorts,
    vibrato: VibratoPorts,
}

struct Builder {
    descriptors: Vec<PortDescriptor>,
}

impl Builder {
    fn port(&mut self, name: String, min: f32, max: f32, default: f32) -> usize {
        self.push(name, min, max, default, false)
    }

    fn switch(&mut self, name: String, default: f32) -> usize {
        self.push(name, 0.0, 1.0, default, true)
    }

    fn waveform(&mut self, name: String) -> usize {
        self.push(name, 0.0, (Waveform::ALL.len() - 1) as f32, 0.0, true)
    }

    fn push(&mut self, name: String, min: f32, max: f32, default: f32, stepped: bool) -> usize {
        self.descriptors.push(PortDescriptor {
            name,
            min,
            max,
            default,
            stepped,
        });
        self.descriptors.len() - 1
    }

    fn oscillator(&mut self, n: usize) -> OscillatorPorts {
        let p = format!("synth-{n}");
        OscillatorPorts {
            oscillator: self.waveform(format!("{p}-oscillator")),
            octave: self.port(format!("{p}-octave"), -6.0, 6.0, 0.0),
            key: self.port(format!("{p}-key"), -12.0, 12.0, 2.0),
            phase: self.port(format!("{p}-phase"), 0.0, TAU, 0.0),
            volume: self.port(format!("{p}-volume"), 0.0, 1.0, 1.0),
            lfo_oscillator: self.waveform(format!("{p}-lfo-oscillator")),
            lfo_frequency: self.port(format!("{p}-lfo-frequency"), 0.01, 16.0, 6.0),
            lfo_depth: self.port(format!("{p}-lfo-depth"), 0.0, 1.0, 0.0),
            lfo_tuning: self.port(format!("{p}-lfo-tuning"), -1200.0, 1200.0, 0.0),
            sync: SyncPorts {
                enabled: self.switch(format!("{p}-sync-enabled"), 0.0),
                relative_attack_factor: self.port(
                    format!("{p}-sync-relative-attack-factor"),
                    0.0,
                    1.0,
                    1.0,
                ),
                attack: std::array::from_fn(|slot| {
                    self.port(format!("{p}-sync-attack-{slot}"), 0.0, 6.0 * TAU, 0.0)
                }),
                phase: std::array::from_fn(|slot| {
                    self.port(format!("{p}-sync-phase-{slot}"), 0.0, TAU, 0.0)
                }),
                lfo_oscillator: self.waveform(format!("{p}-sync-lfo-oscillator")),
                lfo_frequency: self.port(format!("{p}-sync-lfo-frequency"), 0.0, 10.0, 0.0),
            },
        }
    }

    fn low_pass(&mut self, n: usize) -> LowPassPorts {
        let p = format!("low-pass-{n}");
        LowPassPorts {
            cutoff: self.port(format!("{p}-cut-off-frequency"), 20.0, 22000.0, 2000.0),
            q: self.port(format!("{p}-q"), 0.1, 10.0, 0.707),
            filter_gain: self.port(format!("{p}-filter-gain"), -20.0, 20.0, 0.0),
        }
    }

    fn amplifier(&mut self, n: usize) -> AmplifierPorts {
        let p = format!("amplifier-{n}");
        AmplifierPorts {
            bands: std::array::from_fn(|band| BandPorts {
                frequency: self.port(
                    format!("{p}-amp-{band}-frequency"),
                    20.0,
                    20000.0,
                    AMPLIFIER_BAND_FREQUENCIES[band],
                ),
                bandwidth: self.port(format!("{p}-amp-{band}-bandwidth"), 0.1, 4.0, 1.0),
                gain: self.port(format!("{p}-amp-{band}-gain"), -20.0, 20.0, 0.0),
            }),
            filter_gain: self.port(format!("{p}-filter-gain"), -20.0, 20.0, 0.0),
        }
    }

    fn layout(&mut self) -> Layout {
        let oscillators = std::array::from_fn(|n| self.oscillator(n));
        let low_pass = std::array::from_fn(|n| self.low_pass(n));
        let amplifiers = std::array::from_fn(|n| self.amplifier(n));
        Layout {
            oscillators,
            low_pass,
            amplifiers,
            noise_gain: self.port("noise-gain".into(), 0.0, 1.0, 0.0),
            pitch_tuning: self.port("pitch-tuning".into(), -1200.0, 1200.0, 0.0),
            chorus: ChorusPorts {
                enabled: self.switch("chorus-enabled".into(), 1.0),
                input_volume: self.port("chorus-input-volume".into(), 0.0, 1.0, 1.0),
                output_volume: self.port("chorus-output-volume".into(), 0.0, 1.0, 1.0),
                lfo_oscillator: self.waveform("chorus-lfo-oscillator".into()),
                lfo_frequency: self.port("chorus-lfo-frequency".into(), 0.01, 10.0, 0.5),
                depth: self.port("chorus-depth".into(), 0.0, 1.0, 0.0),
                mix: self.port("chorus-mix".into(), 0.0, 1.0, 0.5),
                delay: self.port("chorus-delay".into(), 0.0, 1.0, 0.0),
            },
            vibrato: VibratoPorts {
                enabled: self.switch("vibrato-enabled".into(), 0.0),
                gain: self.port("vibrato-gain".into(), 0.0, 1.0, 1.0),
                lfo_depth: self.port("vibrato-lfo-depth".into(), 0.0, 1.0, 1.0),
                lfo_frequency: self.port("vibrato-lfo-freq".into(), 0.0, 10.0, 8.172),
                tuning: self.port("vibrato-tuning".into(), -1200.0, 1200.0, 0.0),
            },
        }
    }
}

/// The port store of one synth.
///
/// # Example
///
/// ```rust
/// use resonar_synth::Ports;
///
/// let ports = Ports::new();
/// ports.set("synth-0-octave", 1.0).unwrap();
/// assert_eq!(ports.get("synth-0-octave"), Some(1.0));
///
/// // values are clamped into range
/// ports.set("synth-0-volume", 3.0).unwrap();
/// assert_eq!(ports.get("synth-0-volume"), Some(1.0));
///
/// let params = ports.snapshot();
/// assert_eq!(params.oscillators[0].octave, 1.0);
/// ```
pub struct Ports {
    descriptors: Vec<PortDescriptor>,
    values: Vec<AtomicU32>,
    index: HashMap<String, usize>,
    layout: Layout,
}

impl Ports {
    /// Creates every port at its default value.
    pub fn new() -> Self {
        let mut builder = Builder {
            descriptors: Vec::new(),
        };
        let layout = builder.layout();
        let descriptors = builder.descriptors;
        let values = descriptors
            .iter()
            .map(|d| AtomicU32::new(d.default.to_bits()))
            .collect();
        let index = descriptors
            .iter()
            .enumerate()
            .map(|(i, d)| (d.name.clone(), i))
            .collect();
        Self {
            descriptors,
            values,
            index,
            layout,
        }
    }

    /// Number of ports.
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Always `false`; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Port metadata in declaration order.
    pub fn descriptors(&self) -> &[PortDescriptor] {
        &self.descriptors
    }

    /// Descriptor of the port called `name`.
    pub fn descriptor(&self, name: &str) -> Option<&PortDescriptor> {
        self.index.get(name).map(|&i| &self.descriptors[i])
    }

    /// Current value of the port called `name`.
    pub fn get(&self, name: &str) -> Option<f32> {
        self.index.get(name).map(|&i| self.load(i))
    }

    /// Writes `value` into the port called `name`, clamped into range.
    /// Returns the stored value.
    pub fn set(&self, name: &str, value: f32) -> Result<f32, PortError> {
        let &i = self.index.get(name).ok_or_else(|| PortError::unknown(name))?;
        if !value.is_finite() {
            return Err(PortError::NotFinite {
                name: name.to_string(),
                value,
            });
        }
        let stored = self.descriptors[i].clamp(value);
        self.values[i].store(stored.to_bits(), Ordering::Relaxed);
        Ok(stored)
    }

    /// Restores every default.
    pub fn reset(&self) {
        for (value, descriptor) in self.values.iter().zip(&self.descriptors) {
            value.store(descriptor.default.to_bits(), Ordering::Relaxed);
        }
    }

    /// `(descriptor, value)` pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&PortDescriptor, f32)> + '_ {
        self.descriptors
            .iter()
            .enumerate()
            .map(|(i, d)| (d, self.load(i)))
    }

    #[inline]
    fn load(&self, index: usize) -> f32 {
        f32::from_bits(self.values[index].load(Ordering::Relaxed))
    }

    #[inline]
    fn load_f64(&self, index: usize) -> f64 {
        f64::from(self.load(index))
    }

    #[inline]
    fn load_bool(&self, index: usize) -> bool {
        self.load(index) >= 0.5
    }

    #[inline]
    fn load_waveform(&self, index: usize) -> Waveform {
        Waveform::from_port(self.load(index))
    }

    /// Reads every port into typed parameters. Allocation free.
    pub fn snapshot(&self) -> SynthParams {
        let l = &self.layout;
        SynthParams {
            oscillators: l.oscillators.map(|o| OscillatorParams {
                waveform: self.load_waveform(o.oscillator),
                octave: self.load_f64(o.octave),
                key: self.load_f64(o.key),
                phase: self.load_f64(o.phase),
                volume: self.load(o.volume),
                lfo_waveform: self.load_waveform(o.lfo_oscillator),
                lfo_frequency: self.load_f64(o.lfo_frequency),
                lfo_depth: self.load_f64(o.lfo_depth),
                lfo_tuning: self.load_f64(o.lfo_tuning),
                sync: SyncParams {
                    enabled: self.load_bool(o.sync.enabled),
                    relative_attack_factor: self.load_f64(o.sync.relative_attack_factor),
                    slots: std::array::from_fn(|s| SyncSlot {
                        attack: self.load_f64(o.sync.attack[s]),
                        phase: self.load_f64(o.sync.phase[s]),
                    }),
                    lfo_waveform: self.load_waveform(o.sync.lfo_oscillator),
                    lfo_frequency: self.load_f64(o.sync.lfo_frequency),
                },
            }),
            low_pass: l.low_pass.map(|p| LowPassParams {
                cutoff: self.load(p.cutoff),
                q: self.load(p.q),
                filter_gain: self.load(p.filter_gain),
            }),
            amplifiers: l.amplifiers.map(|a| AmplifierParams {
                bands: a.bands.map(|b| BandParams {
                    frequency: self.load(b.frequency),
                    bandwidth: self.load(b.bandwidth),
                    gain: self.load(b.gain),
                }),
                filter_gain: self.load(a.filter_gain),
            }),
            noise_gain: self.load(l.noise_gain),
            pitch_tuning: self.load_f64(l.pitch_tuning),
            chorus: ChorusParams {
                enabled: self.load_bool(l.chorus.enabled),
                input_volume: self.load(l.chorus.input_volume),
                output_volume: self.load(l.chorus.output_volume),
                lfo_waveform: self.load_waveform(l.chorus.lfo_oscillator),
                lfo_frequency: self.load_f64(l.chorus.lfo_frequency),
                depth: self.load(l.chorus.depth),
                mix: self.load(l.chorus.mix),
                delay: self.load(l.chorus.delay),
            },
            vibrato: VibratoParams {
                enabled: self.load_bool(l.vibrato.enabled),
                gain: self.load_f64(l.vibrato.gain),
                lfo_depth: self.load_f64(l.vibrato.lfo_depth),
                lfo_frequency: self.load_f64(l.vibrato.lfo_frequency),
                tuning: self.load_f64(l.vibrato.tuning),
            },
        }
    }
}

impl Default for Ports {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Ports {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ports").field("len", &self.len()).finish()
    }
}

/// One attack/phase slot of a sync schedule.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SyncSlot {
    /// Reset interval in radians of the oscillator period; `0` disables the slot
    pub attack: f64,
    /// Phase applied at the reset, in radians
    pub phase: f64,
}

/// Oscillator sync settings.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SyncParams {
    /// Whether resets are scheduled at all
    pub enabled: bool,
    /// How strongly high notes shorten the reset interval, `[0, 1]`
    pub relative_attack_factor: f64,
    /// Attack/phase slots, visited in order
    pub slots: [SyncSlot; SYNC_SLOTS],
    /// Shape of the LFO scaling each reset phase
    pub lfo_waveform: Waveform,
    /// LFO frequency in Hz; `0` disables the LFO
    pub lfo_frequency: f64,
}

/// One oscillator.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OscillatorParams {
    /// Shape
    pub waveform: Waveform,
    /// Octave shift
    pub octave: f64,
    /// Semitone shift
    pub key: f64,
    /// Start phase in radians
    pub phase: f64,
    /// Linear output level
    pub volume: f32,
    /// FM LFO shape
    pub lfo_waveform: Waveform,
    /// FM LFO frequency in Hz
    pub lfo_frequency: f64,
    /// FM depth, scales the LFO in cents
    pub lfo_depth: f64,
    /// Static detune in cents
    pub lfo_tuning: f64,
    /// Sync schedule
    pub sync: SyncParams,
}

/// One low-pass stage.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LowPassParams {
    /// Cut-off in Hz
    pub cutoff: f32,
    /// Resonance
    pub q: f32,
    /// Make-up gain in dB
    pub filter_gain: f32,
}

/// One peaking band.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BandParams {
    /// Center frequency in Hz
    pub frequency: f32,
    /// Bandwidth in octaves
    pub bandwidth: f32,
    /// Boost or cut in dB
    pub gain: f32,
}

/// One amplifier stage.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AmplifierParams {
    /// Peaking bands
    pub bands: [BandParams; AMPLIFIER_BANDS],
    /// Output gain in dB
    pub filter_gain: f32,
}

/// Chorus stage.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ChorusParams {
    /// Master switch
    pub enabled: bool,
    /// Level into both paths
    pub input_volume: f32,
    /// Level of the mixed output
    pub output_volume: f32,
    /// Sweep shape
    pub lfo_waveform: Waveform,
    /// Sweep frequency in Hz
    pub lfo_frequency: f64,
    /// Detune amount; `0` bypasses the stage
    pub depth: f32,
    /// Wet share, `[0, 1]`
    pub mix: f32,
    /// Sweep width as a share of the maximum modulation delay
    pub delay: f32,
}

/// Vibrato applied to both oscillators.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct VibratoParams {
    /// Master switch
    pub enabled: bool,
    /// Output scale of the vibrato LFO
    pub gain: f64,
    /// Depth; `1.0` swings one semitone
    pub lfo_depth: f64,
    /// LFO frequency in Hz
    pub lfo_frequency: f64,
    /// Static detune in cents
    pub tuning: f64,
}

/// Every parameter the stage chain reads in one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SynthParams {
    /// `synth-0-*` and `synth-1-*`
    pub oscillators: [OscillatorParams; STAGE_PAIRS],
    /// `low-pass-0-*` and `low-pass-1-*`
    pub low_pass: [LowPassParams; STAGE_PAIRS],
    /// `amplifier-0-*` and `amplifier-1-*`
    pub amplifiers: [AmplifierParams; STAGE_PAIRS],
    /// Linear noise level
    pub noise_gain: f32,
    /// Pitch shift in cents
    pub pitch_tuning: f64,
    /// `chorus-*`
    pub chorus: ChorusParams,
    /// `vibrato-*`
    pub vibrato: VibratoParams,
}
