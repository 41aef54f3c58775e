//! Resonar Synth - per-note stream-feed synthesis
//!
//! This crate turns scheduler ticks into audio. For every note covering a
//! tick, [`StreamFeed`] picks the note's [`Voice`], renders one buffer
//! through the voice's stage chain and mixes it into the playback
//! instance's current buffer.
//!
//! # Stage chain
//!
//! ```text
//! oscillator 0 ─┐
//!               ├─> low-pass ×2 ─> amplifier ×2 ─> noise ─> pitch ─> chorus
//! oscillator 1 ─┘
//! ```
//!
//! - [`oscillator`] - Phase-accumulating oscillators with FM and vibrato
//! - [`sync`] - Four-slot hard-sync schedule splitting a tick into sub-segments
//! - [`stages`] - Low-pass, amplifier, noise, pitch shift and chorus
//!
//! Stages whose parameters make them a no-op (zero noise gain, zero pitch
//! tuning, chorus disabled or at zero depth) are skipped.
//!
//! # Parameters
//!
//! [`Ports`] holds every control as a lock-free named value. The feed takes
//! one [`SynthParams`] snapshot per tick.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use resonar_signal::{AudioFormat, Container, Note, SampleFormat, Scope, SoundScope};
//! use resonar_synth::{NoteMapping, Ports, StreamFeed, Tick};
//!
//! let container = Container::new(AudioFormat::new(48000, 128, SampleFormat::Float));
//! let scope = Scope::new(SoundScope::Playback);
//! let instance = container.playback_instance(scope);
//! instance.stream_resize(1);
//! container.add_instance(&instance).unwrap();
//!
//! let ports = Arc::new(Ports::new());
//! ports.set("synth-0-octave", -1.0).unwrap();
//!
//! let feed = StreamFeed::new(ports, NoteMapping::default());
//! let note = Note::new(0, 1, 57);
//! feed.stream_feed(&instance, &Tick::new(note, 0, 1.0, 128));
//! feed.notify_remove(&instance, &note);
//!
//! assert_eq!(feed.total_key_on(), 0);
//! ```

pub mod feed;
pub mod oscillator;
pub mod ports;
pub mod stages;
pub mod sync;
pub mod voice;

pub use feed::{FeedOutcome, Note256th, NoteMapping, StreamFeed, Tick, frame_count_for_tick, frame_offset};
pub use oscillator::{Oscillator, Vibrato, note_frequency};
pub use ports::{PortDescriptor, PortError, Ports, SynthParams};
pub use sync::{SubSegment, SyncSchedule, SyncTiming};
pub use voice::{Released, Voice, VoiceKey, VoiceTable};
