//! Per-voice DSP stages run after the oscillators.
//!
//! Fixed order: low-pass ×2 → amplifier ×2 → noise → pitch → chorus. Each
//! stage is configured from the tick's [`SynthParams`](crate::SynthParams)
//! and then run through [`resonar_core::stage::run`], which skips stages
//! that are bypassed.

pub mod amplifier;
pub mod chorus;
pub mod lowpass;
pub mod noise;
pub mod pitch;

pub use amplifier::Amplifier;
pub use chorus::Chorus;
pub use lowpass::LowPass;
pub use noise::Noise;
pub use pitch::PitchShift;
