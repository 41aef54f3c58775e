//! Resonar Core - DSP primitives for the resonar voice engine
//!
//! This crate provides the building blocks the signal tree and the per-note
//! synthesis pipeline are made of. Nothing here allocates while processing.
//!
//! # Core Abstractions
//!
//! ## Stages
//!
//! - [`Stage`] - Object-safe in-place block processor
//! - [`BlockContext`] - Timing of one processed block
//!
//! ## Shapes and Modulation
//!
//! - [`Waveform`] - Closed set of oscillator shapes (sine, sawtooth,
//!   triangle, square, impulse)
//! - [`Lfo`] - Low-frequency oscillator with frame alignment
//!
//! ## Filters and Delay
//!
//! - [`Biquad`] / [`Coefficients`] - RBJ cookbook second-order sections
//! - [`DelayLine`] - Circular delay with fractional reads
//!
//! ## Block Copy Planning
//!
//! - [`segment::segments`] - Linear copy split at block boundaries
//! - [`segment::looped_segments`] - Copy repeating a loop region
//! - [`segment::boundaries`] - Split a frame range at block boundaries
//!
//! ## Utilities
//!
//! - Pitch: [`key_to_frequency`], [`cents_to_ratio`], [`guard_frequency`]
//! - Level: [`db_to_linear`], [`linear_to_db`]
//!
//! # no_std Support
//!
//! Disable the default `std` feature to use the crate on embedded targets:
//!
//! ```toml
//! [dependencies]
//! resonar-core = { version = "0.1", default-features = false }
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

pub mod biquad;
pub mod delay;
pub mod lfo;
pub mod math;
pub mod segment;
pub mod stage;
pub mod waveform;

pub use biquad::{Biquad, Coefficients};
pub use delay::{DelayLine, Interpolation};
pub use lfo::Lfo;
pub use math::{
    A4_FREQUENCY, MIN_FREQUENCY, cents_to_ratio, db_to_linear, guard_frequency, key_to_frequency,
    linear_to_db, wrap_unit,
};
pub use segment::{CopyStep, Cursor};
pub use stage::{BlockContext, Stage};
pub use waveform::Waveform;
