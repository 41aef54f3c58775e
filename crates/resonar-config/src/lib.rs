//! Configuration and preset management for resonar.
//!
//! # Features
//!
//! - **Engine config**: Device format, row mapping and timing mode from TOML
//! - **Synth presets**: Named port values, loaded, saved, validated and
//!   applied to a [`Ports`](resonar_synth::Ports) store
//! - **Validation**: Port names and ranges checked against the live ports
//! - **Factory presets**: Built-in starting points
//!
//! # Example
//!
//! ```rust
//! use resonar_config::{EngineConfig, SynthPreset};
//! use resonar_synth::Ports;
//!
//! let config = EngineConfig::from_toml("[soundcard]\nbuffer_size = 256\n").unwrap();
//! assert_eq!(config.audio_format().buffer_size, 256);
//!
//! let ports = Ports::new();
//! SynthPreset::new("Saw")
//!     .with_param("synth-0-oscillator", 1.0)
//!     .apply(&ports)
//!     .unwrap();
//! assert_eq!(ports.get("synth-0-oscillator"), Some(1.0));
//! ```

mod engine;
mod error;
mod preset;

/// Preset and configuration validation.
pub mod validation;

/// Factory presets bundled with the library.
pub mod factory_presets;

pub use engine::{EngineConfig, MappingConfig, SoundcardConfig, TimingConfig};
pub use error::{ConfigError, FileOp};
pub use factory_presets::{
    FACTORY_PRESET_NAMES, factory_presets, get_factory_preset, is_factory_preset,
};
pub use preset::SynthPreset;
pub use validation::{
    ValidationError, ValidationResult, validate_engine, validate_port_value, validate_preset,
};
