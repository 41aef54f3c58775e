//! Preset and engine configuration validation.
//!
//! Port names and ranges come from a [`Ports`] store, so validation always
//! matches the ports the synth actually exposes.
//!
//! # Example
//!
//! ```rust
//! use resonar_config::{SynthPreset, validate_preset};
//! use resonar_synth::Ports;
//!
//! let ports = Ports::new();
//! let preset = SynthPreset::new("Lead").with_param("synth-0-octave", 1.0);
//! validate_preset(&preset, &ports).expect("valid preset");
//!
//! let broken = SynthPreset::new("Broken").with_param("synth-0-octave", 9.0);
//! assert!(validate_preset(&broken, &ports).is_err());
//! ```

use resonar_synth::Ports;
use thiserror::Error;

use crate::engine::EngineConfig;
use crate::preset::SynthPreset;

/// Validation error types.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// Unknown port name.
    #[error("unknown port '{port}'")]
    UnknownPort {
        /// Name of the unrecognized port.
        port: String,
    },

    /// Port value out of range.
    #[error("port '{port}' value {value} out of range [{min}, {max}]")]
    OutOfRange {
        /// Name of the port.
        port: String,
        /// The value that was out of range.
        value: f32,
        /// Minimum allowed value.
        min: f32,
        /// Maximum allowed value.
        max: f32,
    },

    /// Invalid configuration field.
    #[error("invalid value for '{field}': {reason}")]
    InvalidField {
        /// Dotted field path, e.g. `soundcard.buffer_size`.
        field: String,
        /// Description of the problem.
        reason: String,
    },

    /// Multiple validation errors.
    #[error("multiple validation errors: {}", .0.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; "))]
    Multiple(Vec<ValidationError>),
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

fn collect(mut errors: Vec<ValidationError>) -> ValidationResult<()> {
    match errors.len() {
        0 => Ok(()),
        1 => Err(errors.remove(0)),
        _ => Err(ValidationError::Multiple(errors)),
    }
}

/// Checks one `(port, value)` pair against `ports`.
pub fn validate_port_value(ports: &Ports, port: &str, value: f32) -> ValidationResult<()> {
    let descriptor = ports
        .descriptor(port)
        .ok_or_else(|| ValidationError::UnknownPort {
            port: port.to_string(),
        })?;
    if value.is_finite() && (descriptor.min..=descriptor.max).contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::OutOfRange {
            port: port.to_string(),
            value,
            min: descriptor.min,
            max: descriptor.max,
        })
    }
}

/// Checks every parameter of `preset`, reporting all problems at once.
pub fn validate_preset(preset: &SynthPreset, ports: &Ports) -> ValidationResult<()> {
    collect(
        preset
            .params
            .iter()
            .filter_map(|(port, &value)| validate_port_value(ports, port, value).err())
            .collect(),
    )
}

/// Checks the fields of an engine configuration.
pub fn validate_engine(config: &EngineConfig) -> ValidationResult<()> {
    let mut errors = Vec::new();
    if config.soundcard.samplerate == 0 {
        errors.push(ValidationError::InvalidField {
            field: "soundcard.samplerate".to_string(),
            reason: "must be positive".to_string(),
        });
    }
    if config.soundcard.buffer_size == 0 {
        errors.push(ValidationError::InvalidField {
            field: "soundcard.buffer_size".to_string(),
            reason: "must be positive".to_string(),
        });
    }
    if !(0..128).contains(&config.mapping.midi_start_mapping) {
        errors.push(ValidationError::InvalidField {
            field: "mapping.midi_start_mapping".to_string(),
            reason: "must be a MIDI note in [0, 128)".to_string(),
        });
    }
    collect(errors)
}
