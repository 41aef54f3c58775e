//! Engine configuration file.

use std::path::Path;

use resonar_signal::{AudioFormat, DEFAULT_BUFFER_SIZE, DEFAULT_SAMPLERATE, SampleFormat};
use resonar_synth::NoteMapping;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::validation::validate_engine;

/// Engine settings loaded from TOML.
///
/// Every field has a default, so an empty file is a valid configuration.
///
/// # TOML Format
///
/// ```toml
/// [soundcard]
/// samplerate = 48000
/// buffer_size = 256
/// format = "float"
///
/// [mapping]
/// audio_start_mapping = 0
/// midi_start_mapping = 0
/// reverse = false
///
/// [timing]
/// use_256th = false
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Device format.
    pub soundcard: SoundcardConfig,
    /// Row to MIDI note mapping.
    pub mapping: MappingConfig,
    /// Scheduler timing.
    pub timing: TimingConfig,
}

/// `[soundcard]` table.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SoundcardConfig {
    /// Frames per second.
    pub samplerate: u32,
    /// Frames per buffer.
    pub buffer_size: usize,
    /// Frame encoding.
    pub format: SampleFormat,
}

impl Default for SoundcardConfig {
    fn default() -> Self {
        Self {
            samplerate: DEFAULT_SAMPLERATE,
            buffer_size: DEFAULT_BUFFER_SIZE,
            format: SampleFormat::default(),
        }
    }
}

/// `[mapping]` table.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MappingConfig {
    /// First row of the audio object.
    pub audio_start_mapping: i64,
    /// MIDI note of the first row.
    pub midi_start_mapping: i64,
    /// Rows count downwards.
    pub reverse: bool,
}

/// `[timing]` table.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TimingConfig {
    /// Place ticks with 256th-note precision.
    pub use_256th: bool,
}

impl EngineConfig {
    /// Load and validate a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        let config = Self::from_toml(&content)?;
        tracing::debug!(path = %path.display(), "engine config loaded");
        Ok(config)
    }

    /// Parse and validate a configuration string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml_str)?;
        validate_engine(&config)?;
        Ok(config)
    }

    /// Save the configuration to a TOML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
        }
        std::fs::write(path, self.to_toml()?).map_err(|e| ConfigError::write_file(path, e))
    }

    /// Convert the configuration to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Format for containers and devices.
    pub fn audio_format(&self) -> AudioFormat {
        AudioFormat::new(
            self.soundcard.samplerate,
            self.soundcard.buffer_size,
            self.soundcard.format,
        )
    }

    /// Row mapping for the stream feed.
    pub fn note_mapping(&self) -> NoteMapping {
        NoteMapping {
            audio_start: self.mapping.audio_start_mapping,
            midi_start: self.mapping.midi_start_mapping,
            reverse: self.mapping.reverse,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = EngineConfig::from_toml("").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.audio_format(), AudioFormat::default());
    }

    #[test]
    fn test_partial_tables() {
        let config = EngineConfig::from_toml(
            r#"
[soundcard]
buffer_size = 256
format = "float"

[timing]
use_256th = true
"#,
        )
        .unwrap();
        assert_eq!(config.soundcard.samplerate, DEFAULT_SAMPLERATE);
        assert_eq!(config.soundcard.buffer_size, 256);
        assert_eq!(config.soundcard.format, SampleFormat::Float);
        assert!(config.timing.use_256th);
    }

    #[test]
    fn test_note_mapping() {
        let config = EngineConfig::from_toml(
            r#"
[mapping]
midi_start_mapping = 24
reverse = true
"#,
        )
        .unwrap();
        let mapping = config.note_mapping();
        assert_eq!(mapping.midi_start, 24);
        assert!(mapping.reverse);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = EngineConfig::from_toml("[soundcard]\nsamplerate = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)), "got: {err}");

        let err = EngineConfig::from_toml("[soundcard]\nformat = \"s12\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::TomlParse(_)), "got: {err}");
    }

    #[test]
    fn test_toml_round_trip() {
        let mut config = EngineConfig::default();
        config.soundcard.format = SampleFormat::S24;
        config.mapping.audio_start_mapping = 3;
        let parsed = EngineConfig::from_toml(&config.to_toml().unwrap()).unwrap();
        assert_eq!(parsed, config);
    }
}
