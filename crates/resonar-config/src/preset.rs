//! Synth preset file format and operations.

use std::collections::BTreeMap;
use std::path::Path;

use resonar_synth::Ports;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::validation::validate_preset;

/// A named set of port values.
///
/// Ports missing from a preset keep their defaults when it is applied.
///
/// # TOML Format
///
/// ```toml
/// name = "Sync Lead"
/// description = "Hard-synced saw with a touch of chorus"
///
/// [params]
/// synth-0-oscillator = 1.0
/// synth-0-sync-enabled = 1.0
/// synth-0-sync-attack-0 = 4.5
/// chorus-depth = 0.3
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SynthPreset {
    /// Name of the preset.
    pub name: String,

    /// Optional description of the preset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Port values by port name.
    #[serde(default)]
    pub params: BTreeMap<String, f32>,
}

impl SynthPreset {
    /// Create an empty preset.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            params: BTreeMap::new(),
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set one port value.
    pub fn with_param(mut self, port: impl Into<String>, value: f32) -> Self {
        self.params.insert(port.into(), value);
        self
    }

    /// Captures every port of `ports` that differs from its default.
    pub fn capture(name: impl Into<String>, ports: &Ports) -> Self {
        let params = ports
            .iter()
            .filter(|(descriptor, value)| *value != descriptor.default)
            .map(|(descriptor, value)| (descriptor.name.clone(), value))
            .collect();
        Self {
            name: name.into(),
            description: None,
            params,
        }
    }

    /// Load a preset from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        Self::from_toml(&content)
    }

    /// Load a preset from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Save the preset to a TOML file.
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

    /// Convert the preset to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Number of port values.
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Whether the preset sets no ports.
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Checks every port name and value against `ports`.
    pub fn validate(&self, ports: &Ports) -> Result<(), ConfigError> {
        Ok(validate_preset(self, ports)?)
    }

    /// Resets `ports` to defaults, then writes every value of the preset.
    ///
    /// The preset is validated first; on error no port is touched.
    pub fn apply(&self, ports: &Ports) -> Result<usize, ConfigError> {
        self.validate(ports)?;
        ports.reset();
        for (port, &value) in &self.params {
            ports.set(port, value)?;
        }
        tracing::debug!(preset = %self.name, ports = self.params.len(), "preset applied");
        Ok(self.params.len())
    }
}

impl Default for SynthPreset {
    fn default() -> Self {
        Self::new("Untitled")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preset_builder() {
        let preset = SynthPreset::new("Lead")
            .with_description("bright")
            .with_param("synth-0-oscillator", 1.0)
            .with_param("noise-gain", 0.1);
        assert_eq!(preset.name, "Lead");
        assert_eq!(preset.description.as_deref(), Some("bright"));
        assert_eq!(preset.len(), 2);
    }

    #[test]
    fn test_from_toml() {
        let preset = SynthPreset::from_toml(
            r#"
name = "Pad"

[params]
chorus-depth = 0.4
synth-1-octave = -1.0
"#,
        )
        .unwrap();
        assert_eq!(preset.name, "Pad");
        assert!(preset.description.is_none());
        assert_eq!(preset.params.get("chorus-depth"), Some(&0.4));
    }

    #[test]
    fn test_missing_name_is_an_error() {
        assert!(SynthPreset::from_toml("[params]\nnoise-gain = 0.1\n").is_err());
    }

    #[test]
    fn test_apply_resets_then_writes() {
        let ports = Ports::new();
        ports.set("pitch-tuning", 200.0).unwrap();
        let preset = SynthPreset::new("Saw").with_param("synth-0-oscillator", 1.0);

        assert_eq!(preset.apply(&ports).unwrap(), 1);
        assert_eq!(ports.get("synth-0-oscillator"), Some(1.0));
        assert_eq!(ports.get("pitch-tuning"), Some(0.0));
    }

    #[test]
    fn test_apply_rejects_invalid_without_side_effects() {
        let ports = Ports::new();
        ports.set("pitch-tuning", 200.0).unwrap();
        let preset = SynthPreset::new("Bad").with_param("synth-3-key", 1.0);
        assert!(matches!(
            preset.apply(&ports),
            Err(ConfigError::Validation(_))
        ));
        assert_eq!(ports.get("pitch-tuning"), Some(200.0));
    }

    #[test]
    fn test_capture_keeps_changed_ports() {
        let ports = Ports::new();
        ports.set("chorus-mix", 0.8).unwrap();
        ports.set("vibrato-enabled", 1.0).unwrap();
        let preset = SynthPreset::capture("Snapshot", &ports);
        assert_eq!(preset.len(), 2);
        assert_eq!(preset.params.get("chorus-mix"), Some(&0.8));
    }
}
