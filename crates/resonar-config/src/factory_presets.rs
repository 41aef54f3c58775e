//! Factory presets bundled with the library.
//!
//! These are embedded at compile time and always available, so the renderer
//! can be pointed at a preset name without any file on disk.

use crate::SynthPreset;
use crate::error::ConfigError;

/// Array of factory preset names for external access.
pub static FACTORY_PRESET_NAMES: &[&str] = &["init", "sync-lead", "chorus-pad", "noise-hit"];

static FACTORY_PRESETS_TOML: &[(&str, &str)] = &[
    ("init", INIT_PRESET),
    ("sync-lead", SYNC_LEAD_PRESET),
    ("chorus-pad", CHORUS_PAD_PRESET),
    ("noise-hit", NOISE_HIT_PRESET),
];

const INIT_PRESET: &str = r#"
name = "Init"
description = "Every port at its default"
"#;

const SYNC_LEAD_PRESET: &str = r#"
name = "Sync Lead"
description = "Hard-synced saw over a sine, opened filter"

[params]
synth-0-oscillator = 1.0
synth-0-sync-enabled = 1.0
synth-0-sync-relative-attack-factor = 0.3
synth-0-sync-attack-0 = 4.5
synth-0-sync-phase-0 = 0.0
synth-0-sync-attack-1 = 7.0
synth-0-sync-phase-1 = 1.57
synth-1-volume = 0.4
low-pass-0-cut-off-frequency = 6000.0
low-pass-1-cut-off-frequency = 9000.0
"#;

const CHORUS_PAD_PRESET: &str = r#"
name = "Chorus Pad"
description = "Detuned triangles with a slow chorus and vibrato"

[params]
synth-0-oscillator = 2.0
synth-1-oscillator = 2.0
synth-1-octave = -1.0
synth-1-lfo-tuning = 7.0
chorus-depth = 0.6
chorus-delay = 0.4
chorus-lfo-frequency = 0.3
chorus-mix = 0.5
vibrato-enabled = 1.0
vibrato-lfo-depth = 0.2
vibrato-lfo-freq = 5.0
"#;

const NOISE_HIT_PRESET: &str = r#"
name = "Noise Hit"
description = "Square with pitched noise and a mid boost"

[params]
synth-0-oscillator = 3.0
synth-1-volume = 0.0
noise-gain = 0.4
amplifier-0-amp-1-gain = 6.0
amplifier-0-filter-gain = -3.0
"#;

/// Parse every factory preset.
pub fn factory_presets() -> Vec<SynthPreset> {
    FACTORY_PRESETS_TOML
        .iter()
        .filter_map(|(_, toml)| SynthPreset::from_toml(toml).ok())
        .collect()
}

/// Look up a factory preset by its id.
pub fn get_factory_preset(name: &str) -> Result<SynthPreset, ConfigError> {
    let (_, toml) = FACTORY_PRESETS_TOML
        .iter()
        .find(|(id, _)| *id == name)
        .ok_or_else(|| ConfigError::PresetNotFound(name.to_string()))?;
    SynthPreset::from_toml(toml)
}

/// Whether `name` is a factory preset id.
pub fn is_factory_preset(name: &str) -> bool {
    FACTORY_PRESET_NAMES.contains(&name)
}
