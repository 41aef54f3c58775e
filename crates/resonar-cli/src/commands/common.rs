//! Shared CLI helpers used across multiple commands.

use std::path::{Path, PathBuf};

use resonar_config::{EngineConfig, SynthPreset, get_factory_preset, is_factory_preset};

/// Parse a `port=value` string for clap's `value_parser`.
pub fn parse_port_value(s: &str) -> Result<(String, f32), String> {
    let (port, value) = s
        .split_once('=')
        .ok_or_else(|| format!("Invalid port assignment: '{s}' (expected port=value)"))?;
    let value = value
        .trim()
        .parse::<f32>()
        .map_err(|e| format!("Invalid value for '{port}': {e}"))?;
    Ok((port.trim().to_string(), value))
}

/// Load a preset by factory name or file path.
pub fn load_preset(name: &str) -> anyhow::Result<SynthPreset> {
    if is_factory_preset(name) {
        return Ok(get_factory_preset(name)?);
    }

    let path = PathBuf::from(name);
    if path.exists() {
        return Ok(SynthPreset::load(&path)?);
    }

    anyhow::bail!("Preset '{name}' not found. Use 'resonar preset' to see factory presets.")
}

/// Load the engine config, or the defaults when no path is given.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<EngineConfig> {
    match path {
        Some(path) => Ok(EngineConfig::load(path)?),
        None => Ok(EngineConfig::default()),
    }
}
