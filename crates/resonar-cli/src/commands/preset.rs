//! Preset validation command.

use std::path::PathBuf;

use clap::Args;
use resonar_config::{FACTORY_PRESET_NAMES, SynthPreset, get_factory_preset};
use resonar_synth::Ports;

#[derive(Args)]
pub struct PresetArgs {
    /// Preset file to validate; lists the factory presets when omitted
    #[arg(value_name = "FILE")]
    file: Option<PathBuf>,
}

pub fn run(args: PresetArgs) -> anyhow::Result<()> {
    let Some(path) = args.file else {
        list_factory();
        return Ok(());
    };

    let preset = SynthPreset::load(&path)?;
    let ports = Ports::new();
    if let Err(e) = preset.validate(&ports) {
        tracing::error!(path = %path.display(), "invalid preset");
        anyhow::bail!("{}: {e}", path.display());
    }

    println!("{}", preset.name);
    println!("{}", "=".repeat(preset.name.len()));
    if let Some(description) = &preset.description {
        println!();
        println!("{description}");
    }
    println!();
    for (port, value) in &preset.params {
        println!("  {port:<40} {value:>10.3}");
    }
    println!();
    println!("OK: {} ports", preset.len());

    Ok(())
}

fn list_factory() {
    println!("Factory Presets");
    println!("===============");
    println!();
    for id in FACTORY_PRESET_NAMES {
        if let Ok(preset) = get_factory_preset(id) {
            println!(
                "  {:<16} {}",
                id,
                preset.description.as_deref().unwrap_or_default()
            );
        }
    }
}
