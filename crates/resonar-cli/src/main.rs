//! Resonar CLI - offline renderer and port/preset tools for the resonar engine.

mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "resonar")]
#[command(author, version, about = "Resonar engine CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a note through the stream feed into a WAV file
    Render(commands::render::RenderArgs),

    /// List the synth parameter ports
    Ports(commands::ports::PortsArgs),

    /// Validate a preset file or list the factory presets
    Preset(commands::preset::PresetArgs),
}

fn main() -> anyhow::Result<()> {
    use tracing_subscriber::EnvFilter;

    // Log to stderr so `ports --json` output stays machine readable.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();
    tracing_log::LogTracer::init().ok();

    let cli = Cli::parse();

    match cli.command {
        Commands::Render(args) => commands::render::run(args),
        Commands::Ports(args) => commands::ports::run(args),
        Commands::Preset(args) => commands::preset::run(args),
    }
}
