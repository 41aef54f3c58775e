//! Port listing command.

use clap::Args;
use resonar_synth::Ports;

#[derive(Args)]
pub struct PortsArgs {
    /// Only list ports whose name starts with this prefix (e.g. "synth-0")
    #[arg(value_name = "PREFIX")]
    prefix: Option<String>,

    /// Print the port descriptors as JSON
    #[arg(long)]
    json: bool,
}

pub fn run(args: PortsArgs) -> anyhow::Result<()> {
    let ports = Ports::new();
    let descriptors: Vec<_> = ports
        .descriptors()
        .iter()
        .filter(|d| args.prefix.as_deref().is_none_or(|p| d.name.starts_with(p)))
        .collect();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&descriptors)?);
        return Ok(());
    }

    if descriptors.is_empty() {
        anyhow::bail!(
            "No ports match '{}'",
            args.prefix.as_deref().unwrap_or_default()
        );
    }

    println!("Synth Ports");
    println!("===========");
    println!();
    println!(
        "  {:<40} {:>10} {:>10} {:>10}",
        "Name", "Min", "Max", "Default"
    );
    println!("  {}", "-".repeat(73));
    for d in &descriptors {
        println!(
            "  {:<40} {:>10.3} {:>10.3} {:>10.3}{}",
            d.name,
            d.min,
            d.max,
            d.default,
            if d.stepped { "  (stepped)" } else { "" }
        );
    }
    println!();
    println!("{} ports", descriptors.len());

    Ok(())
}
