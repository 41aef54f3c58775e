//! Integration tests for resonar-cli.
//!
//! Tests cover the CLI binary invocation: port listing, preset validation
//! and end-to-end offline rendering to WAV.

use std::process::Command;

use tempfile::TempDir;

/// Helper to get the path to the `resonar` binary built by cargo.
fn resonar_bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_resonar"))
}

fn wav_info(path: &std::path::Path) -> (hound::WavSpec, u32) {
    let reader = hound::WavReader::open(path).expect("output should be a WAV file");
    (reader.spec(), reader.duration())
}

// ---------------------------------------------------------------------------
// CLI binary tests -- `resonar --help`
// ---------------------------------------------------------------------------

#[test]
fn cli_help_works() {
    let output = resonar_bin()
        .arg("--help")
        .output()
        .expect("failed to run resonar --help");

    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Resonar engine CLI"));
    assert!(stdout.contains("render"));
    assert!(stdout.contains("ports"));
    assert!(stdout.contains("preset"));
}

// ---------------------------------------------------------------------------
// CLI binary tests -- `resonar ports`
// ---------------------------------------------------------------------------

#[test]
fn cli_ports_lists_every_group() {
    let output = resonar_bin()
        .arg("ports")
        .output()
        .expect("failed to run resonar ports");

    assert!(output.status.success(), "resonar ports failed");

    let stdout = String::from_utf8_lossy(&output.stdout);
    for port in [
        "synth-0-oscillator",
        "synth-1-sync-attack-3",
        "low-pass-1-cut-off-frequency",
        "amplifier-0-amp-2-gain",
        "noise-gain",
        "pitch-tuning",
        "chorus-depth",
        "vibrato-lfo-freq",
    ] {
        assert!(stdout.contains(port), "ports listing should contain '{port}'");
    }
}

#[test]
fn cli_ports_json_is_parseable() {
    let output = resonar_bin()
        .args(["ports", "chorus", "--json"])
        .output()
        .expect("failed to run resonar ports --json");

    assert!(output.status.success());

    let ports: Vec<serde_json::Value> =
        serde_json::from_slice(&output.stdout).expect("stdout should be JSON");
    assert_eq!(ports.len(), 8);
    assert!(
        ports
            .iter()
            .all(|p| p["name"].as_str().is_some_and(|n| n.starts_with("chorus-")))
    );
}

#[test]
fn cli_ports_unknown_prefix_fails() {
    let output = resonar_bin()
        .args(["ports", "reverb"])
        .output()
        .expect("failed to run resonar ports");

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("reverb"));
}

// ---------------------------------------------------------------------------
// CLI binary tests -- `resonar preset`
// ---------------------------------------------------------------------------

#[test]
fn cli_preset_lists_factory_presets() {
    let output = resonar_bin()
        .arg("preset")
        .output()
        .expect("failed to run resonar preset");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("sync-lead"));
    assert!(stdout.contains("chorus-pad"));
}

#[test]
fn cli_preset_validates_file() {
    let dir = TempDir::new().unwrap();
    let good = dir.path().join("good.toml");
    std::fs::write(
        &good,
        "name = \"Good\"\n\n[params]\nsynth-0-oscillator = 1.0\nnoise-gain = 0.1\n",
    )
    .unwrap();

    let output = resonar_bin().arg("preset").arg(&good).output().unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("OK: 2 ports"));

    let bad = dir.path().join("bad.toml");
    std::fs::write(&bad, "name = \"Bad\"\n\n[params]\nsynth-0-octave = 40.0\n").unwrap();

    let output = resonar_bin().arg("preset").arg(&bad).output().unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("synth-0-octave"), "got: {stderr}");
}

// ---------------------------------------------------------------------------
// CLI binary tests -- `resonar render`
// ---------------------------------------------------------------------------

#[test]
fn cli_render_writes_wav() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("note.wav");

    let output = resonar_bin()
        .arg("render")
        .arg(&out)
        .args(["--note", "57", "--length", "8"])
        .output()
        .expect("failed to run resonar render");

    assert!(
        output.status.success(),
        "render failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let (spec, frames) = wav_info(&out);
    assert_eq!(spec.sample_rate, 44100);
    assert_eq!(spec.bits_per_sample, 16);
    assert_eq!(frames, 8 * 1024);
}

#[test]
fn cli_render_with_config_preset_and_overrides() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("engine.toml");
    std::fs::write(
        &config,
        "[soundcard]\nsamplerate = 48000\nbuffer_size = 256\nformat = \"float\"\n\n[timing]\nuse_256th = true\n",
    )
    .unwrap();
    let out = dir.path().join("chord.wav");

    let output = resonar_bin()
        .arg("render")
        .arg(&out)
        .args(["--note", "60", "--note", "64", "--note", "67"])
        .args(["--length", "16", "--preset", "chorus-pad"])
        .args(["--set", "noise-gain=0.1"])
        .arg("--config")
        .arg(&config)
        .output()
        .expect("failed to run resonar render");

    assert!(
        output.status.success(),
        "render failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let (spec, frames) = wav_info(&out);
    assert_eq!(spec.sample_rate, 48000);
    assert_eq!(spec.sample_format, hound::SampleFormat::Float);
    assert_eq!(frames, 16 * 256);

    let samples: Vec<f32> = hound::WavReader::open(&out)
        .unwrap()
        .into_samples::<f32>()
        .map(Result::unwrap)
        .collect();
    assert!(samples.iter().all(|s| s.is_finite()));
    assert!(samples.iter().any(|s| *s != 0.0));
}

#[test]
fn cli_render_rejects_unknown_port() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("never.wav");

    let output = resonar_bin()
        .arg("render")
        .arg(&out)
        .args(["--set", "reverb-mix=0.5"])
        .output()
        .expect("failed to run resonar render");

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("reverb-mix"));
    assert!(!out.exists());
}
