//! Integration tests for resonar-config.
//!
//! These tests verify end-to-end functionality across modules: files on
//! disk, presets applied to live ports, and the feed built from a config.

use std::sync::Arc;

use resonar_config::{
    ConfigError, EngineConfig, FileOp, SynthPreset, factory_presets, get_factory_preset,
};
use resonar_signal::{Container, Note, Scope, SoundScope};
use resonar_synth::{FeedOutcome, Ports, StreamFeed, Tick};
use tempfile::TempDir;

/// Test saving a preset to disk and loading it back.
#[test]
fn test_preset_file_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested/presets/lead.toml");

    let preset = SynthPreset::new("Lead")
        .with_description("square lead")
        .with_param("synth-0-oscillator", 3.0)
        .with_param("chorus-mix", 0.25);
    preset.save(&path).unwrap();

    let loaded = SynthPreset::load(&path).unwrap();
    assert_eq!(loaded, preset);
}

/// Test capturing ports, saving, and restoring them onto a fresh store.
#[test]
fn test_capture_and_restore_ports() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("captured.toml");

    let ports = Ports::new();
    ports.set("synth-1-octave", -2.0).unwrap();
    ports.set("vibrato-enabled", 1.0).unwrap();
    SynthPreset::capture("Captured", &ports).save(&path).unwrap();

    let restored = Ports::new();
    let applied = SynthPreset::load(&path).unwrap().apply(&restored).unwrap();
    assert_eq!(applied, 2);
    for (descriptor, value) in ports.iter() {
        assert_eq!(restored.get(&descriptor.name), Some(value), "{}", descriptor.name);
    }
}

/// Test that loading a missing file reports the path.
#[test]
fn test_missing_file_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("absent.toml");
    match SynthPreset::load(&path) {
        Err(err @ ConfigError::Io { op: FileOp::Read, .. }) => {
            assert!(err.to_string().contains("absent.toml"), "got: {err}");
        }
        other => panic!("expected a read error, got {other:?}"),
    }
}

/// Test that every factory preset renders sound through the feed.
#[test]
fn test_factory_presets_render() {
    let config = EngineConfig::default();
    let buffer_size = config.soundcard.buffer_size;

    for preset in factory_presets() {
        let ports = Arc::new(Ports::new());
        preset.apply(&ports).unwrap();
        let feed = StreamFeed::new(ports, config.note_mapping());

        let container = Container::new(config.audio_format());
        let instance = container.playback_instance(Scope::new(SoundScope::Playback));
        instance.stream_resize(2);

        let note = Note::new(0, 2, 57);
        for (i, tick) in (note.x0..note.x1).enumerate() {
            instance.set_current(i);
            let outcome = feed.stream_feed(&instance, &Tick::new(note, tick, 1.0, buffer_size));
            assert!(
                matches!(outcome, FeedOutcome::Rendered { .. }),
                "{}: {outcome:?}",
                preset.name
            );
        }
        feed.notify_remove(&instance, &note);

        let frames = instance.to_vec();
        assert!(frames.iter().all(|s| s.is_finite()), "{}", preset.name);
        assert!(frames.iter().any(|s| *s != 0.0), "{} is silent", preset.name);
    }
}

/// Test an engine config file driving the note mapping.
#[test]
fn test_engine_config_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("engine.toml");
    std::fs::write(
        &path,
        r#"
[soundcard]
samplerate = 48000
buffer_size = 512

[mapping]
audio_start_mapping = 10
midi_start_mapping = 60
"#,
    )
    .unwrap();

    let config = EngineConfig::load(&path).unwrap();
    assert_eq!(config.audio_format().samplerate, 48000);
    assert_eq!(config.note_mapping().midi_note(12), Some(62));

    let copy = dir.path().join("copy/engine.toml");
    config.save(&copy).unwrap();
    assert_eq!(EngineConfig::load(&copy).unwrap(), config);
}

/// Test that a factory preset can be modified and stays valid.
#[test]
fn test_modified_factory_preset() {
    let ports = Ports::new();
    let preset = get_factory_preset("chorus-pad")
        .unwrap()
        .with_param("chorus-mix", 1.0);
    preset.validate(&ports).unwrap();
    preset.apply(&ports).unwrap();
    assert_eq!(ports.get("chorus-mix"), Some(1.0));
}
