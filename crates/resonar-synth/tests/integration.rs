//! Integration tests for resonar-synth.
//!
//! Drives the stream feed the way a scheduler does: tick by tick over a
//! container tree, with onset, removal and scope cancellation.

use std::sync::Arc;
use std::thread;

use resonar_signal::{
    AudioChannel, AudioFormat, Channel, Container, DeviceInfo, Note, SampleFormat, Scope,
    SoundScope, Soundcard,
};
use resonar_synth::{FeedOutcome, NoteMapping, Ports, StreamFeed, Tick};

const BUFFER_SIZE: usize = 128;

fn format() -> AudioFormat {
    AudioFormat::new(44100, BUFFER_SIZE, SampleFormat::Float)
}

fn connected(audio_channel: usize) -> (Container, Arc<dyn AudioChannel>) {
    let channel: Arc<dyn AudioChannel> = Arc::new(Channel::new(audio_channel, audio_channel));
    let device: Arc<dyn Soundcard> = Arc::new(DeviceInfo::new("offline", format()));
    (Container::connect(&channel, device), channel)
}

/// Runs `note` to completion on a fresh playback instance, one buffer per
/// tick, and returns the rendered frames.
fn render_note(feed: &StreamFeed, container: &Container, note: Note) -> Vec<f32> {
    let scope = Scope::new(SoundScope::Playback);
    let instance = container.playback_instance(scope);
    instance.stream_resize(note.duration() as usize);
    container.add_instance(&instance).unwrap();

    for (i, tick) in (note.x0..note.x1).enumerate() {
        instance.set_current(i);
        let outcome = feed.stream_feed(&instance, &Tick::new(note, tick, 1.0, BUFFER_SIZE));
        assert!(matches!(outcome, FeedOutcome::Rendered { .. }), "tick {tick}: {outcome:?}");
    }
    feed.notify_remove(&instance, &note);
    instance.to_vec()
}

fn rms(frames: &[f32]) -> f32 {
    (frames.iter().map(|s| s * s).sum::<f32>() / frames.len().max(1) as f32).sqrt()
}

// ============================================================================
// 1. Rendering
// ============================================================================

#[test]
fn rendered_note_is_audible_and_finite() {
    let (container, _channel) = connected(0);
    let feed = StreamFeed::new(Arc::new(Ports::new()), NoteMapping::default());
    let frames = render_note(&feed, &container, Note::new(0, 8, 60));

    assert_eq!(frames.len(), 8 * BUFFER_SIZE);
    assert!(frames.iter().all(|s| s.is_finite()));
    assert!(rms(&frames) > 0.1);
    assert_eq!(feed.total_key_on(), 0);
}

#[test]
fn same_parameters_render_identically() {
    let (container, _channel) = connected(0);
    let feed = StreamFeed::new(Arc::new(Ports::new()), NoteMapping::default());
    let first = render_note(&feed, &container, Note::new(0, 4, 64));
    let second = render_note(&feed, &container, Note::new(0, 4, 64));
    assert_eq!(first, second);
}

#[test]
fn zero_volume_is_silent() {
    let (container, _channel) = connected(0);
    let ports = Arc::new(Ports::new());
    ports.set("synth-0-volume", 0.0).unwrap();
    ports.set("synth-1-volume", 0.0).unwrap();
    let feed = StreamFeed::new(ports, NoteMapping::default());
    let frames = render_note(&feed, &container, Note::new(0, 4, 60));
    assert!(frames.iter().all(|s| *s == 0.0));
}

#[test]
fn every_optional_stage_keeps_output_finite() {
    let (container, _channel) = connected(0);
    let ports = Arc::new(Ports::new());
    for (name, value) in [
        ("synth-0-sync-enabled", 1.0),
        ("synth-0-sync-attack-0", 2.5),
        ("synth-0-sync-attack-2", 6.0),
        ("synth-0-sync-phase-2", 1.0),
        ("synth-0-sync-lfo-frequency", 3.0),
        ("synth-1-lfo-depth", 0.5),
        ("synth-1-oscillator", 1.0),
        ("amplifier-1-amp-0-gain", 9.0),
        ("noise-gain", 0.2),
        ("pitch-tuning", -500.0),
        ("chorus-depth", 1.0),
        ("chorus-delay", 1.0),
        ("vibrato-enabled", 1.0),
    ] {
        ports.set(name, value).unwrap();
    }
    let feed = StreamFeed::new(ports, NoteMapping::default());
    let frames = render_note(&feed, &container, Note::new(0, 16, 55));
    assert!(frames.iter().all(|s| s.is_finite()));
    assert!(rms(&frames) > 0.01);
}

#[test]
fn higher_note_crosses_zero_more_often() {
    let (container, _channel) = connected(0);
    let ports = Arc::new(Ports::new());
    ports.set("synth-1-volume", 0.0).unwrap();
    ports.set("low-pass-0-cut-off-frequency", 22000.0).unwrap();
    ports.set("low-pass-1-cut-off-frequency", 22000.0).unwrap();
    let feed = StreamFeed::new(ports, NoteMapping::default());

    let crossings = |frames: &[f32]| {
        frames
            .windows(2)
            .filter(|w| w[0] <= 0.0 && w[1] > 0.0)
            .count()
    };
    let low = render_note(&feed, &container, Note::new(0, 16, 36));
    let high = render_note(&feed, &container, Note::new(0, 16, 48));
    let (low, high) = (crossings(&low), crossings(&high));
    // one octave apart
    assert!(high > low * 3 / 2, "low {low}, high {high}");
}

// ============================================================================
// 2. Voice bookkeeping
// ============================================================================

#[test]
fn voices_are_keyed_by_audio_channel() {
    let feed = StreamFeed::new(Arc::new(Ports::new()), NoteMapping::default());
    let scope = Scope::new(SoundScope::Playback);
    let note = Note::new(0, 4, 60);

    let mut keep = Vec::new();
    for audio_channel in 0..2 {
        let (container, channel) = connected(audio_channel);
        let instance = container.playback_instance(scope);
        instance.stream_resize(1);
        container.add_instance(&instance).unwrap();
        feed.stream_feed(&instance, &Tick::new(note, 0, 1.0, BUFFER_SIZE));
        keep.push((container, channel));
    }

    assert_eq!(feed.key_on(scope, 0, 60), 1);
    assert_eq!(feed.key_on(scope, 1, 60), 1);
    feed.resize_channels(1);
    assert_eq!(feed.key_on(scope, 1, 60), 0);
    assert_eq!(feed.total_key_on(), 1);
}

#[test]
fn overlapping_notes_share_a_voice() {
    let (container, _channel) = connected(0);
    let feed = StreamFeed::new(Arc::new(Ports::new()), NoteMapping::default());
    let scope = Scope::new(SoundScope::Playback);
    let instance = container.playback_instance(scope);
    instance.stream_resize(8);
    container.add_instance(&instance).unwrap();

    let a = Note::new(0, 4, 60);
    let b = Note::new(2, 6, 60);
    for tick in 0..6 {
        instance.set_current(tick as usize);
        for note in [a, b] {
            if note.covers(tick) {
                feed.stream_feed(&instance, &Tick::new(note, tick, 1.0, BUFFER_SIZE));
            }
        }
        if tick == 3 {
            assert_eq!(feed.key_on(scope, 0, 60), 2);
            assert_eq!(feed.notify_remove(&instance, &a), Some(1));
        }
    }
    assert_eq!(feed.notify_remove(&instance, &b), Some(0));
}

#[test]
fn cancelled_scope_releases_and_detaches() {
    let (container, _channel) = connected(0);
    let feed = StreamFeed::new(Arc::new(Ports::new()), NoteMapping::default());
    let live = Scope::new(SoundScope::Playback);
    let export = Scope::new(SoundScope::Playback);

    let mut instances = Vec::new();
    for scope in [live, export] {
        let instance = container.playback_instance(scope);
        instance.stream_resize(1);
        instance.add_note(Note::new(0, 4, 60));
        container.add_instance(&instance).unwrap();
        feed.stream_feed(&instance, &Tick::new(Note::new(0, 4, 60), 0, 1.0, BUFFER_SIZE));
        instances.push(instance);
    }

    let (removed, released) = feed.cancel_scope(&container, export);
    assert_eq!(removed.len(), 1);
    assert!(removed[0].container().is_none());
    assert_eq!(released.len(), 1);
    assert_eq!(released[0].key.scope, export);

    assert!(container.is_active(live));
    assert!(!container.is_active(export));
    assert_eq!(feed.key_on(live, 0, 60), 1);
}

// ============================================================================
// 3. Concurrency
// ============================================================================

#[test]
fn parallel_scopes_render_independently() {
    let (container, _channel) = connected(0);
    let feed = Arc::new(StreamFeed::new(Arc::new(Ports::new()), NoteMapping::default()));

    let handles: Vec<_> = (0..4u32)
        .map(|n| {
            let container = container.clone();
            let feed = Arc::clone(&feed);
            thread::spawn(move || {
                let note = Note::new(0, 8, 48 + n);
                render_note(&feed, &container, note)
            })
        })
        .collect();

    for handle in handles {
        let frames = handle.join().unwrap();
        assert!(rms(&frames) > 0.1);
    }
    assert_eq!(feed.total_key_on(), 0);
}
