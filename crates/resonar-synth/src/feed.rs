//! Stream-feed: per-tick rendering of notes into playback instances.
//!
//! The scheduler calls [`StreamFeed::stream_feed`] once per tick for every
//! note that covers the tick, passing the playback instance whose current
//! buffer receives the audio. [`StreamFeed::notify_remove`] is called once
//! when the note ends.
//!
//! # Timing
//!
//! A tick maps onto absolute note-relative frames as
//!
//! ```text
//! frame_offset = floor(((offset_counter - x0) * delay + delay_counter) * buffer_size)
//! frame_count  = floor(((offset_counter - x0) * delay + delay_counter + 1) * buffer_size)
//! ```
//!
//! In 256th mode the offset is taken from the 256th counters instead:
//! `floor((offset_lower_256th - x0_256th) * delay_256th * buffer_size)`.
//!
//! # Locking
//!
//! The container lock is taken and released to resolve the audio channel,
//! then the instance lock is held while the voice table lock renders into
//! the current buffer. This keeps the Container → Instance → Voice order.

use std::cell::RefCell;
use std::sync::Arc;

use parking_lot::ReentrantMutex;
use resonar_signal::{Container, Note, Scope, SignalInstance};

use crate::ports::Ports;
use crate::voice::{Released, VoiceKey, VoiceTable};

/// 256th-precision counters of a tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Note256th {
    /// Lower bound of the tick in 256th units
    pub offset_lower: u64,
    /// Ticks per buffer in 256th units
    pub delay: f64,
}

/// Everything the scheduler passes for one tick of one note.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tick {
    /// The note being rendered
    pub note: Note,
    /// Fractional position inside the current tick, in buffers
    pub delay_counter: f64,
    /// Current tick
    pub offset_counter: u64,
    /// Frame budget of the whole note; `0` means unbounded
    pub frame_count: usize,
    /// Buffers per tick
    pub delay: f64,
    /// Frames per buffer
    pub buffer_size: usize,
    /// Present when the scheduler runs in 256th mode
    pub note_256th: Option<Note256th>,
}

impl Tick {
    /// A tick of `note` at `offset_counter` with no sub-tick delay.
    pub fn new(note: Note, offset_counter: u64, delay: f64, buffer_size: usize) -> Self {
        Self {
            note,
            delay_counter: 0.0,
            offset_counter,
            frame_count: 0,
            delay,
            buffer_size,
            note_256th: None,
        }
    }

    /// Elapsed buffers since the note onset at the start of this tick.
    fn elapsed(&self) -> f64 {
        (self.offset_counter as f64 - self.note.x0 as f64) * self.delay + self.delay_counter
    }

    /// Whether this is the note's onset tick.
    pub fn is_onset(&self) -> bool {
        self.delay_counter.floor() == 0.0 && self.note.x0 == self.offset_counter
    }
}

/// First absolute frame of `tick`, counted from the note onset.
///
/// Ticks before the onset clamp to zero.
///
/// # Example
///
/// ```rust
/// use resonar_signal::Note;
/// use resonar_synth::feed::{Tick, frame_offset};
///
/// let note = Note::new(4, 8, 60);
/// assert_eq!(frame_offset(&Tick::new(note, 4, 1.0, 256)), 0);
/// assert_eq!(frame_offset(&Tick::new(note, 5, 1.0, 256)), 256);
/// assert_eq!(frame_offset(&Tick::new(note, 6, 1.0, 256)), 512);
/// ```
pub fn frame_offset(tick: &Tick) -> u64 {
    let bs = tick.buffer_size as f64;
    let frames = match tick.note_256th {
        Some(n) => (n.offset_lower as f64 - tick.note.x0_256th as f64) * n.delay * bs,
        None => tick.elapsed() * bs,
    };
    frames.floor().max(0.0) as u64
}

/// Exclusive end frame of `tick`.
pub fn frame_count_for_tick(tick: &Tick) -> u64 {
    let bs = tick.buffer_size as f64;
    match tick.note_256th {
        Some(_) => frame_offset(tick) + (tick.delay * bs).floor().max(0.0) as u64,
        None => ((tick.elapsed() + 1.0) * bs).floor().max(0.0) as u64,
    }
}

/// Maps score rows onto MIDI notes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoteMapping {
    /// First row of the audio object
    pub audio_start: i64,
    /// MIDI note of the first row
    pub midi_start: i64,
    /// Rows count downwards from the top
    pub reverse: bool,
}

impl NoteMapping {
    /// MIDI note of row `y`, `None` outside `[0, 128)`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use resonar_synth::NoteMapping;
    ///
    /// let mapping = NoteMapping { audio_start: 0, midi_start: 24, reverse: false };
    /// assert_eq!(mapping.midi_note(36), Some(60));
    /// assert_eq!(mapping.midi_note(120), None);
    /// ```
    pub fn midi_note(&self, y: u32) -> Option<u8> {
        let y = i64::from(y);
        let midi = if self.reverse {
            128 - y - 1 - self.audio_start + self.midi_start
        } else {
            y - self.audio_start + self.midi_start
        };
        u8::try_from(midi).ok().filter(|&m| m < 128)
    }
}

/// Result of one [`StreamFeed::stream_feed`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedOutcome {
    /// Frames were mixed into the current buffer
    Rendered {
        /// Frames mixed
        frames: usize,
        /// Whether this tick started the note
        onset: bool,
    },
    /// The note maps outside the MIDI range
    OutOfRange,
    /// The source is not a playback instance
    NotPlayback,
    /// The note's frame budget is used up or the buffer size is zero
    Exhausted,
    /// The source has no current buffer to mix into
    NoBuffer,
}

/// Per-note synthesis front end of one audio object.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use resonar_signal::{AudioFormat, Container, Note, SampleFormat, Scope, SoundScope};
/// use resonar_synth::{FeedOutcome, NoteMapping, Ports, StreamFeed, Tick};
///
/// let container = Container::new(AudioFormat::new(44100, 256, SampleFormat::Float));
/// let instance = container.playback_instance(Scope::new(SoundScope::Playback));
/// instance.stream_resize(1);
///
/// let feed = StreamFeed::new(Arc::new(Ports::new()), NoteMapping::default());
/// let note = Note::new(0, 4, 60);
/// let outcome = feed.stream_feed(&instance, &Tick::new(note, 0, 1.0, 256));
/// assert_eq!(outcome, FeedOutcome::Rendered { frames: 256, onset: true });
/// ```
pub struct StreamFeed {
    ports: Arc<Ports>,
    mapping: NoteMapping,
    voices: ReentrantMutex<RefCell<VoiceTable>>,
}

impl StreamFeed {
    /// Creates a feed reading `ports`.
    pub fn new(ports: Arc<Ports>, mapping: NoteMapping) -> Self {
        Self {
            ports,
            mapping,
            voices: ReentrantMutex::new(RefCell::new(VoiceTable::new())),
        }
    }

    /// Parameter ports.
    pub fn ports(&self) -> &Arc<Ports> {
        &self.ports
    }

    /// Row mapping.
    pub fn mapping(&self) -> NoteMapping {
        self.mapping
    }

    fn with_voices<R>(&self, f: impl FnOnce(&mut VoiceTable) -> R) -> R {
        let guard = self.voices.lock();
        let mut table = guard.borrow_mut();
        f(&mut table)
    }

    fn voice_key(source: &SignalInstance, scope: Scope) -> VoiceKey {
        let audio_channel = source
            .container()
            .and_then(|container| container.channel())
            .map_or(0, |channel| channel.audio_channel());
        VoiceKey::new(scope, audio_channel)
    }

    /// Renders one tick of `tick.note` and mixes it into the current buffer
    /// of `source`.
    ///
    /// Never fails: out-of-range notes and unusable sources are skipped
    /// without touching any state.
    pub fn stream_feed(&self, source: &SignalInstance, tick: &Tick) -> FeedOutcome {
        let Some(midi) = self.mapping.midi_note(tick.note.y) else {
            tracing::trace!(y = tick.note.y, "note outside midi range");
            return FeedOutcome::OutOfRange;
        };
        let Some(scope) = source.scope() else {
            return FeedOutcome::NotPlayback;
        };
        let key = Self::voice_key(source, scope);

        let offset = frame_offset(tick);
        let end = frame_count_for_tick(tick);
        let mut len = tick.buffer_size;
        if tick.frame_count > 0 {
            len = len.min((tick.frame_count as u64).saturating_sub(offset) as usize);
        }
        if len == 0 {
            return FeedOutcome::Exhausted;
        }

        let onset = tick.is_onset();
        let params = self.ports.snapshot();
        let samplerate = f64::from(source.samplerate());

        tracing::trace!(
            midi,
            offset,
            end,
            len,
            onset,
            offset_counter = tick.offset_counter,
            "stream feed"
        );

        let mixed = source.with_buffer_mut(source.current(), |buffer| {
            self.with_voices(|table| {
                let voice = table.voice_mut(key, midi, samplerate);
                if onset {
                    voice.note_on(&params, samplerate);
                }
                let rendered = voice.render(&params, offset, len, tick.buffer_size, samplerate);
                buffer.mix(0, rendered)
            })
        });

        match mixed {
            Some(frames) => FeedOutcome::Rendered { frames, onset },
            None => FeedOutcome::NoBuffer,
        }
    }

    /// Releases one hold of the voice `note` started on `source`. Returns
    /// the remaining holds, or `None` when the note holds nothing there.
    ///
    /// Every onset must be matched by exactly one release. A release with
    /// no hold left is a caller bug: it panics in debug builds and is
    /// logged and ignored in release builds.
    pub fn notify_remove(&self, source: &SignalInstance, note: &Note) -> Option<u32> {
        let midi = self.mapping.midi_note(note.y)?;
        let scope = source.scope()?;
        let key = Self::voice_key(source, scope);
        self.with_voices(|table| {
            let voice = table.get_mut(key, midi)?;
            debug_assert!(
                voice.is_sounding(),
                "note {midi} removed more often than it started"
            );
            if !voice.is_sounding() {
                tracing::error!(midi, "note removed from a voice that holds nothing");
                return None;
            }
            Some(voice.release())
        })
    }

    /// Holds of the voice for `midi` under (`scope`, `audio_channel`).
    pub fn key_on(&self, scope: Scope, audio_channel: usize, midi: u8) -> u32 {
        self.with_voices(|table| {
            table
                .get(VoiceKey::new(scope, audio_channel), midi)
                .map_or(0, |voice| voice.key_on())
        })
    }

    /// Sum of holds across every voice.
    pub fn total_key_on(&self) -> u64 {
        self.with_voices(|table| table.total_key_on())
    }

    /// Drops the voices of audio channels at or above `channels`.
    pub fn resize_channels(&self, channels: usize) {
        self.with_voices(|table| table.truncate_channels(channels));
    }

    /// Cancels `scope` on `container`: removes its playback instances and
    /// releases every voice still sounding for it.
    ///
    /// The removed instances are returned so the caller can drop their
    /// partially rendered buffers.
    pub fn cancel_scope(&self, container: &Container, scope: Scope) -> (Vec<SignalInstance>, Vec<Released>) {
        let removed = container.remove_scope(scope);
        let released = self.with_voices(|table| table.remove_scope(scope));
        tracing::debug!(
            container = %container.id(),
            instances = removed.len(),
            voices = released.len(),
            "scope cancelled"
        );
        (removed, released)
    }
}

impl std::fmt::Debug for StreamFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamFeed")
            .field("mapping", &self.mapping)
            .field("ports", &self.ports)
            .finish_non_exhaustive()
    }
}
