//! Read-only view of an audio device.
//!
//! Device backends live outside the engine. Containers and instances only
//! hold shared references to them and read their format and the note offset
//! the device is currently rendering.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::format::AudioFormat;

/// A device as seen by the signal tree.
pub trait Soundcard: Send + Sync + fmt::Debug {
    /// Human readable device name.
    fn name(&self) -> &str;

    /// Format the device renders at.
    fn audio_format(&self) -> AudioFormat;

    /// Tick index the device is currently rendering.
    fn note_offset(&self) -> u64;
}

/// Plain in-memory [`Soundcard`], used by offline rendering and tests.
#[derive(Debug)]
pub struct DeviceInfo {
    name: String,
    format: AudioFormat,
    note_offset: AtomicU64,
}

impl DeviceInfo {
    /// Creates a device with the given format.
    pub fn new(name: impl Into<String>, format: AudioFormat) -> Self {
        Self {
            name: name.into(),
            format,
            note_offset: AtomicU64::new(0),
        }
    }

    /// Moves the device to tick `offset`.
    pub fn set_note_offset(&self, offset: u64) {
        self.note_offset.store(offset, Ordering::Release);
    }

    /// Advances the device by one tick and returns the new offset.
    pub fn advance(&self) -> u64 {
        self.note_offset.fetch_add(1, Ordering::AcqRel) + 1
    }
}

impl Soundcard for DeviceInfo {
    fn name(&self) -> &str {
        &self.name
    }

    fn audio_format(&self) -> AudioFormat {
        self.format
    }

    fn note_offset(&self) -> u64 {
        self.note_offset.load(Ordering::Acquire)
    }
}
