//! Owner of a container: the audio channel it buffers for.

use std::fmt;

/// An audio channel as seen by the signal tree.
///
/// Containers keep only a weak reference to their channel, so dropping the
/// channel never leaks through the tree.
pub trait AudioChannel: Send + Sync + fmt::Debug {
    /// Line index across the whole audio object.
    fn line(&self) -> usize;

    /// Index of the channel inside its pad, used to key voice tables.
    fn audio_channel(&self) -> usize;
}

/// Minimal [`AudioChannel`] carrying only its indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Channel {
    line: usize,
    audio_channel: usize,
}

impl Channel {
    /// Creates a channel at `line` with pad-local index `audio_channel`.
    pub fn new(line: usize, audio_channel: usize) -> Self {
        Self {
            line,
            audio_channel,
        }
    }
}

impl AudioChannel for Channel {
    fn line(&self) -> usize {
        self.line
    }

    fn audio_channel(&self) -> usize {
        self.audio_channel
    }
}
