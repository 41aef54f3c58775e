//! Note extents attached to playback instances.

use uuid::Uuid;

/// A note on the score: `[x0, x1)` in ticks, `y` the key row.
///
/// The 256th-precision bounds are used when the scheduler runs in
/// sub-tick mode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Note {
    /// Identity, stable across copies
    pub id: Uuid,
    /// Onset tick
    pub x0: u64,
    /// End tick (exclusive)
    pub x1: u64,
    /// Key row in the audio object's mapping
    pub y: u32,
    /// Onset in 256th ticks
    pub x0_256th: u64,
    /// End in 256th ticks
    pub x1_256th: u64,
}

impl Note {
    /// Creates a note spanning `[x0, x1)` on row `y`. The 256th bounds are
    /// derived as `x * 16`.
    pub fn new(x0: u64, x1: u64, y: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            x0,
            x1: x1.max(x0),
            y,
            x0_256th: x0 * 16,
            x1_256th: x1.max(x0) * 16,
        }
    }

    /// Length in ticks.
    pub fn duration(&self) -> u64 {
        self.x1 - self.x0
    }

    /// Whether tick `offset` falls inside the note.
    pub fn covers(&self, offset: u64) -> bool {
        (self.x0..self.x1).contains(&offset)
    }
}
