//! Render scopes.
//!
//! A [`Scope`] names one concurrent rendering pass over the container tree,
//! such as live playback or an export. Every playback instance belongs to
//! exactly one scope, and a container holds at most one playback instance
//! per scope.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_SCOPE_ID: AtomicU64 = AtomicU64::new(1);

/// What kind of pass a scope renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SoundScope {
    /// Live playback of the arrangement
    Playback,
    /// Pattern sequencer
    Sequencer,
    /// Note editor preview
    Notation,
    /// Recorded wave playback
    Wave,
    /// Live MIDI input
    Midi,
}

/// Opaque render-pass token. Copies compare equal; fresh scopes never do.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Scope {
    id: u64,
    kind: SoundScope,
}

impl Scope {
    /// Allocates a new scope of `kind`.
    pub fn new(kind: SoundScope) -> Self {
        Self {
            id: NEXT_SCOPE_ID.fetch_add(1, Ordering::Relaxed),
            kind,
        }
    }

    /// Pass kind.
    pub fn kind(&self) -> SoundScope {
        self.kind
    }

    /// Process-unique id.
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Scope({:?}#{})", self.kind, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scopes_are_unique() {
        let a = Scope::new(SoundScope::Playback);
        let b = Scope::new(SoundScope::Playback);
        assert_ne!(a, b);
        assert_eq!(a, a);
        assert_eq!(a.kind(), SoundScope::Playback);
        assert!(format!("{a:?}").starts_with("Scope(Playback#"));
    }
}
