//! Block processing trait shared by every DSP stage of a voice.
//!
//! A voice renders one tick at a time into a scratch block, and each stage
//! transforms that block in place. Stages are stateful: they are created once
//! per voice slot and reused across notes, so [`Stage::reset`] must restore a
//! clean slate without reallocating.
//!
//! The trait is object-safe so a voice can walk its stages as
//! `&mut dyn Stage` in a fixed order.

/// Timing information for one processed block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockContext {
    /// Sample rate in Hz
    pub samplerate: f64,
    /// Absolute frame of the first sample in the block, counted from the
    /// note onset
    pub frame: u64,
    /// Fundamental frequency of the note in Hz
    pub frequency: f64,
}

impl BlockContext {
    /// Context for a block starting at `frame`.
    pub fn new(samplerate: f64, frame: u64, frequency: f64) -> Self {
        Self {
            samplerate,
            frame,
            frequency,
        }
    }
}

/// In-place block processor.
///
/// # Example
///
/// ```rust
/// use resonar_core::{BlockContext, Stage};
///
/// struct Gain(f32);
///
/// impl Stage for Gain {
///     fn process_block(&mut self, block: &mut [f32], _ctx: &BlockContext) {
///         for s in block.iter_mut() {
///             *s *= self.0;
///         }
///     }
///
///     fn is_active(&self) -> bool {
///         self.0 != 1.0
///     }
///
///     fn reset(&mut self) {}
/// }
///
/// let mut block = [1.0_f32; 4];
/// let ctx = BlockContext::new(44100.0, 0, 440.0);
/// resonar_core::stage::run(&mut Gain(0.5), &mut block, &ctx);
/// assert_eq!(block, [0.5; 4]);
/// ```
pub trait Stage {
    /// Transforms `block` in place.
    fn process_block(&mut self, block: &mut [f32], ctx: &BlockContext);

    /// Whether the stage currently changes the signal. Inactive stages are
    /// skipped and keep their state untouched.
    fn is_active(&self) -> bool {
        true
    }

    /// Clears internal history without touching parameters.
    fn reset(&mut self);

    /// Latency introduced by the stage, in frames.
    fn latency_frames(&self) -> usize {
        0
    }
}

/// Runs `stage` over `block` when it is active. Returns whether it ran.
#[inline]
pub fn run(stage: &mut dyn Stage, block: &mut [f32], ctx: &BlockContext) -> bool {
    if stage.is_active() {
        stage.process_block(block, ctx);
        true
    } else {
        false
    }
}
