//! Segmented copy planning across block sequences.
//!
//! Audio data lives in sequences of fixed-size blocks. Copying a frame range
//! from one sequence into another must split at every block boundary of
//! *both* sides, or a single copy would run past the end of a block. The
//! iterators here compute those splits once, so callers only move data.
//!
//! - [`Segments`] plans a linear copy.
//! - [`LoopedSegments`] plans a copy whose source repeats a loop region and
//!   goes silent past its end when no loop is set.
//! - [`Boundaries`] splits a single frame range at block boundaries.

/// A position inside a block sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    /// Block index
    pub block: usize,
    /// Frame offset inside the block
    pub offset: usize,
}

impl Cursor {
    /// Splits an absolute frame position into block and offset.
    #[inline]
    pub fn at(position: usize, block_size: usize) -> Self {
        Self {
            block: position / block_size,
            offset: position % block_size,
        }
    }
}

/// One contiguous copy: `len` frames from `src` (or silence) into `dst`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CopyStep {
    /// Destination start
    pub dst: Cursor,
    /// Source start; `None` means the step is silence
    pub src: Option<Cursor>,
    /// Frame count, never zero
    pub len: usize,
}

/// Linear copy plan. See [`segments`].
#[derive(Debug, Clone)]
pub struct Segments {
    dst_pos: usize,
    src_pos: usize,
    remaining: usize,
    dst_block: usize,
    src_block: usize,
}

/// Plans copying `len` frames from absolute source frame `src_start` into
/// absolute destination frame `dst_start`.
///
/// No step straddles a block boundary on either side. A zero block size
/// yields an empty plan.
///
/// # Example
///
/// ```rust
/// use resonar_core::segment::segments;
///
/// // 12 frames, destination blocks of 4, source blocks of 6
/// let lens: Vec<usize> = segments(2, 0, 12, 4, 6).map(|s| s.len).collect();
/// assert_eq!(lens, vec![2, 4, 4, 2]);
/// ```
pub fn segments(
    dst_start: usize,
    src_start: usize,
    len: usize,
    dst_block: usize,
    src_block: usize,
) -> Segments {
    let remaining = if dst_block == 0 || src_block == 0 { 0 } else { len };
    Segments {
        dst_pos: dst_start,
        src_pos: src_start,
        remaining,
        dst_block,
        src_block,
    }
}

impl Iterator for Segments {
    type Item = CopyStep;

    fn next(&mut self) -> Option<CopyStep> {
        if self.remaining == 0 {
            return None;
        }

        let dst = Cursor::at(self.dst_pos, self.dst_block);
        let src = Cursor::at(self.src_pos, self.src_block);
        let len = self
            .remaining
            .min(self.dst_block - dst.offset)
            .min(self.src_block - src.offset);

        self.dst_pos += len;
        self.src_pos += len;
        self.remaining -= len;

        Some(CopyStep {
            dst,
            src: Some(src),
            len,
        })
    }
}

/// Looped copy plan. See [`looped_segments`].
#[derive(Debug, Clone)]
pub struct LoopedSegments {
    dst_pos: usize,
    read_pos: usize,
    remaining: usize,
    dst_block: usize,
    src_block: usize,
    src_len: usize,
    loop_region: Option<(usize, usize)>,
}

/// Plans filling `len` destination frames starting at `dst_start` from a
/// source of `src_len` frames, read from `src_start`.
///
/// When `loop_start < loop_end <= src_len` the source region
/// `[loop_start, loop_end)` repeats once reading reaches `loop_end`.
/// Without a valid loop, reading past `src_len` produces silence steps.
pub fn looped_segments(
    dst_start: usize,
    src_start: usize,
    len: usize,
    dst_block: usize,
    src_block: usize,
    src_len: usize,
    loop_start: usize,
    loop_end: usize,
) -> LoopedSegments {
    let remaining = if dst_block == 0 || src_block == 0 { 0 } else { len };
    let loop_region = (loop_start < loop_end && loop_end <= src_len).then_some((loop_start, loop_end));
    #[cfg(feature = "tracing")]
    if loop_region.is_none() && loop_start != loop_end {
        tracing::debug!(loop_start, loop_end, src_len, "loop region ignored");
    }
    LoopedSegments {
        dst_pos: dst_start,
        read_pos: src_start,
        remaining,
        dst_block,
        src_block,
        src_len,
        loop_region,
    }
}

impl Iterator for LoopedSegments {
    type Item = CopyStep;

    fn next(&mut self) -> Option<CopyStep> {
        if self.remaining == 0 {
            return None;
        }

        let limit = match self.loop_region {
            Some((start, end)) => {
                if self.read_pos >= end {
                    self.read_pos = start + (self.read_pos - end) % (end - start);
                }
                Some(end - self.read_pos)
            }
            None if self.read_pos < self.src_len => Some(self.src_len - self.read_pos),
            None => None,
        };

        let dst = Cursor::at(self.dst_pos, self.dst_block);
        let mut len = self.remaining.min(self.dst_block - dst.offset);

        let src = limit.map(|limit| {
            let src = Cursor::at(self.read_pos, self.src_block);
            len = len.min(limit).min(self.src_block - src.offset);
            src
        });

        self.dst_pos += len;
        self.read_pos += len;
        self.remaining -= len;

        Some(CopyStep { dst, src, len })
    }
}

/// Splits `[start, start + len)` at multiples of `block`.
///
/// Yields `(position, len)` pairs in order.
#[derive(Debug, Clone)]
pub struct Boundaries {
    pos: u64,
    end: u64,
    block: u64,
}

/// See [`Boundaries`]. A zero block size yields the whole range at once.
pub fn boundaries(start: u64, len: u64, block: u64) -> Boundaries {
    Boundaries {
        pos: start,
        end: start + len,
        block,
    }
}

/// First multiple of `block` strictly greater than `position`.
#[inline]
pub fn next_boundary(position: u64, block: u64) -> u64 {
    if block == 0 {
        u64::MAX
    } else {
        (position / block + 1) * block
    }
}

impl Iterator for Boundaries {
    type Item = (u64, u64);

    fn next(&mut self) -> Option<(u64, u64)> {
        if self.pos >= self.end {
            return None;
        }
        let stop = next_boundary(self.pos, self.block).min(self.end);
        let item = (self.pos, stop - self.pos);
        self.pos = stop;
        Some(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_splits_on_both_sides() {
        let steps: Vec<CopyStep> = segments(2, 0, 12, 4, 6).collect();
        let lens: Vec<usize> = steps.iter().map(|s| s.len).collect();
        assert_eq!(lens, vec![2, 4, 4, 2]);
        assert_eq!(steps[0].dst, Cursor { block: 0, offset: 2 });
        assert_eq!(steps[2].src, Some(Cursor { block: 1, offset: 0 }));
        assert_eq!(steps[3].dst, Cursor { block: 3, offset: 0 });
        assert_eq!(steps[3].src, Some(Cursor { block: 1, offset: 4 }));
    }

    #[test]
    fn test_linear_zero_block_is_empty() {
        assert_eq!(segments(0, 0, 10, 0, 4).count(), 0);
        assert_eq!(segments(0, 0, 10, 4, 0).count(), 0);
    }

    #[test]
    fn test_looped_without_loop_pads_silence() {
        let steps: Vec<CopyStep> = looped_segments(0, 0, 10, 8, 8, 6, 0, 0).collect();
        let covered: usize = steps.iter().map(|s| s.len).sum();
        assert_eq!(covered, 10);
        assert!(steps[0].src.is_some());
        assert_eq!(steps[0].len, 6);
        assert!(steps[1].src.is_none());
    }

    #[test]
    fn test_looped_repeats_region() {
        // source of 8 frames, loop [2, 6), fill 14 frames
        let steps: Vec<CopyStep> = looped_segments(0, 0, 14, 64, 64, 8, 2, 6).collect();
        let mut read = Vec::new();
        for s in &steps {
            let src = s.src.expect("looped source never goes silent");
            read.extend(src.offset..src.offset + s.len);
        }
        assert_eq!(read, vec![0, 1, 2, 3, 4, 5, 2, 3, 4, 5, 2, 3, 4, 5]);
    }

    #[test]
    fn test_looped_invalid_loop_is_ignored() {
        let steps: Vec<CopyStep> = looped_segments(0, 0, 12, 16, 16, 8, 6, 20).collect();
        assert_eq!(steps.iter().filter(|s| s.src.is_none()).map(|s| s.len).sum::<usize>(), 4);
    }

    #[test]
    fn test_boundaries() {
        let parts: Vec<(u64, u64)> = boundaries(250, 20, 256).collect();
        assert_eq!(parts, vec![(250, 6), (256, 14)]);
        let whole: Vec<(u64, u64)> = boundaries(3, 5, 0).collect();
        assert_eq!(whole, vec![(3, 5)]);
    }

    #[test]
    fn test_next_boundary() {
        assert_eq!(next_boundary(0, 256), 256);
        assert_eq!(next_boundary(255, 256), 256);
        assert_eq!(next_boundary(256, 256), 512);
    }
}
