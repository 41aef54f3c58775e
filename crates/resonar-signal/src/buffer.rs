//! Fixed-length block of encoded sample frames.
//!
//! A [`Buffer`] stores its frames in the declared [`SampleFormat`] and
//! converts to and from normalized `f32` at the edges. Integer encodings map
//! full scale to `±1.0` and saturate on the way in.

use crate::format::SampleFormat;

/// Storage word of one encoding.
trait Word: Copy + Default {
    fn decode(self, full_scale: f64) -> f64;
    fn encode(value: f64, full_scale: f64) -> Self;
}

macro_rules! int_word {
    ($($t:ty),*) => {$(
        impl Word for $t {
            #[inline]
            fn decode(self, full_scale: f64) -> f64 {
                self as f64 / full_scale
            }

            #[inline]
            fn encode(value: f64, full_scale: f64) -> Self {
                (value.clamp(-1.0, 1.0) * full_scale).round() as $t
            }
        }
    )*};
}

int_word!(i8, i16, i32, i64);

impl Word for f32 {
    #[inline]
    fn decode(self, _full_scale: f64) -> f64 {
        f64::from(self)
    }

    #[inline]
    fn encode(value: f64, _full_scale: f64) -> Self {
        value as f32
    }
}

impl Word for f64 {
    #[inline]
    fn decode(self, _full_scale: f64) -> f64 {
        self
    }

    #[inline]
    fn encode(value: f64, _full_scale: f64) -> Self {
        value
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Frames {
    S8(Vec<i8>),
    S16(Vec<i16>),
    S24(Vec<i32>),
    S32(Vec<i32>),
    S64(Vec<i64>),
    Float(Vec<f32>),
    Double(Vec<f64>),
}

/// Dispatches `$body` with `$v` bound to the typed frame vector and `$fs`
/// to the full-scale value of the encoding.
macro_rules! dispatch {
    ($frames:expr, $v:ident, $fs:ident => $body:expr) => {
        match $frames {
            Frames::S8($v) => {
                let $fs = f64::from(i8::MAX);
                $body
            }
            Frames::S16($v) => {
                let $fs = f64::from(i16::MAX);
                $body
            }
            Frames::S24($v) => {
                let $fs = 8_388_607.0;
                $body
            }
            Frames::S32($v) => {
                let $fs = f64::from(i32::MAX);
                $body
            }
            Frames::S64($v) => {
                let $fs = i64::MAX as f64;
                $body
            }
            Frames::Float($v) => {
                let $fs = 1.0;
                $body
            }
            Frames::Double($v) => {
                let $fs = 1.0;
                $body
            }
        }
    };
}

/// A block of frames in one encoding.
///
/// # Example
///
/// ```rust
/// use resonar_signal::{Buffer, SampleFormat};
///
/// let mut buffer = Buffer::new(SampleFormat::S16, 4);
/// buffer.write(0, &[0.5, -0.5]);
/// assert!((buffer.get(0) - 0.5).abs() < 1e-4);
/// assert_eq!(buffer.get(3), 0.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Buffer {
    frames: Frames,
}

impl Default for Buffer {
    /// Zero frames of `Float`.
    fn default() -> Self {
        Self {
            frames: Frames::Float(Vec::new()),
        }
    }
}

impl Buffer {
    /// Creates `len` zeroed frames.
    pub fn new(format: SampleFormat, len: usize) -> Self {
        let frames = match format {
            SampleFormat::S8 => Frames::S8(vec![0; len]),
            SampleFormat::S16 => Frames::S16(vec![0; len]),
            SampleFormat::S24 => Frames::S24(vec![0; len]),
            SampleFormat::S32 => Frames::S32(vec![0; len]),
            SampleFormat::S64 => Frames::S64(vec![0; len]),
            SampleFormat::Float => Frames::Float(vec![0.0; len]),
            SampleFormat::Double => Frames::Double(vec![0.0; len]),
        };
        Self { frames }
    }

    /// Creates a buffer holding `samples` encoded as `format`.
    pub fn from_samples(format: SampleFormat, samples: &[f32]) -> Self {
        let mut buffer = Self::new(format, samples.len());
        buffer.write(0, samples);
        buffer
    }

    /// Encoding of the stored frames.
    pub fn format(&self) -> SampleFormat {
        match self.frames {
            Frames::S8(_) => SampleFormat::S8,
            Frames::S16(_) => SampleFormat::S16,
            Frames::S24(_) => SampleFormat::S24,
            Frames::S32(_) => SampleFormat::S32,
            Frames::S64(_) => SampleFormat::S64,
            Frames::Float(_) => SampleFormat::Float,
            Frames::Double(_) => SampleFormat::Double,
        }
    }

    /// Frame count.
    pub fn len(&self) -> usize {
        dispatch!(&self.frames, v, _fs => v.len())
    }

    /// Whether the buffer holds no frames.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Normalized frame at `index`, or `0.0` past the end.
    #[inline]
    pub fn get(&self, index: usize) -> f32 {
        dispatch!(&self.frames, v, fs => v.get(index).map_or(0.0, |w| w.decode(fs) as f32))
    }

    /// Stores a normalized frame. Writes past the end are dropped.
    #[inline]
    pub fn set(&mut self, index: usize, value: f32) {
        dispatch!(&mut self.frames, v, fs => {
            if let Some(w) = v.get_mut(index) {
                *w = Word::encode(f64::from(value), fs);
            }
        })
    }

    /// Decodes frames starting at `offset` into `out`. Returns the number of
    /// frames read.
    pub fn read(&self, offset: usize, out: &mut [f32]) -> usize {
        dispatch!(&self.frames, v, fs => {
            let src = v.get(offset..).unwrap_or(&[]);
            let n = src.len().min(out.len());
            for (o, w) in out[..n].iter_mut().zip(src) {
                *o = w.decode(fs) as f32;
            }
            n
        })
    }

    /// Encodes `input` over the frames starting at `offset`. Returns the
    /// number of frames written.
    pub fn write(&mut self, offset: usize, input: &[f32]) -> usize {
        dispatch!(&mut self.frames, v, fs => {
            let dst = v.get_mut(offset..).unwrap_or(&mut []);
            let n = dst.len().min(input.len());
            for (w, i) in dst[..n].iter_mut().zip(input) {
                *w = Word::encode(f64::from(*i), fs);
            }
            n
        })
    }

    /// Adds `input` onto the frames starting at `offset`, saturating integer
    /// encodings. Returns the number of frames mixed.
    pub fn mix(&mut self, offset: usize, input: &[f32]) -> usize {
        dispatch!(&mut self.frames, v, fs => {
            let dst = v.get_mut(offset..).unwrap_or(&mut []);
            let n = dst.len().min(input.len());
            for (w, i) in dst[..n].iter_mut().zip(input) {
                *w = Word::encode(w.decode(fs) + f64::from(*i), fs);
            }
            n
        })
    }

    /// Copies `len` frames from `src` at `src_offset` to `dst_offset`,
    /// converting the encoding when it differs. Both ranges are clamped to
    /// their buffer; returns the number of frames copied.
    pub fn copy_from(
        &mut self,
        dst_offset: usize,
        src: &Buffer,
        src_offset: usize,
        len: usize,
    ) -> usize {
        let n = len
            .min(self.len().saturating_sub(dst_offset))
            .min(src.len().saturating_sub(src_offset));
        if n == 0 {
            return 0;
        }

        if self.format() != src.format() {
            for i in 0..n {
                let value = src.get_f64(src_offset + i);
                self.set_f64(dst_offset + i, value);
            }
            return n;
        }

        let dst = dst_offset..dst_offset + n;
        let from = src_offset..src_offset + n;
        match (&mut self.frames, &src.frames) {
            (Frames::S8(d), Frames::S8(s)) => d[dst].copy_from_slice(&s[from]),
            (Frames::S16(d), Frames::S16(s)) => d[dst].copy_from_slice(&s[from]),
            (Frames::S24(d), Frames::S24(s)) | (Frames::S32(d), Frames::S32(s)) => {
                d[dst].copy_from_slice(&s[from]);
            }
            (Frames::S64(d), Frames::S64(s)) => d[dst].copy_from_slice(&s[from]),
            (Frames::Float(d), Frames::Float(s)) => d[dst].copy_from_slice(&s[from]),
            (Frames::Double(d), Frames::Double(s)) => d[dst].copy_from_slice(&s[from]),
            _ => unreachable!("formats compared equal"),
        }
        n
    }

    fn get_f64(&self, index: usize) -> f64 {
        dispatch!(&self.frames, v, fs => v.get(index).map_or(0.0, |w| w.decode(fs)))
    }

    fn set_f64(&mut self, index: usize, value: f64) {
        dispatch!(&mut self.frames, v, fs => {
            if let Some(w) = v.get_mut(index) {
                *w = Word::encode(value, fs);
            }
        })
    }

    /// Zeroes every frame.
    pub fn clear(&mut self) {
        dispatch!(&mut self.frames, v, _fs => v.fill(Default::default()))
    }

    /// Zeroes `len` frames from `offset`, clamped to the buffer.
    pub fn clear_range(&mut self, offset: usize, len: usize) {
        dispatch!(&mut self.frames, v, _fs => {
            let end = offset.saturating_add(len).min(v.len());
            if offset < end {
                v[offset..end].fill(Default::default());
            }
        })
    }

    /// Changes the frame count. Growth is zero-filled.
    pub fn resize(&mut self, len: usize) {
        dispatch!(&mut self.frames, v, _fs => v.resize(len, Default::default()))
    }

    /// Re-encodes every frame as `format`.
    pub fn convert(&mut self, format: SampleFormat) {
        if format == self.format() {
            return;
        }
        let mut converted = Buffer::new(format, self.len());
        for i in 0..self.len() {
            converted.set_f64(i, self.get_f64(i));
        }
        *self = converted;
    }

    /// Whether every frame is zero.
    pub fn is_silent(&self) -> bool {
        dispatch!(&self.frames, v, fs => v.iter().all(|w| w.decode(fs) == 0.0))
    }

    /// Decodes the whole buffer.
    pub fn to_vec(&self) -> Vec<f32> {
        let mut out = vec![0.0; self.len()];
        self.read(0, &mut out);
        out
    }
}
