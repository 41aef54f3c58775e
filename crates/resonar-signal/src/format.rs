//! Sample encodings and the format descriptor shared by containers and
//! signal instances.

use serde::{Deserialize, Serialize};

/// Default sample rate in Hz.
pub const DEFAULT_SAMPLERATE: u32 = 44100;
/// Default block length in frames.
pub const DEFAULT_BUFFER_SIZE: usize = 1024;

/// Encoding of the frames stored in a [`Buffer`](crate::Buffer).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SampleFormat {
    /// Signed 8 bit
    S8,
    /// Signed 16 bit
    #[default]
    S16,
    /// Signed 24 bit in a 32 bit word
    S24,
    /// Signed 32 bit
    S32,
    /// Signed 64 bit
    S64,
    /// 32 bit float
    Float,
    /// 64 bit float
    Double,
}

impl SampleFormat {
    /// Every supported encoding.
    pub const ALL: [SampleFormat; 7] = [
        SampleFormat::S8,
        SampleFormat::S16,
        SampleFormat::S24,
        SampleFormat::S32,
        SampleFormat::S64,
        SampleFormat::Float,
        SampleFormat::Double,
    ];

    /// Value that maps to `1.0`, or `None` for floating point encodings.
    pub fn full_scale(self) -> Option<f64> {
        match self {
            SampleFormat::S8 => Some(f64::from(i8::MAX)),
            SampleFormat::S16 => Some(f64::from(i16::MAX)),
            SampleFormat::S24 => Some(8_388_607.0),
            SampleFormat::S32 => Some(f64::from(i32::MAX)),
            SampleFormat::S64 => Some(i64::MAX as f64),
            SampleFormat::Float | SampleFormat::Double => None,
        }
    }

    /// Bytes a single frame occupies in memory.
    pub fn word_size(self) -> usize {
        match self {
            SampleFormat::S8 => 1,
            SampleFormat::S16 => 2,
            SampleFormat::S24 | SampleFormat::S32 | SampleFormat::Float => 4,
            SampleFormat::S64 | SampleFormat::Double => 8,
        }
    }

    /// Whether the encoding stores floating point frames.
    pub fn is_float(self) -> bool {
        self.full_scale().is_none()
    }
}

impl core::fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            SampleFormat::S8 => "s8",
            SampleFormat::S16 => "s16",
            SampleFormat::S24 => "s24",
            SampleFormat::S32 => "s32",
            SampleFormat::S64 => "s64",
            SampleFormat::Float => "float",
            SampleFormat::Double => "double",
        };
        f.write_str(name)
    }
}

/// `{samplerate, buffer_size, format}` descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioFormat {
    /// Frames per second
    pub samplerate: u32,
    /// Frames per buffer
    pub buffer_size: usize,
    /// Frame encoding
    pub format: SampleFormat,
}

impl AudioFormat {
    /// Creates a descriptor. A zero buffer size is raised to one frame.
    pub fn new(samplerate: u32, buffer_size: usize, format: SampleFormat) -> Self {
        Self {
            samplerate,
            buffer_size: buffer_size.max(1),
            format,
        }
    }

    /// Duration of one buffer in seconds.
    pub fn buffer_duration(&self) -> f64 {
        self.buffer_size as f64 / f64::from(self.samplerate.max(1))
    }
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLERATE, DEFAULT_BUFFER_SIZE, SampleFormat::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let f = AudioFormat::default();
        assert_eq!(f.samplerate, 44100);
        assert_eq!(f.buffer_size, 1024);
        assert_eq!(f.format, SampleFormat::S16);
    }

    #[test]
    fn test_zero_buffer_size_is_raised() {
        assert_eq!(AudioFormat::new(48000, 0, SampleFormat::Float).buffer_size, 1);
    }

    #[test]
    fn test_word_sizes() {
        assert_eq!(SampleFormat::S8.word_size(), 1);
        assert_eq!(SampleFormat::S24.word_size(), 4);
        assert_eq!(SampleFormat::Double.word_size(), 8);
    }

    #[test]
    fn test_float_has_no_full_scale() {
        assert!(SampleFormat::Float.is_float());
        assert!(!SampleFormat::S32.is_float());
        assert_eq!(SampleFormat::S16.full_scale(), Some(32767.0));
    }

    #[test]
    fn test_display_matches_serde_names() {
        assert_eq!(SampleFormat::Double.to_string(), "double");
        assert_eq!(SampleFormat::S24.to_string(), "s24");
    }
}
