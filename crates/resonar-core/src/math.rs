//! Pitch and level math shared by every stage.
//!
//! All functions are allocation-free and `no_std` friendly. Pitch math runs
//! in `f64` because frame positions of long notes exceed the precision of
//! `f32` long before they overflow.
//!
//! # Pitch
//!
//! - [`key_to_frequency`] - Semitones relative to A4 to Hz
//! - [`cents_to_ratio`] - Cents to a frequency multiplier
//! - [`guard_frequency`] - Clamp a frequency away from zero
//!
//! # Level
//!
//! - [`db_to_linear`] / [`linear_to_db`]

use libm::{exp2, expf, floor, logf};

/// Reference pitch of key `0` (A4).
pub const A4_FREQUENCY: f64 = 440.0;

/// Smallest frequency any stage is allowed to divide by.
pub const MIN_FREQUENCY: f64 = 1.0e-3;

/// Converts a semitone distance from A4 into a frequency in Hz.
///
/// # Example
/// ```rust
/// use resonar_core::key_to_frequency;
///
/// assert!((key_to_frequency(0.0) - 440.0).abs() < 1e-9);
/// assert!((key_to_frequency(12.0) - 880.0).abs() < 1e-9);
/// assert!((key_to_frequency(-12.0) - 220.0).abs() < 1e-9);
/// ```
#[inline]
pub fn key_to_frequency(semitones: f64) -> f64 {
    exp2(semitones / 12.0) * A4_FREQUENCY
}

/// Converts a pitch offset in cents into a frequency ratio.
///
/// `1200` cents is one octave, so `cents_to_ratio(1200.0) == 2.0`.
#[inline]
pub fn cents_to_ratio(cents: f64) -> f64 {
    exp2(cents / 1200.0)
}

/// Clamps `frequency` to at least [`MIN_FREQUENCY`].
///
/// Phase and period math divides by the frequency; a zero or negative value
/// coming from a parameter port must never reach it.
#[inline]
pub fn guard_frequency(frequency: f64) -> f64 {
    if frequency.is_nan() || frequency < MIN_FREQUENCY {
        MIN_FREQUENCY
    } else {
        frequency
    }
}

/// Fractional part in `[0, 1)`, also for negative inputs.
#[inline]
pub fn wrap_unit(x: f64) -> f64 {
    x - floor(x)
}

/// Convert decibels to linear gain.
///
/// # Example
/// ```rust
/// use resonar_core::db_to_linear;
///
/// assert!((db_to_linear(0.0) - 1.0).abs() < 0.001);
/// assert!((db_to_linear(-6.02) - 0.5).abs() < 0.01);
/// ```
#[inline]
pub fn db_to_linear(db: f32) -> f32 {
    const FACTOR: f32 = core::f32::consts::LN_10 / 20.0;
    expf(db * FACTOR)
}

/// Convert linear gain to decibels. Inputs are floored at -200 dB.
#[inline]
pub fn linear_to_db(linear: f32) -> f32 {
    const FACTOR: f32 = 20.0 / core::f32::consts::LN_10;
    logf(linear.max(1e-10)) * FACTOR
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_to_frequency_octaves() {
        assert!((key_to_frequency(24.0) - 1760.0).abs() < 1e-9);
        // middle C is 9 semitones below A4
        assert!((key_to_frequency(-9.0) - 261.6255653005986).abs() < 1e-9);
    }

    #[test]
    fn test_cents_to_ratio() {
        assert!((cents_to_ratio(0.0) - 1.0).abs() < 1e-12);
        assert!((cents_to_ratio(1200.0) - 2.0).abs() < 1e-12);
        assert!((cents_to_ratio(-1200.0) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_guard_frequency() {
        assert_eq!(guard_frequency(0.0), MIN_FREQUENCY);
        assert_eq!(guard_frequency(-20.0), MIN_FREQUENCY);
        assert_eq!(guard_frequency(f64::NAN), MIN_FREQUENCY);
        assert_eq!(guard_frequency(440.0), 440.0);
    }

    #[test]
    fn test_wrap_unit() {
        assert!((wrap_unit(1.25) - 0.25).abs() < 1e-12);
        assert!((wrap_unit(-0.25) - 0.75).abs() < 1e-12);
        assert_eq!(wrap_unit(3.0), 0.0);
    }

    #[test]
    fn test_db_round_trip() {
        for db in [-24.0_f32, -6.0, 0.0, 6.0] {
            let back = linear_to_db(db_to_linear(db));
            assert!((back - db).abs() < 1e-3, "{db} dB came back as {back}");
        }
    }
}
