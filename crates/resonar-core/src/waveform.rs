//! Closed set of oscillator and LFO shapes.
//!
//! Every oscillator, LFO and sync modulator in the engine evaluates one of
//! the five [`Waveform`] variants. Shapes are evaluated from a phase in
//! cycles, so callers never keep per-shape state.

use core::f64::consts::PI;
use libm::sin;

use crate::math::wrap_unit;

/// Threshold used by the impulse shape: a cycle is "high" while the sine
/// is above `sin(2π * 3/5)`.
const IMPULSE_THRESHOLD_CYCLES: f64 = 3.0 / 5.0;

/// Oscillator shape.
///
/// Port values select a shape by index, in declaration order: sine = 0,
/// sawtooth = 1, triangle = 2, square = 3, impulse = 4.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Waveform {
    /// Pure sine.
    #[default]
    Sine,
    /// Rising ramp from -1 to 1.
    Sawtooth,
    /// Symmetric triangle starting at -1.
    Triangle,
    /// Sign of the sine.
    Square,
    /// Narrow negative pulse, positive for the rest of the cycle.
    Impulse,
}

impl Waveform {
    /// All shapes in port-index order.
    pub const ALL: [Waveform; 5] = [
        Waveform::Sine,
        Waveform::Sawtooth,
        Waveform::Triangle,
        Waveform::Square,
        Waveform::Impulse,
    ];

    /// Selects a shape by its port index. Unknown indices fall back to sine.
    pub fn from_index(index: u32) -> Self {
        Self::ALL
            .get(index as usize)
            .copied()
            .unwrap_or(Waveform::Sine)
    }

    /// Selects a shape from a float port value, rounding to the nearest index.
    pub fn from_port(value: f32) -> Self {
        if value.is_nan() || value < 0.0 {
            return Waveform::Sine;
        }
        Self::from_index(libm::roundf(value) as u32)
    }

    /// Port index of this shape.
    pub fn index(self) -> u32 {
        self as u32
    }

    /// Lowercase name used in presets and on the command line.
    pub fn name(self) -> &'static str {
        match self {
            Waveform::Sine => "sine",
            Waveform::Sawtooth => "sawtooth",
            Waveform::Triangle => "triangle",
            Waveform::Square => "square",
            Waveform::Impulse => "impulse",
        }
    }

    /// Evaluates the shape at `cycles` (any real number; only the fractional
    /// part matters). Output is in `[-1, 1]`.
    #[inline]
    pub fn at(self, cycles: f64) -> f64 {
        match self {
            Waveform::Sine => sin(2.0 * PI * cycles),
            Waveform::Sawtooth => 2.0 * wrap_unit(cycles) - 1.0,
            Waveform::Triangle => 1.0 - 4.0 * (wrap_unit(cycles) - 0.5).abs(),
            Waveform::Square => {
                if sin(2.0 * PI * cycles) >= 0.0 {
                    1.0
                } else {
                    -1.0
                }
            }
            Waveform::Impulse => {
                if sin(2.0 * PI * cycles) >= sin(2.0 * PI * IMPULSE_THRESHOLD_CYCLES) {
                    1.0
                } else {
                    -1.0
                }
            }
        }
    }

    /// Evaluates the shape at absolute frame `frame` of a free-running
    /// oscillator of `frequency` Hz at `samplerate` Hz.
    ///
    /// This is the modulation factor used by LFO-perturbed sync resets and
    /// the chorus sweep.
    #[inline]
    pub fn factor(self, frame: f64, frequency: f64, samplerate: f64) -> f64 {
        self.at(frame * frequency / samplerate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_index_matches_port_order() {
        for (i, w) in Waveform::ALL.iter().enumerate() {
            assert_eq!(Waveform::from_index(i as u32), *w);
            assert_eq!(w.index(), i as u32);
        }
        assert_eq!(Waveform::from_index(99), Waveform::Sine);
    }

    #[test]
    fn test_from_port_rounds() {
        assert_eq!(Waveform::from_port(0.9), Waveform::Sawtooth);
        assert_eq!(Waveform::from_port(2.2), Waveform::Triangle);
        assert_eq!(Waveform::from_port(-1.0), Waveform::Sine);
        assert_eq!(Waveform::from_port(f32::NAN), Waveform::Sine);
    }

    #[test]
    fn test_shapes_stay_in_range() {
        for w in Waveform::ALL {
            for i in 0..1000 {
                let v = w.at(i as f64 * 0.013 - 3.0);
                assert!((-1.0..=1.0).contains(&v), "{:?} out of range: {v}", w);
            }
        }
    }

    #[test]
    fn test_sawtooth_and_triangle_landmarks() {
        assert!((Waveform::Sawtooth.at(0.0) + 1.0).abs() < 1e-12);
        assert!(Waveform::Sawtooth.at(0.5).abs() < 1e-12);
        assert!((Waveform::Triangle.at(0.0) + 1.0).abs() < 1e-12);
        assert!((Waveform::Triangle.at(0.5) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_impulse_is_mostly_high() {
        let high = (0..1000)
            .filter(|i| Waveform::Impulse.at(*i as f64 / 1000.0) > 0.0)
            .count();
        assert!(high > 500 && high < 1000, "impulse high count {high}");
    }

    #[test]
    fn test_factor_uses_frequency_over_samplerate() {
        // a quarter of a 1 Hz cycle at 4 Hz sample rate is one frame
        let v = Waveform::Sine.factor(1.0, 1.0, 4.0);
        assert!((v - 1.0).abs() < 1e-12);
    }
}
