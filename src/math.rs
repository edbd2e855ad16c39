//! Shared numerical primitives.

use num_complex::Complex;

/// Primary scalar type used across the crate; the engine works in `double`.
pub type Scalar = f64;
/// Complex scalar type used for AC phasors.
pub type CScalar = Complex<Scalar>;

/// Builds a phasor from a magnitude and a phase in degrees.
#[must_use]
pub fn phasor_deg(magnitude: Scalar, phase_deg: Scalar) -> CScalar {
    Complex::from_polar(magnitude, phase_deg.to_radians())
}

/// Magnitude in dB (20*log10(|x|)), clamping very small values.
#[must_use]
pub fn to_db(magnitude: Scalar) -> Scalar {
    const MIN: Scalar = 1e-300;
    20.0 * magnitude.abs().max(MIN).log10()
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn phasor_uses_degrees() {
        let p = phasor_deg(2.0, 90.0);
        assert_relative_eq!(p.re, 0.0, epsilon = 1e-12);
        assert_relative_eq!(p.im, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn db_of_decade() {
        assert_relative_eq!(to_db(10.0), 20.0, epsilon = 1e-12);
        assert!(to_db(0.0).is_finite());
    }
}
