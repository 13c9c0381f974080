//! Small numeric helpers shared across the model.

use nalgebra::Complex;

/// Promotes a real value to a complex one with a positive-zero imaginary part.
///
/// All real inputs to the reflectance chain pass through here exactly once,
/// so every intermediate is carried in complex arithmetic. The positive-zero
/// imaginary part places negative radicands on the upper side of the branch
/// cut, giving `sqrt(-x) = +i·sqrt(x)`.
#[inline]
pub fn promote(x: f64) -> Complex<f64> {
    Complex::new(x, 0.0)
}

/// Vacuum wavenumber `k0 = 2π/λ`, in inverse units of `wavelength`.
#[inline]
pub fn wavenumber(wavelength: f64) -> f64 {
    2.0 * std::f64::consts::PI / wavelength
}
