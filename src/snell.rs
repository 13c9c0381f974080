//! Refraction angle cosines inside the metal film and the outer medium.
//!
//! In the prism-coupled geometry light enters from a prism of index `N`,
//! crosses a metal film of permittivity `ε`, and exits into air. Snell's law
//! fixes the tangential wavevector `N·sin θ1` across every interface, so the
//! cosines of the refraction angles follow directly from the incident angle.
//!
//! Beyond the critical angle `N·sin θ1 > 1` and the cosine in air becomes
//! purely imaginary (evanescent field). Inside a lossy metal both cosines are
//! genuinely complex. Nothing here is truncated to a real value: the square
//! roots use the principal branch (non-negative real part) of
//! [`Complex::sqrt`].

use nalgebra::Complex;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helpers::promote;
    use approx::assert_abs_diff_eq;

    #[test]
    fn normal_incidence_is_unity() {
        let eps = Complex::new(-18.0, 0.47);
        let n = promote(1.51);
        let ct2 = cos_theta2(promote(0.0), eps, n);
        let ct3 = cos_theta3(promote(0.0), n);
        assert_abs_diff_eq!(ct2.re, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(ct2.im, 0.0, epsilon = 1e-12);
        assert_eq!(ct3, Complex::new(1.0, 0.0));
    }

    #[test]
    fn below_critical_angle_air_cosine_is_real() {
        let n = promote(1.51);
        let theta = promote(30.0_f64.to_radians());
        let ct3 = cos_theta3(theta, n);
        let expected = (1.0 - 1.51_f64.powi(2) * 0.25).sqrt();
        assert_abs_diff_eq!(ct3.re, expected, epsilon = 1e-12);
        assert_abs_diff_eq!(ct3.im, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn beyond_critical_angle_air_cosine_is_evanescent() {
        let n = promote(1.51);
        let ct3 = cos_theta3(promote(43.5_f64.to_radians()), n);
        assert_abs_diff_eq!(ct3.re, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(ct3.im, 0.283_521_415_567, epsilon = 1e-9);
    }

    #[test]
    fn silver_film_cosine() {
        let eps = Complex::new(-18.0, 0.47);
        let ct2 = cos_theta2(promote(43.5_f64.to_radians()), eps, promote(1.51));
        assert_abs_diff_eq!(ct2.re, 1.029_553_806_072, epsilon = 1e-9);
        assert_abs_diff_eq!(ct2.im, 0.000_760_599_628, epsilon = 1e-9);
    }
}

/// Cosine of the refraction angle inside the metal film.
///
/// **Context**: The metal has a negative real permittivity, so there is no
/// real refraction angle. The cosine is still well defined as a complex number
/// and it is what enters both interface amplitudes.
///
/// **How it Works**: Snell's law `N·sin θ1 = sqrt(ε)·sin θ2` gives
/// `sin²θ2 = (N²/ε)·sin²θ1`, hence `cos θ2 = sqrt(1 − (N²/ε)·sin²θ1)` on the
/// principal branch.
///
/// # Example
/// ```rust
/// # use nalgebra::Complex;
/// # use spr::{helpers::promote, snell::cos_theta2};
/// let ct2 = cos_theta2(promote(0.0), Complex::new(-18.0, 0.47), promote(1.51));
/// assert!((ct2.re - 1.0).abs() < 1e-12);
/// ```
pub fn cos_theta2(
    theta_1: Complex<f64>,
    epsilon: Complex<f64>,
    n: Complex<f64>,
) -> Complex<f64> {
    let sin_sq = theta_1.sin().powi(2);
    (Complex::new(1.0, 0.0) - (n * n / epsilon) * sin_sq).sqrt()
}

/// Cosine of the refraction angle in the outer medium (air).
///
/// `cos θ3 = sqrt(1 − N²·sin²θ1)`, principal branch. Purely imaginary past
/// the critical angle `sin θ1 = 1/N`, where the field in air is evanescent.
pub fn cos_theta3(theta_1: Complex<f64>, n: Complex<f64>) -> Complex<f64> {
    let sin_sq = theta_1.sin().powi(2);
    (Complex::new(1.0, 0.0) - n * n * sin_sq).sqrt()
}
