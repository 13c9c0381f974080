//! Fresnel reflection amplitudes at the two film interfaces.
//!
//! The p-polarised reflection amplitudes at the prism–metal (`r_pm`, also
//! written `r_12`) and metal–air (`r_ma`, `r_23`) boundaries, expressed through
//! the refraction angle cosines from [`crate::snell`].
//!
//! Near resonance a denominator can come arbitrarily close to zero. This is the
//! physics of the plasmon excitation, not a numerical fault, so the amplitudes
//! are returned as computed: very large magnitudes are possible and nothing is
//! clamped.

use nalgebra::Complex;

use crate::snell::{cos_theta2, cos_theta3};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helpers::promote;
    use approx::assert_abs_diff_eq;

    #[test]
    fn prism_metal_amplitude() {
        let eps = Complex::new(-18.0, 0.47);
        let r = r_pm(promote(43.5_f64.to_radians()), eps, promote(1.51));
        assert_abs_diff_eq!(r.re, 0.586_985_689_546, epsilon = 1e-9);
        assert_abs_diff_eq!(r.im, 0.795_922_550_274, epsilon = 1e-9);
    }

    #[test]
    fn metal_air_amplitude() {
        let eps = Complex::new(-18.0, 0.47);
        let r = r_ma(promote(43.5_f64.to_radians()), eps, promote(1.51));
        assert_abs_diff_eq!(r.re, -12.766_105_105_761, epsilon = 1e-7);
        assert_abs_diff_eq!(r.im, -1.125_726_665_271, epsilon = 1e-7);
    }

    #[test]
    fn matched_media_do_not_reflect() {
        // A "film" with the permittivity of the prism is no interface at all.
        let n = promote(1.5);
        let theta = promote(0.3);
        let r = r_pm(theta, n * n, n);
        assert_abs_diff_eq!(r.norm(), 0.0, epsilon = 1e-12);
    }
}

/// Reflection amplitude at the prism–metal interface.
///
/// **Context**: The first boundary the light meets. Its amplitude alone is the
/// reflectance of an infinitely thick film, and the thin-film result in
/// [`crate::reflectance`] reduces to `|r_pm|²` as `d` grows.
///
/// **How it Works**: The p-polarised Fresnel formula with the film written
/// through its refractive index `sqrt(ε)`:
/// `r_pm = (sqrt(ε)·cos θ1 − N·cos θ2) / (sqrt(ε)·cos θ1 + N·cos θ2)`,
/// with `cos θ2` from [`cos_theta2`].
///
/// # Example
/// ```rust
/// # use spr::{fresnel::r_pm, helpers::promote};
/// // a film matching the prism is no interface at all
/// let n = promote(1.5);
/// let r = r_pm(promote(0.3), n * n, n);
/// assert!(r.norm() < 1e-12);
/// ```
pub fn r_pm(theta_1: Complex<f64>, epsilon: Complex<f64>, n: Complex<f64>) -> Complex<f64> {
    let ct1 = theta_1.cos();
    let ct2 = cos_theta2(theta_1, epsilon, n);
    let sqrt_eps = epsilon.sqrt();
    (sqrt_eps * ct1 - n * ct2) / (sqrt_eps * ct1 + n * ct2)
}

/// Reflection amplitude at the metal–air interface.
///
/// **Context**: The far boundary of the film, where the surface plasmon lives.
/// Its denominator approaches zero at the plasmon condition, so the magnitude
/// can be large near resonance.
///
/// **How it Works**: `r_ma = (cos θ2 − sqrt(ε)·cos θ3) / (cos θ2 + sqrt(ε)·cos θ3)`
/// with both cosines from [`crate::snell`]. Depends on the prism only through
/// the conserved tangential wavevector.
pub fn r_ma(theta_1: Complex<f64>, epsilon: Complex<f64>, n: Complex<f64>) -> Complex<f64> {
    let ct2 = cos_theta2(theta_1, epsilon, n);
    let ct3 = cos_theta3(theta_1, n);
    let sqrt_eps = epsilon.sqrt();
    (ct2 - sqrt_eps * ct3) / (ct2 + sqrt_eps * ct3)
}
