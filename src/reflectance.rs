//! Reflectance of a prism-coupled thin metal film.
//!
//! Combines the interface amplitudes of [`crate::fresnel`] with the complex
//! attenuation across a film of thickness `d`:
//!
//! ```text
//! R = | (r_pm + r_ma·e^{−2kd}) / (1 + r_pm·r_ma·e^{−2kd}) |²
//! ```
//!
//! where `k` is the complex decay constant from [`k_plas`]. The model follows
//! Simon, Mitchell & Watson (1975).
//!
//! Every function in the chain takes and returns [`Complex<f64>`]; real inputs
//! are promoted once with [`promote`]. Arrays of angles are handled by
//! [`evaluate`], which maps any of the scalar functions elementwise.

use nalgebra::Complex;
use ndarray::Array1;

use crate::{
    fresnel::{r_ma, r_pm},
    helpers::promote,
    params::FitParams,
    settings::LightSource,
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snell::{cos_theta2, cos_theta3};
    use approx::assert_abs_diff_eq;
    use std::f64::consts::PI;

    fn red() -> SprModel {
        SprModel {
            epsilon: Complex::new(-18.0, 0.47),
            thickness: 47.0,
            prism_index: promote(1.51),
            wavenumber: 2.0 * PI / 632.8,
        }
    }

    #[test]
    fn decay_constant_at_43_5_degrees() {
        let model = red();
        let k = k_plas(
            promote(43.5_f64.to_radians()),
            model.epsilon,
            model.prism_index,
            promote(model.wavenumber),
        );
        assert_abs_diff_eq!(k.re, 0.043_375_040_135, epsilon = 1e-10);
        assert_abs_diff_eq!(k.im, -0.000_534_139_590, epsilon = 1e-10);
    }

    #[test]
    fn decay_constant_of_transparent_film_is_imaginary() {
        // propagating wave in glass at normal incidence: k = -i·k0·n
        let k = k_plas(promote(0.0), promote(2.25), promote(1.0), promote(0.01));
        assert_abs_diff_eq!(k.re, 0.0, epsilon = 1e-15);
        assert_abs_diff_eq!(k.im, -0.015, epsilon = 1e-15);
    }

    #[test]
    fn reflectance_at_43_degrees() {
        let r = red().reflectance(43.0_f64.to_radians());
        assert_abs_diff_eq!(r, 0.121_093_551_617, epsilon = 1e-8);
    }

    #[test]
    fn grazing_incidence_reflects_everything() {
        let r = red().reflectance(PI / 2.0);
        assert_abs_diff_eq!(r, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn model_and_free_function_agree() {
        let model = red();
        let theta = 44.1_f64.to_radians();
        let expected = reflectance(
            theta,
            model.epsilon,
            model.thickness,
            model.prism_index,
            model.wavenumber,
        );
        assert_eq!(model.reflectance(theta), expected);
    }

    #[test]
    fn evaluate_matches_scalar_calls() {
        let model = red();
        let thetas = Array1::linspace(0.1, 1.4, 7);
        let ct2 = evaluate(&thetas, |t| cos_theta2(t, model.epsilon, model.prism_index));
        let ct3 = evaluate(&thetas, |t| cos_theta3(t, model.prism_index));
        let curve = model.curve(&thetas);
        for (i, &theta) in thetas.iter().enumerate() {
            let t = promote(theta);
            assert_eq!(ct2[i], cos_theta2(t, model.epsilon, model.prism_index));
            assert_eq!(ct3[i], cos_theta3(t, model.prism_index));
            assert_eq!(curve[i], model.reflectance(theta));
        }
    }

    #[test]
    fn fitter_scales_by_intensity() {
        let model = red();
        let params = FitParams::new(-18.0, 0.47, 47.0, 0.5);
        let x = 43.2;
        let full = r_fitter(x, -18.0, 0.47, 47.0, 1.0, model.prism_index, model.wavenumber);
        let half = r_fitter(
            x,
            params.eps_re,
            params.eps_im,
            params.thickness,
            params.intensity,
            model.prism_index,
            model.wavenumber,
        );
        assert_abs_diff_eq!(half, 0.5 * full, epsilon = 1e-15);
    }

    #[test]
    fn fitter_curve_matches_scalar_fitter() {
        let model = red();
        let params = FitParams::new(-17.5, 0.6, 50.0, 0.9);
        let xs = Array1::linspace(41.0, 46.0, 11);
        let ys = r_fitter_curve(&xs, &params, model.prism_index, model.wavenumber);
        for (x, y) in xs.iter().zip(ys.iter()) {
            let expected = r_fitter(
                *x,
                params.eps_re,
                params.eps_im,
                params.thickness,
                params.intensity,
                model.prism_index,
                model.wavenumber,
            );
            assert_eq!(*y, expected);
        }
    }
}

/// Complex decay constant of the field across the metal film.
///
/// **Context**: Past the critical angle the field inside the metal does not
/// propagate. It decays away from the prism, and the film thickness `d` sets
/// how much of it reaches the far interface. That coupling is what opens the
/// resonance dip.
///
/// **How it Works**: Conservation of the tangential wavevector `N·k0·sin θ1`
/// leaves `k = −i·k0·sqrt(ε − N²·sin²θ1)` as the normal component. The square
/// root is on the principal branch, so `Re(k) > 0` for a lossy metal and
/// `e^{−2kd}` falls off with thickness. `k0 = 2π/λ` is in inverse nanometres
/// when `λ` is in nanometres.
///
/// # Example
/// ```rust
/// # use nalgebra::Complex;
/// # use spr::{helpers::promote, reflectance::k_plas};
/// let k0 = 2.0 * std::f64::consts::PI / 632.8;
/// let theta = promote(43.5_f64.to_radians());
/// let k = k_plas(theta, Complex::new(-18.0, 0.47), promote(1.51), promote(k0));
/// assert!(k.re > 0.0);
/// ```
pub fn k_plas(
    theta_1: Complex<f64>,
    epsilon: Complex<f64>,
    n: Complex<f64>,
    wavenum: Complex<f64>,
) -> Complex<f64> {
    let sin_sq = theta_1.sin().powi(2);
    -Complex::<f64>::i() * wavenum * (epsilon - n * n * sin_sq).sqrt()
}

/// Reflectance `R` of the prism–film–air stack for p-polarised light.
///
/// **Context**: In the Kretschmann geometry the reflected intensity stays close
/// to 1 except in a narrow band of angles where the evanescent field excites a
/// surface plasmon on the far side of the film. The position and depth of that
/// dip depend on `ε` and `d`, which is what a fit to a measured scan recovers.
///
/// **How it Works**: Combines the two interface amplitudes [`r_pm`] and
/// [`r_ma`] with the round-trip attenuation `e^{−2kd}` from [`k_plas`] into the
/// Airy sum of multiple reflections inside the film, then takes `|·|²`.
/// `theta_1` is in radians and `thickness` in the same length unit as
/// `1/wavenum`. The result is real and non-negative. No input makes this fail;
/// unphysical inputs give defined but meaningless numbers.
///
/// # Example
/// ```rust
/// # use nalgebra::Complex;
/// # use spr::reflectance::reflectance;
/// let k0 = 2.0 * std::f64::consts::PI / 632.8;
/// let eps = Complex::new(-18.0, 0.47);
/// let n = Complex::new(1.51, 0.0);
/// let off_resonance = reflectance(41.0_f64.to_radians(), eps, 47.0, n, k0);
/// let near_dip = reflectance(43.0_f64.to_radians(), eps, 47.0, n, k0);
/// assert!(near_dip < 0.2 && off_resonance > 0.9);
/// ```
pub fn reflectance(
    theta_1: f64,
    epsilon: Complex<f64>,
    thickness: f64,
    n: Complex<f64>,
    wavenum: f64,
) -> f64 {
    let theta_1 = promote(theta_1);
    let k = k_plas(theta_1, epsilon, n, promote(wavenum));
    let rpm = r_pm(theta_1, epsilon, n);
    let rma = r_ma(theta_1, epsilon, n);
    let attenuation = (-2.0 * k * promote(thickness)).exp();

    let num = rpm + rma * attenuation;
    let den = Complex::new(1.0, 0.0) + rpm * rma * attenuation;
    (num / den).norm_sqr()
}

/// Maps a complex-valued model function over an array of real angles.
///
/// Each angle is promoted once before `f` sees it.
///
/// # Example
/// ```rust
/// # use ndarray::Array1;
/// # use nalgebra::Complex;
/// # use spr::{reflectance::evaluate, snell::cos_theta3};
/// let thetas = Array1::linspace(0.0, 1.0, 5);
/// let n = Complex::new(1.51, 0.0);
/// let ct3 = evaluate(&thetas, |t| cos_theta3(t, n));
/// assert_eq!(ct3.len(), 5);
/// ```
pub fn evaluate<T, F>(thetas: &Array1<f64>, f: F) -> Array1<T>
where
    F: Fn(Complex<f64>) -> T,
{
    thetas.mapv(|theta| f(promote(theta)))
}

/// Fit-engine adapter for [`reflectance`].
///
/// Takes the angle in degrees and the permittivity as two real parameters, as
/// nonlinear least-squares engines want, and returns `intensity · R`. Does no
/// work beyond repackaging its arguments.
pub fn r_fitter(
    x_deg: f64,
    eps_re: f64,
    eps_im: f64,
    thickness: f64,
    intensity: f64,
    n: Complex<f64>,
    wavenum: f64,
) -> f64 {
    intensity
        * reflectance(
            x_deg.to_radians(),
            Complex::new(eps_re, eps_im),
            thickness,
            n,
            wavenum,
        )
}

/// [`r_fitter`] over an array of angles in degrees.
pub fn r_fitter_curve(
    xs_deg: &Array1<f64>,
    params: &FitParams,
    n: Complex<f64>,
    wavenum: f64,
) -> Array1<f64> {
    xs_deg.mapv(|x| {
        r_fitter(
            x,
            params.eps_re,
            params.eps_im,
            params.thickness,
            params.intensity,
            n,
            wavenum,
        )
    })
}

/// Explicit parameter set for one evaluation of the reflectance model.
///
/// Replaces "default arguments": build one from a [`LightSource`] for quick
/// curves, or fill it in by hand to override any value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SprModel {
    pub epsilon: Complex<f64>,
    pub thickness: f64,
    pub prism_index: Complex<f64>,
    pub wavenumber: f64,
}

impl SprModel {
    /// Same source, fit parameters in place of its permittivity and thickness.
    /// The intensity scale is not part of the model.
    pub fn with_params(source: &LightSource, params: &FitParams) -> Self {
        Self {
            epsilon: params.epsilon(),
            thickness: params.thickness,
            prism_index: source.prism_index,
            wavenumber: source.wavenumber(),
        }
    }

    pub fn reflectance(&self, theta_1: f64) -> f64 {
        reflectance(
            theta_1,
            self.epsilon,
            self.thickness,
            self.prism_index,
            self.wavenumber,
        )
    }

    /// Reflectance at every angle (radians) of `thetas`.
    pub fn curve(&self, thetas: &Array1<f64>) -> Array1<f64> {
        thetas.mapv(|theta| self.reflectance(theta))
    }
}

impl From<&LightSource> for SprModel {
    fn from(source: &LightSource) -> Self {
        Self {
            epsilon: source.epsilon,
            thickness: source.thickness,
            prism_index: source.prism_index,
            wavenumber: source.wavenumber(),
        }
    }
}
