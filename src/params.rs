//! Free parameters of the reflectance fit.
//!
//! The least-squares engine works on a real vector, so the complex
//! permittivity is split into its real and imaginary parts. Alongside sit the
//! film thickness and a linear intensity scale that absorbs the arbitrary
//! units of the detector signal.

use nalgebra::{Complex, Vector4};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::settings::LightSource;

/// Number of free parameters in a fit.
pub const NUM_PARAMS: usize = 4;

/// Best-fit (or trial) values of the four free fit parameters.
///
/// Also used for their standard errors, which share the same layout.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitParams {
    pub eps_re: f64,
    pub eps_im: f64,
    pub thickness: f64,
    #[serde(default = "default_intensity")]
    pub intensity: f64,
}

fn default_intensity() -> f64 {
    1.0
}

impl FitParams {
    pub fn new(eps_re: f64, eps_im: f64, thickness: f64, intensity: f64) -> Self {
        Self {
            eps_re,
            eps_im,
            thickness,
            intensity,
        }
    }

    /// Starting point taken from a light source's defaults, unit intensity.
    pub fn from_source(source: &LightSource) -> Self {
        Self::new(
            source.epsilon.re,
            source.epsilon.im,
            source.thickness,
            default_intensity(),
        )
    }

    pub fn epsilon(&self) -> Complex<f64> {
        Complex::new(self.eps_re, self.eps_im)
    }

    /// Order: `[eps_re, eps_im, thickness, intensity]`.
    pub fn to_vector(&self) -> Vector4<f64> {
        Vector4::new(self.eps_re, self.eps_im, self.thickness, self.intensity)
    }

    pub fn from_vector(v: &Vector4<f64>) -> Self {
        Self::new(v[0], v[1], v[2], v[3])
    }
}

impl fmt::Display for FitParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "eps = {:.4} {:+.4}i, d = {:.3}, I = {:.4}",
            self.eps_re, self.eps_im, self.thickness, self.intensity
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vector_layout() {
        let params = FitParams::new(-18.0, 0.47, 47.0, 0.9);
        let v = params.to_vector();
        assert_eq!(v, Vector4::new(-18.0, 0.47, 47.0, 0.9));
        assert_eq!(FitParams::from_vector(&v), params);
        assert_eq!(params.epsilon(), Complex::new(-18.0, 0.47));
    }

    #[test]
    fn intensity_defaults_to_one() {
        let params: FitParams =
            serde_json::from_str(r#"{"eps_re": -18.0, "eps_im": 0.5, "thickness": 50.0}"#)
                .unwrap();
        assert_eq!(params.intensity, 1.0);
    }
}
