use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use spr::{
    data::Measurement,
    fit,
    params::FitParams,
    reflectance::{self, SprModel},
    settings::{FitSettings, LightSource},
};

type Complex = num_complex::Complex<f64>;

/// Reflectance at `theta_1` (radians).
#[pyfunction]
#[pyo3(name = "reflectance", signature = (theta_1, eps_re, eps_im, d, n, wavenum))]
fn py_reflectance(theta_1: f64, eps_re: f64, eps_im: f64, d: f64, n: f64, wavenum: f64) -> f64 {
    reflectance::reflectance(
        theta_1,
        Complex::new(eps_re, eps_im),
        d,
        Complex::new(n, 0.0),
        wavenum,
    )
}

/// Reflectance at every angle (radians) of `thetas`.
#[pyfunction]
fn reflectance_curve(
    thetas: Vec<f64>,
    eps_re: f64,
    eps_im: f64,
    d: f64,
    n: f64,
    wavenum: f64,
) -> Vec<f64> {
    let model = SprModel {
        epsilon: Complex::new(eps_re, eps_im),
        thickness: d,
        prism_index: Complex::new(n, 0.0),
        wavenumber: wavenum,
    };
    thetas.iter().map(|&t| model.reflectance(t)).collect()
}

/// `I * R` at `x` degrees, for use as a curve-fit model.
#[pyfunction]
#[pyo3(name = "r_fitter")]
fn py_r_fitter(
    x: f64,
    eps_re: f64,
    eps_im: f64,
    d: f64,
    intensity: f64,
    n: f64,
    wavenum: f64,
) -> f64 {
    reflectance::r_fitter(
        x,
        eps_re,
        eps_im,
        d,
        intensity,
        Complex::new(n, 0.0),
        wavenum,
    )
}

/// `I * R` at every angle (degrees) of `xs`.
#[pyfunction]
fn r_fitter_curve(
    xs: Vec<f64>,
    eps_re: f64,
    eps_im: f64,
    d: f64,
    intensity: f64,
    n: f64,
    wavenum: f64,
) -> Vec<f64> {
    let params = FitParams::new(eps_re, eps_im, d, intensity);
    let n = Complex::new(n, 0.0);
    xs.iter()
        .map(|&x| {
            reflectance::r_fitter(
                x,
                params.eps_re,
                params.eps_im,
                params.thickness,
                params.intensity,
                n,
                wavenum,
            )
        })
        .collect()
}

/// Optical constants of a laser, prism and film.
#[pyclass(name = "LightSource")]
#[derive(Debug, Clone)]
struct PyLightSource {
    inner: LightSource,
}

#[pymethods]
impl PyLightSource {
    #[new]
    #[pyo3(signature = (wavelength, prism_index, eps_re, eps_im, thickness))]
    fn py_new(wavelength: f64, prism_index: f64, eps_re: f64, eps_im: f64, thickness: f64) -> Self {
        Self {
            inner: LightSource {
                wavelength,
                prism_index: Complex::new(prism_index, 0.0),
                epsilon: Complex::new(eps_re, eps_im),
                thickness,
            },
        }
    }

    #[staticmethod]
    fn red() -> Self {
        Self {
            inner: LightSource::red(),
        }
    }

    #[staticmethod]
    fn green() -> Self {
        Self {
            inner: LightSource::green(),
        }
    }

    #[getter]
    fn wavelength(&self) -> f64 {
        self.inner.wavelength
    }

    #[getter]
    fn wavenumber(&self) -> f64 {
        self.inner.wavenumber()
    }

    #[getter]
    fn prism_index(&self) -> f64 {
        self.inner.prism_index.re
    }

    #[getter]
    fn epsilon(&self) -> (f64, f64) {
        (self.inner.epsilon.re, self.inner.epsilon.im)
    }

    #[getter]
    fn thickness(&self) -> f64 {
        self.inner.thickness
    }

    /// Reflectance with this source's defaults at angles in degrees.
    fn reflectance(&self, angles_deg: Vec<f64>) -> Vec<f64> {
        let model = SprModel::from(&self.inner);
        angles_deg
            .iter()
            .map(|a| model.reflectance(a.to_radians()))
            .collect()
    }

    /// Fit the model to a scan (angles in degrees). Returns the report as JSON.
    #[pyo3(signature = (angles_deg, values, starts = 8, seed = None))]
    fn fit(
        &self,
        angles_deg: Vec<f64>,
        values: Vec<f64>,
        starts: usize,
        seed: Option<u64>,
    ) -> PyResult<String> {
        let measurement = Measurement::new(angles_deg, values)
            .map_err(|e| PyValueError::new_err(format!("{:#}", e)))?;
        let settings = FitSettings {
            starts,
            seed,
            ..FitSettings::default()
        };
        let report = fit::fit(&measurement, &self.inner, &settings)
            .map_err(|e| PyValueError::new_err(format!("{:#}", e)))?;
        serde_json::to_string(&report).map_err(|e| PyValueError::new_err(e.to_string()))
    }

    fn __repr__(&self) -> String {
        format!("{:?}", self.inner)
    }
}

/// Surface plasmon resonance reflectance model.
#[pymodule]
fn spr_py(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(py_reflectance, m)?)?;
    m.add_function(wrap_pyfunction!(reflectance_curve, m)?)?;
    m.add_function(wrap_pyfunction!(py_r_fitter, m)?)?;
    m.add_function(wrap_pyfunction!(r_fitter_curve, m)?)?;
    m.add_class::<PyLightSource>()?;
    Ok(())
}
