//! Nonlinear least-squares fit of the reflectance model to a measured scan.
//!
//! The free parameters are the real and imaginary parts of the film
//! permittivity, the film thickness and a linear intensity scale. The prism
//! index and wavenumber stay fixed at the light source's values. Residuals come
//! from [`r_fitter`] and are minimised with the Levenberg-Marquardt algorithm.
//!
//! The resonance dip is narrow, so a poor initial guess can land in a flat
//! region of the objective. [`fit`] therefore runs several starts in parallel,
//! the initial guess plus seeded random perturbations of it, and keeps the one
//! with the lowest objective.

use anyhow::{bail, Result};
use levenberg_marquardt::{
    LeastSquaresProblem, LevenbergMarquardt, MinimizationReport, TerminationReason,
};
use log::{debug, info, warn};
use nalgebra::{Complex, Dyn, OMatrix, OVector, Owned, Vector4, U4};
use rand::{rngs::StdRng, SeedableRng};
use rand_distr::{Distribution, Normal};
use rayon::prelude::*;
use serde::Serialize;
use std::fmt;

use crate::{
    data::Measurement,
    params::{FitParams, NUM_PARAMS},
    reflectance::r_fitter,
    settings::{FitSettings, LightSource},
};

/// Relative step for the central-difference Jacobian.
const FD_STEP: f64 = 1e-6;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{reflectance::SprModel, synth::synthesize};
    use approx::assert_abs_diff_eq;

    fn red_scan(intensity: f64) -> Measurement {
        let model = SprModel::from(&LightSource::red());
        synthesize(&model, intensity, 40.0, 50.0, 201, 0.0, None).unwrap()
    }

    #[test]
    fn residuals_vanish_at_true_parameters() {
        let scan = red_scan(0.9);
        let source = LightSource::red();
        let truth = FitParams::new(-18.0, 0.47, 47.0, 0.9);
        let problem = ReflectanceFitProblem::new(&scan, &source, &truth);
        let residuals = problem.residuals().unwrap();
        assert_eq!(residuals.len(), scan.len());
        assert_abs_diff_eq!(residuals.amax(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn intensity_column_of_jacobian_is_reflectance() {
        let scan = red_scan(1.0);
        let source = LightSource::red();
        let params = FitParams::new(-17.0, 0.6, 45.0, 0.8);
        let problem = ReflectanceFitProblem::new(&scan, &source, &params);
        let jacobian = problem.jacobian().unwrap();
        let model = SprModel::with_params(&source, &params);
        for (i, angle) in scan.angles_deg.iter().enumerate() {
            let expected = model.reflectance(angle.to_radians());
            assert_abs_diff_eq!(jacobian[(i, 3)], expected, epsilon = 1e-6);
        }
    }

    #[test]
    fn params_round_trip_through_problem() {
        let scan = red_scan(1.0);
        let source = LightSource::red();
        let mut problem =
            ReflectanceFitProblem::new(&scan, &source, &FitParams::new(-1.0, 2.0, 3.0, 4.0));
        problem.set_params(&Vector4::new(-18.0, 0.5, 50.0, 1.0));
        assert_eq!(problem.fit_params(), FitParams::new(-18.0, 0.5, 50.0, 1.0));
    }

    #[test]
    fn recovers_exact_parameters() {
        let scan = red_scan(1.0);
        let settings = FitSettings {
            starts: 4,
            seed: Some(1),
            initial: Some(FitParams::new(-17.0, 0.6, 44.0, 0.95)),
            ..FitSettings::default()
        };
        let report = fit(&scan, &LightSource::red(), &settings).unwrap();
        assert!(report.converged, "{:?}", report.termination);
        assert_abs_diff_eq!(report.params.eps_re, -18.0, epsilon = 1e-4);
        assert_abs_diff_eq!(report.params.eps_im, 0.47, epsilon = 1e-5);
        assert_abs_diff_eq!(report.params.thickness, 47.0, epsilon = 1e-3);
        assert_abs_diff_eq!(report.params.intensity, 1.0, epsilon = 1e-5);
        assert!(report.chi_square < 1e-12);
    }

    #[test]
    fn too_few_points_is_an_error() {
        let scan = Measurement::new(vec![42.0, 43.0, 44.0], vec![0.9, 0.1, 0.9]).unwrap();
        assert!(fit(&scan, &LightSource::red(), &FitSettings::default()).is_err());
    }

    #[test]
    fn starting_points_are_seeded() {
        let initial = FitParams::new(-18.0, 0.47, 47.0, 1.0);
        let settings = FitSettings {
            starts: 5,
            seed: Some(3),
            ..FitSettings::default()
        };
        let a = starting_points(&initial, &settings).unwrap();
        let b = starting_points(&initial, &settings).unwrap();
        assert_eq!(a.len(), 5);
        assert_eq!(a[0], initial);
        assert_eq!(a, b);
        assert_ne!(a[1], initial);
    }
}

/// Least-squares problem for one fit start.
///
/// Holds the measurement by reference, so many starts can share one scan.
#[derive(Debug, Clone)]
pub struct ReflectanceFitProblem<'a> {
    angles_deg: &'a [f64],
    measured: &'a [f64],
    prism_index: Complex<f64>,
    wavenumber: f64,
    params: Vector4<f64>,
}

impl<'a> ReflectanceFitProblem<'a> {
    pub fn new(measurement: &'a Measurement, source: &LightSource, initial: &FitParams) -> Self {
        Self {
            angles_deg: &measurement.angles_deg,
            measured: &measurement.reflectance,
            prism_index: source.prism_index,
            wavenumber: source.wavenumber(),
            params: initial.to_vector(),
        }
    }

    pub fn fit_params(&self) -> FitParams {
        FitParams::from_vector(&self.params)
    }

    fn residuals_at(&self, p: &Vector4<f64>) -> OVector<f64, Dyn> {
        let residuals = self
            .angles_deg
            .iter()
            .zip(self.measured.iter())
            .map(|(&x, &y)| {
                r_fitter(x, p[0], p[1], p[2], p[3], self.prism_index, self.wavenumber) - y
            });
        OVector::<f64, Dyn>::from_iterator(self.angles_deg.len(), residuals)
    }
}

impl LeastSquaresProblem<f64, Dyn, U4> for ReflectanceFitProblem<'_> {
    type ResidualStorage = Owned<f64, Dyn>;
    type JacobianStorage = Owned<f64, Dyn, U4>;
    type ParameterStorage = Owned<f64, U4>;

    fn set_params(&mut self, x: &Vector4<f64>) {
        self.params.copy_from(x);
    }

    fn params(&self) -> Vector4<f64> {
        self.params
    }

    fn residuals(&self) -> Option<OVector<f64, Dyn>> {
        Some(self.residuals_at(&self.params))
    }

    fn jacobian(&self) -> Option<OMatrix<f64, Dyn, U4>> {
        let mut jacobian = OMatrix::<f64, Dyn, U4>::zeros(self.angles_deg.len());
        for j in 0..NUM_PARAMS {
            let h = FD_STEP * self.params[j].abs().max(1.0);
            let mut forward = self.params;
            forward[j] += h;
            let mut backward = self.params;
            backward[j] -= h;
            let column = (self.residuals_at(&forward) - self.residuals_at(&backward)) / (2.0 * h);
            jacobian.set_column(j, &column);
        }
        Some(jacobian)
    }
}

/// Outcome of a fit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FitReport {
    /// Best-fit parameters.
    pub params: FitParams,
    /// One-sigma standard errors, scaled by the reduced chi-square. `None` if
    /// the normal matrix could not be inverted.
    pub stderr: Option<FitParams>,
    /// Sum of squared residuals.
    pub chi_square: f64,
    /// `chi_square / (points - parameters)`.
    pub reduced_chi_square: f64,
    /// Residual evaluations used by the best start.
    pub evaluations: usize,
    pub converged: bool,
    /// Termination reason reported by the optimizer.
    pub termination: String,
    pub starts: usize,
    pub points: usize,
}

impl fmt::Display for FitReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let err = |value: Option<f64>| value.map_or("n/a".to_string(), |v| format!("{:.4}", v));
        write!(
            f,
            "Fit ({} points, best of {} starts, {}):
  - eps real:  {:.4} +/- {}
  - eps imag:  {:.4} +/- {}
  - thickness: {:.4} +/- {}
  - intensity: {:.4} +/- {}
  - chi^2: {:.6e} (reduced {:.6e})
  ",
            self.points,
            self.starts,
            if self.converged {
                "converged"
            } else {
                "NOT converged"
            },
            self.params.eps_re,
            err(self.stderr.map(|s| s.eps_re)),
            self.params.eps_im,
            err(self.stderr.map(|s| s.eps_im)),
            self.params.thickness,
            err(self.stderr.map(|s| s.thickness)),
            self.params.intensity,
            err(self.stderr.map(|s| s.intensity)),
            self.chi_square,
            self.reduced_chi_square,
        )
    }
}

/// Fits the reflectance model to `measurement` using the light source's prism
/// index and wavelength.
///
/// Non-convergence is not an error; check [`FitReport::converged`].
pub fn fit(
    measurement: &Measurement,
    source: &LightSource,
    settings: &FitSettings,
) -> Result<FitReport> {
    if measurement.len() <= NUM_PARAMS {
        bail!(
            "need more than {} data points to fit {} parameters, got {}",
            NUM_PARAMS,
            NUM_PARAMS,
            measurement.len()
        );
    }

    let initial = settings.initial_for(source);
    let starts = starting_points(&initial, settings)?;
    info!(
        "Fitting {} points from {} starts, initial guess {}",
        measurement.len(),
        starts.len(),
        initial
    );

    let solver = LevenbergMarquardt::new().with_patience(settings.patience);
    let (problem, report) = starts
        .par_iter()
        .map(|start| {
            let (problem, report) =
                solver.minimize(ReflectanceFitProblem::new(measurement, source, start));
            debug!(
                "start {} -> {}, objective {:e}, {:?}",
                start,
                problem.fit_params(),
                report.objective_function,
                report.termination
            );
            (problem, report)
        })
        .min_by(|(_, a), (_, b)| objective(a).total_cmp(&objective(b)))
        .ok_or_else(|| anyhow::anyhow!("no fit starts were run"))?;

    let converged = matches!(
        report.termination,
        TerminationReason::Converged { .. }
            | TerminationReason::ResidualsZero
            | TerminationReason::Orthogonal
    );
    if !converged {
        warn!("fit did not converge: {:?}", report.termination);
    }

    let points = measurement.len();
    let chi_square = problem.residuals_at(&problem.params).norm_squared();
    let reduced_chi_square = chi_square / (points - NUM_PARAMS) as f64;
    let stderr = problem
        .jacobian()
        .and_then(|j| (j.transpose() * &j).try_inverse())
        .map(|cov| FitParams::from_vector(&(cov * reduced_chi_square).diagonal().map(f64::sqrt)));

    let fit_report = FitReport {
        params: problem.fit_params(),
        stderr,
        chi_square,
        reduced_chi_square,
        evaluations: report.number_of_evaluations,
        converged,
        termination: format!("{:?}", report.termination),
        starts: starts.len(),
        points,
    };
    info!("Best fit: {}", fit_report.params);
    Ok(fit_report)
}

/// Objective used to rank starts. NaN ranks last.
fn objective(report: &MinimizationReport<f64>) -> f64 {
    if report.objective_function.is_nan() {
        f64::INFINITY
    } else {
        report.objective_function
    }
}

/// The initial guess followed by `starts - 1` seeded relative perturbations of it.
fn starting_points(initial: &FitParams, settings: &FitSettings) -> Result<Vec<FitParams>> {
    let mut rng = match settings.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let normal = Normal::new(0.0, settings.spread)?;
    let base = initial.to_vector();

    let mut starts = Vec::with_capacity(settings.starts);
    starts.push(*initial);
    for _ in 1..settings.starts {
        let perturbed = base.map(|v| v * (1.0 + normal.sample(&mut rng)));
        starts.push(FitParams::from_vector(&perturbed));
    }
    Ok(starts)
}
