//! Synthetic angle scans generated from the model.
//!
//! Useful for exercising the fit on data with known parameters, and for
//! checking how measurement noise propagates into the fitted values.

use anyhow::{bail, Result};
use log::debug;
use ndarray::Array1;
use rand::{rngs::StdRng, SeedableRng};
use rand_distr::{Distribution, Normal};

use crate::{data::Measurement, reflectance::SprModel};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::LightSource;

    #[test]
    fn noiseless_scan_is_the_model() {
        let model = SprModel::from(&LightSource::red());
        let scan = synthesize(&model, 0.8, 40.0, 50.0, 21, 0.0, None).unwrap();
        assert_eq!(scan.len(), 21);
        for (angle, value) in scan.angles_deg.iter().zip(scan.reflectance.iter()) {
            assert_eq!(*value, 0.8 * model.reflectance(angle.to_radians()));
        }
    }

    #[test]
    fn seeded_noise_is_reproducible() {
        let model = SprModel::from(&LightSource::red());
        let a = synthesize(&model, 1.0, 40.0, 50.0, 50, 0.01, Some(7)).unwrap();
        let b = synthesize(&model, 1.0, 40.0, 50.0, 50, 0.01, Some(7)).unwrap();
        let c = synthesize(&model, 1.0, 40.0, 50.0, 50, 0.01, Some(8)).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn negative_noise_is_rejected() {
        let model = SprModel::from(&LightSource::red());
        assert!(synthesize(&model, 1.0, 40.0, 50.0, 10, -0.1, None).is_err());
    }
}

/// Samples `intensity · R` on `num` evenly spaced angles and adds Gaussian
/// noise of standard deviation `noise`.
///
/// The noise generator is seeded from `seed` when given, otherwise from the
/// operating system.
pub fn synthesize(
    model: &SprModel,
    intensity: f64,
    min_deg: f64,
    max_deg: f64,
    num: usize,
    noise: f64,
    seed: Option<u64>,
) -> Result<Measurement> {
    if !(noise >= 0.0) {
        bail!("noise must not be negative, got {}", noise);
    }
    let angles_deg = Array1::linspace(min_deg, max_deg, num);
    let clean = model.curve(&angles_deg.mapv(f64::to_radians)) * intensity;

    let reflectance = if noise > 0.0 {
        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let normal = Normal::new(0.0, noise)?;
        clean.mapv(|r| r + normal.sample(&mut rng))
    } else {
        clean
    };

    debug!(
        "synthesized {} points between {} and {} degrees, noise {}",
        num,
        min_deg,
        max_deg,
        noise
    );

    Measurement::new(angles_deg.to_vec(), reflectance.to_vec())
}
