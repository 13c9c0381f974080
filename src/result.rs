use itertools::Itertools;
use ndarray::Array1;
use ndarray_stats::QuantileExt;
use serde::Serialize;

use crate::reflectance::SprModel;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::LightSource;

    #[test]
    fn red_dip_location() {
        let model = SprModel::from(&LightSource::red());
        let curve = Curve::sample(&model, 41.0, 50.0, 500);
        let dip = curve.dip().unwrap();
        assert!((dip.angle_deg - 43.02).abs() < 0.05, "dip: {:?}", dip);
        assert!(dip.reflectance < 0.1, "dip: {:?}", dip);
        assert_eq!(curve.local_minima().len(), 1);
    }

    #[test]
    fn dip_skips_nan() {
        let curve = Curve {
            angles_deg: Array1::from(vec![1.0, 2.0, 3.0]),
            reflectance: Array1::from(vec![0.5, f64::NAN, 0.2]),
        };
        assert!(!curve.is_finite());
        let dip = curve.dip().unwrap();
        assert_eq!(dip.angle_deg, 3.0);
        assert_eq!(dip.reflectance, 0.2);
    }

    #[test]
    fn empty_curve_has_no_dip() {
        let curve = Curve {
            angles_deg: Array1::zeros(0),
            reflectance: Array1::zeros(0),
        };
        assert!(curve.dip().is_none());
        assert!(curve.local_minima().is_empty());
    }
}

/// Reflectance sampled over a range of incidence angles.
#[derive(Debug, Clone, PartialEq)]
pub struct Curve {
    /// Incidence angles in degrees.
    pub angles_deg: Array1<f64>,
    pub reflectance: Array1<f64>,
}

/// The resonance minimum of a curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Dip {
    pub angle_deg: f64,
    pub reflectance: f64,
}

impl Curve {
    /// Samples `model` at `num` evenly spaced angles from `min_deg` to `max_deg` inclusive.
    pub fn sample(model: &SprModel, min_deg: f64, max_deg: f64, num: usize) -> Self {
        let angles_deg = Array1::linspace(min_deg, max_deg, num);
        let reflectance = model.curve(&angles_deg.mapv(f64::to_radians));
        Self {
            angles_deg,
            reflectance,
        }
    }

    pub fn len(&self) -> usize {
        self.angles_deg.len()
    }

    pub fn is_empty(&self) -> bool {
        self.angles_deg.is_empty()
    }

    /// True if no sample is NaN or infinite.
    pub fn is_finite(&self) -> bool {
        self.reflectance.iter().all(|r| r.is_finite())
    }

    /// Global minimum, ignoring NaN samples.
    pub fn dip(&self) -> Option<Dip> {
        let index = self.reflectance.argmin_skipnan().ok()?;
        Some(Dip {
            angle_deg: self.angles_deg[index],
            reflectance: self.reflectance[index],
        })
    }

    /// Indices of strict interior local minima.
    pub fn local_minima(&self) -> Vec<usize> {
        self.reflectance
            .iter()
            .tuple_windows()
            .enumerate()
            .filter(|(_, (prev, curr, next))| curr < prev && curr < next)
            .map(|(i, _)| i + 1)
            .collect()
    }
}
