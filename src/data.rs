//! Measured angle scans.
//!
//! A scan is a tab-delimited text file with the incidence angle in degrees in
//! the first column and the detected reflectance in the second. Lines whose
//! first non-blank character is `#` are comments. A first row that is not two
//! numbers is taken as a header. Any further columns are ignored.

use anyhow::{anyhow, bail, Context, Result};
use csv::{ReaderBuilder, Trim};
use ndarray::Array1;
use std::{fs::File, io::Read, path::Path};


/// A measured reflectance scan.
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    /// Incidence angles in degrees.
    pub angles_deg: Vec<f64>,
    /// Detected reflectance, in arbitrary units unless normalized.
    pub reflectance: Vec<f64>,
}

impl Measurement {
    pub fn new(angles_deg: Vec<f64>, reflectance: Vec<f64>) -> Result<Self> {
        if angles_deg.len() != reflectance.len() {
            bail!(
                "angle and reflectance columns must have the same length. Got {} and {}",
                angles_deg.len(),
                reflectance.len()
            );
        }
        if angles_deg.is_empty() {
            bail!("measurement contains no data points");
        }
        Ok(Self {
            angles_deg,
            reflectance,
        })
    }

    /// Reads a tab-delimited scan from a file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).with_context(|| format!("failed to open {:?}", path))?;
        Self::from_reader(file).with_context(|| format!("failed to read scan {:?}", path))
    }

    /// Reads a tab-delimited scan from any reader.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .delimiter(b'\t')
            .comment(Some(b'#'))
            .trim(Trim::All)
            .flexible(true)
            .from_reader(reader);

        let mut angles_deg = Vec::new();
        let mut reflectance = Vec::new();
        let mut header_seen = false;
        for (index, record) in reader.records().enumerate() {
            let record = record?;
            let line = record.position().map_or(index as u64 + 1, |p| p.line());
            // indented comments get past the reader's first-byte check
            let first = record.iter().find(|field| !field.is_empty());
            if first.is_some_and(|field| field.starts_with('#')) {
                continue;
            }
            let numbers = match (record.get(0), record.get(1)) {
                (Some(angle), Some(value)) => {
                    angle.parse::<f64>().ok().zip(value.parse::<f64>().ok())
                }
                _ => None,
            };
            match numbers {
                Some((angle, value)) => {
                    angles_deg.push(angle);
                    reflectance.push(value);
                }
                // a non-numeric first row is a header
                None if angles_deg.is_empty() && !header_seen => header_seen = true,
                None if record.len() < 2 => {
                    bail!("line {}: expected two columns, found {}", line, record.len())
                }
                None => {
                    return Err(anyhow!(
                        "line {}: could not parse '{}' and '{}' as numbers",
                        line,
                        &record[0],
                        &record[1]
                    ))
                }
            }
        }

        Self::new(angles_deg, reflectance)
    }

    pub fn len(&self) -> usize {
        self.angles_deg.len()
    }

    pub fn is_empty(&self) -> bool {
        self.angles_deg.is_empty()
    }

    pub fn angles(&self) -> Array1<f64> {
        Array1::from(self.angles_deg.clone())
    }

    pub fn angles_rad(&self) -> Array1<f64> {
        self.angles().mapv(f64::to_radians)
    }

    pub fn values(&self) -> Array1<f64> {
        Array1::from(self.reflectance.clone())
    }

    /// Scales the reflectance so that its maximum is 1.
    pub fn normalized(&self) -> Result<Self> {
        let peak = self
            .reflectance
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);
        if !(peak > 0.0) {
            bail!("cannot normalize a scan whose maximum is {}", peak);
        }
        Ok(Self {
            angles_deg: self.angles_deg.clone(),
            reflectance: self.reflectance.iter().map(|r| r / peak).collect(),
        })
    }

    /// Keeps only the points within `[min_deg, max_deg]`.
    pub fn crop(&self, min_deg: Option<f64>, max_deg: Option<f64>) -> Result<Self> {
        let min = min_deg.unwrap_or(f64::NEG_INFINITY);
        let max = max_deg.unwrap_or(f64::INFINITY);
        let (angles_deg, reflectance) = self
            .angles_deg
            .iter()
            .zip(self.reflectance.iter())
            .filter(|(angle, _)| (min..=max).contains(*angle))
            .map(|(angle, value)| (*angle, *value))
            .unzip();
        Self::new(angles_deg, reflectance)
            .with_context(|| format!("no data points between {} and {} degrees", min, max))
    }
}
