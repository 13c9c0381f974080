use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::Path,
};

use anyhow::{Context, Result};
use nalgebra::Complex;

use crate::{
    data::Measurement,
    fit::FitReport,
    reflectance::r_fitter_curve,
    result::Curve,
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{reflectance::SprModel, settings::LightSource};

    #[test]
    fn curve_is_written_as_tab_separated_columns() {
        let dir = tempfile::tempdir().unwrap();
        let model = SprModel::from(&LightSource::red());
        let curve = Curve::sample(&model, 40.0, 50.0, 5);
        let path = dir.path().join("nested/curve.dat");
        write_curve(&path, &curve).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 6);
        assert!(lines[0].starts_with('#'));
        let columns: Vec<f64> = lines[1].split('\t').map(|v| v.parse().unwrap()).collect();
        assert_eq!(columns[0], 40.0);
        assert_eq!(columns[1], curve.reflectance[0]);
    }

    #[test]
    fn written_measurement_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let scan = Measurement::new(vec![40.0, 41.5], vec![0.9, 0.25]).unwrap();
        let path = dir.path().join("scan.dat");
        write_measurement(&path, &scan).unwrap();
        assert_eq!(Measurement::from_file(&path).unwrap(), scan);
    }
}

fn create<P: AsRef<Path>>(path: P) -> Result<BufWriter<File>> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {:?}", parent))?;
    }
    let file = File::create(path).with_context(|| format!("failed to create {:?}", path))?;
    Ok(BufWriter::new(file))
}

/// Write a model curve as `theta_deg<TAB>reflectance` rows.
pub fn write_curve<P: AsRef<Path>>(path: P, curve: &Curve) -> Result<()> {
    let mut writer = create(path)?;
    writeln!(writer, "# theta_deg\treflectance")?;
    for (theta, r) in curve.angles_deg.iter().zip(curve.reflectance.iter()) {
        writeln!(writer, "{}\t{}", theta, r)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write a measurement in the same layout it is read in.
pub fn write_measurement<P: AsRef<Path>>(path: P, measurement: &Measurement) -> Result<()> {
    let mut writer = create(path)?;
    writeln!(writer, "# theta_deg\treflectance")?;
    for (theta, r) in measurement
        .angles_deg
        .iter()
        .zip(measurement.reflectance.iter())
    {
        writeln!(writer, "{}\t{}", theta, r)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write measured values next to the fitted model and the residuals.
pub fn write_fit<P: AsRef<Path>>(
    path: P,
    measurement: &Measurement,
    report: &FitReport,
    prism_index: Complex<f64>,
    wavenumber: f64,
) -> Result<()> {
    let model = r_fitter_curve(
        &measurement.angles(),
        &report.params,
        prism_index,
        wavenumber,
    );
    let mut writer = create(path)?;
    writeln!(writer, "# theta_deg\tmeasured\tmodel\tresidual")?;
    for ((theta, measured), fitted) in measurement
        .angles_deg
        .iter()
        .zip(measurement.reflectance.iter())
        .zip(model.iter())
    {
        writeln!(
            writer,
            "{}\t{}\t{}\t{}",
            theta,
            measured,
            fitted,
            fitted - measured
        )?;
    }
    writer.flush()?;
    Ok(())
}

/// Write the fit report as pretty-printed JSON.
pub fn write_report<P: AsRef<Path>>(path: P, report: &FitReport) -> Result<()> {
    let mut writer = create(path)?;
    serde_json::to_writer_pretty(&mut writer, report)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}
