use anyhow::Result;
use clap::Parser;
use spr::{
    data::Measurement,
    fit, output,
    reflectance::SprModel,
    result::Curve,
    settings::{self, CliArgs, Command},
    synth,
};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = CliArgs::parse();
    let settings = settings::load_config(&args)?;
    let source = settings.light_source()?;
    println!("{}", settings);

    match &args.command {
        Command::Curve { .. } => {
            let model = SprModel::from(source);
            let curve = Curve::sample(
                &model,
                settings.min_angle,
                settings.max_angle,
                settings.num_angles,
            );
            let path = settings.directory.join("curve.dat");
            output::write_curve(&path, &curve)?;
            match curve.dip() {
                Some(dip) => println!(
                    "Resonance dip at {:.3} deg, R = {:.5}",
                    dip.angle_deg, dip.reflectance
                ),
                None => println!("No resonance dip found"),
            }
            println!("Wrote {:?}", path);
        }
        Command::Fit {
            data,
            normalize,
            min,
            max,
            ..
        } => {
            let mut measurement = Measurement::from_file(data)?.crop(*min, *max)?;
            if *normalize {
                measurement = measurement.normalized()?;
            }
            let report = fit::fit(&measurement, source, &settings.fit)?;
            println!("{}", report);

            let fit_path = settings.directory.join("fit.dat");
            let report_path = settings.directory.join("fit.json");
            output::write_fit(
                &fit_path,
                &measurement,
                &report,
                source.prism_index,
                source.wavenumber(),
            )?;
            output::write_report(&report_path, &report)?;
            println!("Wrote {:?} and {:?}", fit_path, report_path);
        }
        Command::Synth {
            intensity,
            noise,
            seed,
            ..
        } => {
            let model = SprModel::from(source);
            let measurement = synth::synthesize(
                &model,
                *intensity,
                settings.min_angle,
                settings.max_angle,
                settings.num_angles,
                *noise,
                *seed,
            )?;
            let path = settings.directory.join("synth.dat");
            output::write_measurement(&path, &measurement)?;
            println!("Wrote {} points to {:?}", measurement.len(), path);
        }
    }

    Ok(())
}
