use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use config::{Config, Environment, File, FileFormat};
use log::{debug, info};
use nalgebra::Complex;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::helpers;
use crate::params::FitParams;

/// Built-in configuration, always loaded first so every key has a value.
const DEFAULT_CONFIG: &str = include_str!("../config/default.toml");
/// Prefix for environment variable overrides, e.g. `SPR_SOURCE=green`.
const ENV_PREFIX: &str = "spr";
/// Separator for nested keys in environment overrides, e.g. `SPR_SOURCES__RED__THICKNESS`.
const ENV_SEPARATOR: &str = "__";


/// Optical constants of one illumination setup: laser, prism and film.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LightSource {
    /// Vacuum wavelength in nanometres.
    pub wavelength: f64,
    /// Refractive index of the coupling prism at `wavelength`.
    pub prism_index: Complex<f64>,
    /// Default permittivity of the metal film at `wavelength`.
    pub epsilon: Complex<f64>,
    /// Default film thickness in nanometres.
    pub thickness: f64,
}

impl LightSource {
    /// HeNe laser, silver film on BK7.
    pub fn red() -> Self {
        Self {
            wavelength: 632.8,
            prism_index: Complex::new(1.51, 0.0),
            epsilon: Complex::new(-18.0, 0.47),
            thickness: 47.0,
        }
    }

    /// Frequency-doubled Nd:YAG laser, silver film on BK7.
    pub fn green() -> Self {
        Self {
            wavelength: 532.0,
            prism_index: Complex::new(1.52, 0.0),
            epsilon: Complex::new(-11.7, 0.37),
            thickness: 47.0,
        }
    }

    /// `k0 = 2π/λ` in inverse nanometres.
    pub fn wavenumber(&self) -> f64 {
        helpers::wavenumber(self.wavelength)
    }
}

/// Controls for the least-squares fit.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct FitSettings {
    /// Number of independent starts. The first is the initial guess itself.
    #[serde(default = "default_starts")]
    pub starts: usize,
    /// Relative standard deviation of the perturbed starts.
    #[serde(default = "default_spread")]
    pub spread: f64,
    /// Levenberg-Marquardt patience, in multiples of the parameter count.
    #[serde(default = "default_patience")]
    pub patience: usize,
    /// Seed for the perturbed starts. Random if absent.
    #[serde(default)]
    pub seed: Option<u64>,
    /// Initial guess. Falls back to the light source defaults with unit intensity.
    #[serde(default)]
    pub initial: Option<FitParams>,
}

fn default_starts() -> usize {
    8
}

fn default_spread() -> f64 {
    0.1
}

fn default_patience() -> usize {
    100
}

impl Default for FitSettings {
    fn default() -> Self {
        Self {
            starts: default_starts(),
            spread: default_spread(),
            patience: default_patience(),
            seed: None,
            initial: None,
        }
    }
}

impl FitSettings {
    pub fn initial_for(&self, source: &LightSource) -> FitParams {
        self.initial
            .unwrap_or_else(|| FitParams::from_source(source))
    }
}

/// Runtime configuration for the application.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Settings {
    /// Key into `sources` of the light source in use.
    pub source: String,
    pub sources: BTreeMap<String, LightSource>,
    /// Angular range and sample count in degrees for curves and synthetic scans.
    pub min_angle: f64,
    pub max_angle: f64,
    pub num_angles: usize,
    /// Directory output files are written to.
    #[serde(default = "default_directory")]
    pub directory: PathBuf,
    #[serde(default)]
    pub fit: FitSettings,
}

fn default_directory() -> PathBuf {
    PathBuf::from(".")
}

impl Settings {
    /// The selected light source.
    pub fn light_source(&self) -> Result<&LightSource> {
        self.sources.get(&self.source).ok_or_else(|| {
            anyhow!(
                "unknown light source '{}', available: {:?}",
                self.source,
                self.sources.keys().collect::<Vec<_>>()
            )
        })
    }

    fn light_source_mut(&mut self) -> Result<&mut LightSource> {
        let name = self.source.clone();
        self.sources
            .get_mut(&name)
            .ok_or_else(|| anyhow!("unknown light source '{}'", name))
    }

    pub fn validate(&self) -> Result<()> {
        self.light_source()?;
        for (name, source) in &self.sources {
            if !(source.wavelength > 0.0) {
                bail!("light source '{}': wavelength must be greater than 0", name);
            }
            if !(source.thickness > 0.0) {
                bail!("light source '{}': thickness must be greater than 0", name);
            }
            if !(source.prism_index.re > 0.0) {
                bail!("light source '{}': prism index must be greater than 0", name);
            }
        }
        if !(self.min_angle < self.max_angle) {
            bail!(
                "min_angle ({}) must be less than max_angle ({})",
                self.min_angle,
                self.max_angle
            );
        }
        if self.num_angles < 2 {
            bail!("num_angles must be at least 2, got {}", self.num_angles);
        }
        if self.fit.starts == 0 {
            bail!("fit.starts must be at least 1");
        }
        if self.fit.spread < 0.0 {
            bail!("fit.spread must not be negative, got {}", self.fit.spread);
        }
        Ok(())
    }
}

/// Loads the built-in configuration only, ignoring local files and the environment.
pub fn load_default_config() -> Result<Settings> {
    let settings = Config::builder()
        .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
        .build()
        .context("failed to build default configuration")?;

    let config: Settings = settings
        .try_deserialize()
        .context("failed to deserialize default configuration")?;

    config.validate()?;
    Ok(config)
}

/// Loads the layered configuration and applies command-line overrides.
///
/// Layers, lowest priority first: built-in defaults, `config/local.toml` in
/// the project root (or the file passed with `--config`), `SPR_*`
/// environment variables, command-line flags.
pub fn load_config(args: &CliArgs) -> Result<Settings> {
    let mut builder =
        Config::builder().add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml));

    if let Some(path) = &args.config {
        info!("Using configuration: {:?}", path);
        builder = builder.add_source(File::from(path.as_path()).required(true));
    } else if let Some(local) = retrieve_project_root().map(|root| root.join("config/local.toml"))
    {
        if local.exists() {
            info!("Using local configuration: {:?}", local);
            builder = builder.add_source(File::from(local).required(true));
        }
    }

    let settings = builder
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator(ENV_SEPARATOR),
        )
        .build()
        .context("failed to load configuration")?;

    let mut config: Settings = settings
        .try_deserialize()
        .context("failed to deserialize configuration")?;

    args.apply(&mut config)?;
    config.validate()?;

    debug!("{:#?}", config);

    Ok(config)
}

/// Retrieve the project root directory, the one holding `config/`.
///
/// Tried in order: the `SPR_ROOT_DIR` environment variable, cargo's
/// `CARGO_MANIFEST_DIR`, then the executable's directory and its parents.
fn retrieve_project_root() -> Option<PathBuf> {
    if let Ok(path) = env::var("SPR_ROOT_DIR") {
        return Some(PathBuf::from(path));
    }
    if let Ok(manifest_dir) = env::var("CARGO_MANIFEST_DIR") {
        return Some(PathBuf::from(manifest_dir));
    }
    let exe_path = env::current_exe().ok()?;
    exe_path
        .ancestors()
        .skip(1)
        .find(|dir| dir.join("config").is_dir())
        .map(Path::to_path_buf)
}

#[derive(Parser, Debug)]
#[command(version, about = "SPR - surface plasmon resonance reflectance model and fitter")]
pub struct CliArgs {
    /// Configuration file layered over the built-in defaults.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Name of the light source to use, as listed under [sources] in the configuration.
    #[arg(long, global = true)]
    pub source: Option<String>,

    /// Vacuum wavelength in nanometres.
    #[arg(short, long, global = true)]
    pub w: Option<f64>,

    /// Refractive index of the prism, e.g. 1.51 or 1.51+0i.
    #[arg(long, global = true)]
    pub ri: Option<Complex<f64>>,

    /// Permittivity of the metal film, e.g. -18+0.47i.
    #[arg(long, global = true, allow_hyphen_values = true)]
    pub eps: Option<Complex<f64>>,

    /// Film thickness in nanometres.
    #[arg(short, long, global = true)]
    pub d: Option<f64>,

    /// Output directory.
    #[arg(long, global = true)]
    pub dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Sample the model reflectance over an angular range.
    Curve {
        #[command(flatten)]
        range: RangeArgs,
    },
    /// Fit the model to a measured angle scan.
    Fit {
        /// Tab-delimited file: angle in degrees, reflectance.
        data: PathBuf,
        /// Divide the measured values by their maximum before fitting.
        #[arg(long)]
        normalize: bool,
        /// Only fit points at or above this angle (degrees).
        #[arg(long)]
        min: Option<f64>,
        /// Only fit points at or below this angle (degrees).
        #[arg(long)]
        max: Option<f64>,
        /// Number of independent fit starts.
        #[arg(long)]
        starts: Option<usize>,
        /// Seed for the perturbed starts.
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Generate a synthetic measurement from the model.
    Synth {
        #[command(flatten)]
        range: RangeArgs,
        /// Linear intensity scale applied to the reflectance.
        #[arg(long, default_value_t = 1.0)]
        intensity: f64,
        /// Standard deviation of the additive Gaussian noise.
        #[arg(long, default_value_t = 0.0)]
        noise: f64,
        /// Seed for the noise.
        #[arg(long)]
        seed: Option<u64>,
    },
}

#[derive(clap::Args, Debug, Clone)]
pub struct RangeArgs {
    /// Start angle in degrees.
    #[arg(long)]
    pub min: Option<f64>,
    /// End angle in degrees.
    #[arg(long)]
    pub max: Option<f64>,
    /// Number of samples.
    #[arg(long)]
    pub num: Option<usize>,
}

impl CliArgs {
    /// Applies command-line overrides on top of loaded settings.
    pub fn apply(&self, config: &mut Settings) -> Result<()> {
        if let Some(source) = &self.source {
            config.source = source.clone();
        }
        if let Some(dir) = &self.dir {
            config.directory = dir.clone();
        }

        let source = config.light_source_mut()?;
        if let Some(wavelength) = self.w {
            source.wavelength = wavelength;
        }
        if let Some(prism_index) = self.ri {
            source.prism_index = prism_index;
        }
        if let Some(epsilon) = self.eps {
            source.epsilon = epsilon;
        }
        if let Some(thickness) = self.d {
            source.thickness = thickness;
        }

        match &self.command {
            Command::Curve { range } | Command::Synth { range, .. } => {
                if let Some(min) = range.min {
                    config.min_angle = min;
                }
                if let Some(max) = range.max {
                    config.max_angle = max;
                }
                if let Some(num) = range.num {
                    config.num_angles = num;
                }
            }
            Command::Fit { starts, seed, .. } => {
                if let Some(starts) = starts {
                    config.fit.starts = *starts;
                }
                if seed.is_some() {
                    config.fit.seed = *seed;
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let source = self.sources.get(&self.source);
        write!(
            f,
            "Settings:
  - Source: {}
  - Wavelength: {}
  - Prism Index: {}
  - Permittivity: {}
  - Thickness: {}
  - Angles: {:.3} .. {:.3} ({} samples)
  ",
            self.source,
            source.map_or("-".to_string(), |s| format!("{:.3}", s.wavelength)),
            source.map_or("-".to_string(), |s| format!(
                "{:.4} + {:.4}i",
                s.prism_index.re, s.prism_index.im
            )),
            source.map_or("-".to_string(), |s| format!(
                "{:.4} + {:.4}i",
                s.epsilon.re, s.epsilon.im
            )),
            source.map_or("-".to_string(), |s| format!("{:.3}", s.thickness)),
            self.min_angle,
            self.max_angle,
            self.num_angles,
        )
    }
}
