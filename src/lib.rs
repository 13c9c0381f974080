//! Surface plasmon resonance reflectance of prism-coupled thin metal films.
//!
//! p-polarised light enters a prism of index `N`, reflects off a metal film of
//! permittivity `ε` and thickness `d`, and leaves through air. Near the angle
//! where the tangential wavevector matches the surface plasmon the reflectance
//! shows a sharp dip. The crate evaluates that reflectance in closed form and
//! fits it to measured angle scans.
//!
//! - [`snell`], [`fresnel`], [`reflectance`]: the model chain
//!   `cos θ2, cos θ3 → r_pm, r_ma, k → R`
//! - [`reflectance::r_fitter`]: the model in the calling convention of a
//!   least-squares engine
//! - [`fit`]: Levenberg-Marquardt fit over `(Re ε, Im ε, d, I)`
//! - [`data`], [`synth`], [`output`]: scans in and results out
//! - [`settings`]: light sources and runtime configuration

pub mod data;
pub mod fit;
pub mod fresnel;
pub mod helpers;
pub mod output;
pub mod params;
pub mod reflectance;
pub mod result;
pub mod settings;
pub mod snell;
pub mod synth;
