//! Dust optical properties for radiative transfer
//!
//! This crate reads dust descriptions from several third-party formats,
//! normalizes them into one optical-property table with a four-element
//! scattering matrix, derives emissivities and mean opacities, and writes
//! everything to a versioned dust file.

pub mod config;
pub mod derived;
pub mod dust_model;
pub mod emissivities;
pub mod loaders;
pub mod mean_opacities;
pub mod optical_properties;
pub mod phase_function;
pub mod sublimation;

pub use config::{ConfigError, ConversionConfig, SublimationConfig};
pub use derived::Derived;
pub use dust_model::{DustError, DustModel, DUST_TYPE, FORMAT_VERSION};
pub use emissivities::{Emissivities, EmissivitiesError};
pub use loaders::{DustSource, LoadedDust, LoaderError};
pub use mean_opacities::{MeanOpacities, MeanOpacitiesError};
pub use optical_properties::{
    OpticalProperties, OpticalPropertiesError, ScatteringElement, TemperatureInversion,
};
pub use phase_function::{henyey_greenstein, henyey_greenstein_column, ScatteringCoefficients};
pub use sublimation::{SublimationMode, SublimationPolicy};
