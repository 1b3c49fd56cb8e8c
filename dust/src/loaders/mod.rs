//! Loaders for third-party dust descriptions.
//!
//! Each supported format has a free function that reads its files and returns
//! a fully populated, validated [`OpticalProperties`]. [`DustSource`] names a
//! dataset in any of these formats so it can be chosen at runtime (from the
//! command line or a configuration file).

pub mod bhmie;
pub mod coatsph;
pub mod isotropic;
pub mod miex;
pub mod simple;

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use shared::columns::ColumnsError;
use shared::interpolate::RepairError;
use thiserror::Error;

use crate::optical_properties::{OpticalProperties, OpticalPropertiesError};

pub use bhmie::bhmie;
pub use coatsph::{coatsph_multiple, coatsph_single};
pub use isotropic::{isotropic, isotropic_from_file};
pub use miex::miex;
pub use simple::simple;

/// Errors that can occur while loading a third-party dust description
#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Parse(#[from] ColumnsError),

    #[error("{}: {message}", path.display())]
    InvalidHeader { path: PathBuf, message: String },

    #[error("{what} has {found} values, expected {expected}")]
    LengthMismatch {
        what: String,
        expected: usize,
        found: usize,
    },

    #[error("{}: wavelength record {index} is {found}, expected {expected}", path.display())]
    WavelengthMismatch {
        path: PathBuf,
        index: usize,
        expected: f64,
        found: f64,
    },

    #[error("{}: scattering angles differ from {} at sample {index}", path.display(), reference.display())]
    AngleGridMismatch {
        path: PathBuf,
        reference: PathBuf,
        index: usize,
    },

    #[error("{}: {lines} lines do not split into {n_wav} wavelength blocks", path.display())]
    InvalidLayout {
        path: PathBuf,
        lines: usize,
        n_wav: usize,
    },

    #[error("{}: array has shape {found:?}, expected {expected:?}", path.display())]
    ShapeMismatch {
        path: PathBuf,
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error(transparent)]
    NanRepair(#[from] RepairError),

    #[error(transparent)]
    OpticalProperties(#[from] OpticalPropertiesError),
}

/// Result of loading a dust description
#[derive(Debug, Clone)]
pub struct LoadedDust {
    pub optical_properties: OpticalProperties,
    /// Hex MD5 of the source file, for formats with a single source file
    pub md5: Option<String>,
}

impl From<OpticalProperties> for LoadedDust {
    fn from(optical_properties: OpticalProperties) -> Self {
        Self {
            optical_properties,
            md5: None,
        }
    }
}

/// A dust dataset in one of the supported formats
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "format", rename_all = "snake_case")]
pub enum DustSource {
    /// Isotropic scattering with explicit arrays (wavelengths in microns)
    Isotropic {
        wav: Vec<f64>,
        chi: Vec<f64>,
        albedo: Vec<f64>,
    },
    /// Isotropic scattering from a three-column `wav chi albedo` text file
    IsotropicFile { path: PathBuf },
    /// Bulk properties with a Henyey-Greenstein phase function
    Simple { path: PathBuf },
    /// Single-component coatsph output directory
    CoatsphSingle {
        directory: PathBuf,
        /// Grain size in cm
        size: f64,
        /// Grain density in g/cm^3
        density: f64,
    },
    /// Multi-component coatsph output directory
    CoatsphMultiple { directory: PathBuf },
    /// MieX output files sharing the `model` prefix
    Miex { model: PathBuf },
    /// Pre-tabulated arrays sharing the `model` prefix
    Bhmie { model: PathBuf },
}

impl DustSource {
    /// Short format name for logging
    pub fn format_name(&self) -> &'static str {
        match self {
            DustSource::Isotropic { .. } => "isotropic",
            DustSource::IsotropicFile { .. } => "isotropic_file",
            DustSource::Simple { .. } => "simple",
            DustSource::CoatsphSingle { .. } => "coatsph_single",
            DustSource::CoatsphMultiple { .. } => "coatsph_multiple",
            DustSource::Miex { .. } => "miex",
            DustSource::Bhmie { .. } => "bhmie",
        }
    }

    pub fn load(&self) -> Result<LoadedDust, LoaderError> {
        log::info!("Loading {} dust", self.format_name());

        match self {
            DustSource::Isotropic { wav, chi, albedo } => Ok(isotropic(wav, chi, albedo)?.into()),
            DustSource::IsotropicFile { path } => Ok(isotropic_from_file(path)?.into()),
            DustSource::Simple { path } => simple(path),
            DustSource::CoatsphSingle {
                directory,
                size,
                density,
            } => Ok(coatsph_single(directory, *size, *density)?.into()),
            DustSource::CoatsphMultiple { directory } => Ok(coatsph_multiple(directory)?.into()),
            DustSource::Miex { model } => Ok(miex(model)?.into()),
            DustSource::Bhmie { model } => Ok(bhmie(model)?.into()),
        }
    }
}

/// `<model>.<extension>`, keeping any dots already in the model name
pub(crate) fn with_extension(model: &Path, extension: &str) -> PathBuf {
    let mut name = OsString::from(model.as_os_str());
    name.push(".");
    name.push(extension);
    PathBuf::from(name)
}

/// Frequency-axis lengths of companion columns must agree
pub(crate) fn check_length(what: &str, values: &[f64], expected: usize) -> Result<(), LoaderError> {
    if values.len() != expected {
        return Err(LoaderError::LengthMismatch {
            what: what.to_string(),
            expected,
            found: values.len(),
        });
    }
    Ok(())
}

/// Relative closeness of two samples
pub(crate) fn close(a: f64, b: f64, tolerance: f64) -> bool {
    (a - b).abs() <= tolerance * a.abs().max(b.abs())
}
