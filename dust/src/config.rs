//! JSON description of a dust conversion.
//!
//! A [`ConversionConfig`] names a source dataset, an output dust file and an
//! optional sublimation setting, so a conversion can be rerun from a file:
//!
//! ```json
//! {
//!   "source": {"format": "miex", "model": "grains/silicate"},
//!   "output": "silicate.dust",
//!   "sublimation": {"mode": "fast", "temperature": 1600.0}
//! }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dust_model::{DustError, DustModel};
use crate::loaders::DustSource;
use crate::sublimation::SublimationMode;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Sublimation takes either a temperature or a specific energy, not both")]
    ConflictingThreshold,

    #[error(transparent)]
    Dust(#[from] DustError),
}

/// Sublimation setting with its threshold as a temperature (K) or a specific
/// energy (erg/s/g)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SublimationConfig {
    pub mode: SublimationMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specific_energy: Option<f64>,
}

impl SublimationConfig {
    /// Apply this setting to `model`
    pub fn apply(&self, model: &mut DustModel) -> Result<(), ConfigError> {
        match (self.temperature, self.specific_energy) {
            (Some(_), Some(_)) => Err(ConfigError::ConflictingThreshold),
            (Some(temperature), None) => {
                Ok(model.set_sublimation_temperature(self.mode, Some(temperature))?)
            }
            (None, specific_energy) => {
                Ok(model.set_sublimation_specific_energy(self.mode, specific_energy)?)
            }
        }
    }
}

fn default_compress() -> bool {
    true
}

/// A complete dust conversion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionConfig {
    pub source: DustSource,
    pub output: PathBuf,
    #[serde(default = "default_compress")]
    pub compress: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sublimation: Option<SublimationConfig>,
}

impl ConversionConfig {
    /// Save as pretty-printed JSON
    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let io_error = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        let json = serde_json::to_string_pretty(self).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        std::fs::write(path, json).map_err(io_error)
    }

    /// Load from a JSON file
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&json).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load the source, apply sublimation and write the dust file
    pub fn run(&self) -> Result<DustModel, ConfigError> {
        let mut model = DustModel::from_source(&self.source)?;
        if let Some(sublimation) = &self.sublimation {
            sublimation.apply(&mut model)?;
        }
        model.write(&self.output, self.compress)?;
        Ok(model)
    }
}
