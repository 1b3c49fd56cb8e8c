//! Spectral transmission curves
//!
//! A [`Filter`] is a transmission curve sampled on frequencies, wavelengths or
//! photon energies. It is stored in a table set with its coordinates
//! normalized to frequency in Hz.

pub mod spectral;

use std::fmt;
use std::str::FromStr;

use shared::table_set::{Table, TableSet, TableSetError};
use thiserror::Error;

pub use spectral::{SpectralCoord, SpectralValue};

/// Errors that can occur with filter curves
#[derive(Debug, Error)]
pub enum FilterError {
    #[error("detector_type should be one of energy/photons, got '{0}'")]
    InvalidDetectorType(String),

    #[error("Spectral coordinates must not be empty")]
    EmptySpectralCoord,

    #[error("Spectral coordinate {index} must be strictly positive and finite, got {value}")]
    InvalidSpectralCoord { index: usize, value: f64 },

    #[error("Transmission {index} must be non-negative and finite, got {value}")]
    InvalidTransmission { index: usize, value: f64 },

    #[error("Transmission has {found} values, spectral coordinates have {expected}")]
    LengthMismatch { expected: usize, found: usize },

    #[error("Filter has no {0}")]
    Missing(&'static str),

    #[error(transparent)]
    TableSet(#[from] TableSetError),
}

/// What the detector behind the filter counts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorType {
    Energy,
    Photons,
}

impl DetectorType {
    /// Exponent applied to the frequency when integrating flux over the curve
    pub fn beta(self) -> i32 {
        match self {
            DetectorType::Energy => -1,
            DetectorType::Photons => 0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DetectorType::Energy => "energy",
            DetectorType::Photons => "photons",
        }
    }
}

impl fmt::Display for DetectorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DetectorType {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "energy" => Ok(DetectorType::Energy),
            "photons" => Ok(DetectorType::Photons),
            other => Err(FilterError::InvalidDetectorType(other.to_string())),
        }
    }
}

/// A spectral transmission curve
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    name: Option<String>,
    spectral_coord: Option<SpectralCoord>,
    transmission: Option<Vec<f64>>,
    central_spectral_coord: Option<SpectralValue>,
    detector_type: Option<DetectorType>,
    alpha: Option<f64>,
}

fn check_transmission(values: &[f64]) -> Result<(), FilterError> {
    match values
        .iter()
        .enumerate()
        .find(|&(_, &v)| !v.is_finite() || v < 0.0)
    {
        Some((index, &value)) => Err(FilterError::InvalidTransmission { index, value }),
        None => Ok(()),
    }
}

impl Filter {
    /// Build a complete curve, validating both arrays
    pub fn new(
        name: Option<String>,
        spectral_coord: SpectralCoord,
        transmission: Vec<f64>,
    ) -> Result<Self, FilterError> {
        let mut filter = Self {
            name,
            ..Self::default()
        };
        filter.set_spectral_coord(spectral_coord)?;
        filter.set_transmission(transmission)?;
        Ok(filter)
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn set_name(&mut self, name: Option<String>) {
        self.name = name;
    }

    pub fn spectral_coord(&self) -> Option<&SpectralCoord> {
        self.spectral_coord.as_ref()
    }

    /// Set the spectral coordinates.
    ///
    /// If a transmission is already set it must have the same length.
    pub fn set_spectral_coord(&mut self, spectral_coord: SpectralCoord) -> Result<(), FilterError> {
        spectral_coord.validate()?;
        if let Some(transmission) = &self.transmission {
            if transmission.len() != spectral_coord.len() {
                return Err(FilterError::LengthMismatch {
                    expected: spectral_coord.len(),
                    found: transmission.len(),
                });
            }
        }
        self.spectral_coord = Some(spectral_coord);
        Ok(())
    }

    pub fn transmission(&self) -> Option<&[f64]> {
        self.transmission.as_deref()
    }

    /// Set the transmission.
    ///
    /// If spectral coordinates are already set the lengths must agree.
    pub fn set_transmission(&mut self, transmission: Vec<f64>) -> Result<(), FilterError> {
        check_transmission(&transmission)?;
        if let Some(coord) = &self.spectral_coord {
            if coord.len() != transmission.len() {
                return Err(FilterError::LengthMismatch {
                    expected: coord.len(),
                    found: transmission.len(),
                });
            }
        }
        self.transmission = Some(transmission);
        Ok(())
    }

    pub fn central_spectral_coord(&self) -> Option<SpectralValue> {
        self.central_spectral_coord
    }

    pub fn set_central_spectral_coord(
        &mut self,
        value: Option<SpectralValue>,
    ) -> Result<(), FilterError> {
        if let Some(value) = &value {
            value.validate()?;
        }
        self.central_spectral_coord = value;
        Ok(())
    }

    pub fn detector_type(&self) -> Option<DetectorType> {
        self.detector_type
    }

    pub fn set_detector_type(&mut self, detector_type: DetectorType) {
        self.detector_type = Some(detector_type);
    }

    /// Frequency exponent of the detector response, if a detector type is set
    pub fn beta(&self) -> Option<i32> {
        self.detector_type.map(DetectorType::beta)
    }

    /// Spectral index used to convert integrated flux to a monochromatic value
    pub fn alpha(&self) -> Option<f64> {
        self.alpha
    }

    pub fn set_alpha(&mut self, alpha: Option<f64>) {
        self.alpha = alpha;
    }

    /// Store the curve as table `name` with columns `nu` (Hz) and `tr`
    pub fn to_table_set(&self, table_set: &mut TableSet, name: &str) -> Result<(), FilterError> {
        let coord = self
            .spectral_coord
            .as_ref()
            .ok_or(FilterError::Missing("spectral coordinates"))?;
        let transmission = self
            .transmission
            .as_ref()
            .ok_or(FilterError::Missing("transmission"))?;

        let mut table = Table::new(name);
        table.add_column("nu", coord.to_hertz());
        table.add_column("tr", transmission.clone());
        if let Some(filter_name) = &self.name {
            table.keywords.insert("name", filter_name.as_str());
        }
        table_set.add_table(table);
        Ok(())
    }

    /// Restore a curve written by [`Filter::to_table_set`], in Hz
    pub fn from_table_set(table_set: &TableSet, name: &str) -> Result<Self, FilterError> {
        let table = table_set.table(name)?;
        let nu = table.column("nu")?;
        let transmission = table.column("tr")?.to_vec();

        let filter_name = if table.keywords.contains("name") {
            Some(table.keywords.text("name")?.to_string())
        } else {
            None
        };

        log::debug!("Read filter '{}' with {} samples", name, nu.len());
        Self::new(filter_name, SpectralCoord::from_hertz(nu), transmission)
    }
}
