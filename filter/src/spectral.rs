//! Spectral coordinates: frequencies, wavelengths or photon energies

use shared::constants::CGS;
use uom::si::energy::erg;
use uom::si::f64::{Energy, Frequency, Length};
use uom::si::frequency::hertz;
use uom::si::length::centimeter;

use crate::FilterError;

/// A single spectral coordinate
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SpectralValue {
    Frequency(Frequency),
    Length(Length),
    Energy(Energy),
}

impl SpectralValue {
    /// Equivalent frequency in Hz
    pub fn to_hertz(&self) -> f64 {
        match *self {
            SpectralValue::Frequency(f) => f.get::<hertz>(),
            SpectralValue::Length(l) => CGS::SPEED_OF_LIGHT / l.get::<centimeter>(),
            SpectralValue::Energy(e) => e.get::<erg>() / CGS::PLANCK_CONSTANT,
        }
    }

    fn raw(&self) -> f64 {
        match *self {
            SpectralValue::Frequency(f) => f.value,
            SpectralValue::Length(l) => l.value,
            SpectralValue::Energy(e) => e.value,
        }
    }

    /// Strictly positive and finite
    pub fn validate(&self) -> Result<(), FilterError> {
        let value = self.raw();
        if value.is_finite() && value > 0.0 {
            Ok(())
        } else {
            Err(FilterError::InvalidSpectralCoord { index: 0, value })
        }
    }
}

/// An ordered sequence of spectral coordinates of one dimension
#[derive(Debug, Clone, PartialEq)]
pub enum SpectralCoord {
    Frequency(Vec<Frequency>),
    Length(Vec<Length>),
    Energy(Vec<Energy>),
}

impl SpectralCoord {
    /// Frequencies given in Hz
    pub fn from_hertz(values: &[f64]) -> Self {
        SpectralCoord::Frequency(values.iter().map(|&v| Frequency::new::<hertz>(v)).collect())
    }

    pub fn len(&self) -> usize {
        match self {
            SpectralCoord::Frequency(v) => v.len(),
            SpectralCoord::Length(v) => v.len(),
            SpectralCoord::Energy(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> Option<SpectralValue> {
        match self {
            SpectralCoord::Frequency(v) => v.get(index).copied().map(SpectralValue::Frequency),
            SpectralCoord::Length(v) => v.get(index).copied().map(SpectralValue::Length),
            SpectralCoord::Energy(v) => v.get(index).copied().map(SpectralValue::Energy),
        }
    }

    fn values(&self) -> impl Iterator<Item = SpectralValue> + '_ {
        (0..self.len()).filter_map(|i| self.get(i))
    }

    /// Equivalent frequencies in Hz
    pub fn to_hertz(&self) -> Vec<f64> {
        self.values().map(|v| v.to_hertz()).collect()
    }

    /// Non-empty, with every value strictly positive and finite
    pub fn validate(&self) -> Result<(), FilterError> {
        if self.is_empty() {
            return Err(FilterError::EmptySpectralCoord);
        }
        for (index, value) in self.values().enumerate() {
            value
                .validate()
                .map_err(|_| FilterError::InvalidSpectralCoord {
                    index,
                    value: value.raw(),
                })?;
        }
        Ok(())
    }
}
